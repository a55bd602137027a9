//! Benchmarks for brute-force ticket ranking.
//!
//! Uses 1,000 tickets by default. Set `BENCH_FULL_SCALE=1` to rank 10,000.

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use helpdesk_core::types::Taxonomy;
use helpdesk_storage::{generate_tickets, write_tickets, CorpusStore};
use helpdesk_vector::{top_k, EmbeddingMatrix, EmbeddingService, MockEmbedding, TicketSearchEngine};
use rand::rngs::StdRng;
use rand::SeedableRng;

const CI_TICKET_COUNT: usize = 1_000;
const FULL_SCALE_TICKET_COUNT: usize = 10_000;

fn ticket_count() -> usize {
    if std::env::var("BENCH_FULL_SCALE").is_ok() {
        FULL_SCALE_TICKET_COUNT
    } else {
        CI_TICKET_COUNT
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build tokio runtime")
}

/// Raw matrix scoring and top-k selection, no embedding on the hot path.
fn bench_rank(c: &mut Criterion) {
    let count = ticket_count();
    let rt = runtime();
    let embedder = MockEmbedding::new();
    let tickets = generate_tickets(count, &mut StdRng::seed_from_u64(7));
    let texts: Vec<String> = tickets.iter().map(|t| t.embedding_text()).collect();

    let rows = rt.block_on(embedder.embed_batch(&texts)).expect("embed failed");
    let matrix = EmbeddingMatrix::from_rows(rows, embedder.dimensions()).expect("matrix failed");
    let query = rt
        .block_on(embedder.embed("cannot login after password reset"))
        .expect("query embed failed");

    let mut group = c.benchmark_group("rank");
    group.measurement_time(Duration::from_secs(5));

    group.bench_function(format!("similarities_{count}"), |b| {
        b.iter(|| matrix.similarities(black_box(&query)).expect("score failed"));
    });

    let scores = matrix.similarities(&query).expect("score failed");
    group.bench_function(format!("top5_{count}"), |b| {
        b.iter(|| top_k(black_box(&scores), 5));
    });

    group.finish();
}

/// Full engine search with a warm ticket index.
fn bench_engine_search(c: &mut Criterion) {
    let count = ticket_count();
    let rt = runtime();
    let dir = tempfile::tempdir().expect("tempdir failed");
    let path = dir.path().join("tickets.json");
    let tickets = generate_tickets(count, &mut StdRng::seed_from_u64(11));
    write_tickets(&path, &tickets).expect("write failed");

    let mut engine =
        TicketSearchEngine::new(CorpusStore::new(&path), Taxonomy::default(), MockEmbedding::new());
    engine.load().expect("load failed");
    rt.block_on(engine.warm_up()).expect("warm up failed");

    let mut group = c.benchmark_group("engine");
    group.measurement_time(Duration::from_secs(5));

    group.bench_function(format!("search_top5_{count}"), |b| {
        b.iter(|| {
            let hits = rt
                .block_on(engine.search("invoice charged twice", 5))
                .expect("search failed");
            assert_eq!(hits.len(), 5);
            hits
        });
    });

    group.bench_function("classify", |b| {
        b.iter(|| {
            rt.block_on(engine.classify("App crashes", "Crash when opening settings"))
                .expect("classify failed")
        });
    });

    group.finish();
}

criterion_group!(benches, bench_rank, bench_engine_search);
criterion_main!(benches);
