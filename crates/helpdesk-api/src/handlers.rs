//! Route handler functions for all API endpoints.
//!
//! Each handler extracts its JSON body, locks the engine for the duration of
//! the call, and returns a JSON response.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use helpdesk_core::types::{Classification, NewTicket, ScoredTicket, Ticket};
use helpdesk_vector::IndexState;

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Request types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ClassifyRequest {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct AddTicketRequest {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ClassifyResponse {
    #[serde(flatten)]
    pub classification: Classification,
    pub similar_tickets: Vec<ScoredTicket>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddTicketResponse {
    #[serde(flatten)]
    pub ticket: Ticket,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct CategoriesResponse {
    pub categories: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub ticket_count: usize,
    pub category_count: usize,
    pub ticket_index: IndexState,
    pub category_index: IndexState,
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /api/search - rank stored tickets against a free-text query.
pub async fn search(
    State(state): State<AppState>,
    Json(body): Json<SearchRequest>,
) -> Result<Json<Vec<ScoredTicket>>, ApiError> {
    let search = &state.config.search;
    let limit = body
        .limit
        .unwrap_or(search.default_limit)
        .min(search.max_limit)
        .max(1);

    let mut engine = state.engine.lock().await;
    let results = engine.search(&body.query, limit).await?;
    tracing::debug!(limit, hits = results.len(), "Search served");
    Ok(Json(results))
}

/// POST /api/classify - predict a category and list similar tickets.
pub async fn classify(
    State(state): State<AppState>,
    Json(body): Json<ClassifyRequest>,
) -> Result<Json<ClassifyResponse>, ApiError> {
    if body.subject.trim().is_empty() || body.description.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Subject and description are required".to_string(),
        ));
    }

    let mut engine = state.engine.lock().await;
    let classification = engine.classify(&body.subject, &body.description).await?;
    let query = format!("{} {}", body.subject, body.description);
    let similar_tickets = engine
        .search(&query, state.config.search.similar_tickets)
        .await?;

    Ok(Json(ClassifyResponse {
        classification,
        similar_tickets,
    }))
}

/// POST /api/add-ticket - persist a new ticket.
pub async fn add_ticket(
    State(state): State<AppState>,
    Json(body): Json<AddTicketRequest>,
) -> Result<Json<AddTicketResponse>, ApiError> {
    let ticket = NewTicket::new(body.subject, body.description, body.category)?;
    let ticket = state.engine.lock().await.add_ticket(ticket)?;

    Ok(Json(AddTicketResponse {
        ticket,
        message: "Ticket added successfully".to_string(),
    }))
}

/// GET /api/categories - the configured taxonomy in index order.
pub async fn categories(State(state): State<AppState>) -> Json<CategoriesResponse> {
    let engine = state.engine.lock().await;
    Json(CategoriesResponse {
        categories: engine.taxonomy().labels().to_vec(),
    })
}

/// GET /health - liveness plus corpus and index status.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let engine = state.engine.lock().await;
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        ticket_count: engine.tickets().len(),
        category_count: engine.taxonomy().len(),
        ticket_index: engine.ticket_index_state(),
        category_index: engine.category_index_state(),
    })
}
