//! Cosine similarity and top-k selection.

use std::cmp::Ordering;

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if the lengths differ or either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (*x as f64) * (*y as f64))
        .sum();

    let mag_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let mag_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    (dot / (mag_a * mag_b)).clamp(-1.0, 1.0)
}

/// Indices of the `k` largest scores, highest first.
///
/// `k` is clamped to `scores.len()`. Equal scores keep ascending index order,
/// which makes the result deterministic.
pub fn top_k(scores: &[f64], k: usize) -> Vec<usize> {
    let k = k.min(scores.len());
    if k == 0 {
        return Vec::new();
    }

    let by_score_desc = |a: &usize, b: &usize| -> Ordering {
        scores[*b].total_cmp(&scores[*a]).then(a.cmp(b))
    };

    let mut indices: Vec<usize> = (0..scores.len()).collect();
    if k < indices.len() {
        indices.select_nth_unstable_by(k - 1, by_score_desc);
        indices.truncate(k);
    }
    indices.sort_unstable_by(by_score_desc);
    indices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity_identical() {
        let a = vec![1.0f32; 100];
        let b = vec![1.0f32; 100];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let mut a = vec![0.0f32; 100];
        let mut b = vec![0.0f32; 100];
        a[0] = 1.0;
        b[1] = 1.0;
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_opposite() {
        let a = vec![1.0f32; 10];
        let b = vec![-1.0f32; 10];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        let a = vec![0.0f32; 100];
        let b = vec![1.0f32; 100];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_cosine_similarity_length_mismatch() {
        let a = vec![1.0f32; 10];
        let b = vec![1.0f32; 20];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_top_k_orders_descending() {
        let scores = [0.1, 0.9, 0.5, 0.7];
        assert_eq!(top_k(&scores, 3), vec![1, 3, 2]);
    }

    #[test]
    fn test_top_k_clamps_to_len() {
        let scores = [0.2, 0.4];
        assert_eq!(top_k(&scores, 10), vec![1, 0]);
    }

    #[test]
    fn test_top_k_empty() {
        assert!(top_k(&[], 5).is_empty());
        assert!(top_k(&[0.5, 0.6], 0).is_empty());
    }

    #[test]
    fn test_top_k_ties_by_index() {
        let scores = [0.5, 0.8, 0.5, 0.8, 0.5];
        assert_eq!(top_k(&scores, 4), vec![1, 3, 0, 2]);
    }

    #[test]
    fn test_top_k_handles_negative_scores() {
        let scores = [-0.3, -0.1, -0.9];
        assert_eq!(top_k(&scores, 2), vec![1, 0]);
    }
}
