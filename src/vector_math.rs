use std::cmp::Ordering;

use crate::core::config::DistanceMetric;
use crate::core::errors::ApiError;

fn check_shapes(query: &[f32], candidate: &[f32]) -> Result<(), ApiError> {
    if query.is_empty() || candidate.is_empty() {
        return Err(ApiError::BadRequest("Vectors must not be empty".to_string()));
    }
    if query.len() != candidate.len() {
        return Err(ApiError::BadRequest(format!(
            "Vector length mismatch: {} != {}",
            query.len(),
            candidate.len()
        )));
    }
    Ok(())
}

pub fn cosine_similarity(query: &[f32], candidate: &[f32]) -> Result<f32, ApiError> {
    check_shapes(query, candidate)?;

    let dot: f32 = query.iter().zip(candidate).map(|(a, b)| a * b).sum();
    let denom = l2_norm(query) * l2_norm(candidate);
    if denom <= f32::EPSILON {
        return Ok(0.0);
    }

    Ok(dot / denom)
}

pub fn euclidean_distance(query: &[f32], candidate: &[f32]) -> Result<f32, ApiError> {
    check_shapes(query, candidate)?;

    Ok(query
        .iter()
        .zip(candidate)
        .map(|(a, b)| (a - b) * (a - b))
        .sum::<f32>()
        .sqrt())
}

/// Similarity under `metric`, higher is closer.
///
/// Euclidean distance is mapped to `1 / (1 + d)` so both metrics rank the
/// same way.
pub fn similarity(metric: DistanceMetric, query: &[f32], candidate: &[f32]) -> Result<f32, ApiError> {
    match metric {
        DistanceMetric::Cosine => cosine_similarity(query, candidate),
        DistanceMetric::Euclidean => euclidean_distance(query, candidate).map(|d| 1.0 / (1.0 + d)),
    }
}

/// Scores each candidate against `query`, best first, keeping the original
/// positions.
pub fn rank_descending<'a, I>(
    metric: DistanceMetric,
    query: &[f32],
    candidates: I,
) -> Result<Vec<(usize, f32)>, ApiError>
where
    I: IntoIterator<Item = &'a [f32]>,
{
    let candidates = candidates.into_iter();
    let mut scores = Vec::with_capacity(candidates.size_hint().0);
    for (idx, candidate) in candidates.enumerate() {
        let score = similarity(metric, query, candidate)?;
        scores.push((idx, score));
    }

    scores.sort_by(|left, right| right.1.partial_cmp(&left.1).unwrap_or(Ordering::Equal));
    Ok(scores)
}

fn l2_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|x| x * x).sum::<f32>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(left: f32, right: f32) -> bool {
        (left - right).abs() < 1e-5
    }

    #[test]
    fn cosine_is_one_for_identical_vectors() {
        let vec = vec![1.0, 2.0, 3.0, 4.0];
        let score = cosine_similarity(&vec, &vec).expect("cosine should work");
        assert!(approx_eq(score, 1.0));
    }

    #[test]
    fn cosine_is_zero_for_orthogonal_or_zero_vectors() {
        assert!(approx_eq(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap(), 0.0));
        assert!(approx_eq(cosine_similarity(&[0.0, 0.0], &[0.0, 1.0]).unwrap(), 0.0));
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        assert!(cosine_similarity(&[1.0], &[1.0, 2.0]).is_err());
        assert!(euclidean_distance(&[], &[]).is_err());
    }

    #[test]
    fn euclidean_similarity_decreases_with_distance() {
        let near = similarity(DistanceMetric::Euclidean, &[0.0, 0.0], &[0.0, 1.0]).unwrap();
        let far = similarity(DistanceMetric::Euclidean, &[0.0, 0.0], &[3.0, 4.0]).unwrap();
        assert!(approx_eq(near, 0.5));
        assert!(near > far);
    }

    #[test]
    fn ranking_returns_highest_similarity_first() {
        let query = vec![1.0, 0.0];
        let candidates = vec![vec![0.8, 0.2], vec![0.1, 0.9], vec![0.9, 0.0]];
        let ranked = rank_descending(
            DistanceMetric::Cosine,
            &query,
            candidates.iter().map(Vec::as_slice),
        )
        .expect("ranking should work");

        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].0, 2);
        assert_eq!(ranked[2].0, 1);
    }
}
