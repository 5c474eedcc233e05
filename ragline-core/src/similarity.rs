//! Vector similarity primitives.
//!
//! Pure functions over two equal-length vectors. Accumulation happens in
//! `f64` so that scores compared against thresholds are not skewed by `f32`
//! rounding.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::{RaglineError, Result};

/// How two embeddings are compared.
///
/// Every mode is oriented so that a larger value means "more similar";
/// [`SimilarityMode::Euclidean`] therefore yields the negated distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SimilarityMode {
    /// Cosine of the angle between the vectors.
    #[default]
    Cosine,
    /// Raw dot product.
    DotProduct,
    /// Negative Euclidean distance.
    Euclidean,
}

impl FromStr for SimilarityMode {
    type Err = RaglineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "cosine" => Ok(Self::Cosine),
            "dot_product" | "dotproduct" | "dot" => Ok(Self::DotProduct),
            "euclidean" => Ok(Self::Euclidean),
            other => Err(RaglineError::validation(format!(
                "unknown similarity mode: {other}"
            ))),
        }
    }
}

fn ensure_same_len(a: &[f32], b: &[f32]) -> Result<()> {
    if a.len() == b.len() {
        Ok(())
    } else {
        Err(RaglineError::validation(format!(
            "vector length mismatch: {} vs {}",
            a.len(),
            b.len()
        )))
    }
}

fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| f64::from(*x) * f64::from(*y))
        .sum()
}

fn norm(v: &[f32]) -> f64 {
    v.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt()
}

/// Cosine similarity. Returns 0 when either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64> {
    ensure_same_len(a, b)?;
    let norm_a = norm(a);
    let norm_b = norm(b);
    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    Ok(dot(a, b) / (norm_a * norm_b))
}

/// Dot product.
pub fn dot_product(a: &[f32], b: &[f32]) -> Result<f64> {
    ensure_same_len(a, b)?;
    Ok(dot(a, b))
}

/// Euclidean distance (non-negative).
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> Result<f64> {
    ensure_same_len(a, b)?;
    Ok(a.iter()
        .zip(b)
        .map(|(x, y)| (f64::from(*x) - f64::from(*y)).powi(2))
        .sum::<f64>()
        .sqrt())
}

/// Similarity under `mode`, oriented so that larger is better.
pub fn similarity(a: &[f32], b: &[f32], mode: SimilarityMode) -> Result<f64> {
    match mode {
        SimilarityMode::Cosine => cosine_similarity(a, b),
        SimilarityMode::DotProduct => dot_product(a, b),
        SimilarityMode::Euclidean => euclidean_distance(a, b).map(|d| -d),
    }
}
