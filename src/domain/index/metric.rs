//! Cosine distance and vector validation
//!
//! Vectors are L2-normalized when they enter the index, after which the
//! cosine distance is `1 - dot(a, b)`. Norms are accumulated in f64 so that
//! any finite, non-zero f32 vector has a finite, positive norm.

use crate::domain::DomainError;

/// Reject vectors the cosine metric is undefined for
pub fn validate_vector(vector: &[f32], dimensions: usize) -> Result<(), DomainError> {
    if vector.len() != dimensions {
        return Err(DomainError::dimension_mismatch(dimensions, vector.len()));
    }

    if vector.iter().any(|x| !x.is_finite()) {
        return Err(DomainError::invalid_input("vector contains non-finite values"));
    }

    let n = norm(vector);
    if n == 0.0 {
        return Err(DomainError::invalid_input("vector has zero magnitude"));
    }
    if !n.is_finite() {
        return Err(DomainError::invalid_input("vector magnitude is not finite"));
    }

    Ok(())
}

pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn norm(vector: &[f32]) -> f64 {
    vector
        .iter()
        .map(|&x| f64::from(x) * f64::from(x))
        .sum::<f64>()
        .sqrt()
}

/// Scale a vector to unit length
pub fn normalize(vector: &[f32]) -> Vec<f32> {
    let n = norm(vector);

    if n == 0.0 || !n.is_finite() {
        return vector.to_vec();
    }

    vector.iter().map(|&x| (f64::from(x) / n) as f32).collect()
}

/// Cosine distance between two raw vectors, in `[0, 2]`
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let na = norm(a);
    let nb = norm(b);

    if a.len() != b.len() || na == 0.0 || nb == 0.0 {
        return 1.0;
    }

    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(&x, &y)| f64::from(x) * f64::from(y))
        .sum();

    ((1.0 - dot / (na * nb)) as f32).clamp(0.0, 2.0)
}
