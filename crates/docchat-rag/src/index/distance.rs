//! Distance functions for nearest-neighbor ranking

use serde::{Deserialize, Serialize};

/// Metric used to rank chunks against a query vector (lower is closer)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Squared Euclidean distance
    #[default]
    L2,
    /// `1 - cosine similarity`
    Cosine,
    /// Negated dot product
    Dot,
}

impl DistanceMetric {
    /// Distance between two vectors of equal length
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::L2 => euclidean_distance_squared(a, b),
            DistanceMetric::Cosine => 1.0 - cosine_similarity(a, b),
            DistanceMetric::Dot => -dot(a, b),
        }
    }
}

pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub fn magnitude(v: &[f32]) -> f32 {
    dot(v, v).sqrt()
}

pub fn euclidean_distance_squared(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Cosine similarity, 0.0 when either vector is all zeros
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let ma = magnitude(a);
    let mb = magnitude(b);

    if ma == 0.0 || mb == 0.0 {
        return 0.0;
    }

    dot(a, b) / (ma * mb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l2() {
        let d = DistanceMetric::L2.distance(&[0.0, 0.0], &[3.0, 4.0]);
        assert!((d - 25.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_identical_is_zero() {
        let d = DistanceMetric::Cosine.distance(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]);
        assert!(d.abs() < 1e-6);
    }

    #[test]
    fn test_cosine_zero_vector() {
        let d = DistanceMetric::Cosine.distance(&[0.0, 0.0], &[1.0, 0.0]);
        assert!((d - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_dot_orders_by_alignment() {
        let q = [1.0, 0.0];
        let close = DistanceMetric::Dot.distance(&q, &[0.9, 0.1]);
        let far = DistanceMetric::Dot.distance(&q, &[0.1, 0.9]);
        assert!(close < far);
    }
}
