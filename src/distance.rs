//! Distance oracles.
//!
//! NN-Descent never looks at point coordinates. Everything it needs is a
//! symmetric, deterministic function over two point identifiers, which is
//! what [`DistanceOracle`] captures. Any `Fn(PointId, PointId) -> f32` closure
//! is an oracle, and [`VectorOracle`] adapts a flat buffer of dense vectors
//! plus a [`DistanceMetric`].
//!
//! ## Important nuance
//!
//! The oracle must return non-negative values with `distance(a, a) == 0` and
//! `distance(a, b) == distance(b, a)`. This is not checked. A non-symmetric or
//! non-deterministic oracle does not crash a build, but the graph it produces
//! is not meaningful and the run may end [`Exhausted`](crate::Termination::Exhausted).

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Error, Result};
use crate::PointId;

/// Symmetric distance over point identifiers.
///
/// Implementations are called concurrently from the parallel join, so they
/// must be `Sync` and free of interior state that affects results.
pub trait DistanceOracle: Sync {
    /// Distance between points `a` and `b`.
    fn distance(&self, a: PointId, b: PointId) -> f32;
}

impl<F> DistanceOracle for F
where
    F: Fn(PointId, PointId) -> f32 + Sync,
{
    #[inline]
    fn distance(&self, a: PointId, b: PointId) -> f32 {
        self(a, b)
    }
}

/// Distance metric for dense vectors.
///
/// No inner product: NN-Descent needs a non-negative distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DistanceMetric {
    /// Euclidean (L2) distance.
    L2,
    /// Squared Euclidean distance. Same neighbor order as L2, no square root.
    SquaredL2,
    /// Manhattan (L1) distance.
    Manhattan,
    /// Cosine distance $1 - \cos(a,b)$, in `[0, 2]`.
    Cosine,
    /// Angular distance $\arccos(\cos(a,b)) / \pi$, in `[0,1]`.
    Angular,
}

impl DistanceMetric {
    /// Compute distance between two vectors.
    ///
    /// If dimensions mismatch, this returns `f32::INFINITY` (so it is never selected as a
    /// nearest neighbor).
    #[inline]
    #[must_use]
    pub fn distance(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::L2 => l2_distance(a, b),
            DistanceMetric::SquaredL2 => squared_l2_distance(a, b),
            DistanceMetric::Manhattan => manhattan_distance(a, b),
            DistanceMetric::Cosine => cosine_distance(a, b),
            DistanceMetric::Angular => angular_distance(a, b),
        }
    }
}

/// Squared L2 distance.
#[inline]
#[must_use]
pub fn squared_l2_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// L2 (Euclidean) distance.
#[inline]
#[must_use]
pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    squared_l2_distance(a, b).sqrt()
}

/// L1 (Manhattan) distance.
#[inline]
#[must_use]
pub fn manhattan_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum()
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        // Zero vectors are orthogonal to everything.
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0)
}

/// Cosine distance $1 - \cos(a,b)$.
///
/// Computes norms, so inputs need not be normalized.
#[inline]
#[must_use]
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    // Rounding can push identical vectors slightly below zero.
    (1.0 - cosine_similarity(a, b)).max(0.0)
}

/// Angular distance $\arccos(\cos(a,b)) / \pi$, in `[0,1]`.
#[inline]
#[must_use]
pub fn angular_distance(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    cosine_similarity(a, b).acos() / std::f32::consts::PI
}

/// Oracle over a flat row-major buffer of dense vectors.
///
/// Point `i` is the slice `vectors[i * dimension..(i + 1) * dimension]`.
#[derive(Debug, Clone, Copy)]
pub struct VectorOracle<'a> {
    vectors: &'a [f32],
    dimension: usize,
    metric: DistanceMetric,
}

impl<'a> VectorOracle<'a> {
    /// Wrap a vector buffer.
    ///
    /// Fails if `dimension` is zero, the buffer is empty, or its length is not a
    /// multiple of `dimension`.
    pub fn new(vectors: &'a [f32], dimension: usize, metric: DistanceMetric) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::InvalidParameter(
                "dimension must be greater than 0".to_string(),
            ));
        }
        if vectors.is_empty() {
            return Err(Error::InvalidParameter("vector buffer is empty".to_string()));
        }
        if vectors.len() % dimension != 0 {
            return Err(Error::DimensionMismatch {
                expected: dimension,
                found: vectors.len() % dimension,
            });
        }
        Ok(Self {
            vectors,
            dimension,
            metric,
        })
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vectors.len() / self.dimension
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[must_use]
    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    /// Vector of point `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is out of range.
    #[inline]
    #[must_use]
    pub fn vector(&self, id: PointId) -> &'a [f32] {
        let start = id as usize * self.dimension;
        &self.vectors[start..start + self.dimension]
    }
}

impl DistanceOracle for VectorOracle<'_> {
    #[inline]
    fn distance(&self, a: PointId, b: PointId) -> f32 {
        self.metric.distance(self.vector(a), self.vector(b))
    }
}

/// Oracle wrapper that counts how many distances were evaluated.
#[derive(Debug, Default)]
pub struct CountingOracle<O> {
    inner: O,
    calls: AtomicU64,
}

impl<O: DistanceOracle> CountingOracle<O> {
    pub fn new(inner: O) -> Self {
        Self {
            inner,
            calls: AtomicU64::new(0),
        }
    }

    /// Evaluations since construction or the last [`reset`](Self::reset).
    #[must_use]
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.calls.store(0, Ordering::Relaxed);
    }

    pub fn into_inner(self) -> O {
        self.inner
    }
}

impl<O: DistanceOracle> DistanceOracle for CountingOracle<O> {
    #[inline]
    fn distance(&self, a: PointId, b: PointId) -> f32 {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.inner.distance(a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_distance_is_zero_for_identical() {
        let a = [1.0_f32, 2.0, 3.0];
        let d = cosine_distance(&a, &a);
        assert!(d.abs() < 1e-6);
    }

    #[test]
    fn cosine_distance_ignores_magnitude() {
        let d = cosine_distance(&[3.0, 4.0], &[6.0, 8.0]);
        assert!(d.abs() < 1e-6);
    }

    #[test]
    fn angular_distance_of_orthogonal_is_half() {
        let d = angular_distance(&[1.0, 0.0], &[0.0, 1.0]);
        assert!((d - 0.5).abs() < 1e-6);
    }

    #[test]
    fn metrics_return_infinity_on_dimension_mismatch() {
        for metric in [
            DistanceMetric::L2,
            DistanceMetric::SquaredL2,
            DistanceMetric::Manhattan,
            DistanceMetric::Cosine,
            DistanceMetric::Angular,
        ] {
            assert!(metric.distance(&[1.0, 2.0], &[1.0]).is_infinite());
        }
    }

    #[test]
    fn l2_and_manhattan_on_unit_square_diagonal() {
        assert!((l2_distance(&[0.0, 0.0], &[1.0, 1.0]) - 2f32.sqrt()).abs() < 1e-6);
        assert_eq!(squared_l2_distance(&[0.0, 0.0], &[1.0, 1.0]), 2.0);
        assert_eq!(manhattan_distance(&[0.0, 0.0], &[1.0, 1.0]), 2.0);
    }

    #[test]
    fn vector_oracle_rejects_ragged_buffer() {
        let data = [0.0f32; 7];
        let err = VectorOracle::new(&data, 3, DistanceMetric::L2).unwrap_err();
        assert_eq!(
            err,
            Error::DimensionMismatch {
                expected: 3,
                found: 1
            }
        );
        assert!(VectorOracle::new(&data, 0, DistanceMetric::L2).is_err());
        assert!(VectorOracle::new(&[], 2, DistanceMetric::L2).is_err());
    }

    #[test]
    fn vector_oracle_reads_rows() {
        let data = [0.0f32, 0.0, 3.0, 4.0];
        let oracle = VectorOracle::new(&data, 2, DistanceMetric::L2).unwrap();
        assert_eq!(oracle.len(), 2);
        assert_eq!(oracle.vector(1), &[3.0, 4.0]);
        assert!((oracle.distance(0, 1) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn closures_are_oracles_and_can_be_counted() {
        let positions = [0.0f32, 1.0, 5.0];
        let oracle = CountingOracle::new(move |a: PointId, b: PointId| {
            (positions[a as usize] - positions[b as usize]).abs()
        });
        assert_eq!(oracle.distance(0, 2), 5.0);
        assert_eq!(oracle.distance(2, 1), 4.0);
        assert_eq!(oracle.calls(), 2);
        oracle.reset();
        assert_eq!(oracle.calls(), 0);

        let inner = oracle.into_inner();
        assert_eq!(inner(0, 1), 1.0);
    }
}
