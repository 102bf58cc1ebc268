//! Local Intrinsic Dimensionality (LID) estimation from k-NN distances.
//!
//! # Intuition
//!
//! LID measures how "locally complex" the space around a point is.
//! A point with high LID behaves as if it's in a high-dimensional space locally,
//! even if the global embedding dimension is lower. These are often outliers or
//! points in sparse regions.
//!
//! # Mathematical Foundation
//!
//! For a point x, LID is defined as:
//!
//! ```text
//! LID(x) = lim(r→0) ln(F(r)) / ln(r)
//! ```
//!
//! where F(r) is the cumulative distribution of distances to nearby points.
//! Two estimators are provided, both reading only the sorted distances
//! d₁ ≤ d₂ ≤ ... ≤ dₖ to the k nearest neighbors.
//!
//! **MLE** (Hill estimator, Amsaleg et al., 2015):
//!
//! ```text
//! LID_MLE(x) = -k / Σᵢ log(dᵢ / dₖ)
//! ```
//!
//! **L-moments** (probability-weighted moments): with `w = dₖ` and excesses
//! `eᵢ = w - d₍ₖ₋ᵢ₎`, the first two sample L-moments `l₁, l₂` of the excesses
//! give
//!
//! ```text
//! LID_LM(x) = w / (l₁² / l₂ - l₁)
//! ```
//!
//! The L-moment estimator is less sensitive to a single tiny distance than
//! the MLE, which diverges as `d₁ → 0`.
//!
//! # References
//!
//! - Amsaleg et al. (2015) "Estimating Local Intrinsic Dimensionality"
//! - Hosking (1990) "L-moments: analysis and estimation of distributions using
//!   linear combinations of order statistics"

use crate::error::{Error, Result};
use crate::graph::KnnQuery;
use crate::PointId;

/// Which estimator to apply to a distance list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LidEstimator {
    /// Maximum likelihood (Hill) estimator.
    #[default]
    Mle,
    /// Probability-weighted-moments estimator on L-moments of the excesses.
    LMoments,
}

/// Result of LID estimation for a single point.
#[derive(Debug, Clone, Copy)]
pub struct LidEstimate {
    /// Estimated local intrinsic dimensionality.
    pub lid: f32,
    /// Number of neighbors used in estimation.
    pub k: usize,
    /// Maximum distance to k-th neighbor.
    pub max_dist: f32,
}

/// LID estimation configuration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LidConfig {
    /// Number of neighbors for LID estimation (default: 20).
    pub k: usize,
    /// Relative floor applied to distances to avoid log(0) (default: 1e-10).
    pub epsilon: f32,
    pub estimator: LidEstimator,
}

impl Default for LidConfig {
    fn default() -> Self {
        Self {
            k: 20,
            epsilon: 1e-10,
            estimator: LidEstimator::Mle,
        }
    }
}

impl LidConfig {
    #[must_use]
    pub fn new(k: usize, estimator: LidEstimator) -> Self {
        Self {
            k,
            estimator,
            ..Self::default()
        }
    }
}

/// The first `min(k, len)` distances and the outermost of them, if at least
/// two are available.
fn window<'a>(sorted_distances: &'a [f32], config: &LidConfig) -> Option<(&'a [f32], f64)> {
    let k = sorted_distances.len().min(config.k);
    let window = sorted_distances.get(..k).filter(|w| w.len() >= 2)?;
    Some((window, f64::from(window[k - 1])))
}

fn too_few(sorted_distances: &[f32], config: &LidConfig) -> LidEstimate {
    LidEstimate {
        lid: f32::NAN,
        k: sorted_distances.len().min(config.k),
        max_dist: sorted_distances.first().copied().unwrap_or(0.0),
    }
}

fn finish(window: &[f32], lid: Option<f64>) -> LidEstimate {
    LidEstimate {
        lid: lid.map_or(f32::INFINITY, |v| v as f32),
        k: window.len(),
        max_dist: window[window.len() - 1],
    }
}

/// MLE (Hill) estimator for Local Intrinsic Dimensionality.
///
/// Distances equal to the outermost one carry no information and are
/// skipped; distances below `epsilon · w` are floored there so a duplicate
/// point does not send the log to minus infinity.
///
/// Returns `NAN` for fewer than two distances and `INFINITY` when every
/// distance equals the outermost one.
#[must_use]
pub fn estimate_lid_mle(sorted_distances: &[f32], config: &LidConfig) -> LidEstimate {
    let Some((window, w)) = window(sorted_distances, config) else {
        return too_few(sorted_distances, config);
    };
    let floor = w * f64::from(config.epsilon);

    let (count, log_sum) = window
        .iter()
        .map(|&d| f64::from(d))
        .filter(|&d| d < w)
        .fold((0usize, 0.0f64), |(count, sum), d| {
            (count + 1, sum + (d.max(floor) / w).ln())
        });

    let lid = (count > 0 && log_sum < 0.0).then(|| -(count as f64) / log_sum);
    finish(window, lid)
}

/// L-moments estimator for Local Intrinsic Dimensionality.
///
/// Same degenerate-case conventions as [`estimate_lid_mle`].
#[must_use]
pub fn estimate_lid_lmoments(sorted_distances: &[f32], config: &LidConfig) -> LidEstimate {
    let Some((window, w)) = window(sorted_distances, config) else {
        return too_few(sorted_distances, config);
    };

    // Excesses come out ascending because the distances are ascending.
    let n = window.len() as f64;
    let (b0, b1) = window
        .iter()
        .rev()
        .enumerate()
        .fold((0.0f64, 0.0f64), |(b0, b1), (i, &d)| {
            let excess = w - f64::from(d);
            (b0 + excess, b1 + excess * i as f64 / (n - 1.0))
        });
    let l1 = b0 / n;
    let l2 = 2.0 * b1 / n - l1;

    let lid = if l2 > 0.0 && w > 0.0 {
        let denom = l1 * l1 / l2 - l1;
        (denom > 0.0).then(|| w / denom)
    } else {
        None
    };
    finish(window, lid)
}

/// Estimate LID from unsorted neighbor distances with the configured estimator.
#[must_use]
pub fn estimate_lid(neighbor_distances: &[f32], config: &LidConfig) -> LidEstimate {
    let mut sorted = neighbor_distances.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    match config.estimator {
        LidEstimator::Mle => estimate_lid_mle(&sorted, config),
        LidEstimator::LMoments => estimate_lid_lmoments(&sorted, config),
    }
}

/// Estimate LID for every point of a k-NN graph.
///
/// Fails if `config.k < 2` or the graph holds fewer than `config.k` neighbors
/// per point.
pub fn lid_scores<Q: KnnQuery + ?Sized>(graph: &Q, config: &LidConfig) -> Result<Vec<LidEstimate>> {
    if config.k < 2 {
        return Err(Error::InvalidParameter(
            "LID needs at least 2 neighbors".to_string(),
        ));
    }
    if config.k > graph.max_k() {
        return Err(Error::InvalidParameter(format!(
            "LID k = {} exceeds graph k = {}",
            config.k,
            graph.max_k()
        )));
    }
    let estimate: fn(&[f32], &LidConfig) -> LidEstimate = match config.estimator {
        LidEstimator::Mle => estimate_lid_mle,
        LidEstimator::LMoments => estimate_lid_lmoments,
    };
    Ok((0..graph.num_points())
        .map(|p| {
            let distances: Vec<f32> = graph
                .knn(p as PointId, config.k)
                .iter()
                .map(|n| n.distance)
                .collect();
            estimate(&distances, config)
        })
        .collect())
}

/// Where a point's LID sits relative to the rest of its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LidCategory {
    /// More than one standard deviation below the median: dense, regular neighborhood.
    Low,
    Normal,
    /// More than one standard deviation above the median, or not finite.
    High,
}

/// Summary of the per-point estimates returned by [`lid_scores`].
///
/// Moments are taken over the finite estimates only; points whose neighbors
/// are all equidistant are counted in `degenerate` instead.
#[derive(Debug, Clone, PartialEq)]
pub struct LidStats {
    pub mean: f32,
    pub median: f32,
    pub std_dev: f32,
    pub min: f32,
    pub max: f32,
    /// Number of finite estimates.
    pub finite: usize,
    /// Number of `NAN` or infinite estimates.
    pub degenerate: usize,
}

impl LidStats {
    #[must_use]
    pub fn from_estimates(estimates: &[LidEstimate]) -> Self {
        let mut lids: Vec<f64> = estimates
            .iter()
            .filter(|e| e.lid.is_finite())
            .map(|e| f64::from(e.lid))
            .collect();
        let degenerate = estimates.len() - lids.len();
        let finite = lids.len();
        if finite == 0 {
            return Self {
                mean: f32::NAN,
                median: f32::NAN,
                std_dev: f32::NAN,
                min: f32::NAN,
                max: f32::NAN,
                finite,
                degenerate,
            };
        }

        lids.sort_by(f64::total_cmp);
        let mean = lids.iter().sum::<f64>() / finite as f64;
        let variance = lids.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / finite as f64;
        let mid = finite / 2;
        let median = if finite % 2 == 1 {
            lids[mid]
        } else {
            0.5 * (lids[mid - 1] + lids[mid])
        };

        Self {
            mean: mean as f32,
            median: median as f32,
            std_dev: variance.sqrt() as f32,
            min: lids[0] as f32,
            max: lids[finite - 1] as f32,
            finite,
            degenerate,
        }
    }

    /// Place `lid` in the one-standard-deviation band around the median.
    #[must_use]
    pub fn categorize(&self, lid: f32) -> LidCategory {
        match lid {
            l if !l.is_finite() || l > self.median + self.std_dev => LidCategory::High,
            l if l < self.median - self.std_dev => LidCategory::Low,
            _ => LidCategory::Normal,
        }
    }

    /// Points of a [`lid_scores`] result that fall in [`LidCategory::High`], ascending.
    #[must_use]
    pub fn high_lid_points(&self, estimates: &[LidEstimate]) -> Vec<PointId> {
        estimates
            .iter()
            .enumerate()
            .filter(|(_, e)| self.categorize(e.lid) == LidCategory::High)
            .map(|(p, _)| p as PointId)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Quantiles of F(r) = r^m on [0, 1]: ideal LID is m.
    fn power_law_distances(m: f32, n: usize) -> Vec<f32> {
        (1..=n)
            .map(|i| (i as f32 / n as f32).powf(1.0 / m))
            .collect()
    }

    #[test]
    fn both_estimators_recover_power_law_dimension() {
        for m in [1.0f32, 2.0, 5.0, 10.0] {
            let distances = power_law_distances(m, 50);
            let mle = estimate_lid_mle(&distances, &LidConfig::new(50, LidEstimator::Mle));
            let lm = estimate_lid_lmoments(&distances, &LidConfig::new(50, LidEstimator::LMoments));
            assert!((mle.lid - m).abs() / m < 0.1, "mle {} vs {}", mle.lid, m);
            assert!((lm.lid - m).abs() / m < 0.1, "lmoments {} vs {}", lm.lid, m);
        }
    }

    #[test]
    fn equal_distances_are_degenerate() {
        let distances = vec![1.0f32; 20];
        for estimator in [LidEstimator::Mle, LidEstimator::LMoments] {
            let estimate = estimate_lid(&distances, &LidConfig::new(20, estimator));
            assert!(estimate.lid.is_infinite());
        }
    }

    #[test]
    fn single_distance_is_nan() {
        let estimate = estimate_lid(&[0.5], &LidConfig::default());
        assert!(estimate.lid.is_nan());
        assert_eq!(estimate.k, 1);
    }

    #[test]
    fn estimate_sorts_its_input() {
        let sorted = power_law_distances(3.0, 20);
        let mut shuffled = sorted.clone();
        shuffled.reverse();
        let config = LidConfig::new(20, LidEstimator::LMoments);
        assert_eq!(
            estimate_lid(&shuffled, &config).lid,
            estimate_lid_lmoments(&sorted, &config).lid
        );
    }

    #[test]
    fn config_k_limits_the_window() {
        let distances: Vec<f32> = (1..=50).map(|i| i as f32 * 0.1).collect();
        let small = estimate_lid_mle(&distances, &LidConfig::new(5, LidEstimator::Mle));
        let large = estimate_lid_mle(&distances, &LidConfig::new(30, LidEstimator::Mle));
        assert_eq!(small.k, 5);
        assert_eq!(large.k, 30);
        assert!((small.max_dist - 0.5).abs() < 1e-6);
    }

    #[test]
    fn lid_stats() {
        let estimates = [5.0, 10.0, 8.0, 7.0, 15.0, f32::INFINITY].map(|lid| LidEstimate {
            lid,
            k: 20,
            max_dist: 1.0,
        });

        let stats = LidStats::from_estimates(&estimates);
        assert_eq!(stats.finite, 5);
        assert_eq!(stats.degenerate, 1);
        assert_eq!(stats.min, 5.0);
        assert_eq!(stats.max, 15.0);
        assert_eq!(stats.median, 8.0);
        assert_eq!(stats.categorize(15.0), LidCategory::High);
        assert_eq!(stats.categorize(8.0), LidCategory::Normal);
        assert_eq!(stats.categorize(f32::INFINITY), LidCategory::High);
        assert_eq!(stats.high_lid_points(&estimates), vec![4, 5]);
    }

    #[test]
    fn stats_of_only_degenerate_estimates() {
        let estimates = [f32::INFINITY, f32::NAN].map(|lid| LidEstimate {
            lid,
            k: 4,
            max_dist: 0.0,
        });
        let stats = LidStats::from_estimates(&estimates);
        assert_eq!(stats.finite, 0);
        assert_eq!(stats.degenerate, 2);
        assert!(stats.median.is_nan());
    }

    #[test]
    fn duplicate_neighbor_keeps_mle_finite() {
        // A zero distance is floored instead of producing ln(0).
        let distances = [0.0f32, 0.2, 0.4, 0.6, 0.8, 1.0];
        let estimate = estimate_lid_mle(&distances, &LidConfig::new(6, LidEstimator::Mle));
        assert!(estimate.lid.is_finite() && estimate.lid > 0.0);
        assert_eq!(estimate.max_dist, 1.0);
    }
}
