//! Local Outlier Probabilities (LoOP).
//!
//! LoOP compares the density around a point with the density around its
//! neighbors, like LOF, but normalizes the ratio into a probability in `[0, 1)`:
//!
//! ```text
//! pdist(p)  = sqrt(mean of d(p, o)² over the first k_reach neighbors o)
//! plof(p)   = max(pdist(p) · |N| / Σ_{o ∈ N} pdist(o), 1)      N = first k_comp neighbors
//! nplof     = λ · sqrt(mean of (plof - 1)²)
//! LoOP(p)   = erf((plof(p) - 1) / (nplof · √2))
//! ```
//!
//! Only the [`KnnQuery`] interface is used, so an approximate NN-Descent
//! graph works as well as an exact one.
//!
//! # References
//!
//! - Kriegel, Kröger, Schubert & Zimek (2009): "LoOP: Local Outlier Probabilities"

use tracing::debug;

use crate::error::{Error, Result};
use crate::graph::KnnQuery;
use crate::PointId;

/// LoOP parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoopParams {
    /// Neighbors used for the probabilistic distance of a point.
    pub k_reach: usize,
    /// Neighbors whose densities a point is compared with.
    pub k_comp: usize,
    /// Standard deviations of the normalization (default: 2.0).
    pub lambda: f64,
}

impl Default for LoopParams {
    fn default() -> Self {
        Self::new(10)
    }
}

impl LoopParams {
    /// Same `k` for both neighborhoods, `lambda = 2`.
    #[must_use]
    pub fn new(k: usize) -> Self {
        Self {
            k_reach: k,
            k_comp: k,
            lambda: 2.0,
        }
    }

    #[must_use]
    pub fn with_k_reach(mut self, k_reach: usize) -> Self {
        self.k_reach = k_reach;
        self
    }

    #[must_use]
    pub fn with_k_comp(mut self, k_comp: usize) -> Self {
        self.k_comp = k_comp;
        self
    }

    #[must_use]
    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.lambda = lambda;
        self
    }

    fn validate(&self, graph_k: usize) -> Result<()> {
        if self.k_reach == 0 || self.k_comp == 0 {
            return Err(Error::InvalidParameter(
                "k_reach and k_comp must be at least 1".to_string(),
            ));
        }
        if !(self.lambda.is_finite() && self.lambda > 0.0) {
            return Err(Error::InvalidParameter(
                "lambda must be positive".to_string(),
            ));
        }
        let needed = self.k_reach.max(self.k_comp);
        if needed > graph_k {
            return Err(Error::InvalidParameter(format!(
                "LoOP needs {needed} neighbors per point, graph has k = {graph_k}"
            )));
        }
        Ok(())
    }
}

/// Per-point outlier probabilities.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlierScores {
    /// Score of point `p` at index `p`.
    pub scores: Vec<f64>,
    pub min: f64,
    pub max: f64,
}

impl OutlierScores {
    fn from_scores(scores: Vec<f64>) -> Self {
        let (min, max) = scores
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &s| {
                (lo.min(s), hi.max(s))
            });
        Self { scores, min, max }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Points ordered from most to least outlying; ties by id.
    #[must_use]
    pub fn ranked(&self) -> Vec<(PointId, f64)> {
        let mut ranked: Vec<(PointId, f64)> = self
            .scores
            .iter()
            .enumerate()
            .map(|(p, &s)| (p as PointId, s))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked
    }
}

/// Error function, Abramowitz & Stegun 7.1.26 (absolute error < 1.5e-7).
fn erf(x: f64) -> f64 {
    const A1: f64 = 0.254_829_592;
    const A2: f64 = -0.284_496_736;
    const A3: f64 = 1.421_413_741;
    const A4: f64 = -1.453_152_027;
    const A5: f64 = 1.061_405_429;
    const P: f64 = 0.327_591_1;

    if x == 0.0 {
        return 0.0;
    }
    let sign = x.signum();
    let x = x.abs();
    let t = 1.0 / (1.0 + P * x);
    let y = 1.0 - (((((A5 * t + A4) * t) + A3) * t + A2) * t + A1) * t * (-x * x).exp();
    sign * y
}

fn probabilistic_distances<Q: KnnQuery + ?Sized>(graph: &Q, k_reach: usize) -> Vec<f64> {
    (0..graph.num_points())
        .map(|p| {
            let neighbors = graph.knn(p as PointId, k_reach);
            if neighbors.is_empty() {
                return 0.0;
            }
            let ssum: f64 = neighbors
                .iter()
                .map(|n| {
                    let d = f64::from(n.distance);
                    d * d
                })
                .sum();
            (ssum / neighbors.len() as f64).sqrt()
        })
        .collect()
}

/// Compute LoOP scores for every point of `graph`.
pub fn loop_scores<Q: KnnQuery + ?Sized>(graph: &Q, params: &LoopParams) -> Result<OutlierScores> {
    params.validate(graph.max_k())?;
    let n = graph.num_points();
    if n == 0 {
        return Ok(OutlierScores::from_scores(Vec::new()));
    }

    let pdists = probabilistic_distances(graph, params.k_reach);

    let plofs: Vec<f64> = (0..n)
        .map(|p| {
            let neighbors = graph.knn(p as PointId, params.k_comp);
            let sum: f64 = neighbors.iter().map(|o| pdists[o.id as usize]).sum();
            let plof = (pdists[p] * neighbors.len() as f64 / sum).max(1.0);
            // 0/0 and x/0 both mean "no density contrast".
            if plof.is_finite() {
                plof
            } else {
                1.0
            }
        })
        .collect();

    let mean_sq = plofs.iter().map(|&v| (v - 1.0) * (v - 1.0)).sum::<f64>() / n as f64;
    let nplof = params.lambda * mean_sq.sqrt();
    let nplof = if nplof > 0.0 { nplof } else { 1.0 };
    debug!(nplof, "loop normalization factor");

    let norm = 1.0 / (nplof * std::f64::consts::SQRT_2);
    let scores = plofs.iter().map(|&plof| erf((plof - 1.0) * norm)).collect();
    Ok(OutlierScores::from_scores(scores))
}
