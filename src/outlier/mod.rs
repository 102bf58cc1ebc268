//! Density estimates computed from a k-NN graph.
//!
//! Both estimators read neighbor lists through [`KnnQuery`](crate::KnnQuery)
//! and never touch the distance oracle again:
//! - [`loop_scores`]: Local Outlier Probabilities, one score in `[0, 1)` per point
//! - [`lid_scores`]: local intrinsic dimensionality per point
//!
//! ```rust
//! use nndescent::{loop_scores, DistanceMetric, LoopParams, NnDescent, NnDescentParams, VectorOracle};
//!
//! # fn main() -> Result<(), nndescent::Error> {
//! let mut points: Vec<f32> = (0..20).map(|i| (i % 5) as f32).collect();
//! points.push(100.0);
//! let oracle = VectorOracle::new(&points, 1, DistanceMetric::L2)?;
//! let graph = NnDescent::new(oracle.len(), NnDescentParams::new(4))?.build(&oracle);
//!
//! let scores = loop_scores(&graph, &LoopParams::new(4))?;
//! assert_eq!(scores.ranked()[0].0, 20);
//! # Ok(())
//! # }
//! ```

pub mod lid;
pub mod loop_score;

pub use lid::{lid_scores, LidCategory, LidConfig, LidEstimate, LidEstimator, LidStats};
pub use loop_score::{loop_scores, LoopParams, OutlierScores};
