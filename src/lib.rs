//! nndescent: approximate k-nearest-neighbor graphs by iterative refinement.
//!
//! Builds, for every point of a dataset, an approximation of its `k` closest
//! other points using only a pairwise distance oracle. No index structure,
//! no coordinates: random initial lists are improved by NN-Descent local
//! joins until a pass changes nothing.
//!
//! - [`nndescent`]: the construction (heaps, seeding, joins, pass driver)
//! - [`graph`]: the frozen [`KnnGraph`] and the [`KnnQuery`] read interface
//! - [`distance`]: the [`DistanceOracle`] capability and dense-vector metrics
//! - [`outlier`]: LoOP scores and local intrinsic dimensionality computed from a graph
//!
//! # Critical Nuances
//!
//! ## Ties and duplicates
//!
//! Datasets with repeated points produce many equal distances. Neighbors are
//! ranked by `(distance, id)`: a heap holding one of several equidistant
//! points only swaps it for a smaller id. The join can still stop at a fixed
//! point that keeps a larger id, since a point is only ever compared with its
//! neighbors' neighbors. Which id survives depends on the seed, never on
//! thread scheduling: a given seed always produces the same graph.
//!
//! ## Approximation quality
//!
//! A converged graph is a fixed point of the join, not the exact k-NN graph.
//! Recall is typically above 0.95 on low-dimensional data and drops as
//! intrinsic dimensionality grows. When `k = n - 1` the seed already holds
//! every other point and the result is exact.
//!
//! ## Oracle contract
//!
//! Distances must be symmetric, deterministic and non-negative. Violations are
//! not detected; they make the result meaningless, not the build crash.

pub mod distance;
pub mod error;
pub mod graph;
pub mod nndescent;
pub mod outlier;

/// Identifier of a point: its position `0..n` in the dataset.
pub type PointId = u32;

pub use distance::{CountingOracle, DistanceMetric, DistanceOracle, VectorOracle};
pub use error::{Error, Result};
pub use graph::{KnnGraph, KnnQuery};
pub use nndescent::{
    build_knn_graph, BuildState, BuildStats, Neighbor, NnDescent, NnDescentParams, Termination,
};
pub use outlier::{
    lid_scores, loop_scores, LidConfig, LidEstimate, LidEstimator, LoopParams, OutlierScores,
};
