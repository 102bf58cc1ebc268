//! NN-Descent approximate k-nearest-neighbor graph construction.
//!
//! # Algorithm
//!
//! NN-Descent refines random neighbor lists until they stop changing:
//! - **Seeding**: every point gets `k` random other points as neighbors
//! - **Join**: points that share a neighbor are compared with each other,
//!   and each comparison may improve both of their lists
//! - **Convergence**: a pass that changes no list ends the run
//!
//! The heuristic is "a neighbor of a neighbor is likely a neighbor". Each pass
//! costs roughly `O(n·k²)` distance evaluations instead of the `O(n²)` of an
//! exhaustive comparison.
//!
//! # Determinism
//!
//! Neighbors are ranked by `(distance, id)`, so ties between equal distances
//! are always resolved toward the smaller id. Every pass reads a snapshot of
//! the lists taken before it starts. Together these make the graph a function
//! of the dataset, `k` and the seed only: sequential and parallel runs produce
//! the same neighbor lists.
//!
//! # Usage
//!
//! ```rust
//! use nndescent::{DistanceMetric, NnDescent, NnDescentParams, VectorOracle};
//!
//! # fn main() -> Result<(), nndescent::Error> {
//! let points = [0.0f32, 0.0, 1.0, 0.0, 0.0, 1.0, 5.0, 5.0, 5.0, 6.0];
//! let oracle = VectorOracle::new(&points, 2, DistanceMetric::L2)?;
//!
//! let graph = NnDescent::new(oracle.len(), NnDescentParams::new(2).with_seed(7))?
//!     .build(&oracle);
//!
//! assert_eq!(graph.neighbors(3).len(), 2);
//! assert_eq!(graph.neighbors(3)[0].id, 4);
//! # Ok(())
//! # }
//! ```
//!
//! # References
//!
//! - Dong, Charikar & Li (2011): "Efficient k-nearest neighbor graph construction
//!   for generic similarity measures"

pub(crate) mod builder;
pub(crate) mod heap;
pub(crate) mod join;
pub(crate) mod seed;
pub(crate) mod store;

pub use builder::{
    build_knn_graph, BuildState, BuildStats, NnDescent, NnDescentParams, Run, Termination,
};
pub use heap::{Neighbor, NeighborHeap};
pub use join::{local_join, JoinConfig, JoinOutcome};
pub use seed::{sample_initial_candidates, seed_store};
pub use store::{ExtendedNeighborhood, NeighborIds, NeighborStore, PassSnapshot, ReverseIndex};
