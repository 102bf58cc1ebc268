//! Pass driver: seed, join until nothing changes, freeze.

use std::fmt;

use tracing::{debug, info, instrument, warn};

use super::join::{local_join, JoinConfig, JoinOutcome};
use super::seed::seed_store;
use super::store::{NeighborStore, PassSnapshot};
use crate::distance::DistanceOracle;
use crate::error::{Error, Result};
use crate::graph::KnnGraph;
use crate::PointId;

/// NN-Descent parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct NnDescentParams {
    /// Neighbors per point. Must satisfy `1 <= k < n`.
    pub k: usize,
    /// Upper bound on join passes (default: 32).
    pub max_passes: usize,
    /// Seed for the initial random neighbor lists (default: 42).
    pub random_seed: u64,
    /// Run passes on rayon's thread pool when the `parallel` feature is on.
    pub parallel: bool,
    /// Skip pairs already evaluated earlier in the same pass.
    pub dedup_pairs: bool,
    /// Cap on the extended neighborhood size per point (`None` = unbounded).
    pub max_candidates: Option<usize>,
}

impl Default for NnDescentParams {
    fn default() -> Self {
        Self {
            k: 10,
            max_passes: 32,
            random_seed: 42,
            parallel: true,
            dedup_pairs: false,
            max_candidates: None,
        }
    }
}

impl NnDescentParams {
    /// Default parameters with `k` neighbors.
    #[must_use]
    pub fn new(k: usize) -> Self {
        Self {
            k,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    #[must_use]
    pub fn with_dedup_pairs(mut self, dedup_pairs: bool) -> Self {
        self.dedup_pairs = dedup_pairs;
        self
    }

    #[must_use]
    pub fn with_max_candidates(mut self, max_candidates: usize) -> Self {
        self.max_candidates = Some(max_candidates);
        self
    }

    /// Check the parameters against a dataset of `n` points.
    pub fn validate(&self, n: usize) -> Result<()> {
        if n as u64 > u64::from(PointId::MAX) + 1 {
            return Err(Error::InvalidParameter(format!(
                "{n} points do not fit in 32-bit point ids"
            )));
        }
        if self.k == 0 {
            return Err(Error::InvalidParameter("k must be at least 1".to_string()));
        }
        if self.k >= n {
            return Err(Error::DatasetTooSmall { k: self.k, n });
        }
        if self.max_passes == 0 {
            return Err(Error::InvalidParameter(
                "max_passes must be at least 1".to_string(),
            ));
        }
        if matches!(self.max_candidates, Some(c) if c < 2) {
            return Err(Error::InvalidParameter(
                "max_candidates must be at least 2".to_string(),
            ));
        }
        Ok(())
    }

    fn join_config(&self) -> JoinConfig {
        JoinConfig {
            parallel: self.parallel,
            dedup_pairs: self.dedup_pairs,
            max_candidates: self.max_candidates,
        }
    }
}

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// A full pass changed no heap: the graph is a fixed point of the join.
    Converged,
    /// The pass cap was hit first. The graph is usable but may still improve.
    Exhausted,
}

/// Where a [`Run`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    /// Heaps allocated, not yet filled.
    Seeding,
    /// `passes` join passes have completed, more may follow.
    Joining { passes: usize },
    Converged { passes: usize },
    Exhausted { passes: usize },
}

impl BuildState {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Converged { .. } | Self::Exhausted { .. })
    }

    #[must_use]
    pub fn passes(&self) -> usize {
        match *self {
            Self::Seeding => 0,
            Self::Joining { passes } | Self::Converged { passes } | Self::Exhausted { passes } => {
                passes
            }
        }
    }
}

/// Counters collected during a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStats {
    pub passes: usize,
    pub termination: Termination,
    /// Successful heap insertions of each pass, in order.
    pub updates_per_pass: Vec<usize>,
    pub seeding_evaluations: u64,
    /// Seeding plus join evaluations.
    pub distance_evaluations: u64,
}

/// Validated NN-Descent configuration for a dataset of `n` points.
#[derive(Debug, Clone)]
pub struct NnDescent {
    n: usize,
    params: NnDescentParams,
}

impl NnDescent {
    pub fn new(n: usize, params: NnDescentParams) -> Result<Self> {
        params.validate(n)?;
        Ok(Self { n, params })
    }

    #[must_use]
    pub fn params(&self) -> &NnDescentParams {
        &self.params
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.n
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Allocate empty heaps. The first [`Run::step`] seeds them.
    pub fn start<'o, O: DistanceOracle>(&self, oracle: &'o O) -> Run<'o, O> {
        Run {
            oracle,
            store: NeighborStore::new(self.n, self.params.k),
            params: self.params.clone(),
            state: BuildState::Seeding,
            updates_per_pass: Vec::new(),
            seeding_evaluations: 0,
            join_evaluations: 0,
        }
    }

    /// Build the graph, joining until convergence or `max_passes`.
    #[instrument(level = "debug", skip(self, oracle), fields(n = self.n, k = self.params.k))]
    pub fn build<O: DistanceOracle>(&self, oracle: &O) -> KnnGraph {
        let mut run = self.start(oracle);
        while !run.state().is_terminal() {
            run.step();
        }
        let graph = run.finish();
        let stats = graph.stats();
        info!(
            passes = stats.passes,
            termination = ?stats.termination,
            distance_evaluations = stats.distance_evaluations,
            "knn graph built"
        );
        if stats.termination == Termination::Exhausted {
            warn!(
                max_passes = self.params.max_passes,
                "nn-descent stopped before converging"
            );
        }
        graph
    }
}

/// Build a k-NN graph over `n` points in one call.
pub fn build_knn_graph<O: DistanceOracle>(
    n: usize,
    oracle: &O,
    params: NnDescentParams,
) -> Result<KnnGraph> {
    Ok(NnDescent::new(n, params)?.build(oracle))
}

/// An in-progress build that can be advanced one pass at a time.
pub struct Run<'o, O> {
    oracle: &'o O,
    store: NeighborStore,
    params: NnDescentParams,
    state: BuildState,
    updates_per_pass: Vec<usize>,
    seeding_evaluations: u64,
    join_evaluations: u64,
}

impl<O> fmt::Debug for Run<'_, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Run")
            .field("n", &self.store.len())
            .field("k", &self.params.k)
            .field("state", &self.state)
            .field("updates_per_pass", &self.updates_per_pass)
            .finish_non_exhaustive()
    }
}

impl<O: DistanceOracle> Run<'_, O> {
    #[must_use]
    pub fn state(&self) -> BuildState {
        self.state
    }

    /// Advance the state by one transition: seed, or run one join pass.
    /// No-op once terminal.
    pub fn step(&mut self) -> BuildState {
        let passes = match self.state {
            BuildState::Seeding => {
                self.seeding_evaluations = seed_store(
                    &self.store,
                    self.oracle,
                    self.params.random_seed,
                    self.params.parallel,
                );
                debug!(seeding_evaluations = self.seeding_evaluations, "heaps seeded");
                self.state = BuildState::Joining { passes: 0 };
                return self.state;
            }
            BuildState::Joining { passes } => passes,
            BuildState::Converged { .. } | BuildState::Exhausted { .. } => return self.state,
        };
        let outcome = self.join_pass();
        let passes = passes + 1;
        self.updates_per_pass.push(outcome.updates);
        debug!(
            pass = passes,
            updates = outcome.updates,
            distance_evaluations = outcome.distance_evaluations,
            "join pass finished"
        );

        self.state = if !outcome.changed() {
            BuildState::Converged { passes }
        } else if passes >= self.params.max_passes {
            BuildState::Exhausted { passes }
        } else {
            BuildState::Joining { passes }
        };
        self.state
    }

    /// Run one join pass without touching the state.
    ///
    /// After convergence this must report zero updates.
    pub fn join_pass(&mut self) -> JoinOutcome {
        let snapshot = PassSnapshot::take(&self.store);
        let outcome = local_join(
            &self.store,
            &snapshot,
            self.oracle,
            &self.params.join_config(),
        );
        self.join_evaluations += outcome.distance_evaluations;
        outcome
    }

    /// Current worst kept distance of every point (`+inf` for unfilled heaps).
    #[must_use]
    pub fn max_distances(&self) -> Vec<f32> {
        self.store.max_distances()
    }

    #[must_use]
    pub fn heap_sizes(&self) -> Vec<usize> {
        self.store.heap_sizes()
    }

    /// Freeze the heaps into a graph.
    ///
    /// A run finished before reaching a terminal state is reported as
    /// [`Termination::Exhausted`].
    #[must_use]
    pub fn finish(self) -> KnnGraph {
        let termination = match self.state {
            BuildState::Converged { .. } => Termination::Converged,
            _ => Termination::Exhausted,
        };
        let stats = BuildStats {
            passes: self.state.passes(),
            termination,
            updates_per_pass: self.updates_per_pass,
            seeding_evaluations: self.seeding_evaluations,
            distance_evaluations: self.seeding_evaluations + self.join_evaluations,
        };
        KnnGraph::new(self.params.k, self.store.freeze(), stats)
    }
}
