//! Local join: compare the neighbors of every point with each other.
//!
//! For a point `p` with extended neighborhood `E(p) = forward(p) ∪ reverse(p)`,
//! every unordered pair `(u, v)` of `E(p)` is evaluated once and offered to
//! both heaps. In addition, each reverse-only neighbor `q` of `p` is offered
//! to `p`'s own heap: `q` listing `p` makes `q` a natural candidate for `p`.
//!
//! All pair sets are derived from a [`PassSnapshot`], never from the heaps
//! being mutated. Heap content after a pass is the `k` smallest of
//! `initial ∪ offered` under the `(distance, id)` order, so neither the
//! evaluation order nor the thread interleaving changes the result.

use std::collections::HashSet;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::store::{NeighborStore, PassSnapshot};
use crate::distance::DistanceOracle;
use crate::PointId;

/// Knobs for one join pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinConfig {
    /// Spread the outer point loop over rayon's thread pool.
    pub parallel: bool,
    /// Skip pairs already evaluated earlier in the same pass.
    ///
    /// Needs a pass-wide seen set, so a deduplicating pass always runs
    /// sequentially. Affects cost only, never the resulting graph.
    pub dedup_pairs: bool,
    /// Truncate each extended neighborhood to this many ids.
    pub max_candidates: Option<usize>,
}

/// What one pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinOutcome {
    /// Successful heap insertions. Zero means the pass changed nothing.
    pub updates: usize,
    pub distance_evaluations: u64,
}

impl JoinOutcome {
    #[must_use]
    pub fn changed(&self) -> bool {
        self.updates > 0
    }

    fn merge(self, other: Self) -> Self {
        Self {
            updates: self.updates + other.updates,
            distance_evaluations: self.distance_evaluations + other.distance_evaluations,
        }
    }
}

#[inline]
fn pair_key(u: PointId, v: PointId) -> (PointId, PointId) {
    if u < v {
        (u, v)
    } else {
        (v, u)
    }
}

fn join_point<O: DistanceOracle>(
    p: PointId,
    store: &NeighborStore,
    snapshot: &PassSnapshot,
    oracle: &O,
    max_candidates: Option<usize>,
    mut seen: Option<&mut HashSet<(PointId, PointId)>>,
) -> JoinOutcome {
    let ext = snapshot.extended(p, max_candidates);
    let mut outcome = JoinOutcome::default();

    let mut first_visit = |u: PointId, v: PointId| match seen.as_deref_mut() {
        Some(seen) => seen.insert(pair_key(u, v)),
        None => true,
    };

    for &q in &ext.reverse_only {
        if !first_visit(p, q) {
            continue;
        }
        let d = oracle.distance(p, q);
        outcome.distance_evaluations += 1;
        // q already lists p, so only p's heap can change.
        if store.try_insert(p, q, d) {
            outcome.updates += 1;
        }
    }

    for (i, &u) in ext.members.iter().enumerate() {
        for &v in &ext.members[i + 1..] {
            if !first_visit(u, v) {
                continue;
            }
            let d = oracle.distance(u, v);
            outcome.distance_evaluations += 1;
            if store.try_insert(u, v, d) {
                outcome.updates += 1;
            }
            if store.try_insert(v, u, d) {
                outcome.updates += 1;
            }
        }
    }
    outcome
}

/// Run one local-join pass over every point of `store`.
pub fn local_join<O: DistanceOracle>(
    store: &NeighborStore,
    snapshot: &PassSnapshot,
    oracle: &O,
    config: &JoinConfig,
) -> JoinOutcome {
    let n = store.len() as PointId;

    if config.dedup_pairs {
        let mut seen = HashSet::new();
        return (0..n).fold(JoinOutcome::default(), |acc, p| {
            acc.merge(join_point(
                p,
                store,
                snapshot,
                oracle,
                config.max_candidates,
                Some(&mut seen),
            ))
        });
    }

    #[cfg(feature = "parallel")]
    {
        if config.parallel {
            return (0..n)
                .into_par_iter()
                .map(|p| join_point(p, store, snapshot, oracle, config.max_candidates, None))
                .reduce(JoinOutcome::default, JoinOutcome::merge);
        }
    }

    (0..n).fold(JoinOutcome::default(), |acc, p| {
        acc.merge(join_point(
            p,
            store,
            snapshot,
            oracle,
            config.max_candidates,
            None,
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nndescent::seed::seed_store;

    fn line_oracle(positions: &'static [f32]) -> impl Fn(PointId, PointId) -> f32 + Sync {
        move |a: PointId, b: PointId| (positions[a as usize] - positions[b as usize]).abs()
    }

    #[test]
    fn reverse_only_neighbor_reaches_owner() {
        // 0 -> {2}, 1 -> {0}, 2 -> {0}; all distances equal.
        let store = NeighborStore::new(3, 1);
        store.try_insert(0, 2, 0.0);
        store.try_insert(1, 0, 0.0);
        store.try_insert(2, 0, 0.0);
        let oracle = |_: PointId, _: PointId| 0.0f32;

        let snapshot = PassSnapshot::take(&store);
        let outcome = local_join(&store, &snapshot, &oracle, &JoinConfig::default());
        assert!(outcome.changed());
        assert_eq!(store.members(0).as_slice(), &[1]);
    }

    #[test]
    fn pass_without_improvement_reports_no_change() {
        let store = NeighborStore::new(3, 2);
        let oracle = line_oracle(&[0.0, 1.0, 2.0]);
        seed_store(&store, &oracle, 0, false);
        let snapshot = PassSnapshot::take(&store);
        let outcome = local_join(&store, &snapshot, &oracle, &JoinConfig::default());
        assert!(!outcome.changed());
        assert!(outcome.distance_evaluations > 0);
    }

    #[test]
    fn dedup_reduces_evaluations_but_not_result() {
        const POSITIONS: &[f32] = &[0.0, 1.5, 2.0, 4.0, 4.5, 7.0, 9.0, 9.5, 12.0, 20.0];
        let oracle = line_oracle(POSITIONS);
        let run = |dedup_pairs: bool| {
            let store = NeighborStore::new(POSITIONS.len(), 3);
            seed_store(&store, &oracle, 11, false);
            let snapshot = PassSnapshot::take(&store);
            let config = JoinConfig {
                dedup_pairs,
                ..JoinConfig::default()
            };
            let outcome = local_join(&store, &snapshot, &oracle, &config);
            (outcome, store.freeze())
        };
        let (plain, plain_graph) = run(false);
        let (dedup, dedup_graph) = run(true);
        assert_eq!(plain_graph, dedup_graph);
        assert!(dedup.distance_evaluations <= plain.distance_evaluations);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn parallel_pass_matches_sequential_pass() {
        const POSITIONS: &[f32] = &[
            3.0, 1.0, 4.0, 1.5, 5.0, 9.0, 2.0, 6.0, 5.5, 3.5, 8.0, 9.7, 9.3, 2.3, 8.4, 6.2,
        ];
        let oracle = line_oracle(POSITIONS);
        let run = |parallel: bool| {
            let store = NeighborStore::new(POSITIONS.len(), 4);
            seed_store(&store, &oracle, 5, parallel);
            let snapshot = PassSnapshot::take(&store);
            let config = JoinConfig {
                parallel,
                ..JoinConfig::default()
            };
            let outcome = local_join(&store, &snapshot, &oracle, &config);
            (outcome.distance_evaluations, store.freeze())
        };
        assert_eq!(run(false), run(true));
    }
}
