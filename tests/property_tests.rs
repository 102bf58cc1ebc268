//! Property-based tests for nndescent components.
//!
//! These tests verify invariants that should hold regardless of input:
//! - A neighbor heap keeps exactly the k best distinct candidates
//! - Reverse indexes are the exact transpose of the forward lists
//! - Seeding never proposes the owner or a repeated id
//! - Built graphs are well-formed and independent of parallelism

use std::collections::HashSet;

use nndescent::nndescent::{sample_initial_candidates, NeighborHeap, NeighborIds, ReverseIndex};
use nndescent::{DistanceMetric, Neighbor, NnDescent, NnDescentParams, PointId, VectorOracle};
use proptest::prelude::*;

mod heap_props {
    use super::*;

    /// Distance is a function of the id, with plenty of ties.
    fn distance_of(id: PointId) -> f32 {
        (id % 7) as f32
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn keeps_the_k_smallest_distinct_candidates(
            owner in 0u32..40,
            capacity in 0usize..12,
            ids in prop::collection::vec(0u32..40, 0..120),
        ) {
            let mut heap = NeighborHeap::new(owner, capacity);
            for &id in &ids {
                heap.insert(id, distance_of(id));
            }

            let mut expected: Vec<Neighbor> = ids
                .iter()
                .copied()
                .filter(|&id| id != owner)
                .collect::<HashSet<_>>()
                .into_iter()
                .map(|id| Neighbor::new(id, distance_of(id)))
                .collect();
            expected.sort_unstable();
            expected.truncate(capacity);

            prop_assert_eq!(heap.to_sorted_list(), expected);
        }

        #[test]
        fn size_bounded_and_owner_excluded(
            owner in 0u32..20,
            capacity in 1usize..8,
            inserts in prop::collection::vec((0u32..20, 0.0f32..10.0), 0..80),
        ) {
            let mut heap = NeighborHeap::new(owner, capacity);
            for &(id, d) in &inserts {
                heap.insert(id, d);
                prop_assert!(heap.len() <= capacity);
            }
            let members = heap.members();
            prop_assert!(!members.contains(&owner));
            let unique: HashSet<_> = members.iter().collect();
            prop_assert_eq!(unique.len(), members.len());
            prop_assert!(members.windows(2).all(|w| w[0] < w[1]));
        }

        #[test]
        fn worst_distance_only_decreases_once_full(
            capacity in 1usize..6,
            inserts in prop::collection::vec((1u32..30, 0.0f32..10.0), 0..60),
        ) {
            let mut heap = NeighborHeap::new(0, capacity);
            let mut worst = heap.max_distance();
            for &(id, d) in &inserts {
                heap.insert(id, d);
                let now = heap.max_distance();
                prop_assert!(now <= worst, "{} > {}", now, worst);
                worst = now;
                if heap.is_full() {
                    let list = heap.to_sorted_list();
                    prop_assert_eq!(list.last().map(|n| n.distance), Some(now));
                }
            }
        }
    }
}

mod index_props {
    use super::*;

    prop_compose! {
        fn arb_forward(max_n: usize)(n in 2usize..max_n)
            (lists in prop::collection::vec(
                prop::collection::btree_set(0..n as u32, 0..n.min(6)),
                n,
            )) -> Vec<NeighborIds> {
            lists
                .into_iter()
                .enumerate()
                .map(|(p, set)| set.into_iter().filter(|&q| q != p as u32).collect())
                .collect()
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn reverse_index_is_the_transpose(forward in arb_forward(40)) {
            let reverse = ReverseIndex::build(&forward);
            prop_assert_eq!(reverse.len(), forward.len());

            for p in 0..forward.len() as PointId {
                let rev = reverse.get(p);
                prop_assert!(rev.windows(2).all(|w| w[0] < w[1]));
                prop_assert!(!rev.contains(&p));
                for &q in rev {
                    prop_assert!(forward[q as usize].contains(&p));
                }
            }
            for (q, list) in forward.iter().enumerate() {
                for &p in list {
                    prop_assert!(reverse.get(p).contains(&(q as PointId)));
                }
            }
        }

        #[test]
        fn seeding_samples_are_valid(n in 2usize..60, k_frac in 0.0f64..1.0, seed in any::<u64>()) {
            let k = 1 + ((n - 2) as f64 * k_frac) as usize;
            let samples = sample_initial_candidates(n, k, seed);
            prop_assert_eq!(samples.len(), n);
            for (p, s) in samples.iter().enumerate() {
                prop_assert_eq!(s.len(), k);
                prop_assert!(!s.contains(&(p as PointId)));
                prop_assert!(s.iter().all(|&q| (q as usize) < n));
                let unique: HashSet<_> = s.iter().collect();
                prop_assert_eq!(unique.len(), k);
            }
            prop_assert_eq!(samples, sample_initial_candidates(n, k, seed));
        }
    }
}

mod graph_props {
    use super::*;

    prop_compose! {
        fn arb_dataset()(n in 3usize..60, dim in 1usize..5)
            (data in prop::collection::vec(-5.0f32..5.0, n * dim), n in Just(n), dim in Just(dim))
            -> (Vec<f32>, usize, usize) {
            (data, n, dim)
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn built_graphs_are_well_formed(
            (data, n, dim) in arb_dataset(),
            k_frac in 0.0f64..1.0,
            seed in any::<u64>(),
        ) {
            let k = 1 + ((n - 2) as f64 * k_frac) as usize;
            let oracle = VectorOracle::new(&data, dim, DistanceMetric::L2).unwrap();
            let graph = NnDescent::new(n, NnDescentParams::new(k).with_seed(seed))
                .unwrap()
                .build(&oracle);

            prop_assert_eq!(graph.len(), n);
            for (p, list) in graph.iter() {
                prop_assert_eq!(list.len(), k);
                prop_assert!(list.iter().all(|nb| nb.id != p));
                prop_assert!(list.windows(2).all(|w| w[0] < w[1]));
                for nb in list {
                    let d = DistanceMetric::L2.distance(oracle.vector(p), oracle.vector(nb.id));
                    prop_assert_eq!(nb.distance, d);
                }
            }
        }

        #[test]
        fn parallelism_does_not_change_the_graph(
            (data, n, dim) in arb_dataset(),
            seed in any::<u64>(),
        ) {
            let k = (n - 1).min(4);
            let oracle = VectorOracle::new(&data, dim, DistanceMetric::Manhattan).unwrap();
            let params = NnDescentParams::new(k).with_seed(seed);
            let a = NnDescent::new(n, params.clone().with_parallel(true)).unwrap().build(&oracle);
            let b = NnDescent::new(n, params.with_parallel(false)).unwrap().build(&oracle);

            for p in 0..n as PointId {
                prop_assert_eq!(a.neighbors(p), b.neighbors(p));
            }
            prop_assert_eq!(a.is_converged(), b.is_converged());
        }
    }
}
