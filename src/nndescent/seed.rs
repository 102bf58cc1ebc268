//! Random initialization of the neighbor heaps.

use rand::rngs::StdRng;
use rand::SeedableRng;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::store::NeighborStore;
use crate::distance::DistanceOracle;
use crate::PointId;

/// Draw `min(k, n - 1)` distinct other points for every point.
///
/// Samples come from a single RNG stream consumed in dataset order, so the
/// result depends only on `seed`, `n` and `k`.
#[must_use]
pub fn sample_initial_candidates(n: usize, k: usize, seed: u64) -> Vec<Vec<PointId>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let amount = k.min(n.saturating_sub(1));
    (0..n)
        .map(|p| {
            rand::seq::index::sample(&mut rng, n - 1, amount)
                .into_iter()
                // Slots index the n - 1 points other than p.
                .map(|slot| (if slot >= p { slot + 1 } else { slot }) as PointId)
                .collect()
        })
        .collect()
}

/// Fill every heap of `store` with random candidates.
///
/// Returns the number of distance evaluations.
pub fn seed_store<O: DistanceOracle>(
    store: &NeighborStore,
    oracle: &O,
    seed: u64,
    parallel: bool,
) -> u64 {
    let samples = sample_initial_candidates(store.len(), store.k(), seed);
    let fill = |(p, candidates): (usize, &Vec<PointId>)| {
        let owner = p as PointId;
        for &c in candidates {
            store.try_insert(owner, c, oracle.distance(owner, c));
        }
        candidates.len() as u64
    };

    #[cfg(feature = "parallel")]
    {
        if parallel {
            return samples.par_iter().enumerate().map(fill).sum();
        }
    }
    #[cfg(not(feature = "parallel"))]
    let _ = parallel;

    samples.iter().enumerate().map(fill).sum()
}
