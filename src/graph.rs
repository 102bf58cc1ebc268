//! The frozen k-NN graph handed to downstream consumers.

use crate::error::{Error, Result};
use crate::nndescent::{BuildStats, Neighbor, Termination};
use crate::PointId;

/// Read access to "the k nearest neighbors of p".
///
/// This is the only thing density and outlier estimators need from a graph.
pub trait KnnQuery {
    /// Up to `k` nearest neighbors of `p`, ascending by distance.
    ///
    /// # Panics
    ///
    /// Implementations may panic if `p` is out of range.
    fn knn(&self, p: PointId, k: usize) -> &[Neighbor];

    /// Number of points.
    fn num_points(&self) -> usize;

    /// Largest `k` that can be requested.
    fn max_k(&self) -> usize;
}

/// Approximate k-nearest-neighbor graph.
///
/// Every list is sorted ascending by `(distance, id)` and never contains the
/// point itself. Lists hold exactly `k` entries unless the run was cut short
/// before seeding.
#[derive(Debug, Clone)]
pub struct KnnGraph {
    k: usize,
    neighbors: Vec<Vec<Neighbor>>,
    stats: BuildStats,
}

impl KnnGraph {
    pub(crate) fn new(k: usize, neighbors: Vec<Vec<Neighbor>>, stats: BuildStats) -> Self {
        Self {
            k,
            neighbors,
            stats,
        }
    }

    #[must_use]
    pub fn k(&self) -> usize {
        self.k
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    /// Neighbors of `p`, ascending.
    ///
    /// # Panics
    ///
    /// Panics if `p` is out of range. See [`KnnGraph::get`].
    #[must_use]
    pub fn neighbors(&self, p: PointId) -> &[Neighbor] {
        &self.neighbors[p as usize]
    }

    /// Neighbors of `p`, or an error if `p` is out of range.
    pub fn get(&self, p: PointId) -> Result<&[Neighbor]> {
        self.neighbors
            .get(p as usize)
            .map(Vec::as_slice)
            .ok_or(Error::PointOutOfRange {
                id: p,
                n: self.neighbors.len(),
            })
    }

    /// The first `k` neighbors of `p` (all of them if `k` exceeds the list).
    #[must_use]
    pub fn k_nearest(&self, p: PointId, k: usize) -> &[Neighbor] {
        let list = self.neighbors(p);
        &list[..k.min(list.len())]
    }

    /// Distance from `p` to its `k`-th nearest neighbor (1-based).
    #[must_use]
    pub fn k_distance(&self, p: PointId, k: usize) -> Option<f32> {
        k.checked_sub(1)
            .and_then(|i| self.neighbors(p).get(i))
            .map(|n| n.distance)
    }

    /// `true` if the build reached a fixed point.
    #[must_use]
    pub fn is_converged(&self) -> bool {
        self.stats.termination == Termination::Converged
    }

    #[must_use]
    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }

    pub fn iter(&self) -> impl Iterator<Item = (PointId, &[Neighbor])> + '_ {
        self.neighbors
            .iter()
            .enumerate()
            .map(|(p, list)| (p as PointId, list.as_slice()))
    }

    /// How many lists each point appears in.
    ///
    /// Points with very high counts are hubs; points with zero are antihubs.
    #[must_use]
    pub fn reverse_neighbor_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.neighbors.len()];
        for list in &self.neighbors {
            for n in list {
                counts[n.id as usize] += 1;
            }
        }
        counts
    }
}

impl KnnQuery for KnnGraph {
    fn knn(&self, p: PointId, k: usize) -> &[Neighbor] {
        self.k_nearest(p, k)
    }

    fn num_points(&self) -> usize {
        self.len()
    }

    fn max_k(&self) -> usize {
        self.k
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> KnnGraph {
        let stats = BuildStats {
            passes: 1,
            termination: Termination::Converged,
            updates_per_pass: vec![0],
            seeding_evaluations: 6,
            distance_evaluations: 9,
        };
        KnnGraph::new(
            2,
            vec![
                vec![Neighbor::new(1, 1.0), Neighbor::new(2, 2.0)],
                vec![Neighbor::new(0, 1.0), Neighbor::new(2, 1.0)],
                vec![Neighbor::new(1, 1.0), Neighbor::new(0, 2.0)],
            ],
            stats,
        )
    }

    #[test]
    fn truncated_queries() {
        let graph = fixture();
        assert_eq!(graph.k_nearest(0, 1), &[Neighbor::new(1, 1.0)]);
        assert_eq!(graph.k_nearest(0, 10).len(), 2);
        assert_eq!(graph.knn(2, 2).len(), 2);
        assert_eq!(graph.k_distance(2, 2), Some(2.0));
        assert_eq!(graph.k_distance(2, 0), None);
        assert_eq!(graph.k_distance(2, 3), None);
    }

    #[test]
    fn out_of_range_lookup_is_an_error() {
        let graph = fixture();
        assert!(graph.get(2).is_ok());
        assert_eq!(
            graph.get(3).unwrap_err(),
            Error::PointOutOfRange { id: 3, n: 3 }
        );
    }

    #[test]
    fn in_degree_counts() {
        let graph = fixture();
        assert_eq!(graph.reverse_neighbor_counts(), vec![2, 2, 2]);
        assert!(graph.is_converged());
        assert_eq!(graph.iter().count(), 3);
    }
}
