//! Per-point neighbor heaps and the per-pass read snapshot.

use parking_lot::Mutex;
use smallvec::SmallVec;

use super::heap::{Neighbor, NeighborHeap};
use crate::PointId;

/// Forward neighbor ids of one point at snapshot time, ascending.
pub type NeighborIds = SmallVec<[PointId; 16]>;

/// One heap per point, each behind its own lock.
///
/// The join for one point may update the heaps of many others, and joins for
/// different points run concurrently, so locking is per heap rather than per
/// join task.
#[derive(Debug)]
pub struct NeighborStore {
    k: usize,
    heaps: Vec<Mutex<NeighborHeap>>,
}

impl NeighborStore {
    /// Create `n` empty heaps of capacity `k`.
    #[must_use]
    pub fn new(n: usize, k: usize) -> Self {
        let heaps = (0..n)
            .map(|p| Mutex::new(NeighborHeap::new(p as PointId, k)))
            .collect();
        Self { k, heaps }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.heaps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heaps.is_empty()
    }

    #[must_use]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Offer `candidate` at `distance` to the heap of `owner`.
    #[inline]
    pub fn try_insert(&self, owner: PointId, candidate: PointId, distance: f32) -> bool {
        self.heaps[owner as usize].lock().insert(candidate, distance)
    }

    /// Current member ids of `owner`'s heap.
    #[must_use]
    pub fn members(&self, owner: PointId) -> NeighborIds {
        self.heaps[owner as usize].lock().members()
    }

    /// Forward lists of every point. Must be taken before a pass mutates anything.
    #[must_use]
    pub fn snapshot_forward(&self) -> Vec<NeighborIds> {
        self.heaps.iter().map(|h| h.lock().members()).collect()
    }

    /// `max_distance()` of every heap.
    #[must_use]
    pub fn max_distances(&self) -> Vec<f32> {
        self.heaps.iter().map(|h| h.lock().max_distance()).collect()
    }

    #[must_use]
    pub fn heap_sizes(&self) -> Vec<usize> {
        self.heaps.iter().map(|h| h.lock().len()).collect()
    }

    /// Consume the store into sorted neighbor lists.
    #[must_use]
    pub fn freeze(self) -> Vec<Vec<Neighbor>> {
        self.heaps
            .into_iter()
            .map(|h| h.into_inner().to_sorted_list())
            .collect()
    }
}

/// For every point `p`, the points whose heap listed `p` at snapshot time.
#[derive(Debug, Clone)]
pub struct ReverseIndex {
    reverse: Vec<Vec<PointId>>,
}

impl ReverseIndex {
    /// One scan over all forward lists. Each reverse list comes out ascending.
    #[must_use]
    pub fn build(forward: &[NeighborIds]) -> Self {
        let mut reverse: Vec<Vec<PointId>> = vec![Vec::new(); forward.len()];
        for (q, members) in forward.iter().enumerate() {
            for &p in members {
                if p as usize != q {
                    reverse[p as usize].push(q as PointId);
                }
            }
        }
        Self { reverse }
    }

    #[must_use]
    pub fn get(&self, p: PointId) -> &[PointId] {
        &self.reverse[p as usize]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.reverse.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reverse.is_empty()
    }
}

/// Forward ∪ reverse neighbors of one point for one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtendedNeighborhood {
    /// Union of forward and reverse ids, ascending, no duplicates.
    pub members: SmallVec<[PointId; 32]>,
    /// Reverse neighbors that are not forward neighbors, ascending.
    pub reverse_only: SmallVec<[PointId; 16]>,
}

/// Read-only view of the store taken at the start of a pass.
#[derive(Debug, Clone)]
pub struct PassSnapshot {
    forward: Vec<NeighborIds>,
    reverse: ReverseIndex,
}

impl PassSnapshot {
    #[must_use]
    pub fn take(store: &NeighborStore) -> Self {
        let forward = store.snapshot_forward();
        let reverse = ReverseIndex::build(&forward);
        Self { forward, reverse }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    #[must_use]
    pub fn forward(&self, p: PointId) -> &[PointId] {
        &self.forward[p as usize]
    }

    #[must_use]
    pub fn reverse(&self, p: PointId) -> &[PointId] {
        self.reverse.get(p)
    }

    /// Merge the two ascending lists of `p`.
    ///
    /// With `cap`, members are limited to the first `cap` ids, forward
    /// neighbors taking precedence over reverse ones.
    #[must_use]
    pub fn extended(&self, p: PointId, cap: Option<usize>) -> ExtendedNeighborhood {
        let forward = self.forward(p);
        let reverse = self.reverse(p);
        let mut out = ExtendedNeighborhood::default();

        let (mut i, mut j) = (0, 0);
        while i < forward.len() || j < reverse.len() {
            match (forward.get(i), reverse.get(j)) {
                (Some(&f), Some(&r)) if f == r => {
                    out.members.push(f);
                    i += 1;
                    j += 1;
                }
                (Some(&f), Some(&r)) if f < r => {
                    out.members.push(f);
                    i += 1;
                }
                (Some(_), Some(&r)) | (None, Some(&r)) => {
                    out.members.push(r);
                    out.reverse_only.push(r);
                    j += 1;
                }
                (Some(&f), None) => {
                    out.members.push(f);
                    i += 1;
                }
                (None, None) => break,
            }
        }

        if let Some(cap) = cap {
            if out.members.len() > cap {
                let keep_reverse = cap.saturating_sub(forward.len());
                let kept: SmallVec<[PointId; 16]> =
                    out.reverse_only.iter().copied().take(keep_reverse).collect();
                let mut members: SmallVec<[PointId; 32]> =
                    forward.iter().copied().take(cap).collect();
                members.extend(kept.iter().copied());
                members.sort_unstable();
                out.members = members;
                out.reverse_only = kept;
            }
        }
        out
    }
}
