//! Bounded max-heap of candidate neighbors for one point.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use smallvec::SmallVec;

use crate::PointId;

/// One neighbor of a point: its identifier and the oracle distance to it.
///
/// Ordered by distance first and identifier second, so two entries compare
/// equal only when both fields match. This total order is what makes the
/// heap's content independent of insertion order.
#[derive(Debug, Clone, Copy)]
pub struct Neighbor {
    pub id: PointId,
    pub distance: f32,
}

impl Neighbor {
    #[inline]
    #[must_use]
    pub fn new(id: PointId, distance: f32) -> Self {
        Self { id, distance }
    }
}

impl PartialEq for Neighbor {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Neighbor {}

impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Neighbor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Fixed-capacity max-heap holding the best `k` neighbors seen for `owner`.
///
/// Invariants:
/// - `len() <= capacity()`
/// - the owner is never a member
/// - no identifier appears twice
/// - the worst kept entry is the heap root
#[derive(Debug, Clone)]
pub struct NeighborHeap {
    owner: PointId,
    capacity: usize,
    entries: BinaryHeap<Neighbor>,
}

impl NeighborHeap {
    #[must_use]
    pub fn new(owner: PointId, capacity: usize) -> Self {
        Self {
            owner,
            capacity,
            entries: BinaryHeap::with_capacity(capacity),
        }
    }

    /// Offer a candidate.
    ///
    /// Returns `true` iff the heap changed. Rejects the owner, ids already
    /// present, and NaN distances. When full, the candidate replaces the
    /// current worst entry only if it is strictly better in `(distance, id)`
    /// order.
    pub fn insert(&mut self, id: PointId, distance: f32) -> bool {
        if id == self.owner || distance.is_nan() || self.capacity == 0 {
            return false;
        }
        let candidate = Neighbor::new(id, distance);
        if self.is_full() {
            match self.entries.peek() {
                Some(worst) if candidate < *worst => {}
                _ => return false,
            }
        }
        if self.contains(id) {
            return false;
        }
        if self.is_full() {
            self.entries.pop();
        }
        self.entries.push(candidate);
        true
    }

    /// Worst kept distance, or `+inf` while fewer than `capacity` entries are held.
    #[inline]
    #[must_use]
    pub fn max_distance(&self) -> f32 {
        if !self.is_full() {
            return f32::INFINITY;
        }
        self.entries.peek().map_or(f32::INFINITY, |n| n.distance)
    }

    /// Entries sorted ascending by `(distance, id)`. Does not mutate the heap.
    #[must_use]
    pub fn to_sorted_list(&self) -> Vec<Neighbor> {
        let mut list: Vec<Neighbor> = self.entries.iter().copied().collect();
        list.sort_unstable();
        list
    }

    /// Member ids, ascending.
    #[must_use]
    pub fn members(&self) -> SmallVec<[PointId; 16]> {
        let mut ids: SmallVec<[PointId; 16]> = self.entries.iter().map(|n| n.id).collect();
        ids.sort_unstable();
        ids
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, id: PointId) -> bool {
        self.entries.iter().any(|n| n.id == id)
    }

    #[inline]
    #[must_use]
    pub fn owner(&self) -> PointId {
        self.owner
    }

    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }
}
