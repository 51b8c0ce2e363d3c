// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Priority queues holding the narrow band of tentative nodes.
//!
//! The two marching variants differ only in how they handle a node whose
//! tentative potential improves while it is already queued:
//!
//! - [`QueueStrategy::Fmm`] uses an [`IndexedHeap`] that knows where each node
//!   sits, removes the old entry and re-inserts the node with its new
//!   priority. Every node is queued at most once, at the price of a position
//!   table and sift operations on removal.
//! - [`QueueStrategy::Sfmm`] uses a plain [`LazyHeap`] and pushes a second
//!   entry instead. Outdated entries stay behind and are recognized as stale
//!   when popped, so the queue grows and pops more often, but only push and
//!   pop are needed.
//!
//! Both order entries by `(potential, flat index)`, so for the same input
//! they freeze nodes in exactly the same sequence.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Queue discipline used by a solver, chosen at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QueueStrategy {
    /// Classic fast marching with decrease-key on an indexed heap.
    #[default]
    Fmm,
    /// Simplified fast marching that tolerates stale duplicate entries.
    Sfmm,
}

impl std::str::FromStr for QueueStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fmm" => Ok(QueueStrategy::Fmm),
            "sfmm" => Ok(QueueStrategy::Sfmm),
            other => Err(format!("unknown strategy '{}': expected fmm or sfmm", other)),
        }
    }
}

/// A queued node with the potential it was pushed with.
#[derive(Clone, Copy, Debug)]
struct BandEntry {
    potential: f64,
    cell: usize,
}

impl BandEntry {
    /// Ascending by potential, then by flat index.
    #[inline]
    fn key_cmp(&self, other: &Self) -> Ordering {
        self.potential
            .total_cmp(&other.potential)
            .then(self.cell.cmp(&other.cell))
    }
}

impl PartialEq for BandEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key_cmp(other) == Ordering::Equal
    }
}

impl Eq for BandEntry {}

impl Ord for BandEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap
        other.key_cmp(self)
    }
}

impl PartialOrd for BandEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

const ABSENT: usize = usize::MAX;

/// Binary min-heap that tracks the slot of every queued node.
#[derive(Debug, Clone)]
pub struct IndexedHeap {
    heap: Vec<BandEntry>,
    position: Vec<usize>,
}

impl IndexedHeap {
    /// Empty heap able to hold nodes `0..num_nodes`.
    pub fn new(num_nodes: usize) -> Self {
        IndexedHeap {
            heap: Vec::new(),
            position: vec![ABSENT; num_nodes],
        }
    }

    /// Whether a node is currently queued.
    pub fn contains(&self, cell: usize) -> bool {
        self.position[cell] != ABSENT
    }

    /// Queue a node. A node already queued is re-keyed instead.
    pub fn push(&mut self, cell: usize, potential: f64) {
        if self.contains(cell) {
            self.remove(cell);
        }
        let slot = self.heap.len();
        self.heap.push(BandEntry { potential, cell });
        self.position[cell] = slot;
        self.sift_up(slot);
    }

    /// Remove and return the node with the lowest potential.
    pub fn pop(&mut self) -> Option<(usize, f64)> {
        if self.heap.is_empty() {
            return None;
        }
        let top = self.take(0);
        Some((top.cell, top.potential))
    }

    /// Remove a queued node, returning the potential it was queued with.
    pub fn remove(&mut self, cell: usize) -> Option<f64> {
        let slot = self.position[cell];
        if slot == ABSENT {
            return None;
        }
        Some(self.take(slot).potential)
    }

    /// Number of queued nodes.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    fn take(&mut self, slot: usize) -> BandEntry {
        let last = self.heap.len() - 1;
        self.swap(slot, last);
        let entry = self.heap[last];
        self.heap.truncate(last);
        self.position[entry.cell] = ABSENT;
        if slot < self.heap.len() {
            self.sift_down(slot);
            self.sift_up(slot);
        }
        entry
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        self.position[self.heap[a].cell] = a;
        self.position[self.heap[b].cell] = b;
    }

    fn sift_up(&mut self, mut slot: usize) {
        while slot > 0 {
            let parent = (slot - 1) / 2;
            if self.heap[slot].key_cmp(&self.heap[parent]) == Ordering::Less {
                self.swap(slot, parent);
                slot = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut slot: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * slot + 1;
            let right = left + 1;
            let mut smallest = slot;
            if left < len && self.heap[left].key_cmp(&self.heap[smallest]) == Ordering::Less {
                smallest = left;
            }
            if right < len && self.heap[right].key_cmp(&self.heap[smallest]) == Ordering::Less {
                smallest = right;
            }
            if smallest == slot {
                break;
            }
            self.swap(slot, smallest);
            slot = smallest;
        }
    }
}

/// Min-heap without removal; improved nodes are pushed again.
#[derive(Debug, Clone, Default)]
pub struct LazyHeap {
    heap: BinaryHeap<BandEntry>,
}

impl LazyHeap {
    /// Empty heap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an entry. Earlier entries for the same node are kept.
    pub fn push(&mut self, cell: usize, potential: f64) {
        self.heap.push(BandEntry { potential, cell });
    }

    /// Remove and return the entry with the lowest potential.
    pub fn pop(&mut self) -> Option<(usize, f64)> {
        self.heap.pop().map(|e| (e.cell, e.potential))
    }

    /// Number of queued entries, stale ones included.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

/// The narrow band of a solver, tagged by queue discipline.
#[derive(Debug, Clone)]
pub enum NarrowBand {
    /// Decrease-key queue for [`QueueStrategy::Fmm`].
    Indexed(IndexedHeap),
    /// Stale-entry queue for [`QueueStrategy::Sfmm`].
    Lazy(LazyHeap),
}

impl NarrowBand {
    /// Empty band for the given strategy and grid size.
    pub fn new(strategy: QueueStrategy, num_nodes: usize) -> Self {
        match strategy {
            QueueStrategy::Fmm => NarrowBand::Indexed(IndexedHeap::new(num_nodes)),
            QueueStrategy::Sfmm => NarrowBand::Lazy(LazyHeap::new()),
        }
    }

    /// Queue a node entering the band.
    pub fn push(&mut self, cell: usize, potential: f64) {
        match self {
            NarrowBand::Indexed(h) => h.push(cell, potential),
            NarrowBand::Lazy(h) => h.push(cell, potential),
        }
    }

    /// Give a queued node a lower potential.
    ///
    /// The indexed heap removes the old entry first; the lazy heap leaves it
    /// in place to be discarded as stale later.
    pub fn improve(&mut self, cell: usize, potential: f64) {
        match self {
            NarrowBand::Indexed(h) => {
                h.remove(cell);
                h.push(cell, potential);
            }
            NarrowBand::Lazy(h) => h.push(cell, potential),
        }
    }

    /// Remove and return the lowest `(cell, potential)` entry.
    pub fn pop(&mut self) -> Option<(usize, f64)> {
        match self {
            NarrowBand::Indexed(h) => h.pop(),
            NarrowBand::Lazy(h) => h.pop(),
        }
    }

    /// Number of queued entries.
    pub fn len(&self) -> usize {
        match self {
            NarrowBand::Indexed(h) => h.len(),
            NarrowBand::Lazy(h) => h.len(),
        }
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
