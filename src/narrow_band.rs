// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Min-priority queue over trial nodes with decrease-key.

const NOT_QUEUED: usize = usize::MAX;

#[derive(Debug, Clone, Copy)]
struct Entry {
    flat: usize,
    value: f64,
}

/// Binary min-heap keyed by tentative arrival time.
///
/// `positions[flat]` is the heap slot of `flat`, or `NOT_QUEUED`. Every
/// node appears at most once, so the heap never holds stale entries.
pub struct NarrowBand {
    heap: Vec<Entry>,
    positions: Vec<usize>,
}

impl NarrowBand {
    /// Create an empty queue for a grid of `num_nodes` nodes.
    pub fn new(num_nodes: usize) -> Self {
        NarrowBand {
            heap: Vec::new(),
            positions: vec![NOT_QUEUED; num_nodes],
        }
    }

    /// Number of queued nodes.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Current key of `flat`, if queued.
    pub fn value_of(&self, flat: usize) -> Option<f64> {
        match self.positions[flat] {
            NOT_QUEUED => None,
            pos => Some(self.heap[pos].value),
        }
    }

    /// Smallest queued entry without removing it.
    pub fn peek(&self) -> Option<(usize, f64)> {
        self.heap.first().map(|e| (e.flat, e.value))
    }

    /// Insert `flat` with `value`, or lower its key if already queued.
    ///
    /// Returns true if the queue changed. A key never increases.
    pub fn push_or_decrease(&mut self, flat: usize, value: f64) -> bool {
        match self.positions[flat] {
            NOT_QUEUED => {
                let pos = self.heap.len();
                self.heap.push(Entry { flat, value });
                self.positions[flat] = pos;
                self.sift_up(pos);
                true
            }
            pos if value < self.heap[pos].value => {
                self.heap[pos].value = value;
                self.sift_up(pos);
                true
            }
            _ => false,
        }
    }

    /// Remove and return the entry with the smallest key.
    pub fn pop(&mut self) -> Option<(usize, f64)> {
        if self.heap.is_empty() {
            return None;
        }
        let last = self.heap.len() - 1;
        self.swap(0, last);
        let top = self.heap.pop()?;
        self.positions[top.flat] = NOT_QUEUED;
        if !self.heap.is_empty() {
            self.sift_down(0);
        }
        Some((top.flat, top.value))
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        self.positions[self.heap[a].flat] = a;
        self.positions[self.heap[b].flat] = b;
    }

    fn sift_up(&mut self, mut pos: usize) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if self.heap[pos].value < self.heap[parent].value {
                self.swap(pos, parent);
                pos = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut pos: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * pos + 1;
            let right = left + 1;
            let mut smallest = pos;
            if left < len && self.heap[left].value < self.heap[smallest].value {
                smallest = left;
            }
            if right < len && self.heap[right].value < self.heap[smallest].value {
                smallest = right;
            }
            if smallest == pos {
                break;
            }
            self.swap(pos, smallest);
            pos = smallest;
        }
    }
}
