//! Per-subject HSP collection.
//!
//! The store grows by a fixed factor up to a hard cap. Once full it keeps the
//! best entries: a new HSP replaces the current worst if it compares better,
//! and is dropped otherwise. The worst entry is found through a heap built
//! the first time the cap is hit, so a crowded subject costs O(log n) per
//! offered HSP.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use log::trace;

use super::{position_compare_hsps, score_compare_hsps, Hsp};
use crate::config::StoreConfig;

/// Result of [`HspStore::append`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    Appended,
    /// The store was full; the worst entry was evicted
    Replaced,
    /// The store was full and the new HSP was not better than its worst entry
    Rejected,
}

/// Sort key of one stored HSP; the greatest key is the worst HSP
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Ranked {
    score: i32,
    s_start: usize,
    s_end: usize,
    q_start: usize,
    q_end: usize,
    slot: usize,
}

impl Ranked {
    fn new(hsp: &Hsp, slot: usize) -> Self {
        Self {
            score: hsp.score,
            s_start: hsp.s_start,
            s_end: hsp.s_end,
            q_start: hsp.q_start,
            q_end: hsp.q_end,
            slot,
        }
    }
}

impl Ord for Ranked {
    // Mirrors score_compare_hsps
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .cmp(&self.score)
            .then(self.s_start.cmp(&other.s_start))
            .then(other.s_end.cmp(&self.s_end))
            .then(self.q_start.cmp(&other.q_start))
            .then(other.q_end.cmp(&self.q_end))
            .then(self.slot.cmp(&other.slot))
    }
}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug)]
pub struct HspStore {
    hsps: Vec<Hsp>,
    capacity: usize,
    growth_factor: usize,
    hard_cap: usize,
    /// Worst-first view of `hsps`, kept only while the store is full
    worst: Option<BinaryHeap<Ranked>>,
    exhausted: bool,
    warned: bool,
}

impl HspStore {
    pub fn new(config: &StoreConfig) -> Self {
        let capacity = config.initial_capacity.min(config.hard_cap).max(1);
        Self {
            hsps: Vec::with_capacity(capacity),
            capacity,
            growth_factor: config.growth_factor.max(2),
            hard_cap: config.hard_cap.max(1),
            worst: None,
            exhausted: false,
            warned: false,
        }
    }

    /// Empty the store for the next window, keeping its allocation
    pub fn clear(&mut self) {
        self.hsps.clear();
        self.worst = None;
        self.exhausted = false;
        self.warned = false;
    }

    pub fn append(&mut self, hsp: Hsp) -> StoreOutcome {
        if self.hsps.len() < self.capacity {
            self.hsps.push(hsp);
            return StoreOutcome::Appended;
        }
        if self.capacity < self.hard_cap {
            self.capacity = self
                .capacity
                .saturating_mul(self.growth_factor)
                .min(self.hard_cap);
            self.hsps.reserve(self.capacity - self.hsps.len());
            trace!("HSP store grew to {}", self.capacity);
            self.hsps.push(hsp);
            return StoreOutcome::Appended;
        }

        self.exhausted = true;
        let hsps = &self.hsps;
        let worst = self
            .worst
            .get_or_insert_with(|| hsps.iter().enumerate().map(|(i, h)| Ranked::new(h, i)).collect());
        let Some(&top) = worst.peek() else {
            return StoreOutcome::Rejected;
        };
        if score_compare_hsps(&hsp, &self.hsps[top.slot]).is_lt() {
            worst.pop();
            worst.push(Ranked::new(&hsp, top.slot));
            self.hsps[top.slot] = hsp;
            StoreOutcome::Replaced
        } else {
            StoreOutcome::Rejected
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Hsp> {
        self.hsps.iter()
    }

    /// Best first
    pub fn sort_by_score(&mut self) {
        self.worst = None;
        self.hsps.sort_by(score_compare_hsps);
    }

    /// Subject order
    pub fn sort_by_position(&mut self) {
        self.worst = None;
        self.hsps.sort_by(position_compare_hsps);
    }

    pub fn len(&self) -> usize {
        self.hsps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hsps.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True exactly once after the cap was hit since the last [`clear`](Self::clear)
    pub fn take_warning(&mut self) -> bool {
        if self.exhausted && !self.warned {
            self.warned = true;
            true
        } else {
            false
        }
    }

    /// Move the HSPs out, leaving the store empty
    pub fn drain(&mut self) -> Vec<Hsp> {
        self.worst = None;
        std::mem::take(&mut self.hsps)
    }
}
