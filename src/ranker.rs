//! Bounded top-K collection of per-subject results.
//!
//! Results are ordered by best E-value (two E-values below 1e-180 compare
//! equal), then best score descending, then subject id and database index.
//! The ranker keeps the worst of its K entries on top of a binary heap so a
//! full ranker decides in O(1) whether a candidate can enter.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::hsp::{evalue_cmp, evalue_compare_hsps, reorder, Hsp};

/// Final result for one subject: its accepted HSPs, best first
#[derive(Debug, Clone, PartialEq)]
pub struct ResultHitlist {
    /// Database index of the subject
    pub oid: usize,
    pub subject_id: String,
    pub subject_len: usize,
    pub hsps: Vec<Hsp>,
    pub best_evalue: f64,
    pub best_score: i32,
}

impl ResultHitlist {
    /// `None` when `hsps` is empty. HSPs are sorted by effective E-value
    /// with chain indices rewritten to match.
    pub fn new(oid: usize, subject_id: &str, subject_len: usize, mut hsps: Vec<Hsp>) -> Option<Self> {
        if hsps.is_empty() {
            return None;
        }
        reorder(&mut hsps, evalue_compare_hsps);
        let best_evalue = hsps
            .iter()
            .map(Hsp::effective_evalue)
            .fold(f64::INFINITY, f64::min);
        let best_score = hsps.iter().map(|h| h.score).max().unwrap_or(0);
        Some(Self {
            oid,
            subject_id: subject_id.to_string(),
            subject_len,
            hsps,
            best_evalue,
            best_score,
        })
    }
}

/// Ranking order: `Less` means `a` ranks ahead of `b`
pub fn compare_results(a: &ResultHitlist, b: &ResultHitlist) -> Ordering {
    evalue_cmp(a.best_evalue, b.best_evalue)
        .then(b.best_score.cmp(&a.best_score))
        .then_with(|| a.subject_id.cmp(&b.subject_id))
        .then(a.oid.cmp(&b.oid))
}

/// Heap entry; the greatest entry is the worst-ranked
#[derive(Debug)]
struct Ranked(ResultHitlist);

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        compare_results(&self.0, &other.0) == Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_results(&self.0, &other.0)
    }
}

#[derive(Debug)]
pub struct ResultRanker {
    capacity: usize,
    heap: BinaryHeap<Ranked>,
}

impl ResultRanker {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            heap: BinaryHeap::with_capacity(capacity.min(1 << 16) + 1),
        }
    }

    /// Offer a result. Returns whether it was kept; a kept result may evict
    /// the current worst.
    pub fn insert(&mut self, result: ResultHitlist) -> bool {
        if self.capacity == 0 {
            return false;
        }
        if self.heap.len() < self.capacity {
            self.heap.push(Ranked(result));
            return true;
        }
        match self.heap.peek() {
            Some(worst) if compare_results(&result, &worst.0) == Ordering::Less => {
                self.heap.pop();
                self.heap.push(Ranked(result));
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Ranked results, best first
    pub fn into_sorted(self) -> Vec<ResultHitlist> {
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|Ranked(r)| r)
            .collect()
    }
}
