//! Search-wide counters.
//!
//! Workers bump relaxed atomics as subjects pass through the pipeline; the
//! coordinator takes one snapshot at the end of the search.

use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use log::debug;

use crate::seed::ScanReport;

/// Counters shared by all workers of one search
#[derive(Debug, Default)]
pub struct SearchCounters {
    pub subjects_scanned: AtomicUsize,
    // Shorter than the word width
    pub subjects_skipped: AtomicUsize,
    pub subjects_split: AtomicUsize,
    // No seed survived the exploratory pass
    pub subjects_prescreened_out: AtomicUsize,
    pub seeds: AtomicUsize,
    pub extensions: AtomicUsize,
    pub hsps_stored: AtomicUsize,
    pub hsps_merged: AtomicUsize,
    pub hsps_rescore_rejected: AtomicUsize,
    pub hsps_linked: AtomicUsize,
    pub chains: AtomicUsize,
    pub hsps_refined: AtomicUsize,
    pub hsps_reported: AtomicUsize,
}

impl SearchCounters {
    #[inline]
    pub fn bump(counter: &AtomicUsize, n: usize) {
        if n > 0 {
            counter.fetch_add(n, AtomicOrdering::Relaxed);
        }
    }

    pub fn add_scan(&self, report: &ScanReport) {
        Self::bump(&self.seeds, report.seeds as usize);
        Self::bump(&self.extensions, report.extensions as usize);
        Self::bump(&self.hsps_stored, report.stored as usize);
    }

    pub fn snapshot(&self) -> SearchStats {
        let get = |c: &AtomicUsize| c.load(AtomicOrdering::Relaxed);
        SearchStats {
            subjects_scanned: get(&self.subjects_scanned),
            subjects_skipped: get(&self.subjects_skipped),
            subjects_split: get(&self.subjects_split),
            subjects_prescreened_out: get(&self.subjects_prescreened_out),
            seeds: get(&self.seeds),
            extensions: get(&self.extensions),
            hsps_stored: get(&self.hsps_stored),
            hsps_merged: get(&self.hsps_merged),
            hsps_rescore_rejected: get(&self.hsps_rescore_rejected),
            hsps_linked: get(&self.hsps_linked),
            chains: get(&self.chains),
            hsps_refined: get(&self.hsps_refined),
            hsps_reported: get(&self.hsps_reported),
        }
    }
}

/// Plain copy of [`SearchCounters`] returned with the search outcome
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub subjects_scanned: usize,
    pub subjects_skipped: usize,
    pub subjects_split: usize,
    pub subjects_prescreened_out: usize,
    pub seeds: usize,
    pub extensions: usize,
    pub hsps_stored: usize,
    /// Window HSPs folded into another during split merging
    pub hsps_merged: usize,
    pub hsps_rescore_rejected: usize,
    pub hsps_linked: usize,
    pub chains: usize,
    pub hsps_refined: usize,
    pub hsps_reported: usize,
}

impl SearchStats {
    pub fn log_summary(&self) {
        debug!("=== search counters ===");
        debug!(
            "subjects: {} scanned, {} skipped, {} split, {} prescreened out",
            self.subjects_scanned, self.subjects_skipped, self.subjects_split, self.subjects_prescreened_out
        );
        debug!(
            "seeds: {}, extensions: {}, HSPs stored: {}",
            self.seeds, self.extensions, self.hsps_stored
        );
        debug!(
            "merged: {}, rescore rejected: {}, linked: {} in {} chains, refined: {}",
            self.hsps_merged, self.hsps_rescore_rejected, self.hsps_linked, self.chains, self.hsps_refined
        );
        debug!("HSPs reported: {}", self.hsps_reported);
    }
}
