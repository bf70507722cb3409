//! Boundary to a gapped aligner.
//!
//! Candidates whose (linked) score reaches the gap trigger are offered to a
//! [`GappedAligner`] together with the query/subject ranges they cover. The
//! search core ships no dynamic-programming aligner of its own;
//! [`NoGappedAligner`] reports itself unavailable and the ungapped result is
//! kept.

use std::ops::Range;

use crate::utils::matrix::Scorer;

/// One column of an alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOp {
    /// Identical residues
    Match,
    Mismatch,
    /// Residue in the query, gap in the subject
    Ins,
    /// Residue in the subject, gap in the query
    Del,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EditSummary {
    pub matches: usize,
    pub mismatches: usize,
    pub gap_opens: usize,
    pub alignment_len: usize,
}

impl EditSummary {
    pub fn identity(&self) -> f64 {
        if self.alignment_len == 0 {
            0.0
        } else {
            100.0 * self.matches as f64 / self.alignment_len as f64
        }
    }
}

pub fn summarize(edits: &[EditOp]) -> EditSummary {
    let mut summary = EditSummary {
        alignment_len: edits.len(),
        ..Default::default()
    };
    let mut prev = None;
    for &op in edits {
        match op {
            EditOp::Match => summary.matches += 1,
            EditOp::Mismatch => summary.mismatches += 1,
            EditOp::Ins | EditOp::Del => {
                if prev != Some(op) {
                    summary.gap_opens += 1;
                }
            }
        }
        prev = Some(op);
    }
    summary
}

/// Edit script of an ungapped segment
pub fn ungapped_edits(query: &[u8], subject: &[u8]) -> Vec<EditOp> {
    query
        .iter()
        .zip(subject)
        .map(|(q, s)| if q == s { EditOp::Match } else { EditOp::Mismatch })
        .collect()
}

/// Refined alignment returned by a gapped aligner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GappedAlignment {
    pub score: i32,
    pub q_range: Range<usize>,
    pub s_range: Range<usize>,
    pub edits: Vec<EditOp>,
}

pub trait GappedAligner: Sync {
    /// Align `query[q_range]` against `subject[s_range]`, allowing the
    /// alignment to grow while the score stays within `xdrop` of the best.
    /// Returned ranges are in the coordinates of `query` and `subject`.
    fn refine<S: Scorer + ?Sized>(
        &self,
        query: &[u8],
        subject: &[u8],
        q_range: Range<usize>,
        s_range: Range<usize>,
        xdrop: i32,
        scorer: &S,
    ) -> Option<GappedAlignment>;

    fn is_available(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoGappedAligner;

impl GappedAligner for NoGappedAligner {
    fn refine<S: Scorer + ?Sized>(
        &self,
        _query: &[u8],
        _subject: &[u8],
        _q_range: Range<usize>,
        _s_range: Range<usize>,
        _xdrop: i32,
        _scorer: &S,
    ) -> Option<GappedAlignment> {
        None
    }

    fn is_available(&self) -> bool {
        false
    }
}
