//! Seed detection: word scanning and diagonal bookkeeping.

pub mod diagonal;
pub mod word_finder;

pub use diagonal::DiagonalTracker;
pub use word_finder::{ScanMode, ScanReport, SeedOutcome, WordFinder};

/// An exact word match between a query context and the scanned subject
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seed {
    pub context: usize,
    /// First residue of the word in the query context
    pub q_offset: usize,
    /// First residue of the word in the subject
    pub s_offset: usize,
    pub length: usize,
}

impl Seed {
    #[inline]
    pub fn diagonal(&self) -> isize {
        DiagonalTracker::diagonal(self.q_offset, self.s_offset)
    }

    #[inline]
    pub fn s_end(&self) -> usize {
        self.s_offset + self.length
    }
}
