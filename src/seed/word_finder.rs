//! Subject scanning against the word index.
//!
//! The word under the scan window is updated incrementally (shift, OR in the
//! next symbol, mask). Every query occurrence of the word is a candidate
//! seed; the diagonal tracker drops seeds inside already-extended regions
//! and, in two-hit mode, seeds without a close predecessor on their diagonal.
//! Surviving seeds are handed to a caller-supplied extension step whose
//! reported reach becomes the diagonal's new level.

use super::{DiagonalTracker, Seed};
use crate::lookup::LookupIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    /// Stop at the first stored extension
    Exploratory,
    /// Scan the whole subject
    Exhaustive,
}

/// What the extension step did with a seed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedOutcome {
    /// Subject position (exclusive) up to which the diagonal was examined
    pub reach: usize,
    /// Whether an HSP was kept
    pub stored: bool,
}

impl SeedOutcome {
    /// Nothing beyond the seed word was examined and nothing kept
    pub fn rejected(seed: &Seed) -> Self {
        Self {
            reach: seed.s_end(),
            stored: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Word matches found in the subject
    pub seeds: u64,
    /// Seeds passed to the extension step
    pub extensions: u64,
    pub stored: u64,
    pub stopped_early: bool,
}

pub struct WordFinder<'a, L: LookupIndex + ?Sized> {
    lookup: &'a L,
    /// 0 selects one-hit seeding
    two_hit_window: usize,
}

impl<'a, L: LookupIndex + ?Sized> WordFinder<'a, L> {
    pub fn new(lookup: &'a L, two_hit_window: usize) -> Self {
        Self {
            lookup,
            two_hit_window,
        }
    }

    pub fn word_width(&self) -> usize {
        self.lookup.encoding().word_width
    }

    /// Scan `subject` and call `extend` for every eligible seed. The tracker
    /// is expected to have been reset for this subject.
    pub fn scan<F>(
        &self,
        subject: &[u8],
        tracker: &mut DiagonalTracker,
        mode: ScanMode,
        mut extend: F,
    ) -> ScanReport
    where
        F: FnMut(Seed) -> SeedOutcome,
    {
        let encoding = self.lookup.encoding();
        let width = encoding.word_width;
        let mut report = ScanReport::default();
        if subject.len() < width {
            return report;
        }

        let mut word = 0u64;
        let mut valid = 0usize;
        for (pos, &code) in subject.iter().enumerate() {
            if !encoding.is_word_symbol(code) {
                word = 0;
                valid = 0;
                continue;
            }
            word = encoding.push(word, code);
            valid += 1;
            if valid < width {
                continue;
            }

            let s_offset = pos + 1 - width;
            for hit in self.lookup.hits_for_word(word) {
                report.seeds += 1;
                let seed = Seed {
                    context: hit.context as usize,
                    q_offset: hit.query_offset as usize,
                    s_offset,
                    length: width,
                };
                let diagonal = seed.diagonal();
                let s_end = seed.s_end();

                if s_end <= tracker.recorded_level(seed.context, diagonal) {
                    continue;
                }
                if self.two_hit_window > 0
                    && !tracker.should_trigger(
                        seed.context,
                        diagonal,
                        s_end,
                        self.two_hit_window,
                        width,
                    )
                {
                    continue;
                }

                report.extensions += 1;
                let outcome = extend(seed);
                tracker.advance(seed.context, diagonal, outcome.reach.max(s_end));

                if outcome.stored {
                    report.stored += 1;
                    if mode == ScanMode::Exploratory {
                        report.stopped_early = true;
                        return report;
                    }
                }
            }
        }
        report
    }
}
