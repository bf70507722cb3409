//! X-drop ungapped extension of a word seed.
//!
//! The seed word is first rescanned for its best-scoring run (maximum
//! subarray), which becomes the anchor. From the anchor the walk goes left,
//! committing a new boundary whenever the running sum beats the best so far
//! and stopping once it falls more than the dropoff below it. The right walk
//! continues from the committed total; its drop bound is the dropoff or the
//! total itself, whichever is smaller, so a walk whose running score would go
//! negative stops immediately.

use crate::seed::Seed;
use crate::utils::matrix::Scorer;

/// Result of extending one seed. Query coordinates are context offsets,
/// subject coordinates are offsets into the scanned buffer; all ranges are
/// end-exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extension {
    pub q_start: usize,
    pub q_end: usize,
    pub s_start: usize,
    pub s_end: usize,
    pub score: i32,
    /// Best-scoring run inside the seed word
    pub q_anchor: usize,
    pub s_anchor: usize,
    pub anchor_len: usize,
    /// Leftmost query position examined by the left walk
    pub q_scan_start: usize,
    /// Subject position (exclusive) where the right walk stopped
    pub s_reach: usize,
}

impl Extension {
    #[inline]
    pub fn len(&self) -> usize {
        self.q_end - self.q_start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.q_end == self.q_start
    }

    #[inline]
    pub fn diagonal(&self) -> isize {
        self.s_start as isize - self.q_start as isize
    }
}

pub struct UngappedExtender<'a, S: Scorer + ?Sized> {
    scorer: &'a S,
}

impl<'a, S: Scorer + ?Sized> UngappedExtender<'a, S> {
    pub fn new(scorer: &'a S) -> Self {
        Self { scorer }
    }

    #[inline]
    fn pair(&self, query: &[u8], subject: &[u8], q: usize, s: usize) -> i32 {
        self.scorer.score(q, query[q], subject[s])
    }

    /// Best-scoring run of the seed word as (start, end, score) relative to
    /// the word. `None` if no run scores above zero.
    fn anchor(&self, query: &[u8], subject: &[u8], seed: &Seed) -> Option<(usize, usize, i32)> {
        let mut sum = 0;
        let mut best = 0;
        let mut run_start = 0;
        let mut best_range = (0, 0);
        for k in 0..seed.length {
            sum += self.pair(query, subject, seed.q_offset + k, seed.s_offset + k);
            if sum > best {
                best = sum;
                best_range = (run_start, k + 1);
            }
            if sum <= 0 {
                sum = 0;
                run_start = k + 1;
            }
        }
        (best > 0).then_some((best_range.0, best_range.1, best))
    }

    /// Extend `seed` along its diagonal. `query` is the whole context and
    /// `subject` the scanned buffer; walks never leave either slice.
    pub fn extend(
        &self,
        query: &[u8],
        subject: &[u8],
        seed: &Seed,
        dropoff: i32,
    ) -> Option<Extension> {
        if seed.q_offset + seed.length > query.len() || seed.s_end() > subject.len() {
            return None;
        }
        let (start, end, core) = self.anchor(query, subject, seed)?;
        let q_anchor = seed.q_offset + start;
        let s_anchor = seed.s_offset + start;
        let anchor_len = end - start;

        // Left walk
        let max_left = q_anchor.min(s_anchor);
        let mut run = 0;
        let mut best_left = 0;
        let mut left_len = 0;
        let mut examined_left = 0;
        for i in 1..=max_left {
            examined_left = i;
            run += self.pair(query, subject, q_anchor - i, s_anchor - i);
            if run > best_left {
                best_left = run;
                left_len = i;
            }
            if best_left - run > dropoff {
                break;
            }
        }

        // Right walk
        let q_anchor_end = q_anchor + anchor_len;
        let s_anchor_end = s_anchor + anchor_len;
        let max_right = (query.len() - q_anchor_end).min(subject.len() - s_anchor_end);
        let mut score = core + best_left;
        let mut run = score;
        let mut right_len = 0;
        let mut examined_right = 0;
        for j in 0..max_right {
            examined_right = j + 1;
            run += self.pair(query, subject, q_anchor_end + j, s_anchor_end + j);
            if run > score {
                score = run;
                right_len = j + 1;
            }
            if score - run > dropoff.min(score) {
                break;
            }
        }

        Some(Extension {
            q_start: q_anchor - left_len,
            q_end: q_anchor_end + right_len,
            s_start: s_anchor - left_len,
            s_end: s_anchor_end + right_len,
            score,
            q_anchor,
            s_anchor,
            anchor_len,
            q_scan_start: q_anchor - examined_left,
            s_reach: s_anchor_end + examined_right,
        })
    }

    /// Sum of pair scores over an ungapped segment
    pub fn segment_score(
        &self,
        query: &[u8],
        subject: &[u8],
        q_start: usize,
        s_start: usize,
        len: usize,
    ) -> i32 {
        (0..len)
            .map(|k| self.pair(query, subject, q_start + k, s_start + k))
            .sum()
    }
}
