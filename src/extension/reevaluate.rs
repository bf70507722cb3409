//! Rescoring of ungapped HSPs over the true subject residues.
//!
//! Subjects are scanned with ambiguity codes collapsed to concrete bases, so
//! a preliminary score may overstate the alignment. Rescoring walks the HSP
//! again with the real residues and keeps the best subsegment. A prefix that
//! never reached the cutoff before the running sum went negative is dropped
//! entirely; if the best subsegment ends below the cutoff the HSP is
//! rejected.

use crate::utils::matrix::Scorer;

/// Rescored ungapped segment; offsets are in the same coordinates as the input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rescored {
    pub q_offset: usize,
    pub s_offset: usize,
    pub len: usize,
    pub score: i32,
}

pub fn rescore_ungapped<S: Scorer + ?Sized>(
    scorer: &S,
    query: &[u8],
    subject: &[u8],
    q_offset: usize,
    s_offset: usize,
    len: usize,
    cutoff: i32,
) -> Option<Rescored> {
    if len == 0 || q_offset + len > query.len() || s_offset + len > subject.len() {
        return None;
    }

    let mut score = 0;
    let mut sum = 0;
    let mut best_start = 0;
    let mut best_end = 0;
    let mut current_start = 0;

    for idx in 0..len {
        let q = q_offset + idx;
        sum += scorer.score(q, query[q], subject[s_offset + idx]);
        if sum < 0 {
            sum = 0;
            current_start = idx + 1;
            if score < cutoff {
                best_start = idx + 1;
                best_end = idx + 1;
                score = 0;
            }
        } else if sum > score {
            score = sum;
            best_end = idx + 1;
            best_start = current_start;
        }
    }

    if score < cutoff || best_end == best_start {
        return None;
    }
    Some(Rescored {
        q_offset: q_offset + best_start,
        s_offset: s_offset + best_start,
        len: best_end - best_start,
        score,
    })
}
