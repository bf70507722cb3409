//! Scanning oversized subjects in overlapping windows.
//!
//! Consecutive windows share `overlap` residues. Every HSP found in a window
//! is shifted to whole-subject coordinates before merging. An alignment
//! shorter than the overlap is seen whole by at least one window, so merging
//! only has to remove the truncated and duplicated copies.

use std::ops::Range;

use crate::hsp::Hsp;

/// Windows covering `0..len`; a single window when `len <= max_window`
pub fn plan_windows(len: usize, max_window: usize, overlap: usize) -> Vec<Range<usize>> {
    if len <= max_window || max_window == 0 {
        return vec![0..len];
    }
    let step = max_window.saturating_sub(overlap).max(1);
    let mut windows = Vec::with_capacity(len / step + 1);
    let mut start = 0;
    loop {
        let end = (start + max_window).min(len);
        windows.push(start..end);
        if end == len {
            break;
        }
        start += step;
    }
    windows
}

/// `hsp` touches a region shared with a neighbouring window
pub fn reaches_overlap(hsp: &Hsp, window: &Range<usize>, overlap: usize, subject_len: usize) -> bool {
    let left = window.start > 0 && hsp.s_start < window.start + overlap;
    let right = window.end < subject_len && hsp.s_end + overlap > window.end;
    left || right
}

/// Drop HSPs that cannot meet another window and whose preliminary E-value
/// exceeds `max_evalue`. Returns the number dropped.
pub fn drop_distant(
    windows: &mut [(Range<usize>, Vec<Hsp>)],
    overlap: usize,
    subject_len: usize,
    max_evalue: f64,
) -> usize {
    let mut dropped = 0;
    for (window, hsps) in windows.iter_mut() {
        let before = hsps.len();
        hsps.retain(|h| h.evalue <= max_evalue || reaches_overlap(h, window, overlap, subject_len));
        dropped += before - hsps.len();
    }
    dropped
}

fn same_group(a: &Hsp, b: &Hsp) -> bool {
    a.context == b.context && a.s_frame == b.s_frame
}

/// Two copies of one alignment lie on the same diagonal
fn same_diagonal(a: &Hsp, b: &Hsp) -> bool {
    same_group(a, b) && a.diagonal() == b.diagonal()
}

/// Same diagonal and overlapping (or abutting) on the subject
fn joinable(a: &Hsp, b: &Hsp) -> bool {
    same_diagonal(a, b) && a.s_start <= b.s_end && b.s_start <= a.s_end
}

/// Smallest HSP spanning both; the score is left to the caller
fn span(a: &Hsp, b: &Hsp) -> Hsp {
    let mut joined = if a.score >= b.score { a.clone() } else { b.clone() };
    joined.q_start = a.q_start.min(b.q_start);
    joined.q_end = a.q_end.max(b.q_end);
    joined.s_start = a.s_start.min(b.s_start);
    joined.s_end = a.s_end.max(b.s_end);
    joined
}

/// Merge per-window HSPs (already in subject coordinates) into one list.
///
/// Only HSPs from different windows are compared; HSPs found by one window
/// are exactly what a whole-subject scan finds there. An incoming HSP
/// contained in a kept HSP on its diagonal scoring at least as much is
/// discarded, and replaces a kept HSP it contains and outscores. Two HSPs on
/// one diagonal that intersect are replaced by their span, rescored by
/// `rescore`; when rescoring rejects the span the better of the two stays.
/// Returns the merged HSPs and the number of window HSPs folded away.
pub fn merge_windows<F>(windows: Vec<(Range<usize>, Vec<Hsp>)>, mut rescore: F) -> (Vec<Hsp>, usize)
where
    F: FnMut(Hsp) -> Option<Hsp>,
{
    // Kept HSPs with the window they were last taken from
    let mut merged: Vec<(usize, Hsp)> = Vec::new();
    let mut folded = 0;

    for (index, (window, incoming)) in windows.into_iter().enumerate() {
        // Only HSPs ending inside this window can meet its HSPs
        let reach_from = window.start;
        for hsp in incoming {
            let mut absorbed = false;
            for (origin, kept) in merged
                .iter_mut()
                .filter(|entry| entry.0 != index && entry.1.s_end > reach_from)
            {
                if !same_diagonal(kept, &hsp) {
                    continue;
                }
                if kept.contains(&hsp) && kept.score >= hsp.score {
                    absorbed = true;
                } else if hsp.contains(kept) && hsp.score >= kept.score {
                    *kept = hsp.clone();
                    *origin = index;
                    absorbed = true;
                } else if joinable(kept, &hsp) {
                    let joined = span(kept, &hsp);
                    match rescore(joined) {
                        Some(j) => *kept = j,
                        None if hsp.score > kept.score => *kept = hsp.clone(),
                        None => {}
                    }
                    *origin = index;
                    absorbed = true;
                }
                if absorbed {
                    break;
                }
            }
            if absorbed {
                folded += 1;
            } else {
                merged.push((index, hsp));
            }
        }
    }
    (merged.into_iter().map(|(_, hsp)| hsp).collect(), folded)
}
