//! High-scoring segment pairs and their per-subject storage.

pub mod store;

pub use store::{HspStore, StoreOutcome};

use std::cmp::Ordering;

use crate::extension::{EditOp, Extension};

/// Which linking model a finalized HSP was judged under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkOrdering {
    /// Not linked; the individual E-value applies
    #[default]
    None,
    SmallGap,
    LargeGap,
    UnevenGap,
}

/// Linkage metadata of one HSP.
///
/// `prev`/`next` are indices into the same HSP array; they are only valid
/// until the array is reordered (see [`reorder`]). `evalue` stays `None`
/// until linking has finalized the HSP's chain.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LinkInfo {
    pub ordering: LinkOrdering,
    /// Segments in the chain this HSP belongs to
    pub num: usize,
    /// Sum of normalized scores over the chain
    pub xsum: f64,
    pub evalue: Option<f64>,
    pub prev: Option<usize>,
    pub next: Option<usize>,
    pub head: bool,
    /// Index of the chain head
    pub chain: Option<usize>,
}

impl LinkInfo {
    pub fn is_linked(&self) -> bool {
        self.num > 1
    }
}

/// One ungapped or gapped segment pair. Ranges are half-open.
#[derive(Debug, Clone, PartialEq)]
pub struct Hsp {
    pub context: usize,
    pub q_start: usize,
    pub q_end: usize,
    pub s_start: usize,
    pub s_end: usize,
    /// Strand (+1/-1) of the query context
    pub q_frame: i8,
    pub s_frame: i8,
    pub score: i32,
    pub bit_score: f64,
    /// E-value of this HSP alone
    pub evalue: f64,
    pub link: LinkInfo,
    /// Set once the gapped aligner has refined the HSP
    pub edits: Option<Vec<EditOp>>,
}

impl Hsp {
    pub fn from_extension(context: usize, q_frame: i8, ext: &Extension) -> Self {
        Self {
            context,
            q_start: ext.q_start,
            q_end: ext.q_end,
            s_start: ext.s_start,
            s_end: ext.s_end,
            q_frame,
            s_frame: 1,
            score: ext.score,
            bit_score: 0.0,
            evalue: f64::MAX,
            link: LinkInfo::default(),
            edits: None,
        }
    }

    #[inline]
    pub fn diagonal(&self) -> isize {
        self.s_start as isize - self.q_start as isize
    }

    #[inline]
    pub fn q_len(&self) -> usize {
        self.q_end - self.q_start
    }

    #[inline]
    pub fn s_len(&self) -> usize {
        self.s_end - self.s_start
    }

    /// Linked E-value once finalized, the individual one otherwise
    #[inline]
    pub fn effective_evalue(&self) -> f64 {
        self.link.evalue.unwrap_or(self.evalue)
    }

    /// `other` lies inside this HSP on both sequences
    pub fn contains(&self, other: &Hsp) -> bool {
        self.context == other.context
            && self.q_start <= other.q_start
            && other.q_end <= self.q_end
            && self.s_start <= other.s_start
            && other.s_end <= self.s_end
    }

    /// Shift subject coordinates by `offset` (window to whole-subject)
    pub fn shift_subject(&mut self, offset: usize) {
        self.s_start += offset;
        self.s_end += offset;
    }
}

/// E-values below this compare equal
const EVALUE_EPSILON: f64 = 1.0e-180;

/// E-value comparison that treats two vanishing values as equal
#[inline]
pub fn evalue_cmp(a: f64, b: f64) -> Ordering {
    if a < EVALUE_EPSILON && b < EVALUE_EPSILON {
        Ordering::Equal
    } else {
        a.partial_cmp(&b).unwrap_or(Ordering::Equal)
    }
}

/// Score DESC, s_start ASC, s_end DESC, q_start ASC, q_end DESC.
pub fn score_compare_hsps(a: &Hsp, b: &Hsp) -> Ordering {
    b.score
        .cmp(&a.score)
        .then(a.s_start.cmp(&b.s_start))
        .then(b.s_end.cmp(&a.s_end))
        .then(a.q_start.cmp(&b.q_start))
        .then(b.q_end.cmp(&a.q_end))
}

/// Effective E-value ASC, then [`score_compare_hsps`]; context breaks the
/// last tie so the order is total.
pub fn evalue_compare_hsps(a: &Hsp, b: &Hsp) -> Ordering {
    evalue_cmp(a.effective_evalue(), b.effective_evalue())
        .then_with(|| score_compare_hsps(a, b))
        .then(a.context.cmp(&b.context))
}

/// Context, s_start, q_start ascending; longest first on ties.
pub fn position_compare_hsps(a: &Hsp, b: &Hsp) -> Ordering {
    a.context
        .cmp(&b.context)
        .then(a.s_start.cmp(&b.s_start))
        .then(a.q_start.cmp(&b.q_start))
        .then(b.s_end.cmp(&a.s_end))
        .then(b.q_end.cmp(&a.q_end))
        .then(b.score.cmp(&a.score))
}

/// Sort `hsps` by `cmp` and rewrite chain indices to the new positions.
pub fn reorder<F>(hsps: &mut Vec<Hsp>, mut cmp: F)
where
    F: FnMut(&Hsp, &Hsp) -> Ordering,
{
    let mut order: Vec<usize> = (0..hsps.len()).collect();
    order.sort_by(|&i, &j| cmp(&hsps[i], &hsps[j]));

    let mut new_pos = vec![0usize; hsps.len()];
    for (pos, &old) in order.iter().enumerate() {
        new_pos[old] = pos;
    }

    let mut slots: Vec<Option<Hsp>> = std::mem::take(hsps).into_iter().map(Some).collect();
    hsps.extend(order.iter().filter_map(|&old| slots[old].take()));
    for hsp in hsps.iter_mut() {
        let link = &mut hsp.link;
        link.prev = link.prev.map(|i| new_pos[i]);
        link.next = link.next.map(|i| new_pos[i]);
        link.chain = link.chain.map(|i| new_pos[i]);
    }
}

/// Keep the HSPs for which `keep(index, hsp)` holds. Chain indices are
/// rewritten; links to removed HSPs become `None`.
pub fn retain_hsps<F>(hsps: &mut Vec<Hsp>, mut keep: F)
where
    F: FnMut(usize, &Hsp) -> bool,
{
    let mut new_pos: Vec<Option<usize>> = Vec::with_capacity(hsps.len());
    let mut next = 0;
    for (i, hsp) in hsps.iter().enumerate() {
        if keep(i, hsp) {
            new_pos.push(Some(next));
            next += 1;
        } else {
            new_pos.push(None);
        }
    }
    if next == hsps.len() {
        return;
    }
    let mut idx = 0;
    hsps.retain(|_| {
        let kept = new_pos[idx].is_some();
        idx += 1;
        kept
    });
    for hsp in hsps.iter_mut() {
        let link = &mut hsp.link;
        link.prev = link.prev.and_then(|i| new_pos[i]);
        link.next = link.next.and_then(|i| new_pos[i]);
        link.chain = link.chain.and_then(|i| new_pos[i]);
    }
}

/// Indices of the chain starting at `head`, following `next`
pub fn chain_members(hsps: &[Hsp], head: usize) -> Vec<usize> {
    let mut members = vec![head];
    let mut cur = hsps[head].link.next;
    while let Some(i) = cur {
        if members.len() >= hsps.len() {
            break;
        }
        members.push(i);
        cur = hsps[i].link.next;
    }
    members
}
