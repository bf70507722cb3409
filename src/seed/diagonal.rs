//! Per-diagonal extension bookkeeping.
//!
//! For every query context the tracker keeps, per diagonal, the subject
//! position up to which the diagonal has already been extended (its level)
//! and, for two-hit seeding, the position of the last unconsumed hit. A seed
//! ending at or before the level is skipped in O(1), which keeps scanning
//! near-linear in subject length.
//!
//! Diagonals are folded into a power-of-two table. The table covers the
//! longest context plus the two-hit window, so two diagonals sharing a slot
//! are never live at the same subject position. Positions are stored shifted
//! by a per-scan base; `reset()` only moves the base past everything written
//! during the previous scan, so clearing costs nothing per subject.

#[derive(Debug, Clone, Copy, Default)]
struct DiagEntry {
    level: u64,
    last_hit: u64,
}

/// Stored values never get near this; once the base passes it the tables are
/// cleared for real.
const REBASE_LIMIT: u64 = u64::MAX / 4;

#[derive(Debug, Clone)]
pub struct DiagonalTracker {
    tables: Vec<Vec<DiagEntry>>,
    mask: usize,
    base: u64,
    high_water: u64,
}

impl DiagonalTracker {
    pub fn new(num_contexts: usize, max_query_len: usize, window: usize) -> Self {
        let size = (max_query_len + window + 1).next_power_of_two();
        Self {
            tables: vec![vec![DiagEntry::default(); size]; num_contexts],
            mask: size - 1,
            base: 1,
            high_water: 1,
        }
    }

    #[inline]
    pub fn diagonal(q_offset: usize, s_offset: usize) -> isize {
        s_offset as isize - q_offset as isize
    }

    /// Number of slots per context
    pub fn table_size(&self) -> usize {
        self.mask + 1
    }

    #[inline]
    fn entry(&self, context: usize, diagonal: isize) -> &DiagEntry {
        &self.tables[context][diagonal as usize & self.mask]
    }

    #[inline]
    fn entry_mut(&mut self, context: usize, diagonal: isize) -> &mut DiagEntry {
        &mut self.tables[context][diagonal as usize & self.mask]
    }

    #[inline]
    fn stored(&mut self, position: usize) -> u64 {
        let value = position as u64 + self.base;
        self.high_water = self.high_water.max(value);
        value
    }

    /// Forget all levels and hits; call before scanning a new subject.
    pub fn reset(&mut self) {
        let next = self.high_water + 1;
        if next >= REBASE_LIMIT {
            for table in &mut self.tables {
                table.fill(DiagEntry::default());
            }
            self.base = 1;
        } else {
            self.base = next;
        }
        self.high_water = self.base;
    }

    /// Subject position (exclusive) up to which `diagonal` has been extended;
    /// 0 if it has not been extended in this scan.
    #[inline]
    pub fn recorded_level(&self, context: usize, diagonal: isize) -> usize {
        let level = self.entry(context, diagonal).level;
        if level < self.base {
            0
        } else {
            (level - self.base) as usize
        }
    }

    /// Raise the level of `diagonal`. Levels never move backwards; a lower
    /// value is ignored. The last hit is moved along so a two-hit trigger
    /// needs a fresh hit beyond the extended region.
    #[inline]
    pub fn advance(&mut self, context: usize, diagonal: isize, new_level: usize) {
        let stored = self.stored(new_level);
        let base = self.base;
        let entry = self.entry_mut(context, diagonal);
        if entry.level < base {
            entry.level = stored;
        } else {
            entry.level = entry.level.max(stored);
        }
        entry.last_hit = entry.level;
    }

    #[inline]
    pub fn last_hit(&self, context: usize, diagonal: isize) -> Option<usize> {
        let last = self.entry(context, diagonal).last_hit;
        (last >= self.base).then(|| (last - self.base) as usize)
    }

    /// Two-hit test for a hit ending at `position`. Returns true when the
    /// previous hit on the diagonal lies at least `min_separation` and less
    /// than `window` positions back. Hits closer than `min_separation`
    /// overlap the previous word and are ignored; any other hit becomes the
    /// new last hit.
    #[inline]
    pub fn should_trigger(
        &mut self,
        context: usize,
        diagonal: isize,
        position: usize,
        window: usize,
        min_separation: usize,
    ) -> bool {
        if let Some(last) = self.last_hit(context, diagonal) {
            let distance = position.saturating_sub(last);
            if distance < min_separation {
                return false;
            }
            if distance < window {
                let stored = self.stored(position);
                self.entry_mut(context, diagonal).last_hit = stored;
                return true;
            }
        }
        let stored = self.stored(position);
        self.entry_mut(context, diagonal).last_hit = stored;
        false
    }
}
