//! Hand-out of contiguous subject ranges to workers.

use std::ops::Range;
use std::sync::{Mutex, PoisonError};

/// Mutex-guarded cursor over `0..end`. Every call to
/// [`next_chunk`](Self::next_chunk) advances the cursor once, so the chunks
/// handed out across all callers partition the range.
#[derive(Debug)]
pub struct ChunkCursor {
    next: Mutex<usize>,
    end: usize,
    chunk_size: usize,
}

impl ChunkCursor {
    pub fn new(end: usize, chunk_size: usize) -> Self {
        Self {
            next: Mutex::new(0),
            end,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn next_chunk(&self) -> Option<Range<usize>> {
        let mut next = self.next.lock().unwrap_or_else(PoisonError::into_inner);
        if *next >= self.end {
            return None;
        }
        let start = *next;
        let stop = (start + self.chunk_size).min(self.end);
        *next = stop;
        Some(start..stop)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// One past the last subject
    pub fn end(&self) -> usize {
        self.end
    }
}
