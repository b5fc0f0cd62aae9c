//! Repaint batching for map edits.
//!
//! Setters never rebuild geometry directly; they record what went stale
//! here and a rendering system drains the batch once per frame. Sets keep
//! a burst of edits to the same chunk down to a single rebuild.

use std::collections::HashSet;
use std::mem;

/// Accumulates stale chunks, recolored cells, and displaced units
/// between rendering flushes.
#[derive(Debug, Default)]
pub struct DirtyTracker {
    chunks: HashSet<usize>,
    recolored: HashSet<usize>,
    stale_units: HashSet<usize>,
}

/// One drained batch of repaint work.
#[derive(Debug, Default)]
pub struct DirtyBatch {
    /// Chunks whose geometry must be rebuilt.
    pub chunks: HashSet<usize>,
    /// Cells whose terrain color changed; geometry is unaffected but the
    /// blend reaches into adjacent chunks.
    pub recolored: HashSet<usize>,
    /// Cells whose occupant needs re-anchoring after a height change.
    pub stale_units: HashSet<usize>,
}

impl DirtyBatch {
    /// True when the batch carries no work.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty() && self.recolored.is_empty() && self.stale_units.is_empty()
    }
}

impl DirtyTracker {
    /// Marks a chunk's geometry stale.
    pub fn mark_chunk(&mut self, chunk: usize) {
        self.chunks.insert(chunk);
    }

    /// Marks a cell as recolored.
    pub fn mark_recolored(&mut self, cell: usize) {
        self.recolored.insert(cell);
    }

    /// Marks a cell whose occupant must be re-anchored.
    pub fn mark_unit_stale(&mut self, cell: usize) {
        self.stale_units.insert(cell);
    }

    /// True when nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty() && self.recolored.is_empty() && self.stale_units.is_empty()
    }

    /// Drains all pending work, leaving the tracker empty.
    pub fn take(&mut self) -> DirtyBatch {
        DirtyBatch {
            chunks: mem::take(&mut self.chunks),
            recolored: mem::take(&mut self.recolored),
            stale_units: mem::take(&mut self.stale_units),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_marks_deduplicate() {
        let mut t = DirtyTracker::default();
        t.mark_chunk(3);
        t.mark_chunk(3);
        t.mark_chunk(4);
        let batch = t.take();
        assert_eq!(batch.chunks.len(), 2);
    }

    #[test]
    fn take_leaves_tracker_empty() {
        let mut t = DirtyTracker::default();
        t.mark_chunk(0);
        t.mark_recolored(9);
        t.mark_unit_stale(9);
        assert!(!t.is_empty());
        let batch = t.take();
        assert!(!batch.is_empty());
        assert!(t.is_empty());
        assert!(t.take().is_empty());
    }

    #[test]
    fn categories_are_independent() {
        let mut t = DirtyTracker::default();
        t.mark_recolored(5);
        let batch = t.take();
        assert!(batch.chunks.is_empty());
        assert_eq!(batch.recolored.len(), 1);
        assert!(batch.stale_units.is_empty());
    }
}
