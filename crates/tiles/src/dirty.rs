//! Invalidation bookkeeping between record cycles.
//!
//! `add` collects what the document dirtied since the last publish; `rebuild` collects what
//! was re-recorded while regenerating tiles. Both are handed out together when a cycle
//! publishes and reset at that point, never earlier.

use model::{IntRect, Region};

#[derive(Debug, Clone, Default)]
pub struct InvalidationAccumulator {
    add: Region,
    rebuild: Region,
}

impl InvalidationAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false for empty rects and rects already pending.
    pub fn invalidate(&mut self, rect: IntRect) -> bool {
        self.add.union_rect(rect)
    }

    pub fn mark_rebuilt(&mut self, rect: IntRect) {
        self.rebuild.union_rect(rect);
    }

    pub fn has_pending(&self) -> bool {
        !self.add.is_empty()
    }

    pub fn pending(&self) -> &Region {
        &self.add
    }

    pub fn pending_mut(&mut self) -> &mut Region {
        &mut self.add
    }

    pub fn rebuilt(&self) -> &Region {
        &self.rebuild
    }

    /// Union of both regions; leaves the accumulator empty.
    pub fn drain(&mut self) -> Region {
        let mut published = std::mem::take(&mut self.add);
        published.union(&self.rebuild);
        self.rebuild.clear();
        published
    }

    pub fn clear(&mut self) {
        self.add.clear();
        self.rebuild.clear();
    }
}
