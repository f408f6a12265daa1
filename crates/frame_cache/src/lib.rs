//! Double-buffered navigation cache.
//!
//! The content thread builds a [`FrameCacheSnapshot`] into a private temp slot and promotes it
//! into the shared slot in one short critical section. The UI thread only ever clones the
//! `Arc` out of the shared slot, so it sees either the old snapshot or the new one.

use std::sync::Arc;

use engine::Generation;
use model::{IntRect, NodeId};
use parking_lot::Mutex;
use render_protocol::{DocumentHost, Picture};

mod snapshot;

pub use snapshot::{FrameCacheSnapshot, NavTree};

/// Cursor reattachment tolerances, in content pixels.
pub const CURSOR_CENTER_SLOP: i32 = 2;
pub const CURSOR_EDGE_SLOP: i32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorBounds {
    pub node: Option<NodeId>,
    pub bounds: IntRect,
}

#[derive(Debug, Default)]
struct PublishedSlot {
    current: Option<Arc<FrameCacheSnapshot>>,
    updated: bool,
}

/// The part of the frame cache visible to the UI thread.
#[derive(Debug, Default)]
pub struct FrameCacheShared {
    slot: Mutex<PublishedSlot>,
    cursor_bounds: Mutex<Option<CursorBounds>>,
}

impl FrameCacheShared {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Arc<FrameCacheSnapshot>> {
        self.slot.lock().current.clone()
    }

    /// Returns the current snapshot if one was published since the last call.
    pub fn take_updated(&self) -> Option<Arc<FrameCacheSnapshot>> {
        let mut slot = self.slot.lock();
        if !slot.updated {
            return None;
        }
        slot.updated = false;
        slot.current.clone()
    }

    pub fn set_cursor_bounds(&self, cursor: Option<CursorBounds>) {
        *self.cursor_bounds.lock() = cursor;
    }

    pub fn cursor_bounds(&self) -> Option<CursorBounds> {
        *self.cursor_bounds.lock()
    }

    fn publish(&self, snapshot: FrameCacheSnapshot) {
        let previous = {
            let mut slot = self.slot.lock();
            slot.updated = true;
            slot.current.replace(Arc::new(snapshot))
        };
        drop(previous);
    }

    fn clear(&self) {
        let previous = {
            let mut slot = self.slot.lock();
            slot.updated = true;
            slot.current.take()
        };
        drop(previous);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrepareParams {
    pub visible_rect: IntRect,
    pub text_generation: Generation,
}

/// Remembers what the last published cache was built from.
#[derive(Debug, Clone)]
struct StalenessTracker {
    last_focused: Option<NodeId>,
    last_focused_bounds: IntRect,
    dom_version_sum: u64,
    check_dom_versions: bool,
    find_is_up: bool,
}

impl Default for StalenessTracker {
    fn default() -> Self {
        Self {
            last_focused: None,
            last_focused_bounds: IntRect::EMPTY,
            dom_version_sum: 0,
            check_dom_versions: true,
            find_is_up: false,
        }
    }
}

impl StalenessTracker {
    fn refresh(&mut self, host: &dyn DocumentHost) -> bool {
        let focused = host.focused_node();
        let focused_bounds = focused
            .and_then(|node| host.node_bounds(node))
            .unwrap_or(IntRect::EMPTY);
        // Per-frame versions only increase, so comparing the sum is enough.
        let dom_version_sum = if self.check_dom_versions {
            host.frame_dom_versions()
                .iter()
                .fold(0u64, |sum, (_, version)| sum.wrapping_add(*version))
        } else {
            0
        };
        let stale = self.last_focused != focused
            || self.last_focused_bounds != focused_bounds
            || self.find_is_up
            || (self.check_dom_versions && dom_version_sum != self.dom_version_sum);
        tracing::trace!(
            ?focused,
            ?focused_bounds,
            dom_version_sum,
            previous_sum = self.dom_version_sum,
            stale,
            "frame cache staleness"
        );
        self.last_focused = focused;
        self.last_focused_bounds = focused_bounds;
        self.dom_version_sum = dom_version_sum;
        stale
    }
}

/// Content-thread side of the frame cache.
#[derive(Debug)]
pub struct FrameCacheManager {
    shared: Arc<FrameCacheShared>,
    temp: Option<FrameCacheSnapshot>,
    out_of_date: bool,
    staleness: StalenessTracker,
}

impl FrameCacheManager {
    pub fn new(shared: Arc<FrameCacheShared>) -> Self {
        Self {
            shared,
            temp: None,
            out_of_date: true,
            staleness: StalenessTracker::default(),
        }
    }

    pub fn shared(&self) -> &Arc<FrameCacheShared> {
        &self.shared
    }

    pub fn is_out_of_date(&self) -> bool {
        self.out_of_date
    }

    pub fn mark_out_of_date(&mut self) {
        self.out_of_date = true;
    }

    pub fn has_prepared(&self) -> bool {
        self.temp.is_some()
    }

    pub fn set_find_is_up(&mut self, find_is_up: bool) {
        self.staleness.find_is_up = find_is_up;
    }

    /// Disabling the summed DOM-version check makes the next staleness test depend on focus
    /// and the find overlay alone.
    pub fn set_dom_version_check(&mut self, enabled: bool) {
        self.staleness.check_dom_versions = enabled;
    }

    /// Called after new content was recorded. Marks the cache out of date when focus, focus
    /// bounds, the find overlay or the DOM versions say the published cache no longer
    /// matches the document.
    pub fn note_content_recorded(&mut self, host: &dyn DocumentHost) -> bool {
        let stale = self.staleness.refresh(host);
        if stale {
            self.out_of_date = true;
        }
        stale
    }

    /// Builds a new snapshot into the temp slot. Returns false, doing nothing, when the
    /// published cache is still up to date.
    pub fn prepare_frame_cache(
        &mut self,
        host: &dyn DocumentHost,
        params: PrepareParams,
        record: impl FnOnce() -> Picture,
    ) -> bool {
        if !self.out_of_date {
            tracing::trace!("frame cache up to date, skipping prepare");
            return false;
        }
        self.out_of_date = false;

        let mut nodes = Vec::new();
        host.visit_interactive_nodes(&mut |node| nodes.push(node));
        let mut snapshot = FrameCacheSnapshot {
            nav: NavTree::from_nodes(nodes),
            cursor: None,
            focus: host.focused_node(),
            visible_rect: params.visible_rect,
            text_generation: params.text_generation,
            picture: record(),
        };

        if let Some(cursor) = self.shared.cursor_bounds()
            && let Some(candidate) = snapshot.nav.find_at(cursor.bounds)
        {
            if cursor_still_matches(cursor.bounds, candidate.bounds) {
                snapshot.cursor = Some(candidate.node);
            } else {
                tracing::trace!(
                    old = ?cursor.bounds,
                    new = ?candidate.bounds,
                    "cursor node moved too far, dropping cursor"
                );
            }
        }

        tracing::debug!(
            nodes = snapshot.nav.len(),
            cursor = ?snapshot.cursor,
            "frame cache prepared"
        );
        self.temp = Some(snapshot);
        true
    }

    /// Promotes the temp slot when `new_cache` is set. No redraw is requested: the cache is
    /// current but focus may not be yet.
    pub fn release_frame_cache(&mut self, new_cache: bool) {
        if !new_cache {
            return;
        }
        let Some(snapshot) = self.temp.take() else {
            debug_assert!(false, "release_frame_cache without a prepared snapshot");
            return;
        };
        self.shared.publish(snapshot);
    }

    /// Throws the temp slot away; the published snapshot stays as it was.
    pub fn discard_prepared(&mut self) {
        if self.temp.take().is_some() {
            // The rebuild was wasted; the next prepare has to run again.
            self.out_of_date = true;
            tracing::trace!("discarded prepared frame cache");
        }
    }

    pub fn update_frame_cache(
        &mut self,
        host: &dyn DocumentHost,
        params: PrepareParams,
        record: impl FnOnce() -> Picture,
    ) -> bool {
        let new_cache = self.prepare_frame_cache(host, params, record);
        self.release_frame_cache(new_cache);
        new_cache
    }

    /// Drops both slots and forgets everything the staleness check remembered.
    pub fn reset(&mut self) {
        self.shared.clear();
        self.temp = None;
        self.out_of_date = true;
        self.staleness = StalenessTracker::default();
    }
}

/// Same center within [`CURSOR_CENTER_SLOP`] and every edge within [`CURSOR_EDGE_SLOP`].
pub fn cursor_still_matches(old: IntRect, new: IntRect) -> bool {
    let old_center = old.center();
    let new_center = new.center();
    (old_center.x - new_center.x).abs() <= CURSOR_CENTER_SLOP
        && (old_center.y - new_center.y).abs() <= CURSOR_CENTER_SLOP
        && (old.min_x - new.min_x).abs() <= CURSOR_EDGE_SLOP
        && (old.min_y - new.min_y).abs() <= CURSOR_EDGE_SLOP
        && (old.max_x - new.max_x).abs() <= CURSOR_EDGE_SLOP
        && (old.max_y - new.max_y).abs() <= CURSOR_EDGE_SLOP
}

#[cfg(test)]
mod tests;
