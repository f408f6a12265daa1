//! Content-thread core.
//!
//! [`ContentCore`] owns the document host and everything only the content thread may touch:
//! the invalidation accumulator, the frame-cache builder, view geometry. What the UI thread
//! reads lives in a shared [`CoreContext`] and is reached through a [`ContentReader`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use engine::{Generation, GenerationKind, GenerationSequencer, NotificationProducer};
use frame_cache::{
    CursorBounds, FrameCacheManager, FrameCacheShared, FrameCacheSnapshot, PrepareParams,
};
use model::{FrameId, IntPoint, IntRect, NodeId, Region};
use render_protocol::{
    ButtonOverlay, Canvas, Color, DocumentHost, KeyEvent, ListSelection, NavNode,
    OverlayRecorder, Picture, RecordingCanvas,
};
use thiserror::Error;
use tiles::{InvalidationAccumulator, PictureSet, TileConfig, TileConfigError};
use view::{ViewState, ViewStateError};

pub mod content_bridge;
mod layout;
mod overlay;
mod synchronizer;

pub use content_bridge::{
    ContentThread, ContentThreadError, CoreCommand, DocumentEdit, PointerSample, UiNotification,
};
pub use layout::total_content_rect;
pub use overlay::ButtonOverlayTracker;
pub use synchronizer::ContentSynchronizer;

pub const DEFAULT_COMMAND_CAPACITY: usize = 64;
pub const DEFAULT_NOTIFICATION_CAPACITY: usize = 64;
pub const DEFAULT_POINTER_RING_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreConfig {
    pub tiles: TileConfig,
    pub command_capacity: usize,
    pub notification_capacity: usize,
    pub pointer_ring_capacity: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            tiles: TileConfig::default(),
            command_capacity: DEFAULT_COMMAND_CAPACITY,
            notification_capacity: DEFAULT_NOTIFICATION_CAPACITY,
            pointer_ring_capacity: DEFAULT_POINTER_RING_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CoreConfigError {
    #[error(transparent)]
    Tiles(#[from] TileConfigError),
    #[error("{0} must be greater than zero")]
    ZeroCapacity(&'static str),
}

impl CoreConfig {
    pub fn validate(&self) -> Result<(), CoreConfigError> {
        self.tiles.validate()?;
        if self.command_capacity == 0 {
            return Err(CoreConfigError::ZeroCapacity("command capacity"));
        }
        if self.notification_capacity == 0 {
            return Err(CoreConfigError::ZeroCapacity("notification capacity"));
        }
        if self.pointer_ring_capacity == 0 {
            return Err(CoreConfigError::ZeroCapacity("pointer ring capacity"));
        }
        Ok(())
    }
}

/// State shared between the content thread and its readers. Each field has its own lock.
#[derive(Debug)]
pub struct CoreContext {
    content: ContentSynchronizer,
    frame_cache: Arc<FrameCacheShared>,
    buttons: ButtonOverlayTracker,
    generations: GenerationSequencer,
}

impl CoreContext {
    fn new(config: &CoreConfig) -> Self {
        Self {
            content: ContentSynchronizer::new(config.tiles),
            frame_cache: Arc::new(FrameCacheShared::new()),
            buttons: ButtonOverlayTracker::new(),
            generations: GenerationSequencer::new(),
        }
    }
}

/// UI-thread handle. Every call copies what it needs out from under a short lock.
#[derive(Debug, Clone)]
pub struct ContentReader {
    context: Arc<CoreContext>,
}

impl ContentReader {
    pub fn read_snapshot(&self) -> (PictureSet, bool) {
        self.context.content.read_snapshot()
    }

    pub fn draw_into(&self, canvas: &mut dyn Canvas, background: Color) -> bool {
        self.context.content.draw_into(canvas, background)
    }

    pub fn is_content_ready(&self) -> bool {
        self.context.content.is_content_ready()
    }

    pub fn copy_content_to_picture(&self) -> Picture {
        self.context.content.copy_content_to_picture()
    }

    pub fn content_rect(&self) -> IntRect {
        self.context.content.content_rect()
    }

    pub fn tile_count(&self) -> usize {
        self.context.content.tile_count()
    }

    pub fn frame_cache(&self) -> Option<Arc<FrameCacheSnapshot>> {
        self.context.frame_cache.current()
    }

    /// The current frame cache, if it was replaced since the last call.
    pub fn take_updated_frame_cache(&self) -> Option<Arc<FrameCacheSnapshot>> {
        self.context.frame_cache.take_updated()
    }

    pub fn hit_test(&self, point: IntPoint) -> Option<NavNode> {
        self.frame_cache()?.hit_test(point).copied()
    }

    pub fn set_cursor_bounds(&self, cursor: Option<CursorBounds>) {
        self.context.frame_cache.set_cursor_bounds(cursor);
    }

    /// Stamps a new input event of `kind`; older in-flight work of that kind becomes stale.
    pub fn next_generation(&self, kind: GenerationKind) -> Generation {
        self.context.generations.advance(kind)
    }

    pub fn current_generation(&self, kind: GenerationKind) -> Generation {
        self.context.generations.current(kind)
    }

    /// Generation of the last move or touch the content thread acted on.
    pub fn last_generation(&self) -> Generation {
        self.context.generations.last()
    }

    pub fn button_overlays(&self) -> Vec<ButtonOverlay> {
        self.context.buttons.snapshot()
    }
}

/// Result of a record cycle that published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentUpdate {
    /// Everything newly invalidated or re-recorded since the previous publish.
    pub changed: Region,
    pub width: i32,
    pub height: i32,
}

pub struct ContentCore<H: DocumentHost> {
    host: H,
    context: Arc<CoreContext>,
    frame_cache: FrameCacheManager,
    invalidations: InvalidationAccumulator,
    view: ViewState,
    notifications: Option<NotificationProducer<UiNotification>>,
    // Set while the core itself drives layout, so the invalidations it causes do not
    // bounce a draw request back to the UI.
    skip_content_draw: bool,
    text_generation: Generation,
    config: CoreConfig,
}

impl<H: DocumentHost> ContentCore<H> {
    pub fn new(host: H, config: CoreConfig) -> Result<Self, CoreConfigError> {
        config.validate()?;
        let context = Arc::new(CoreContext::new(&config));
        let frame_cache = FrameCacheManager::new(context.frame_cache.clone());
        Ok(Self {
            host,
            context,
            frame_cache,
            invalidations: InvalidationAccumulator::new(),
            view: ViewState::default(),
            notifications: None,
            skip_content_draw: false,
            text_generation: Generation::default(),
            config,
        })
    }

    pub fn set_notifications(&mut self, notifications: NotificationProducer<UiNotification>) {
        self.notifications = Some(notifications);
    }

    pub fn reader(&self) -> ContentReader {
        ContentReader {
            context: self.context.clone(),
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Direct access for document edits. Invalidations the host queues are picked up by the
    /// next [`Self::content_changed`] or record cycle.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn pending_invalidation(&self) -> &Region {
        self.invalidations.pending()
    }

    /// Marks `rect` for re-recording and asks the UI for a draw.
    pub fn invalidate(&mut self, rect: IntRect) {
        let Some(rect) = rect.intersection(&IntRect::UNBOUNDED_CONTENT) else {
            return;
        };
        let grew = self.invalidations.invalidate(rect);
        if grew && !self.skip_content_draw {
            self.notify(UiNotification::ContentDrawRequested);
        }
    }

    /// Pulls whatever the host invalidated since the last call.
    pub fn content_changed(&mut self) {
        for rect in self.host.drain_invalidations() {
            self.invalidate(rect);
        }
    }

    /// Runs one record cycle and publishes the result.
    ///
    /// Returns `None`, leaving all pending invalidation in place, when there is no document,
    /// nothing to record or layout could not settle.
    pub fn record_and_publish(&mut self) -> Option<ContentUpdate> {
        self.content_changed();
        let progress = self.host.progress();
        let progress_done = progress <= 0.0 || progress >= 1.0;
        let mut working = self.context.content.begin_cycle(progress_done);
        if !self.record_picture_set(&mut working) {
            return None;
        }

        let changed = self.invalidations.drain();
        let (width, height) = self.context.content.publish(working);
        tracing::debug!(
            changed = ?changed.bounds(),
            width,
            height,
            "content published"
        );
        let update = ContentUpdate {
            changed,
            width,
            height,
        };
        self.notify(UiNotification::ContentPublished(update.clone()));
        Some(update)
    }

    /// Rebuilds the frame cache if it is out of date and publishes it right away.
    pub fn prepare_and_release_frame_cache(&mut self) -> bool {
        let new_cache = self.prepare_frame_cache();
        self.frame_cache.release_frame_cache(new_cache);
        new_cache
    }

    /// Moves the mouse unless a newer move was generated before or while the frame cache was
    /// rebuilt. A rebuild that went stale is thrown away, not published.
    pub fn move_mouse_if_current(
        &mut self,
        generation: Generation,
        frame: Option<FrameId>,
        node: Option<NodeId>,
        x: i32,
        y: i32,
    ) -> bool {
        let generations = &self.context.generations;
        if !generations.is_current(GenerationKind::Move, generation) {
            tracing::trace!(
                ?generation,
                current = ?generations.current(GenerationKind::Move),
                "stale move skipped"
            );
            return false;
        }
        let new_cache = self.prepare_frame_cache();
        let generations = &self.context.generations;
        if !generations.is_current(GenerationKind::Move, generation) {
            tracing::trace!(
                ?generation,
                current = ?generations.current(GenerationKind::Move),
                "move went stale while the frame cache was rebuilt"
            );
            self.frame_cache.discard_prepared();
            return false;
        }
        self.frame_cache.release_frame_cache(new_cache);
        generations.mark_last(generation);
        self.move_mouse(frame, node, x, y);
        true
    }

    /// Moves to the touch point and clicks, unless a newer touch was generated. Returns
    /// whether the click was delivered.
    pub fn touch_up(
        &mut self,
        generation: Generation,
        frame: Option<FrameId>,
        node: Option<NodeId>,
        x: i32,
        y: i32,
    ) -> bool {
        let generations = &self.context.generations;
        if !generations.is_current(GenerationKind::Touch, generation) {
            tracing::trace!(?generation, "stale touch skipped");
            return false;
        }
        self.move_mouse(frame, node, x, y);
        self.context.generations.mark_last(generation);
        let handled = self.host.dispatch_click(frame, node);
        self.content_changed();
        handled
    }

    /// Delivers a key to the focused node and stamps later frame caches with `generation`.
    pub fn pass_key_to_document(&mut self, generation: Generation, event: &KeyEvent) -> bool {
        if self.host.focused_node().is_none() {
            return false;
        }
        let handled = self.host.dispatch_key(event);
        self.text_generation = generation;
        self.context
            .generations
            .observe(GenerationKind::Text, generation);
        self.content_changed();
        handled
    }

    pub fn popup_reply(&mut self, selection: ListSelection) -> bool {
        let applied = self.host.apply_list_selection(selection);
        if !applied {
            tracing::trace!("popup reply without a pending list box");
        }
        self.content_changed();
        applied
    }

    pub fn set_find_is_up(&mut self, find_is_up: bool) {
        self.frame_cache.set_find_is_up(find_is_up);
    }

    /// Rebuilds the frame cache once without consulting the summed DOM versions.
    pub fn did_first_layout(&mut self) {
        self.frame_cache.set_dom_version_check(false);
        self.frame_cache.mark_out_of_date();
        self.prepare_and_release_frame_cache();
    }

    pub fn notify_progress_finished(&mut self) {
        self.frame_cache.set_dom_version_check(true);
        self.frame_cache.mark_out_of_date();
        self.prepare_and_release_frame_cache();
    }

    /// Drops both frame caches, the published content, tracked overlays and all pending
    /// invalidation.
    pub fn reset(&mut self) {
        self.frame_cache.reset();
        self.context.content.reset();
        self.context.buttons.clear();
        self.invalidations.clear();
        tracing::debug!("content core reset");
    }

    pub fn clear_content(&mut self) {
        self.context.content.clear();
        self.invalidations.clear();
    }

    /// Cuts oversized published tiles into a grid and re-records the pieces.
    pub fn split_content(&mut self) -> bool {
        if !self.layout_quietly() {
            tracing::debug!("split skipped, layout did not settle");
            return false;
        }
        let mut split = PictureSet::new(self.config.tiles);
        self.context.content.split_published(&mut split);
        self.rebuild_invalid_tiles(&mut split);
        self.context.content.replace(split);
        true
    }

    pub fn set_scroll_offset(&mut self, x: i32, y: i32) -> bool {
        self.view.set_scroll_offset(x, y)
    }

    /// Applies a new window size; a real change relayouts and dirties the content.
    pub fn set_size(
        &mut self,
        width: i32,
        height: i32,
        screen_width: i32,
        scale: f32,
    ) -> Result<bool, ViewStateError> {
        let changed = self.view.set_size(width, height, screen_width, scale)?;
        self.host.resize_view(width, height);
        if changed {
            self.host.force_layout();
            let (content_width, content_height) = self.host.contents_size();
            self.invalidate(IntRect::from_size(content_width, content_height));
        }
        Ok(changed)
    }

    fn notify(&mut self, notification: UiNotification) {
        if let Some(notifications) = &mut self.notifications {
            notifications.push(notification);
        }
    }

    fn layout_quietly(&mut self) -> bool {
        self.skip_content_draw = true;
        let laid_out = self.host.layout_if_needed();
        self.content_changed();
        self.skip_content_draw = false;
        laid_out
    }

    fn record_picture_set(&mut self, working: &mut PictureSet) -> bool {
        if !self.host.has_document() {
            tracing::trace!("no document to record");
            return false;
        }
        if !self.invalidations.has_pending() {
            return false;
        }
        if !self.layout_quietly() {
            tracing::debug!("layout did not settle, keeping invalidation");
            return false;
        }

        let (mut width, mut height) = self.host.contents_size();
        let content_rect = IntRect::from_size(width, height);
        let total = total_content_rect(content_rect, &self.host.frames());
        if !content_rect.contains_rect(&total) {
            tracing::debug!(?content_rect, ?total, "sub-frames overflow the content");
            self.host.resize_view(total.width(), total.height());
            self.host.force_layout();
            if !self.layout_quietly() {
                return false;
            }
            (width, height) = self.host.contents_size();
        }

        working.check_dimensions(width, height, self.invalidations.pending_mut());
        let pending = self.invalidations.pending().clone();
        if !working.reuse_subdivided(&pending) {
            let (picture, elapsed) = self.rebuild_picture(pending.bounds());
            working.add(&pending, Some(picture), elapsed, false);
        }
        if working.build() {
            self.rebuild_invalid_tiles(working);
        }

        self.frame_cache.note_content_recorded(&self.host);
        self.prepare_and_release_frame_cache();
        true
    }

    fn rebuild_invalid_tiles(&mut self, set: &mut PictureSet) {
        for index in set.invalid_tiles().iter_ones() {
            let (picture, _) = self.rebuild_picture(set.bounds(index));
            set.set_picture(index, picture);
        }
    }

    /// Records `area` into a new picture and merges the button overlays painted with it.
    fn rebuild_picture(&mut self, area: IntRect) -> (Picture, Duration) {
        let started = Instant::now();
        let mut overlays = OverlayRecorder::new(self.context.buttons.snapshot());
        let mut canvas = RecordingCanvas::new(area.width(), area.height());
        canvas.translate(-area.min_x, -area.min_y);
        self.host.record(area, &mut canvas, &mut overlays);
        let picture = canvas.finish(area.origin());
        self.invalidations.mark_rebuilt(area);

        let host = &self.host;
        self.context
            .buttons
            .merge(overlays.into_overlays(), |node| host.node_is_live(node));
        (picture, started.elapsed())
    }

    fn prepare_frame_cache(&mut self) -> bool {
        let params = PrepareParams {
            visible_rect: self.view.visible_rect(),
            text_generation: self.text_generation,
        };
        let host = &self.host;
        let buttons = &self.context.buttons;
        self.frame_cache
            .prepare_frame_cache(host, params, || record_full_picture(host, buttons))
    }

    fn move_mouse(&mut self, frame: Option<FrameId>, node: Option<NodeId>, x: i32, y: i32) {
        let point = IntPoint::new(x, y);
        let window_point = self.view.record_mouse(point);
        self.host.dispatch_mouse_move(frame, point);
        self.content_changed();
        if let Some(node) = node
            && !self.host.node_is_live(node)
        {
            tracing::trace!(?node, ?window_point, "mouse moved over a stale node");
        }
    }
}

fn record_full_picture(host: &dyn DocumentHost, buttons: &ButtonOverlayTracker) -> Picture {
    let (width, height) = host.contents_size();
    let mut overlays = OverlayRecorder::new(buttons.snapshot());
    let mut canvas = RecordingCanvas::new(width, height);
    host.record(IntRect::from_size(width, height), &mut canvas, &mut overlays);
    canvas.finish(IntPoint::default())
}

#[cfg(test)]
mod tests;
