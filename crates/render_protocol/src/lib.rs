use std::sync::Arc;

use bitflags::bitflags;
use model::{FrameId, IntPoint, IntRect, NodeId};
use serde::Serialize;

mod canvas;

pub use canvas::{Canvas, GLYPH_HEIGHT, GLYPH_WIDTH, PixelCanvas, RecordingCanvas};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const WHITE: Self = Self::rgb(0xff, 0xff, 0xff);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 0xff)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OverlayState {
    Normal,
    Focused,
    Pressed,
}

/// Decoration painted on top of a form control. Bound to its node by identifier only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ButtonOverlay {
    pub node: NodeId,
    pub rect: IntRect,
    pub state: OverlayState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaintCommand {
    Save,
    Restore,
    Translate { dx: i32, dy: i32 },
    ClipRect(IntRect),
    FillRect { rect: IntRect, color: Color },
    DrawText {
        origin: IntPoint,
        text: Arc<str>,
        color: Color,
    },
    DrawOverlay(ButtonOverlay),
}

/// Immutable recorded command list.
///
/// `origin` is the content-space point the recording was made at; a consumer translates by it
/// before playback. Commands are shared, so cloning a picture never copies the list.
#[derive(Debug, Clone)]
pub struct Picture {
    origin: IntPoint,
    commands: Arc<[PaintCommand]>,
}

impl Picture {
    pub fn empty() -> Self {
        Self::from_commands(IntPoint::default(), Vec::new())
    }

    pub fn from_commands(origin: IntPoint, commands: Vec<PaintCommand>) -> Self {
        Self {
            origin,
            commands: commands.into(),
        }
    }

    pub fn origin(&self) -> IntPoint {
        self.origin
    }

    pub fn commands(&self) -> &[PaintCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Identity comparison: both handles refer to the same recording.
    pub fn ptr_eq(&self, other: &Picture) -> bool {
        Arc::ptr_eq(&self.commands, &other.commands) && self.origin == other.origin
    }

    pub fn playback(&self, canvas: &mut dyn Canvas) {
        for command in self.commands.iter() {
            canvas.apply(command);
        }
    }
}

/// Overlay list handed to one recording pass.
///
/// Seeded with a copy of the tracked overlays; painting a button updates the entry for its
/// node or appends a new one.
#[derive(Debug, Clone, Default)]
pub struct OverlayRecorder {
    overlays: Vec<ButtonOverlay>,
}

impl OverlayRecorder {
    pub fn new(seed: Vec<ButtonOverlay>) -> Self {
        Self { overlays: seed }
    }

    pub fn paint_button(
        &mut self,
        canvas: &mut dyn Canvas,
        node: NodeId,
        rect: IntRect,
        state: OverlayState,
    ) {
        let overlay = ButtonOverlay { node, rect, state };
        match self.overlays.iter_mut().find(|entry| entry.node == node) {
            Some(entry) => *entry = overlay,
            None => self.overlays.push(overlay),
        }
        canvas.draw_overlay(&overlay);
    }

    pub fn overlays(&self) -> &[ButtonOverlay] {
        &self.overlays
    }

    pub fn into_overlays(self) -> Vec<ButtonOverlay> {
        self.overlays
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    pub id: FrameId,
    /// `None` only for the main frame.
    pub parent: Option<FrameId>,
    /// Owner element rectangle in the parent frame's coordinates.
    pub owner_rect: IntRect,
    pub visible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NavKind {
    Link,
    Button,
    TextInput,
    Select,
    Other,
}

/// One interactive node as seen by navigation and hit testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavNode {
    pub node: NodeId,
    pub frame: FrameId,
    pub bounds: IntRect,
    pub kind: NavKind,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct KeyModifiers: u8 {
        const SHIFT = 0b0001;
        const ALT = 0b0010;
        const CTRL = 0b0100;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key_code: u32,
    pub unichar: Option<char>,
    pub down: bool,
    pub modifiers: KeyModifiers,
}

/// Reply to a pending list-box request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListSelection {
    Single(usize),
    Multiple(Vec<usize>),
    Cancelled,
}

/// Everything the content core needs from the layout/paint engine.
///
/// Identifiers handed out by the host are opaque and may go stale; the host is expected to
/// re-validate them on every call that takes one.
pub trait DocumentHost: Send {
    fn has_document(&self) -> bool;
    /// Runs pending layout on every frame. Returns false when some frame is mid-relayout and
    /// cannot be painted yet.
    fn layout_if_needed(&mut self) -> bool;
    fn contents_size(&self) -> (i32, i32);
    fn view_size(&self) -> (i32, i32);
    fn resize_view(&mut self, width: i32, height: i32);
    fn force_layout(&mut self);
    /// All frames, parents before children.
    fn frames(&self) -> Vec<FrameInfo>;
    /// Paints content intersecting `area` (content coordinates) into `canvas`.
    fn record(&self, area: IntRect, canvas: &mut dyn Canvas, overlays: &mut OverlayRecorder);
    fn visit_interactive_nodes(&self, visitor: &mut dyn FnMut(NavNode));
    fn focused_node(&self) -> Option<NodeId>;
    fn node_bounds(&self, node: NodeId) -> Option<IntRect>;
    fn node_is_live(&self, node: NodeId) -> bool;
    /// Per-frame DOM mutation counters; each only ever increases.
    fn frame_dom_versions(&self) -> Vec<(FrameId, u64)>;
    /// Estimated load progress in `[0, 1]`.
    fn progress(&self) -> f32;
    fn hit_test(&self, point: IntPoint) -> Option<NodeId>;
    fn dispatch_mouse_move(&mut self, frame: Option<FrameId>, point: IntPoint);
    /// Returns true when the click was consumed by a node.
    fn dispatch_click(&mut self, frame: Option<FrameId>, node: Option<NodeId>) -> bool;
    fn dispatch_key(&mut self, event: &KeyEvent) -> bool;
    /// Returns false when no list-box request is pending.
    fn apply_list_selection(&mut self, selection: ListSelection) -> bool;
    /// Rectangles dirtied since the last call.
    fn drain_invalidations(&mut self) -> Vec<IntRect>;
}
