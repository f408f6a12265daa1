//! In-memory document used wherever a real layout engine is not available.
//!
//! Frames and nodes live in generation-checked slot maps, so a [`NodeId`] handed out before a
//! node was removed simply stops resolving instead of aliasing a newer node.

use std::cell::Cell;

use model::{FrameId, IntPoint, IntRect, NodeId};
use render_protocol::{
    Canvas, Color, DocumentHost, FrameInfo, KeyEvent, ListSelection, NavKind, NavNode,
    OverlayRecorder, OverlayState,
};
use slotmap::{Key, KeyData, SlotMap};
use thiserror::Error;

slotmap::new_key_type! {
    struct NodeKey;
    struct FrameKey;
}

pub const KEY_BACKSPACE: u32 = 8;

const LINK_COLOR: Color = Color::rgb(0x1a, 0x0d, 0xab);
const CONTROL_FILL: Color = Color::rgb(0xf4, 0xf4, 0xf4);

#[derive(Debug, Clone, PartialEq)]
pub enum NodeContent {
    Block { color: Color },
    Text { text: String, color: Color },
    Link { text: String },
    Button { label: String },
    TextInput { value: String },
    Select {
        options: Vec<String>,
        selected: Vec<usize>,
        multiple: bool,
    },
}

impl NodeContent {
    fn nav_kind(&self) -> Option<NavKind> {
        match self {
            NodeContent::Block { .. } | NodeContent::Text { .. } => None,
            NodeContent::Link { .. } => Some(NavKind::Link),
            NodeContent::Button { .. } => Some(NavKind::Button),
            NodeContent::TextInput { .. } => Some(NavKind::TextInput),
            NodeContent::Select { .. } => Some(NavKind::Select),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum DocumentError {
    #[error("unknown frame {0:?}")]
    UnknownFrame(FrameId),
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),
    #[error("node {0:?} carries no text")]
    NotTextual(NodeId),
    #[error("load progress {0} is outside [0, 1]")]
    InvalidProgress(f32),
}

#[derive(Debug, Clone)]
struct FrameEntry {
    parent: Option<FrameKey>,
    owner_rect: IntRect,
    visible: bool,
    dom_version: u64,
}

#[derive(Debug, Clone)]
struct NodeEntry {
    frame: FrameKey,
    /// In the owning frame's coordinates.
    bounds: IntRect,
    content: NodeContent,
}

type TraversalHook = Box<dyn Fn() + Send>;

pub struct ReferenceDocument {
    frames: SlotMap<FrameKey, FrameEntry>,
    frame_order: Vec<FrameKey>,
    nodes: SlotMap<NodeKey, NodeEntry>,
    paint_order: Vec<NodeKey>,
    main_frame: FrameKey,
    loaded: bool,
    declared_size: (i32, i32),
    contents_size: (i32, i32),
    view_size: (i32, i32),
    layout_pending: bool,
    mid_relayout: bool,
    layout_count: u64,
    pending_invalidations: Vec<IntRect>,
    focus: Option<NodeKey>,
    progress: f32,
    mouse: Option<IntPoint>,
    hovered: Option<NodeKey>,
    clicks: Vec<NodeId>,
    pending_list_box: Option<NodeKey>,
    background: Color,
    record_count: Cell<u64>,
    traversal_hook: Option<TraversalHook>,
}

impl std::fmt::Debug for ReferenceDocument {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ReferenceDocument")
            .field("frames", &self.frames.len())
            .field("nodes", &self.nodes.len())
            .field("contents_size", &self.contents_size)
            .field("view_size", &self.view_size)
            .field("layout_pending", &self.layout_pending)
            .field("mid_relayout", &self.mid_relayout)
            .finish_non_exhaustive()
    }
}

fn node_id(key: NodeKey) -> NodeId {
    NodeId::from_raw(key.data().as_ffi())
}

fn node_key(id: NodeId) -> NodeKey {
    NodeKey::from(KeyData::from_ffi(id.raw()))
}

fn frame_id(key: FrameKey) -> FrameId {
    FrameId::from_raw(key.data().as_ffi())
}

fn frame_key(id: FrameId) -> FrameKey {
    FrameKey::from(KeyData::from_ffi(id.raw()))
}

impl ReferenceDocument {
    /// A loaded document whose content and view are both `width` x `height`.
    pub fn new(width: i32, height: i32) -> Self {
        let mut frames = SlotMap::with_key();
        let main_frame = frames.insert(FrameEntry {
            parent: None,
            owner_rect: IntRect::EMPTY,
            visible: true,
            dom_version: 0,
        });
        Self {
            frames,
            frame_order: vec![main_frame],
            nodes: SlotMap::with_key(),
            paint_order: Vec::new(),
            main_frame,
            loaded: true,
            declared_size: (width, height),
            contents_size: (0, 0),
            view_size: (width, height),
            layout_pending: true,
            mid_relayout: false,
            layout_count: 0,
            pending_invalidations: Vec::new(),
            focus: None,
            progress: 1.0,
            mouse: None,
            hovered: None,
            clicks: Vec::new(),
            pending_list_box: None,
            background: Color::WHITE,
            record_count: Cell::new(0),
            traversal_hook: None,
        }
    }

    pub fn main_frame(&self) -> FrameId {
        frame_id(self.main_frame)
    }

    pub fn set_loaded(&mut self, loaded: bool) {
        self.loaded = loaded;
    }

    pub fn set_background(&mut self, color: Color) {
        self.background = color;
        self.invalidate(IntRect::from_size(self.contents_size.0, self.contents_size.1));
    }

    /// Takes effect on the next layout.
    pub fn set_contents_size(&mut self, width: i32, height: i32) {
        self.declared_size = (width, height);
        self.layout_pending = true;
    }

    /// While set, `layout_if_needed` reports that the document cannot be painted.
    pub fn set_mid_relayout(&mut self, mid_relayout: bool) {
        self.mid_relayout = mid_relayout;
    }

    pub fn set_progress(&mut self, progress: f32) -> Result<(), DocumentError> {
        if !(0.0..=1.0).contains(&progress) {
            return Err(DocumentError::InvalidProgress(progress));
        }
        self.progress = progress;
        Ok(())
    }

    /// Runs at the start of every interactive-node traversal.
    pub fn set_traversal_hook(&mut self, hook: impl Fn() + Send + 'static) {
        self.traversal_hook = Some(Box::new(hook));
    }

    pub fn clear_traversal_hook(&mut self) {
        self.traversal_hook = None;
    }

    pub fn add_frame(
        &mut self,
        parent: FrameId,
        owner_rect: IntRect,
    ) -> Result<FrameId, DocumentError> {
        let parent_key = self.resolve_frame(parent)?;
        let key = self.frames.insert(FrameEntry {
            parent: Some(parent_key),
            owner_rect,
            visible: true,
            dom_version: 0,
        });
        self.frame_order.push(key);
        self.bump_version(parent_key);
        let absolute = self.absolute_frame_rect(key);
        self.invalidate(absolute);
        Ok(frame_id(key))
    }

    pub fn set_frame_visible(&mut self, frame: FrameId, visible: bool) -> Result<(), DocumentError> {
        let key = self.resolve_frame(frame)?;
        self.frames[key].visible = visible;
        let absolute = self.absolute_frame_rect(key);
        self.invalidate(absolute);
        self.layout_pending = true;
        Ok(())
    }

    pub fn add_node(
        &mut self,
        frame: FrameId,
        bounds: IntRect,
        content: NodeContent,
    ) -> Result<NodeId, DocumentError> {
        let frame_key = self.resolve_frame(frame)?;
        let key = self.nodes.insert(NodeEntry {
            frame: frame_key,
            bounds,
            content,
        });
        self.paint_order.push(key);
        self.node_changed(key, None);
        Ok(node_id(key))
    }

    pub fn remove_node(&mut self, node: NodeId) -> Result<(), DocumentError> {
        let key = self.resolve_node(node)?;
        let absolute = self.absolute_bounds(key);
        let Some(entry) = self.nodes.remove(key) else {
            return Err(DocumentError::UnknownNode(node));
        };
        self.paint_order.retain(|candidate| *candidate != key);
        if self.focus == Some(key) {
            self.focus = None;
        }
        if self.hovered == Some(key) {
            self.hovered = None;
        }
        if self.pending_list_box == Some(key) {
            self.pending_list_box = None;
        }
        self.bump_version(entry.frame);
        self.invalidate(absolute);
        self.layout_pending = true;
        Ok(())
    }

    pub fn move_node(&mut self, node: NodeId, bounds: IntRect) -> Result<(), DocumentError> {
        let key = self.resolve_node(node)?;
        let previous = self.absolute_bounds(key);
        self.nodes[key].bounds = bounds;
        self.node_changed(key, Some(previous));
        Ok(())
    }

    pub fn set_text(&mut self, node: NodeId, text: &str) -> Result<(), DocumentError> {
        let key = self.resolve_node(node)?;
        match &mut self.nodes[key].content {
            NodeContent::Text { text: current, .. }
            | NodeContent::Link { text: current }
            | NodeContent::Button { label: current }
            | NodeContent::TextInput { value: current } => {
                current.clear();
                current.push_str(text);
            }
            NodeContent::Block { .. } | NodeContent::Select { .. } => {
                return Err(DocumentError::NotTextual(node));
            }
        }
        self.node_changed(key, None);
        Ok(())
    }

    pub fn set_focus(&mut self, node: Option<NodeId>) -> Result<(), DocumentError> {
        let key = node.map(|node| self.resolve_node(node)).transpose()?;
        self.focus_key(key);
        Ok(())
    }

    pub fn content(&self, node: NodeId) -> Option<&NodeContent> {
        self.nodes.get(node_key(node)).map(|entry| &entry.content)
    }

    pub fn clicks(&self) -> &[NodeId] {
        &self.clicks
    }

    pub fn hovered(&self) -> Option<NodeId> {
        self.hovered.map(node_id)
    }

    pub fn mouse_position(&self) -> Option<IntPoint> {
        self.mouse
    }

    pub fn pending_list_box(&self) -> Option<NodeId> {
        self.pending_list_box.map(node_id)
    }

    pub fn layout_count(&self) -> u64 {
        self.layout_count
    }

    pub fn record_count(&self) -> u64 {
        self.record_count.get()
    }

    fn resolve_frame(&self, frame: FrameId) -> Result<FrameKey, DocumentError> {
        let key = frame_key(frame);
        if self.frames.contains_key(key) {
            Ok(key)
        } else {
            Err(DocumentError::UnknownFrame(frame))
        }
    }

    fn resolve_node(&self, node: NodeId) -> Result<NodeKey, DocumentError> {
        let key = node_key(node);
        if self.nodes.contains_key(key) {
            Ok(key)
        } else {
            Err(DocumentError::UnknownNode(node))
        }
    }

    fn frame_offset(&self, frame: FrameKey) -> IntPoint {
        let mut offset = IntPoint::default();
        let mut current = Some(frame);
        while let Some(key) = current {
            let entry = &self.frames[key];
            if entry.parent.is_some() {
                offset = offset.offset_by(entry.owner_rect.min_x, entry.owner_rect.min_y);
            }
            current = entry.parent;
        }
        offset
    }

    fn absolute_frame_rect(&self, frame: FrameKey) -> IntRect {
        let entry = &self.frames[frame];
        match entry.parent {
            Some(parent) => {
                let offset = self.frame_offset(parent);
                entry.owner_rect.translated(offset.x, offset.y)
            }
            None => IntRect::from_size(self.contents_size.0, self.contents_size.1),
        }
    }

    fn frame_is_visible(&self, frame: FrameKey) -> bool {
        let mut current = Some(frame);
        while let Some(key) = current {
            let entry = &self.frames[key];
            if !entry.visible {
                return false;
            }
            current = entry.parent;
        }
        true
    }

    fn absolute_bounds(&self, node: NodeKey) -> IntRect {
        let entry = &self.nodes[node];
        let offset = self.frame_offset(entry.frame);
        entry.bounds.translated(offset.x, offset.y)
    }

    fn invalidate(&mut self, rect: IntRect) {
        if !rect.is_empty() {
            self.pending_invalidations.push(rect);
        }
    }

    fn bump_version(&mut self, frame: FrameKey) {
        self.frames[frame].dom_version += 1;
    }

    fn node_changed(&mut self, node: NodeKey, previous_bounds: Option<IntRect>) {
        if let Some(previous) = previous_bounds {
            self.invalidate(previous);
        }
        let absolute = self.absolute_bounds(node);
        self.invalidate(absolute);
        let frame = self.nodes[node].frame;
        self.bump_version(frame);
        self.layout_pending = true;
    }

    fn focus_key(&mut self, key: Option<NodeKey>) {
        if self.focus == key {
            return;
        }
        let previous = std::mem::replace(&mut self.focus, key);
        for changed in [previous, key].into_iter().flatten() {
            let absolute = self.absolute_bounds(changed);
            self.invalidate(absolute);
        }
    }

    fn hit_test_key(&self, point: IntPoint) -> Option<NodeKey> {
        self.paint_order.iter().rev().copied().find(|key| {
            self.frame_is_visible(self.nodes[*key].frame)
                && self.absolute_bounds(*key).contains_point(point)
        })
    }

    fn perform_layout(&mut self) {
        let (declared_width, declared_height) = self.declared_size;
        self.contents_size = (declared_width.max(self.view_size.0), declared_height);
        self.layout_pending = false;
        self.layout_count += 1;
        tracing::trace!(contents_size = ?self.contents_size, "reference document laid out");
    }
}

impl DocumentHost for ReferenceDocument {
    fn has_document(&self) -> bool {
        self.loaded
    }

    fn layout_if_needed(&mut self) -> bool {
        if self.mid_relayout {
            tracing::trace!("reference document is mid-relayout");
            return false;
        }
        if self.layout_pending {
            self.perform_layout();
        }
        true
    }

    fn contents_size(&self) -> (i32, i32) {
        self.contents_size
    }

    fn view_size(&self) -> (i32, i32) {
        self.view_size
    }

    fn resize_view(&mut self, width: i32, height: i32) {
        if self.view_size != (width, height) {
            self.view_size = (width, height);
            self.layout_pending = true;
        }
    }

    fn force_layout(&mut self) {
        self.perform_layout();
    }

    fn frames(&self) -> Vec<FrameInfo> {
        self.frame_order
            .iter()
            .map(|key| {
                let entry = &self.frames[*key];
                FrameInfo {
                    id: frame_id(*key),
                    parent: entry.parent.map(frame_id),
                    owner_rect: entry.owner_rect,
                    visible: entry.visible,
                }
            })
            .collect()
    }

    fn record(&self, area: IntRect, canvas: &mut dyn Canvas, overlays: &mut OverlayRecorder) {
        self.record_count.set(self.record_count.get() + 1);
        canvas.fill_rect(area, self.background);
        for key in &self.paint_order {
            let entry = &self.nodes[*key];
            if !self.frame_is_visible(entry.frame) {
                continue;
            }
            let bounds = self.absolute_bounds(*key);
            if !bounds.intersects(&area) {
                continue;
            }
            let frame_clip =
                (entry.frame != self.main_frame).then(|| self.absolute_frame_rect(entry.frame));
            if let Some(clip) = frame_clip {
                canvas.save();
                canvas.clip_rect(clip);
            }
            match &entry.content {
                NodeContent::Block { color } => canvas.fill_rect(bounds, *color),
                NodeContent::Text { text, color } => {
                    canvas.draw_text(bounds.origin(), text, *color)
                }
                NodeContent::Link { text } => canvas.draw_text(bounds.origin(), text, LINK_COLOR),
                NodeContent::Button { label } => {
                    let state = if self.focus == Some(*key) {
                        OverlayState::Focused
                    } else {
                        OverlayState::Normal
                    };
                    overlays.paint_button(canvas, node_id(*key), bounds, state);
                    canvas.draw_text(bounds.origin(), label, Color::BLACK);
                }
                NodeContent::TextInput { value } => {
                    canvas.fill_rect(bounds, Color::WHITE);
                    canvas.draw_text(bounds.origin(), value, Color::BLACK);
                }
                NodeContent::Select {
                    options, selected, ..
                } => {
                    canvas.fill_rect(bounds, CONTROL_FILL);
                    if let Some(label) = selected.first().and_then(|index| options.get(*index)) {
                        canvas.draw_text(bounds.origin(), label, Color::BLACK);
                    }
                }
            }
            if frame_clip.is_some() {
                canvas.restore();
            }
        }
    }

    fn visit_interactive_nodes(&self, visitor: &mut dyn FnMut(NavNode)) {
        if let Some(hook) = &self.traversal_hook {
            hook();
        }
        for key in &self.paint_order {
            let entry = &self.nodes[*key];
            let Some(kind) = entry.content.nav_kind() else {
                continue;
            };
            if !self.frame_is_visible(entry.frame) {
                continue;
            }
            visitor(NavNode {
                node: node_id(*key),
                frame: frame_id(entry.frame),
                bounds: self.absolute_bounds(*key),
                kind,
            });
        }
    }

    fn focused_node(&self) -> Option<NodeId> {
        self.focus.map(node_id)
    }

    fn node_bounds(&self, node: NodeId) -> Option<IntRect> {
        let key = node_key(node);
        self.nodes
            .contains_key(key)
            .then(|| self.absolute_bounds(key))
    }

    fn node_is_live(&self, node: NodeId) -> bool {
        self.nodes.contains_key(node_key(node))
    }

    fn frame_dom_versions(&self) -> Vec<(FrameId, u64)> {
        self.frame_order
            .iter()
            .map(|key| (frame_id(*key), self.frames[*key].dom_version))
            .collect()
    }

    fn progress(&self) -> f32 {
        self.progress
    }

    fn hit_test(&self, point: IntPoint) -> Option<NodeId> {
        self.hit_test_key(point).map(node_id)
    }

    fn dispatch_mouse_move(&mut self, frame: Option<FrameId>, point: IntPoint) {
        if let Some(frame) = frame
            && !self.frames.contains_key(frame_key(frame))
        {
            tracing::trace!(?frame, "mouse move for a stale frame, using the main frame");
        }
        self.mouse = Some(point);
        self.hovered = self.hit_test_key(point);
    }

    fn dispatch_click(&mut self, frame: Option<FrameId>, node: Option<NodeId>) -> bool {
        let frame_valid = frame.is_none_or(|frame| self.frames.contains_key(frame_key(frame)));
        let explicit = node
            .map(node_key)
            .filter(|key| frame_valid && self.nodes.contains_key(*key));
        let target = explicit.or_else(|| self.mouse.and_then(|point| self.hit_test_key(point)));
        let Some(key) = target else {
            return false;
        };
        match &self.nodes[key].content {
            NodeContent::Select { .. } => {
                self.pending_list_box = Some(key);
                self.focus_key(Some(key));
                true
            }
            NodeContent::TextInput { .. } => {
                self.focus_key(Some(key));
                true
            }
            NodeContent::Button { .. } | NodeContent::Link { .. } => {
                self.clicks.push(node_id(key));
                self.focus_key(Some(key));
                true
            }
            NodeContent::Block { .. } | NodeContent::Text { .. } => false,
        }
    }

    fn dispatch_key(&mut self, event: &KeyEvent) -> bool {
        if !event.down {
            return false;
        }
        let Some(key) = self.focus else {
            return false;
        };
        let NodeContent::TextInput { value } = &mut self.nodes[key].content else {
            return false;
        };
        if event.key_code == KEY_BACKSPACE {
            value.pop();
        } else if let Some(character) = event.unichar {
            value.push(character);
        } else {
            return false;
        }
        self.node_changed(key, None);
        true
    }

    fn apply_list_selection(&mut self, selection: ListSelection) -> bool {
        let Some(key) = self.pending_list_box.take() else {
            return false;
        };
        let Some(entry) = self.nodes.get_mut(key) else {
            return false;
        };
        let NodeContent::Select {
            options,
            selected,
            multiple,
        } = &mut entry.content
        else {
            return false;
        };
        match selection {
            ListSelection::Single(index) if index < options.len() => *selected = vec![index],
            ListSelection::Single(_) | ListSelection::Cancelled => return true,
            ListSelection::Multiple(indices) => {
                let option_count = options.len();
                let mut chosen: Vec<usize> = indices
                    .into_iter()
                    .filter(|index| *index < option_count)
                    .collect();
                if !*multiple {
                    chosen.truncate(1);
                }
                *selected = chosen;
            }
        }
        self.node_changed(key, None);
        true
    }

    fn drain_invalidations(&mut self) -> Vec<IntRect> {
        std::mem::take(&mut self.pending_invalidations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use render_protocol::RecordingCanvas;

    fn document_with_button() -> (ReferenceDocument, NodeId) {
        let mut document = ReferenceDocument::new(800, 600);
        let main = document.main_frame();
        let button = document
            .add_node(
                main,
                IntRect::from_xywh(10, 10, 80, 20),
                NodeContent::Button {
                    label: "ok".to_owned(),
                },
            )
            .expect("add button");
        assert!(document.layout_if_needed());
        (document, button)
    }

    #[test]
    fn removed_node_ids_stop_resolving() {
        let (mut document, button) = document_with_button();
        document.remove_node(button).expect("remove button");
        assert!(!document.node_is_live(button));
        assert_eq!(document.node_bounds(button), None);

        let main = document.main_frame();
        let replacement = document
            .add_node(
                main,
                IntRect::from_xywh(0, 0, 5, 5),
                NodeContent::Block {
                    color: Color::BLACK,
                },
            )
            .expect("add block");
        assert_ne!(replacement, button);
        assert!(!document.node_is_live(button));
        assert_eq!(
            document.remove_node(button),
            Err(DocumentError::UnknownNode(button))
        );
    }

    #[test]
    fn mutations_invalidate_and_bump_frame_versions() {
        let (mut document, button) = document_with_button();
        document.drain_invalidations();
        let before = document.frame_dom_versions()[0].1;

        document
            .move_node(button, IntRect::from_xywh(100, 100, 80, 20))
            .expect("move");
        let dirty = document.drain_invalidations();
        assert_eq!(
            dirty,
            vec![
                IntRect::from_xywh(10, 10, 80, 20),
                IntRect::from_xywh(100, 100, 80, 20)
            ]
        );
        assert_eq!(document.frame_dom_versions()[0].1, before + 1);
        assert!(document.drain_invalidations().is_empty());
    }

    #[test]
    fn subframe_nodes_report_absolute_bounds() {
        let mut document = ReferenceDocument::new(800, 600);
        let main = document.main_frame();
        let outer = document
            .add_frame(main, IntRect::from_xywh(100, 50, 300, 300))
            .expect("outer frame");
        let inner = document
            .add_frame(outer, IntRect::from_xywh(20, 30, 100, 100))
            .expect("inner frame");
        let link = document
            .add_node(
                inner,
                IntRect::from_xywh(5, 5, 10, 10),
                NodeContent::Link {
                    text: "a".to_owned(),
                },
            )
            .expect("link");
        assert_eq!(
            document.node_bounds(link),
            Some(IntRect::from_xywh(125, 85, 10, 10))
        );
        assert_eq!(document.hit_test(IntPoint::new(130, 90)), Some(link));

        let frames = document.frames();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[2].parent, Some(outer));
    }

    #[test]
    fn mid_relayout_blocks_layout() {
        let (mut document, _) = document_with_button();
        document.set_mid_relayout(true);
        document.set_contents_size(800, 900);
        assert!(!document.layout_if_needed());
        assert_eq!(document.contents_size(), (800, 600));
        document.set_mid_relayout(false);
        assert!(document.layout_if_needed());
        assert_eq!(document.contents_size(), (800, 900));
    }

    #[test]
    fn list_box_reply_updates_selection() {
        let mut document = ReferenceDocument::new(800, 600);
        let main = document.main_frame();
        let select = document
            .add_node(
                main,
                IntRect::from_xywh(0, 0, 100, 20),
                NodeContent::Select {
                    options: vec!["a".into(), "b".into(), "c".into()],
                    selected: vec![0],
                    multiple: false,
                },
            )
            .expect("select");
        assert!(!document.apply_list_selection(ListSelection::Single(1)));
        assert!(document.dispatch_click(None, Some(select)));
        assert_eq!(document.pending_list_box(), Some(select));
        assert!(document.apply_list_selection(ListSelection::Multiple(vec![2, 1, 7])));
        let Some(NodeContent::Select { selected, .. }) = document.content(select) else {
            panic!("select node missing");
        };
        assert_eq!(selected, &vec![2]);
        assert_eq!(document.pending_list_box(), None);
    }

    #[test]
    fn recording_paints_buttons_through_overlay_recorder() {
        let (document, button) = document_with_button();
        let mut canvas = RecordingCanvas::new(800, 600);
        let mut overlays = OverlayRecorder::default();
        document.record(IntRect::from_size(800, 600), &mut canvas, &mut overlays);
        assert_eq!(overlays.overlays().len(), 1);
        assert_eq!(overlays.overlays()[0].node, button);
        assert_eq!(document.record_count(), 1);
    }

    #[test]
    fn progress_outside_unit_range_is_rejected() {
        let mut document = ReferenceDocument::new(10, 10);
        assert_eq!(
            document.set_progress(1.5),
            Err(DocumentError::InvalidProgress(1.5))
        );
        document.set_progress(0.5).expect("valid progress");
        assert_eq!(document.progress(), 0.5);
    }
}
