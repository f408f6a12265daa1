use std::collections::HashMap;

use model::{FrameId, IntPoint, IntRect};
use render_protocol::FrameInfo;

/// Main content rect grown by every rendered sub-frame that touches it.
///
/// `frames` lists parents before children, as [`render_protocol::DocumentHost::frames`]
/// promises. A sub-frame's owner rect is in its parent's coordinates, so it is shifted by the
/// owner offsets of all of its ancestors below the main frame. A hidden frame has no owner box,
/// so neither it nor anything nested in it contributes.
pub fn total_content_rect(content_rect: IntRect, frames: &[FrameInfo]) -> IntRect {
    // `None` marks a frame whose owner is not rendered.
    let mut offsets: HashMap<FrameId, Option<IntPoint>> = HashMap::with_capacity(frames.len());
    let mut total = content_rect;
    for frame in frames {
        let Some(parent) = frame.parent else {
            offsets.insert(frame.id, Some(IntPoint::default()));
            continue;
        };
        let parent_offset = offsets
            .get(&parent)
            .copied()
            .unwrap_or(Some(IntPoint::default()));
        let Some(parent_offset) = parent_offset.filter(|_| frame.visible) else {
            offsets.insert(frame.id, None);
            continue;
        };
        let absolute = frame
            .owner_rect
            .translated(parent_offset.x, parent_offset.y);
        offsets.insert(frame.id, Some(absolute.origin()));
        if absolute.intersects(&total) {
            total = total.join(&absolute);
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(id: u64, parent: Option<u64>, owner_rect: IntRect) -> FrameInfo {
        FrameInfo {
            id: FrameId::from_raw(id),
            parent: parent.map(FrameId::from_raw),
            owner_rect,
            visible: true,
        }
    }

    #[test]
    fn nested_frames_use_cumulative_offsets() {
        let frames = [
            frame(1, None, IntRect::EMPTY),
            frame(2, Some(1), IntRect::from_xywh(700, 10, 200, 100)),
            frame(3, Some(2), IntRect::from_xywh(150, 20, 100, 50)),
        ];
        let total = total_content_rect(IntRect::from_size(800, 600), &frames);
        assert_eq!(total, IntRect::new(0, 0, 950, 600));
    }

    #[test]
    fn thin_frames_grow_content_and_disjoint_frames_are_ignored() {
        let frames = [
            frame(1, None, IntRect::EMPTY),
            frame(2, Some(1), IntRect::from_xywh(0, 590, 1, 500)),
            frame(3, Some(1), IntRect::from_xywh(900, 0, 100, 100)),
        ];
        let total = total_content_rect(IntRect::from_size(800, 600), &frames);
        assert_eq!(total, IntRect::new(0, 0, 800, 1090));
    }

    #[test]
    fn frames_touching_the_grown_total_are_merged() {
        let frames = [
            frame(1, None, IntRect::EMPTY),
            frame(2, Some(1), IntRect::from_xywh(700, 0, 200, 100)),
            frame(3, Some(1), IntRect::from_xywh(850, 50, 100, 100)),
        ];
        let total = total_content_rect(IntRect::from_size(800, 600), &frames);
        assert_eq!(total, IntRect::new(0, 0, 950, 600));
    }

    #[test]
    fn hidden_frames_and_their_children_do_not_grow_content() {
        let mut hidden = frame(2, Some(1), IntRect::from_xywh(700, 0, 300, 100));
        hidden.visible = false;
        let frames = [
            frame(1, None, IntRect::EMPTY),
            hidden,
            frame(3, Some(2), IntRect::from_xywh(0, 0, 300, 100)),
        ];
        let total = total_content_rect(IntRect::from_size(800, 600), &frames);
        assert_eq!(total, IntRect::from_size(800, 600));
    }
}
