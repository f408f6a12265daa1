use std::cell::Cell;

use document::{NodeContent, ReferenceDocument};
use render_protocol::DocumentHost;

use super::*;

fn params() -> PrepareParams {
    PrepareParams {
        visible_rect: IntRect::from_size(800, 600),
        text_generation: Generation::from_raw(3),
    }
}

fn document_with_button() -> (ReferenceDocument, NodeId) {
    let mut document = ReferenceDocument::new(800, 600);
    let main = document.main_frame();
    let button = document
        .add_node(
            main,
            IntRect::from_xywh(100, 100, 80, 20),
            NodeContent::Button {
                label: "go".to_owned(),
            },
        )
        .expect("add button");
    assert!(document.layout_if_needed());
    (document, button)
}

fn manager() -> (Arc<FrameCacheShared>, FrameCacheManager) {
    let shared = Arc::new(FrameCacheShared::new());
    let manager = FrameCacheManager::new(shared.clone());
    (shared, manager)
}

#[test]
fn update_publishes_snapshot_once() {
    let (document, button) = document_with_button();
    let (shared, mut manager) = manager();
    assert!(shared.current().is_none());

    assert!(manager.update_frame_cache(&document, params(), Picture::empty));
    let snapshot = shared.take_updated().expect("published snapshot");
    assert_eq!(snapshot.nav().len(), 1);
    assert_eq!(snapshot.nav().nodes()[0].node, button);
    assert_eq!(snapshot.text_generation(), Generation::from_raw(3));
    assert_eq!(snapshot.visible_rect(), IntRect::from_size(800, 600));
    assert!(shared.take_updated().is_none());
    assert!(shared.current().is_some());
}

#[test]
fn prepare_skips_when_up_to_date() {
    let (document, _) = document_with_button();
    let (_, mut manager) = manager();
    assert!(manager.update_frame_cache(&document, params(), Picture::empty));

    let recorded = Cell::new(false);
    let prepared = manager.prepare_frame_cache(&document, params(), || {
        recorded.set(true);
        Picture::empty()
    });
    assert!(!prepared);
    assert!(!recorded.get());
    assert!(!manager.has_prepared());
}

#[test]
fn discarded_preparation_keeps_published_snapshot() {
    let (mut document, _) = document_with_button();
    let (shared, mut manager) = manager();
    assert!(manager.update_frame_cache(&document, params(), Picture::empty));
    let published = shared.current().expect("published");

    let main = document.main_frame();
    document
        .add_node(
            main,
            IntRect::from_xywh(0, 0, 10, 10),
            NodeContent::Link {
                text: "x".to_owned(),
            },
        )
        .expect("add link");
    manager.mark_out_of_date();
    assert!(manager.prepare_frame_cache(&document, params(), Picture::empty));
    manager.discard_prepared();

    let current = shared.current().expect("still published");
    assert!(Arc::ptr_eq(&published, &current));
    assert_eq!(current.nav().len(), 1);
    assert!(manager.is_out_of_date());
    assert!(!manager.has_prepared());
}

#[test]
fn cursor_reattaches_within_tolerance() {
    let (mut document, button) = document_with_button();
    let (shared, mut manager) = manager();
    shared.set_cursor_bounds(Some(CursorBounds {
        node: Some(button),
        bounds: IntRect::from_xywh(101, 99, 80, 21),
    }));
    assert!(manager.update_frame_cache(&document, params(), Picture::empty));
    assert_eq!(shared.current().and_then(|s| s.cursor()), Some(button));

    document
        .move_node(button, IntRect::from_xywh(110, 100, 80, 20))
        .expect("move button");
    manager.mark_out_of_date();
    assert!(manager.update_frame_cache(&document, params(), Picture::empty));
    let snapshot = shared.current().expect("published");
    assert_eq!(snapshot.cursor(), None);
    assert!(snapshot.cursor_node().is_none());
}

#[test]
fn staleness_follows_focus_versions_and_find() {
    let (mut document, button) = document_with_button();
    let (_, mut manager) = manager();
    manager.note_content_recorded(&document);
    assert!(manager.update_frame_cache(&document, params(), Picture::empty));

    assert!(!manager.note_content_recorded(&document));
    assert!(!manager.is_out_of_date());

    document.set_focus(Some(button)).expect("focus");
    assert!(manager.note_content_recorded(&document));
    assert!(manager.is_out_of_date());
    assert!(manager.update_frame_cache(&document, params(), Picture::empty));

    document.set_text(button, "stop").expect("set text");
    assert!(manager.note_content_recorded(&document));
    assert!(manager.update_frame_cache(&document, params(), Picture::empty));

    manager.set_dom_version_check(false);
    manager.note_content_recorded(&document);
    document.set_text(button, "again").expect("set text");
    assert!(!manager.note_content_recorded(&document));

    manager.set_find_is_up(true);
    assert!(manager.note_content_recorded(&document));
}

#[test]
fn reset_clears_published_snapshot() {
    let (document, _) = document_with_button();
    let (shared, mut manager) = manager();
    assert!(manager.update_frame_cache(&document, params(), Picture::empty));
    assert!(!manager.is_out_of_date());

    manager.reset();
    assert!(shared.current().is_none());
    assert!(manager.is_out_of_date());
    assert!(!manager.has_prepared());
}

#[test]
fn cursor_match_checks_center_and_edges() {
    let base = IntRect::from_xywh(0, 0, 40, 40);
    assert!(cursor_still_matches(base, base));
    assert!(cursor_still_matches(base, IntRect::from_xywh(2, -2, 40, 40)));
    assert!(!cursor_still_matches(base, IntRect::from_xywh(3, 0, 40, 40)));
    // Same center, edges too far apart.
    assert!(!cursor_still_matches(base, IntRect::from_xywh(-5, -5, 50, 50)));
}
