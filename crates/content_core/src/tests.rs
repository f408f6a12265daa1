use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use document::{NodeContent, ReferenceDocument};
use engine::GenerationKind;
use model::{IntRect, NodeId, Region};
use render_protocol::{Color, KeyEvent, KeyModifiers, ListSelection, PixelCanvas};
use tiles::TileConfig;

use super::*;

fn empty_core() -> ContentCore<ReferenceDocument> {
    ContentCore::new(ReferenceDocument::new(800, 600), CoreConfig::default()).expect("core")
}

fn core_with_button() -> (ContentCore<ReferenceDocument>, NodeId) {
    let mut document = ReferenceDocument::new(800, 600);
    let main = document.main_frame();
    let button = document
        .add_node(
            main,
            IntRect::from_xywh(20, 20, 100, 30),
            NodeContent::Button {
                label: "ok".to_owned(),
            },
        )
        .expect("add button");
    let core = ContentCore::new(document, CoreConfig::default()).expect("core");
    (core, button)
}

#[test]
fn single_invalidation_publishes_its_rect() {
    let mut core = empty_core();
    core.invalidate(IntRect::from_xywh(0, 0, 100, 100));

    let update = core.record_and_publish().expect("published");
    assert!(update.changed.same_area(&Region::from_rect(IntRect::from_xywh(0, 0, 100, 100))));
    assert_eq!((update.width, update.height), (800, 600));
    assert!(core.pending_invalidation().is_empty());
    assert!(core.reader().is_content_ready());
}

#[test]
fn consecutive_cycles_accumulate_disjoint_tiles() {
    let mut core = empty_core();
    let mut published = Region::new();

    core.invalidate(IntRect::from_xywh(0, 0, 50, 50));
    published.union(&core.record_and_publish().expect("first cycle").changed);
    core.invalidate(IntRect::from_xywh(700, 550, 100, 100));
    published.union(&core.record_and_publish().expect("second cycle").changed);

    assert_eq!(published.bounds(), IntRect::new(0, 0, 800, 650));
    assert_eq!(core.reader().tile_count(), 2);
}

#[test]
fn move_discards_rebuild_when_superseded_mid_prepare() {
    let (mut core, _) = core_with_button();
    core.invalidate(IntRect::from_size(800, 600));
    core.record_and_publish().expect("initial publish");
    let reader = core.reader();
    let published = reader.frame_cache().expect("frame cache");

    let armed = Arc::new(AtomicBool::new(false));
    {
        let armed = armed.clone();
        let reader = reader.clone();
        core.host_mut().set_traversal_hook(move || {
            if armed.swap(false, Ordering::SeqCst) {
                reader.next_generation(GenerationKind::Move);
            }
        });
    }
    let mut generation = Generation::default();
    for _ in 0..5 {
        generation = reader.next_generation(GenerationKind::Move);
    }
    assert_eq!(generation, Generation::from_raw(5));

    core.frame_cache.mark_out_of_date();
    armed.store(true, Ordering::SeqCst);
    assert!(!core.move_mouse_if_current(generation, None, None, 30, 30));

    assert_eq!(
        reader.current_generation(GenerationKind::Move),
        Generation::from_raw(6)
    );
    let current = reader.frame_cache().expect("frame cache");
    assert!(Arc::ptr_eq(&published, &current));
    assert_eq!(reader.last_generation(), Generation::default());
    assert!(core.host().mouse_position().is_none());
    assert!(core.frame_cache.is_out_of_date());

    let newest = reader.current_generation(GenerationKind::Move);
    assert!(core.move_mouse_if_current(newest, None, None, 30, 30));
    assert!(!Arc::ptr_eq(&published, &reader.frame_cache().expect("frame cache")));
    assert_eq!(reader.last_generation(), newest);
    assert_eq!(core.view().mouse_position(), IntPoint::new(30, 30));
}

#[test]
fn stale_move_is_skipped_before_any_work() {
    let (mut core, _) = core_with_button();
    let reader = core.reader();
    let old = reader.next_generation(GenerationKind::Move);
    reader.next_generation(GenerationKind::Move);

    let records_before = core.host().record_count();
    assert!(!core.move_mouse_if_current(old, None, None, 1, 1));
    assert_eq!(core.host().record_count(), records_before);
    assert!(reader.frame_cache().is_none());
}

#[test]
fn no_document_keeps_invalidation() {
    let mut core = empty_core();
    core.host_mut().set_loaded(false);
    core.invalidate(IntRect::from_xywh(10, 10, 10, 10));
    assert!(core.record_and_publish().is_none());
    assert!(!core.pending_invalidation().is_empty());

    core.host_mut().set_loaded(true);
    let update = core.record_and_publish().expect("published once loaded");
    assert!(update.changed.contains_rect(&IntRect::from_xywh(10, 10, 10, 10)));
}

#[test]
fn unsettled_layout_keeps_invalidation() {
    let mut core = empty_core();
    core.host_mut().set_mid_relayout(true);
    core.invalidate(IntRect::from_xywh(0, 0, 30, 30));
    assert!(core.record_and_publish().is_none());
    core.invalidate(IntRect::from_xywh(100, 100, 30, 30));

    core.host_mut().set_mid_relayout(false);
    let update = core.record_and_publish().expect("published");
    assert!(update.changed.contains_rect(&IntRect::from_xywh(0, 0, 30, 30)));
    assert!(update.changed.contains_rect(&IntRect::from_xywh(100, 100, 30, 30)));
}

#[test]
fn content_is_not_ready_while_loading_without_pictures() {
    let mut core = empty_core();
    core.host_mut().set_progress(0.4).expect("progress");
    core.host_mut().set_loaded(false);
    core.invalidate(IntRect::from_xywh(0, 0, 10, 10));
    assert!(core.record_and_publish().is_none());
    assert!(!core.reader().is_content_ready());

    core.host_mut().set_loaded(true);
    core.record_and_publish().expect("published while loading");
    assert!(core.reader().is_content_ready());
    let (_, done) = core.reader().read_snapshot();
    assert!(!done);
}

#[test]
fn overflowing_subframe_widens_the_view() {
    let mut core = empty_core();
    let main = core.host().main_frame();
    core.host_mut()
        .add_frame(main, IntRect::from_xywh(700, 10, 200, 100))
        .expect("frame");

    let update = core.record_and_publish().expect("published");
    assert_eq!((update.width, update.height), (900, 600));
    assert_eq!(core.host().view_size(), (900, 600));
}

#[test]
fn subframe_overflowing_the_bottom_grows_the_view_height() {
    let mut core = empty_core();
    let main = core.host().main_frame();
    core.host_mut()
        .add_frame(main, IntRect::from_xywh(0, 550, 100, 200))
        .expect("frame");

    core.record_and_publish().expect("published");
    assert_eq!(core.host().view_size(), (800, 750));
}

#[test]
fn untouched_tiles_keep_their_recording() {
    let mut core = empty_core();
    core.invalidate(IntRect::from_xywh(0, 0, 100, 100));
    core.record_and_publish().expect("first");
    let (before, _) = core.reader().read_snapshot();

    core.invalidate(IntRect::from_xywh(300, 300, 50, 50));
    core.record_and_publish().expect("second");
    let (after, _) = core.reader().read_snapshot();

    assert_eq!(after.len(), 2);
    let kept = before.tiles()[0].picture().expect("recorded");
    let still = after.tiles()[0].picture().expect("recorded");
    assert!(kept.ptr_eq(still));
}

#[test]
fn split_pieces_are_reused_in_place() {
    let config = CoreConfig {
        tiles: TileConfig {
            max_tile_area: 250_000,
            ..TileConfig::default()
        },
        ..CoreConfig::default()
    };
    let mut core = ContentCore::new(ReferenceDocument::new(800, 600), config).expect("core");
    core.invalidate(IntRect::from_size(800, 600));
    core.record_and_publish().expect("first");
    assert_eq!(core.reader().tile_count(), 1);

    assert!(core.split_content());
    assert_eq!(core.reader().tile_count(), 4);

    let piece = IntRect::new(500, 0, 800, 500);
    core.invalidate(piece);
    let update = core.record_and_publish().expect("piece rebuilt");
    assert!(update.changed.contains_rect(&piece));
    assert_eq!(core.reader().tile_count(), 4);
    let (set, _) = core.reader().read_snapshot();
    assert!(set.tiles().iter().all(|tile| tile.is_valid()));
}

#[test]
fn button_overlays_follow_node_liveness() {
    let (mut core, button) = core_with_button();
    core.invalidate(IntRect::from_size(800, 600));
    core.record_and_publish().expect("published");
    let overlays = core.reader().button_overlays();
    assert_eq!(overlays.len(), 1);
    assert_eq!(overlays[0].node, button);

    core.host_mut().remove_node(button).expect("remove");
    core.record_and_publish().expect("republished");
    assert!(core.reader().button_overlays().is_empty());
}

#[test]
fn touch_up_clicks_only_for_the_latest_touch() {
    let (mut core, button) = core_with_button();
    let reader = core.reader();
    let older = reader.next_generation(GenerationKind::Touch);
    let newest = reader.next_generation(GenerationKind::Touch);

    assert!(!core.touch_up(older, None, Some(button), 30, 30));
    assert!(core.host().clicks().is_empty());
    assert!(core.touch_up(newest, None, Some(button), 30, 30));
    assert_eq!(core.host().clicks(), &[button]);
    assert_eq!(reader.last_generation(), newest);
}

#[test]
fn key_stamps_text_generation_on_next_frame_cache() {
    let mut document = ReferenceDocument::new(800, 600);
    let main = document.main_frame();
    let input = document
        .add_node(
            main,
            IntRect::from_xywh(10, 100, 200, 20),
            NodeContent::TextInput {
                value: String::new(),
            },
        )
        .expect("input");
    document.set_focus(Some(input)).expect("focus");
    let mut core = ContentCore::new(document, CoreConfig::default()).expect("core");
    core.record_and_publish().expect("initial");

    let generation = core.reader().next_generation(GenerationKind::Text);
    let event = KeyEvent {
        key_code: 0,
        unichar: Some('a'),
        down: true,
        modifiers: KeyModifiers::empty(),
    };
    assert!(core.pass_key_to_document(generation, &event));
    assert_eq!(
        core.host().content(input),
        Some(&NodeContent::TextInput {
            value: "a".to_owned()
        })
    );

    core.record_and_publish().expect("republished");
    let snapshot = core.reader().frame_cache().expect("frame cache");
    assert_eq!(snapshot.text_generation(), generation);
}

#[test]
fn popup_reply_reaches_pending_list_box() {
    let mut document = ReferenceDocument::new(800, 600);
    let main = document.main_frame();
    let select = document
        .add_node(
            main,
            IntRect::from_xywh(0, 0, 100, 20),
            NodeContent::Select {
                options: vec!["one".into(), "two".into()],
                selected: vec![0],
                multiple: false,
            },
        )
        .expect("select");
    let mut core = ContentCore::new(document, CoreConfig::default()).expect("core");
    assert!(!core.popup_reply(ListSelection::Single(1)));

    let touch = core.reader().next_generation(GenerationKind::Touch);
    assert!(core.touch_up(touch, None, Some(select), 5, 5));
    assert!(core.popup_reply(ListSelection::Single(1)));
    let Some(NodeContent::Select { selected, .. }) = core.host().content(select) else {
        panic!("select missing");
    };
    assert_eq!(selected, &vec![1]);
}

#[test]
fn reset_drops_published_state() {
    let (mut core, _) = core_with_button();
    core.invalidate(IntRect::from_size(800, 600));
    core.record_and_publish().expect("published");
    core.invalidate(IntRect::from_xywh(0, 0, 5, 5));
    let reader = core.reader();
    assert!(reader.frame_cache().is_some());
    assert_eq!(reader.button_overlays().len(), 1);

    core.reset();
    assert!(reader.frame_cache().is_none());
    assert!(reader.button_overlays().is_empty());
    assert_eq!(reader.tile_count(), 0);
    assert!(core.pending_invalidation().is_empty());
    assert!(!reader.is_content_ready());
}

fn published_tiles_cover(reader: &ContentReader, rect: IntRect) -> bool {
    let (set, _) = reader.read_snapshot();
    let mut covered = Region::new();
    for tile in set.tiles() {
        assert!(tile.is_valid());
        covered.union_rect(tile.area());
    }
    covered.contains_rect(&rect)
}

#[test]
fn cleared_content_is_rerecorded_in_full() {
    let mut core = empty_core();
    let page = IntRect::from_size(800, 600);
    core.invalidate(page);
    core.record_and_publish().expect("first cycle");

    core.clear_content();
    core.invalidate(IntRect::from_xywh(0, 0, 10, 10));
    let update = core.record_and_publish().expect("after clear");
    assert!(update.changed.contains_rect(&page));
    assert!(published_tiles_cover(&core.reader(), page));
}

#[test]
fn content_after_reset_is_rerecorded_in_full() {
    let (mut core, _) = core_with_button();
    let page = IntRect::from_size(800, 600);
    core.invalidate(page);
    core.record_and_publish().expect("first cycle");

    core.reset();
    core.invalidate(IntRect::from_xywh(0, 0, 10, 10));
    let update = core.record_and_publish().expect("after reset");
    assert!(update.changed.contains_rect(&page));
    assert!(published_tiles_cover(&core.reader(), page));
}

#[test]
fn first_layout_and_progress_finished_rebuild_the_frame_cache() {
    let (mut core, _) = core_with_button();
    core.invalidate(IntRect::from_size(800, 600));
    core.record_and_publish().expect("published");
    let reader = core.reader();
    let recorded = reader.frame_cache().expect("frame cache after recording");
    assert!(!core.frame_cache.is_out_of_date());

    core.did_first_layout();
    let after_first_layout = reader.frame_cache().expect("frame cache after first layout");
    assert!(!Arc::ptr_eq(&recorded, &after_first_layout));

    core.notify_progress_finished();
    let after_progress = reader.frame_cache().expect("frame cache after progress finished");
    assert!(!Arc::ptr_eq(&after_first_layout, &after_progress));
    assert_eq!(after_progress.nav().len(), 1);
}

#[test]
fn size_changes_relayout_and_dirty_content() {
    let mut core = empty_core();
    assert_eq!(
        core.set_size(0, 600, 480, 1.0),
        Err(ViewStateError::InvalidWidth(0))
    );
    assert_eq!(core.set_size(1000, 600, 480, 1.0), Ok(true));
    assert_eq!(core.view().max_scroll(), (120, 72));
    assert_eq!(core.host().contents_size(), (1000, 600));
    assert!(core.pending_invalidation().contains_rect(&IntRect::from_size(1000, 600)));
    assert_eq!(core.set_size(1000, 600, 480, 2.0), Ok(false));
}

#[test]
fn reader_draws_published_content() {
    let mut document = ReferenceDocument::new(100, 100);
    let main = document.main_frame();
    document
        .add_node(
            main,
            IntRect::from_xywh(10, 10, 20, 20),
            NodeContent::Block {
                color: Color::rgb(200, 0, 0),
            },
        )
        .expect("block");
    let mut core = ContentCore::new(document, CoreConfig::default()).expect("core");
    core.invalidate(IntRect::from_size(100, 100));
    core.record_and_publish().expect("published");

    let mut canvas = PixelCanvas::new(120, 100);
    assert!(!core.reader().draw_into(&mut canvas, Color::BLACK));
    assert_eq!(canvas.pixel(15, 15), Some(Color::rgb(200, 0, 0)));
    assert_eq!(canvas.pixel(50, 50), Some(Color::WHITE));
    assert_eq!(canvas.pixel(110, 50), Some(Color::BLACK));
}

#[test]
fn hit_test_uses_published_frame_cache() {
    let (mut core, button) = core_with_button();
    let reader = core.reader();
    assert!(reader.hit_test(IntPoint::new(25, 25)).is_none());
    core.invalidate(IntRect::from_size(800, 600));
    core.record_and_publish().expect("published");
    assert_eq!(
        reader.hit_test(IntPoint::new(25, 25)).map(|hit| hit.node),
        Some(button)
    );
    assert!(reader.hit_test(IntPoint::new(500, 500)).is_none());
}
