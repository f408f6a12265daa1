//! The published picture set and the lock around it.
//!
//! Nothing records or draws with the lock held: readers copy the set out (tile pictures are
//! shared, so the copy is shallow), work on the copy, and come back only to write draw
//! statistics.

use model::{IntPoint, IntRect};
use parking_lot::Mutex;
use render_protocol::{Canvas, Color, Picture, RecordingCanvas};
use tiles::{PictureSet, TileConfig};

#[derive(Debug)]
struct PublishedContent {
    pictures: PictureSet,
    progress_done: bool,
}

#[derive(Debug)]
pub struct ContentSynchronizer {
    published: Mutex<PublishedContent>,
}

impl ContentSynchronizer {
    pub fn new(config: TileConfig) -> Self {
        Self {
            published: Mutex::new(PublishedContent {
                pictures: PictureSet::new(config),
                progress_done: false,
            }),
        }
    }

    /// Copy of the published set and whether loading was idle when it was recorded.
    pub fn read_snapshot(&self) -> (PictureSet, bool) {
        let published = self.published.lock();
        (published.pictures.clone(), published.progress_done)
    }

    /// Loading finished, or something was published anyway.
    pub fn is_content_ready(&self) -> bool {
        let published = self.published.lock();
        published.progress_done || !published.pictures.is_empty()
    }

    /// Draws the published set into `canvas`, filling everything outside the content with
    /// `background`. Returns true when some tile was slow to draw.
    pub fn draw_into(&self, canvas: &mut dyn Canvas, background: Color) -> bool {
        let (mut copy, _) = self.read_snapshot();
        let device = canvas.device_bounds();
        let content = copy.content_rect();
        if content.is_empty() {
            canvas.fill_rect(device, background);
        } else {
            for outside in device.subtract(&content) {
                canvas.fill_rect(outside, background);
            }
        }
        let took_too_long = copy.draw(canvas);
        self.published.lock().pictures.set_draw_times(&copy);
        took_too_long
    }

    /// Flattens the published set into one picture covering the whole content.
    pub fn copy_content_to_picture(&self) -> Picture {
        let (mut copy, _) = self.read_snapshot();
        let mut recorder = RecordingCanvas::new(copy.width(), copy.height());
        copy.draw(&mut recorder);
        recorder.finish(IntPoint::default())
    }

    pub fn content_rect(&self) -> IntRect {
        self.published.lock().pictures.content_rect()
    }

    pub fn tile_count(&self) -> usize {
        self.published.lock().pictures.len()
    }

    /// Starts a record cycle: remembers the load state and hands out a working copy.
    pub(crate) fn begin_cycle(&self, progress_done: bool) -> PictureSet {
        let mut published = self.published.lock();
        published.progress_done = progress_done;
        published.pictures.clone()
    }

    /// Replaces the published set with `recorded`, keeping draw statistics of tiles that
    /// survived. Returns the published content size.
    pub(crate) fn publish(&self, mut recorded: PictureSet) -> (i32, i32) {
        let mut published = self.published.lock();
        recorded.set_draw_times(&published.pictures);
        published.pictures = recorded;
        (published.pictures.width(), published.pictures.height())
    }

    pub(crate) fn split_published(&self, out: &mut PictureSet) {
        self.published.lock().pictures.split(out);
    }

    pub(crate) fn replace(&self, pictures: PictureSet) {
        self.published.lock().pictures = pictures;
    }

    pub(crate) fn clear(&self) {
        self.published.lock().pictures.clear();
    }

    pub(crate) fn reset(&self) {
        let mut published = self.published.lock();
        published.pictures.clear();
        published.progress_done = false;
    }
}
