//! Tiled container of recorded paint output.
//!
//! A [`PictureSet`] is an ordered list of [`Tile`]s over content space. New invalidations are
//! appended as tiles covering the invalid bounds; [`PictureSet::build`] then reconciles the
//! list back to front so that later tiles win and no two tiles overlap.

use std::time::{Duration, Instant};

use bitvec::prelude::{BitVec, Lsb0};
use model::{IntRect, Region};
use render_protocol::{Canvas, Picture};
use thiserror::Error;

mod dirty;

pub use dirty::InvalidationAccumulator;

pub const DEFAULT_MAX_TILE_AREA: i64 = 512 * 512;
pub const DEFAULT_DRAW_BUDGET: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileConfig {
    /// Tiles larger than this are cut into a grid by [`PictureSet::split`].
    pub max_tile_area: i64,
    /// A single tile draw slower than this reports `took_too_long`.
    pub draw_budget: Duration,
}

impl Default for TileConfig {
    fn default() -> Self {
        Self {
            max_tile_area: DEFAULT_MAX_TILE_AREA,
            draw_budget: DEFAULT_DRAW_BUDGET,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TileConfigError {
    #[error("max tile area must be positive, got {0}")]
    NonPositiveTileArea(i64),
    #[error("draw budget must be non-zero")]
    ZeroDrawBudget,
}

impl TileConfig {
    pub fn validate(&self) -> Result<(), TileConfigError> {
        if self.max_tile_area <= 0 {
            return Err(TileConfigError::NonPositiveTileArea(self.max_tile_area));
        }
        if self.draw_budget.is_zero() {
            return Err(TileConfigError::ZeroDrawBudget);
        }
        Ok(())
    }

    /// Side of the square cells produced by `split`.
    pub fn split_cell_side(&self) -> i32 {
        self.max_tile_area.isqrt().clamp(1, i32::MAX as i64) as i32
    }
}

#[derive(Debug, Clone)]
pub struct Tile {
    area: IntRect,
    picture: Option<Picture>,
    elapsed: Duration,
    split: bool,
}

impl Tile {
    pub fn area(&self) -> IntRect {
        self.area
    }

    pub fn picture(&self) -> Option<&Picture> {
        self.picture.as_ref()
    }

    pub fn is_valid(&self) -> bool {
        self.picture.is_some()
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn is_split_piece(&self) -> bool {
        self.split
    }

    fn clipped_to(&self, area: IntRect) -> Tile {
        Tile {
            area,
            picture: self.picture.clone(),
            elapsed: self.elapsed,
            split: self.split,
        }
    }

    fn same_recording(&self, other: &Tile) -> bool {
        if self.area != other.area {
            return false;
        }
        match (&self.picture, &other.picture) {
            (Some(left), Some(right)) => left.ptr_eq(right),
            (None, None) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PictureSet {
    width: i32,
    height: i32,
    tiles: Vec<Tile>,
    config: TileConfig,
    /// Set by the first `check_dimensions`; survives `clear`.
    sized: bool,
}

impl PictureSet {
    pub fn new(config: TileConfig) -> Self {
        Self {
            width: 0,
            height: 0,
            tiles: Vec::new(),
            config,
            sized: false,
        }
    }

    pub fn config(&self) -> TileConfig {
        self.config
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn content_rect(&self) -> IntRect {
        IntRect::from_size(self.width, self.height)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn bounds(&self, index: usize) -> IntRect {
        self.tile(index).area
    }

    pub fn up_to_date(&self, index: usize) -> bool {
        self.tile(index).is_valid()
    }

    pub fn set_picture(&mut self, index: usize, picture: Picture) {
        let tile_count = self.tiles.len();
        let Some(tile) = self.tiles.get_mut(index) else {
            panic!("tile index {index} out of bounds for picture set of {tile_count} tiles");
        };
        tile.picture = Some(picture);
    }

    /// One bit per tile, set when the tile still needs recording.
    pub fn invalid_tiles(&self) -> BitVec<usize, Lsb0> {
        self.tiles.iter().map(|tile| !tile.is_valid()).collect()
    }

    pub fn clear(&mut self) {
        self.tiles.clear();
        self.width = 0;
        self.height = 0;
    }

    pub fn set(&mut self, source: &PictureSet) {
        self.clone_from(source);
    }

    /// Adopts the content size, dirtying whatever the change exposes.
    ///
    /// The very first sizing only records the size. After that, growing height alone dirties
    /// the new strip and any other change drops every tile and dirties the full content rect.
    /// A cleared set counts as 0x0, so its next sizing dirties everything.
    pub fn check_dimensions(&mut self, width: i32, height: i32, inval: &mut Region) {
        if self.width == width && self.height == height {
            return;
        }
        let first_sizing = !self.sized && self.tiles.is_empty();
        tracing::trace!(
            old_width = self.width,
            old_height = self.height,
            width,
            height,
            first_sizing,
            "picture set dimensions changed"
        );
        if !first_sizing {
            if self.width == width && height > self.height {
                inval.union_rect(IntRect::new(0, self.height, width, height));
            } else {
                self.tiles.clear();
                inval.union_rect(IntRect::from_size(width, height));
            }
        }
        self.width = width;
        self.height = height;
        self.sized = true;
    }

    /// Re-targets split pieces when `inval` lands exactly on one of them.
    ///
    /// On success the matching piece and every tile inside `inval` lose their picture and the
    /// caller rebuilds them in place instead of appending a new tile.
    pub fn reuse_subdivided(&mut self, inval: &Region) -> bool {
        if inval.is_empty() || inval.is_complex() {
            return false;
        }
        let inval_bounds = inval.bounds();
        let Some(matched) = self
            .tiles
            .iter()
            .position(|tile| tile.split && tile.area == inval_bounds)
        else {
            return false;
        };
        let partially_overlapped = self.tiles[matched + 1..].iter().any(|tile| {
            tile.area.intersects(&inval_bounds) && !inval_bounds.contains_rect(&tile.area)
        });
        if partially_overlapped {
            return false;
        }
        for tile in &mut self.tiles {
            let exact_piece = tile.split && tile.area == inval_bounds;
            if exact_piece || inval_bounds.contains_rect(&tile.area) {
                tile.picture = None;
            }
        }
        tracing::trace!(?inval_bounds, "reusing split piece");
        true
    }

    pub fn add(&mut self, region: &Region, picture: Option<Picture>, elapsed: Duration, split: bool) {
        let area = region.bounds();
        if area.is_empty() {
            debug_assert!(false, "adding a tile with an empty area");
            return;
        }
        self.tiles.push(Tile {
            area,
            picture,
            elapsed,
            split,
        });
    }

    /// Removes tiles hidden by later ones and clips partly hidden tiles to what remains
    /// visible. Returns true when some tile still needs recording.
    pub fn build(&mut self) -> bool {
        let mut covered = Region::new();
        let mut visible_back_to_front = Vec::with_capacity(self.tiles.len());
        let mut removed = 0usize;
        for tile in self.tiles.iter().rev() {
            if covered.contains_rect(&tile.area) {
                removed += 1;
                continue;
            }
            if covered.intersects_rect(&tile.area) {
                let mut visible = Region::from_rect(tile.area);
                visible.subtract(&covered);
                for piece in visible.rects().iter().rev() {
                    visible_back_to_front.push(tile.clipped_to(*piece));
                }
            } else {
                visible_back_to_front.push(tile.clone());
            }
            covered.union_rect(tile.area);
        }
        visible_back_to_front.reverse();
        self.tiles = visible_back_to_front;
        self.validate("build");

        let needs_rebuild = self.tiles.iter().any(|tile| !tile.is_valid());
        tracing::trace!(
            tiles = self.tiles.len(),
            removed,
            needs_rebuild,
            "picture set built"
        );
        needs_rebuild
    }

    /// Writes into `out` a copy of this set whose oversized tiles are cut into invalid grid
    /// cells no larger than the configured area.
    pub fn split(&self, out: &mut PictureSet) {
        out.width = self.width;
        out.height = self.height;
        out.config = self.config;
        out.sized = self.sized;
        out.tiles.clear();
        let side = self.config.split_cell_side();
        for tile in &self.tiles {
            if tile.area.area() <= self.config.max_tile_area {
                out.tiles.push(tile.clone());
                continue;
            }
            let area = tile.area;
            let mut y = area.min_y;
            while y < area.max_y {
                let bottom = y.saturating_add(side).min(area.max_y);
                let mut x = area.min_x;
                while x < area.max_x {
                    let right = x.saturating_add(side).min(area.max_x);
                    out.tiles.push(Tile {
                        area: IntRect::new(x, y, right, bottom),
                        picture: None,
                        elapsed: Duration::ZERO,
                        split: true,
                    });
                    x = right;
                }
                y = bottom;
            }
        }
        tracing::trace!(before = self.tiles.len(), after = out.tiles.len(), side, "picture set split");
    }

    /// Plays back every recorded tile clipped to its area. Returns true when one tile took
    /// longer than the draw budget.
    pub fn draw(&mut self, canvas: &mut dyn Canvas) -> bool {
        if self.width <= 0 || self.height <= 0 {
            return false;
        }
        let budget = self.config.draw_budget;
        let mut took_too_long = false;
        for tile in &mut self.tiles {
            let Some(picture) = &tile.picture else {
                continue;
            };
            let started = Instant::now();
            canvas.save();
            canvas.clip_rect(tile.area);
            let origin = picture.origin();
            canvas.translate(origin.x, origin.y);
            picture.playback(canvas);
            canvas.restore();
            tile.elapsed = started.elapsed();
            if tile.elapsed > budget {
                tracing::debug!(
                    area = ?tile.area,
                    elapsed_us = tile.elapsed.as_micros() as u64,
                    "tile draw exceeded budget"
                );
                took_too_long = true;
            }
        }
        took_too_long
    }

    /// Copies draw statistics from `source` for tiles holding the same recording; geometry
    /// and pictures are left alone.
    pub fn set_draw_times(&mut self, source: &PictureSet) {
        if self.width != source.width || self.height != source.height {
            return;
        }
        let mut source_tiles = source.tiles.iter().peekable();
        for tile in &mut self.tiles {
            let Some(candidate) = source_tiles.peek() else {
                break;
            };
            if tile.same_recording(candidate) {
                tile.elapsed = candidate.elapsed;
                source_tiles.next();
            }
        }
    }

    /// Panics in debug builds when two tiles overlap.
    pub fn validate(&self, context: &str) {
        if !cfg!(debug_assertions) {
            return;
        }
        for (index, tile) in self.tiles.iter().enumerate() {
            assert!(
                !tile.area.is_empty(),
                "{context}: tile {index} has an empty area"
            );
            for (offset, other) in self.tiles[index + 1..].iter().enumerate() {
                assert!(
                    !tile.area.intersects(&other.area),
                    "{context}: tile {index} {:?} overlaps tile {} {:?}",
                    tile.area,
                    index + 1 + offset,
                    other.area
                );
            }
        }
    }

    fn tile(&self, index: usize) -> &Tile {
        let tile_count = self.tiles.len();
        self.tiles.get(index).unwrap_or_else(|| {
            panic!("tile index {index} out of bounds for picture set of {tile_count} tiles")
        })
    }
}
