//! Integer geometry shared by every crate in the workspace.
//!
//! Rectangles are half-open (`min` inclusive, `max` exclusive). A [`Region`] is a set of
//! pairwise disjoint rectangles and is closed under union and difference.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct IntPoint {
    pub x: i32,
    pub y: i32,
}

impl IntPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset_by(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct IntRect {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl IntRect {
    pub const EMPTY: Self = Self {
        min_x: 0,
        min_y: 0,
        max_x: 0,
        max_y: 0,
    };

    /// Everything an invalidation can legally touch.
    pub const UNBOUNDED_CONTENT: Self = Self {
        min_x: 0,
        min_y: 0,
        max_x: i32::MAX,
        max_y: i32::MAX,
    };

    pub const fn new(min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn from_xywh(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x.saturating_add(width),
            max_y: y.saturating_add(height),
        }
    }

    pub fn from_size(width: i32, height: i32) -> Self {
        Self::from_xywh(0, 0, width, height)
    }

    pub fn is_empty(&self) -> bool {
        self.min_x >= self.max_x || self.min_y >= self.max_y
    }

    pub fn width(&self) -> i32 {
        self.max_x.saturating_sub(self.min_x).max(0)
    }

    pub fn height(&self) -> i32 {
        self.max_y.saturating_sub(self.min_y).max(0)
    }

    pub fn area(&self) -> i64 {
        if self.is_empty() {
            return 0;
        }
        (self.max_x as i64 - self.min_x as i64) * (self.max_y as i64 - self.min_y as i64)
    }

    pub fn origin(&self) -> IntPoint {
        IntPoint::new(self.min_x, self.min_y)
    }

    /// Center rounded toward the origin, `x + (width >> 1)`.
    pub fn center(&self) -> IntPoint {
        IntPoint::new(
            self.min_x.saturating_add(self.width() >> 1),
            self.min_y.saturating_add(self.height() >> 1),
        )
    }

    pub fn translated(&self, dx: i32, dy: i32) -> Self {
        Self {
            min_x: self.min_x.saturating_add(dx),
            min_y: self.min_y.saturating_add(dy),
            max_x: self.max_x.saturating_add(dx),
            max_y: self.max_y.saturating_add(dy),
        }
    }

    pub fn contains_point(&self, point: IntPoint) -> bool {
        point.x >= self.min_x && point.x < self.max_x && point.y >= self.min_y && point.y < self.max_y
    }

    pub fn contains_rect(&self, other: &IntRect) -> bool {
        if other.is_empty() {
            return true;
        }
        !self.is_empty()
            && other.min_x >= self.min_x
            && other.min_y >= self.min_y
            && other.max_x <= self.max_x
            && other.max_y <= self.max_y
    }

    pub fn intersects(&self, other: &IntRect) -> bool {
        self.intersection(other).is_some()
    }

    pub fn intersection(&self, other: &IntRect) -> Option<IntRect> {
        let clipped = IntRect {
            min_x: self.min_x.max(other.min_x),
            min_y: self.min_y.max(other.min_y),
            max_x: self.max_x.min(other.max_x),
            max_y: self.max_y.min(other.max_y),
        };
        (!clipped.is_empty()).then_some(clipped)
    }

    /// Smallest rectangle containing both; an empty operand is ignored.
    pub fn join(&self, other: &IntRect) -> IntRect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        IntRect {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Pieces of `self` not covered by `other`; at most four, pairwise disjoint.
    pub fn subtract(&self, other: &IntRect) -> SmallVec<[IntRect; 4]> {
        let mut pieces = SmallVec::new();
        if self.is_empty() {
            return pieces;
        }
        let Some(overlap) = self.intersection(other) else {
            pieces.push(*self);
            return pieces;
        };
        if overlap.min_y > self.min_y {
            pieces.push(IntRect::new(self.min_x, self.min_y, self.max_x, overlap.min_y));
        }
        if overlap.max_y < self.max_y {
            pieces.push(IntRect::new(self.min_x, overlap.max_y, self.max_x, self.max_y));
        }
        if overlap.min_x > self.min_x {
            pieces.push(IntRect::new(self.min_x, overlap.min_y, overlap.min_x, overlap.max_y));
        }
        if overlap.max_x < self.max_x {
            pieces.push(IntRect::new(overlap.max_x, overlap.min_y, self.max_x, overlap.max_y));
        }
        pieces
    }
}

/// Union-closed set of disjoint rectangles.
///
/// Structural equality (`==`) compares decompositions; use [`Region::same_area`] when two
/// regions may have been built in a different order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Region {
    rects: SmallVec<[IntRect; 4]>,
}

impl Region {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rect(rect: IntRect) -> Self {
        let mut region = Self::new();
        region.union_rect(rect);
        region
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    pub fn clear(&mut self) {
        self.rects.clear();
    }

    pub fn rects(&self) -> &[IntRect] {
        &self.rects
    }

    pub fn area(&self) -> i64 {
        self.rects.iter().map(IntRect::area).sum()
    }

    pub fn bounds(&self) -> IntRect {
        self.rects
            .iter()
            .fold(IntRect::EMPTY, |bounds, rect| bounds.join(rect))
    }

    /// True when the region is exactly one rectangle (however it is decomposed).
    pub fn is_rect(&self) -> bool {
        !self.is_empty() && self.area() == self.bounds().area()
    }

    pub fn is_complex(&self) -> bool {
        !self.is_empty() && !self.is_rect()
    }

    /// Adds `rect`; returns false when it was already covered.
    pub fn union_rect(&mut self, rect: IntRect) -> bool {
        if rect.is_empty() {
            return false;
        }
        let mut uncovered: SmallVec<[IntRect; 8]> = SmallVec::new();
        uncovered.push(rect);
        for existing in &self.rects {
            let mut remaining = SmallVec::new();
            for piece in &uncovered {
                remaining.extend(piece.subtract(existing));
            }
            uncovered = remaining;
            if uncovered.is_empty() {
                return false;
            }
        }
        self.rects.extend(uncovered);
        self.coalesce();
        true
    }

    /// Merges pairs of rects that share a whole edge until none are left.
    fn coalesce(&mut self) {
        let mut merged = true;
        while merged {
            merged = false;
            'scan: for first in 0..self.rects.len() {
                for second in first + 1..self.rects.len() {
                    if let Some(joined) = edge_join(&self.rects[first], &self.rects[second]) {
                        self.rects[first] = joined;
                        self.rects.swap_remove(second);
                        merged = true;
                        break 'scan;
                    }
                }
            }
        }
    }

    pub fn union(&mut self, other: &Region) -> bool {
        let mut changed = false;
        for rect in other.rects() {
            changed |= self.union_rect(*rect);
        }
        changed
    }

    pub fn subtract_rect(&mut self, rect: &IntRect) {
        if rect.is_empty() || self.is_empty() {
            return;
        }
        let mut remaining = SmallVec::new();
        for existing in &self.rects {
            remaining.extend(existing.subtract(rect));
        }
        self.rects = remaining;
    }

    pub fn subtract(&mut self, other: &Region) {
        for rect in other.rects() {
            self.subtract_rect(rect);
            if self.is_empty() {
                return;
            }
        }
    }

    pub fn intersect_rect(&self, rect: &IntRect) -> Region {
        Region {
            rects: self
                .rects
                .iter()
                .filter_map(|existing| existing.intersection(rect))
                .collect(),
        }
    }

    pub fn intersects_rect(&self, rect: &IntRect) -> bool {
        self.rects.iter().any(|existing| existing.intersects(rect))
    }

    pub fn contains_rect(&self, rect: &IntRect) -> bool {
        if rect.is_empty() {
            return true;
        }
        let mut remainder = Region::from_rect(*rect);
        remainder.subtract(self);
        remainder.is_empty()
    }

    pub fn covers(&self, other: &Region) -> bool {
        other.rects().iter().all(|rect| self.contains_rect(rect))
    }

    pub fn same_area(&self, other: &Region) -> bool {
        self.covers(other) && other.covers(self)
    }
}

fn edge_join(a: &IntRect, b: &IntRect) -> Option<IntRect> {
    let stacked = a.min_x == b.min_x
        && a.max_x == b.max_x
        && (a.max_y == b.min_y || b.max_y == a.min_y);
    let side_by_side = a.min_y == b.min_y
        && a.max_y == b.max_y
        && (a.max_x == b.min_x || b.max_x == a.min_x);
    (stacked || side_by_side).then(|| a.join(b))
}

impl From<IntRect> for Region {
    fn from(rect: IntRect) -> Self {
        Region::from_rect(rect)
    }
}

/// Opaque, stable identifier of a document node. Never an owning reference: it must be
/// re-resolved through the document host before use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u64);

impl NodeId {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FrameId(u64);

impl FrameId {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}
