//! Small geometry helpers shared by the block store and the query surface.
//!
//! Grounded in `maths_utils::{Box, Size, Vector2}` from `original_source`:
//! the C++ engine keeps areas as a position plus a size. We keep the same
//! shape but drop the templated `Box<T>`/`Size<T>` machinery in favor of two
//! concrete types, since this crate only ever needs an integer box (world
//! coordinates, block areas) and a float box (the live-area cache).

use std::fmt;

/// A cell coordinate in world space.
pub type Coord = (i32, i32);

/// An axis-aligned integer box: position of the bottom-left corner plus a
/// width and height. Mirrors `utils::Boxi`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Area {
    /// X coordinate of the bottom-left corner.
    pub x: i32,
    /// Y coordinate of the bottom-left corner.
    pub y: i32,
    /// Width, in cells.
    pub w: i32,
    /// Height, in cells.
    pub h: i32,
}

impl Area {
    /// Creates a new area.
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Area { x, y, w, h }
    }

    /// `true` if the area has a strictly positive width and height.
    pub fn valid(&self) -> bool {
        self.w > 0 && self.h > 0
    }

    /// Inclusive left bound.
    pub fn left(&self) -> i32 {
        self.x
    }

    /// Exclusive right bound.
    pub fn right(&self) -> i32 {
        self.x + self.w
    }

    /// Inclusive bottom bound.
    pub fn bottom(&self) -> i32 {
        self.y
    }

    /// Exclusive top bound.
    pub fn top(&self) -> i32 {
        self.y + self.h
    }

    /// The center of the area. Used as the key for the center-hash index.
    pub fn center(&self) -> Coord {
        (self.x + self.w / 2, self.y + self.h / 2)
    }

    /// `true` if `coord` lies within `[left, right) x [bottom, top)`.
    pub fn contains(&self, coord: Coord) -> bool {
        coord.0 >= self.left()
            && coord.0 < self.right()
            && coord.1 >= self.bottom()
            && coord.1 < self.top()
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}x{}]", self.x, self.y, self.w, self.h)
    }
}

/// An axis-aligned floating point box, used for [`crate::Engine::live_area`].
/// Mirrors `utils::Boxf`.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct AreaF {
    /// X coordinate of the bottom-left corner.
    pub x: f32,
    /// Y coordinate of the bottom-left corner.
    pub y: f32,
    /// Width.
    pub w: f32,
    /// Height.
    pub h: f32,
}

impl AreaF {
    /// Creates a new float area.
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        AreaF { x, y, w, h }
    }

    /// `true` if `coord` lies within the area, inclusive of both bounds.
    pub fn contains(&self, coord: Coord) -> bool {
        let (cx, cy) = (coord.0 as f32, coord.1 as f32);
        cx >= self.x && cx <= self.x + self.w && cy >= self.y && cy <= self.y + self.h
    }

    /// Grows the area so that it also contains `coord`. The area must
    /// already describe a real box (even a single point); callers building
    /// a box up from nothing should seed it from their first data point
    /// rather than from a `(0, 0)`-sized default (see
    /// `BlockStore::update_live_area`), since a box that legitimately has
    /// zero width or height is indistinguishable from "no data yet".
    pub fn grow_to_contain(&mut self, coord: Coord) {
        let (cx, cy) = (coord.0 as f32, coord.1 as f32);
        let left = self.x.min(cx);
        let bottom = self.y.min(cy);
        let right = (self.x + self.w).max(cx);
        let top = (self.y + self.h).max(cy);
        self.x = left;
        self.y = bottom;
        self.w = right - left;
        self.h = top - bottom;
    }
}
