use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

/// A 2D point or vector in physical pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// True when either axis is zero, i.e. nothing would be visible.
    pub fn is_empty_area(&self) -> bool {
        self.x == 0.0 || self.y == 0.0
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Point {
    fn add_assign(&mut self, rhs: Point) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self::new(x, y)
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x as f32, y as f32)
    }
}

/// Safe-area insets of a frame, in density-independent units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Insets {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

/// Conversion factors from density-independent units to pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub px_per_dp: f32,
    pub px_per_sp: f32,
}

impl Metric {
    pub fn dp(&self, v: f32) -> f32 {
        v * self.px_per_dp
    }

    /// Top-left inset offset, in pixels.
    pub fn inset_origin(&self, insets: &Insets) -> Point {
        Point::new(self.dp(insets.left), self.dp(insets.top))
    }
}

impl Default for Metric {
    fn default() -> Self {
        Self {
            px_per_dp: 1.0,
            px_per_sp: 1.0,
        }
    }
}
