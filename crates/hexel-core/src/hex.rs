//! Hex coordinate system and the geometry engine.
//!
//! Boards use *offset* coordinates `(x, y)` = `(column, row)` on a flat-top
//! grid where odd columns are pushed down by half a hex. This module maps
//! those coordinates to pixel centers and back, and produces the outline
//! polygon used for both filling and stroking a hex.
//!
//! Every function here is pure: the only input besides the coordinate is the
//! circumradius of a hex in pixels.

use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Radius used by newly created boards.
pub const DEFAULT_RADIUS: f64 = 30.0;

/// Smallest radius the editor offers.
pub const MIN_RADIUS: f64 = 20.0;

/// Largest radius the editor offers.
pub const MAX_RADIUS: f64 = 100.0;

/// A hex key that could not be parsed back into a coordinate.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("Invalid hex key {0:?}, expected \"x,y\"")]
pub struct InvalidHexKey(pub String);

/// Offset coordinate of a hex on the board.
///
/// Serialized as a two element array `[x, y]`, which is how stored boards
/// record a hex location.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(from = "[i32; 2]", into = "[i32; 2]")]
pub struct HexCoord {
    /// Column (increases going east)
    pub x: i32,
    /// Row (increases going south)
    pub y: i32,
}

impl HexCoord {
    /// Create a new hex coordinate
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Whether this hex sits in an odd column, i.e. is shifted down half a hex.
    pub const fn is_odd_column(&self) -> bool {
        self.x.rem_euclid(2) == 1
    }

    /// The map key of this location, `"x,y"`.
    pub fn key(&self) -> String {
        self.to_string()
    }

    /// Parse a key produced by [`HexCoord::key`].
    pub fn from_key(key: &str) -> Result<Self, InvalidHexKey> {
        key.parse()
    }

    /// Pixel center of this hex for the given circumradius.
    pub fn to_pixel_center(&self, radius: f64) -> Point {
        let row = if self.is_odd_column() {
            self.y as f64 + 0.5
        } else {
            self.y as f64
        };
        Point::new(
            self.x as f64 * hex_width(radius),
            row * hex_height(radius),
        )
    }

    /// The hex whose center is nearest to `point` by rounding.
    ///
    /// This is not an exact point-in-hexagon test: points close to an edge
    /// may resolve to the neighbor. Stored layouts were drawn against this
    /// exact mapping, so it must stay as is.
    pub fn from_pixel(point: Point, radius: f64) -> Self {
        let width = hex_width(radius);
        let height = hex_height(radius);

        let x = round_half_up(point.x / width) as i32;
        let y = if x.rem_euclid(2) == 1 {
            round_half_up((point.y - width / 2.0) / height)
        } else {
            round_half_up(point.y / height)
        };
        Self::new(x, y as i32)
    }

    /// Outline of this hex in pixel space.
    pub fn polygon(&self, radius: f64) -> [Point; 6] {
        hex_polygon(self.to_pixel_center(radius), radius)
    }
}

impl fmt::Display for HexCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

impl FromStr for HexCoord {
    type Err = InvalidHexKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidHexKey(s.to_string());
        let (x, y) = s.split_once(',').ok_or_else(invalid)?;
        let x = x.trim().parse().map_err(|_| invalid())?;
        let y = y.trim().parse().map_err(|_| invalid())?;
        Ok(Self::new(x, y))
    }
}

impl From<[i32; 2]> for HexCoord {
    fn from([x, y]: [i32; 2]) -> Self {
        Self::new(x, y)
    }
}

impl From<HexCoord> for [i32; 2] {
    fn from(coord: HexCoord) -> Self {
        [coord.x, coord.y]
    }
}

impl From<(i32, i32)> for HexCoord {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

/// Horizontal distance between the centers of adjacent columns.
pub fn hex_width(radius: f64) -> f64 {
    (1.0 + (PI / 6.0).sin()) * radius
}

/// Vertical distance between the centers of adjacent rows.
pub fn hex_height(radius: f64) -> f64 {
    2.0 * radius * (PI / 6.0).cos()
}

/// The six corners of a flat-top hex around `center`.
///
/// Corners are at `i * 60°` for `i` in `1..=6`; the last one is the
/// rightmost corner, so the outline starts and ends there.
pub fn hex_polygon(center: Point, radius: f64) -> [Point; 6] {
    std::array::from_fn(|i| {
        let angle = (i + 1) as f64 * PI / 3.0;
        Point::new(
            center.x + angle.cos() * radius,
            center.y + angle.sin() * radius,
        )
    })
}

/// Round with halves going up (towards positive infinity).
fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}
