//! Snapping and measurement math.
//!
//! Pure functions with no state, kept apart from the session for testability.

use crate::model::Point;

/// Grid sizes at or below this are treated as unset.
const MIN_GRID_SIZE: f64 = f64::EPSILON;

/// Effective grid size: unset, zero, negative or non-finite sizes become 1.
pub fn effective_grid_size(grid_size: f64) -> f64 {
    if grid_size.is_finite() && grid_size > MIN_GRID_SIZE {
        grid_size
    } else {
        1.0
    }
}

/// Snap a point to the nearest grid intersection.
///
/// Identity when `enabled` is false. Each coordinate rounds to the nearest
/// multiple of the grid size (`round(v / g) * g`).
pub fn snap(point: Point, grid_size: f64, enabled: bool) -> Point {
    if !enabled {
        return point;
    }
    let g = effective_grid_size(grid_size);
    Point::new(snap_value(point.lat, g), snap_value(point.lng, g))
}

fn snap_value(value: f64, grid: f64) -> f64 {
    // Halves round towards +inf on both sides of zero.
    let snapped = (value / grid + 0.5).floor() * grid;
    // Normalize -0.0 so snapped coordinates serialize as plain 0.
    if snapped == 0.0 { 0.0 } else { snapped }
}

/// Distance between two points, in map pixels and in world units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub pixels: f64,
    pub units: f64,
}

impl Measurement {
    /// Pixel distance with one decimal.
    pub fn pixels_text(&self) -> String {
        format!("{:.1}", self.pixels)
    }

    /// Unit distance with two decimals.
    pub fn units_text(&self) -> String {
        format!("{:.2}", self.units)
    }
}

/// Measure the distance between `a` and `b` under a pixels-per-unit scale.
pub fn measure(a: Point, b: Point, pixels_per_unit: f64) -> Measurement {
    let pixels = a.distance_to(&b);
    let scale = if pixels_per_unit.is_finite() && pixels_per_unit > 0.0 {
        pixels_per_unit
    } else {
        1.0
    };
    Measurement {
        pixels,
        units: pixels / scale,
    }
}

/// Whether a click lands close enough to the first vertex to close a polygon.
///
/// The threshold is `max(grid_size, 1)` world units, inclusive.
pub fn closes_polygon(first: Point, click: Point, grid_size: f64) -> bool {
    let threshold = if grid_size.is_finite() {
        grid_size.max(1.0)
    } else {
        1.0
    };
    first.distance_to(&click) <= threshold
}
