//! Planar position in world units.

use serde::{Deserialize, Serialize};

/// A position on the map.
///
/// `lat` is the vertical axis and `lng` the horizontal one, matching the
/// record schema. Both are world units under the session's fixed scale.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub lat: f64,
    pub lng: f64,
}

impl Point {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Point) -> f64 {
        (self.lat - other.lat).hypot(self.lng - other.lng)
    }
}
