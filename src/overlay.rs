//! The always-present radius overlay.
//!
//! A draggable center with two concentric rings of fixed diameter. The rings
//! move only as a pair with the center; each ring's visibility toggles on its
//! own.

use crate::constants::RING_DIAMETERS;
use crate::geometry::snap;
use crate::model::Point;

/// One ring of the overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ring {
    /// Diameter in world units.
    pub diameter: f64,
    pub visible: bool,
}

impl Ring {
    /// Radius in map coordinates under the given scale.
    pub fn radius(&self, pixels_per_unit: f64) -> f64 {
        self.diameter / 2.0 * pixels_per_unit
    }
}

/// Center plus exactly two rings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiusOverlay {
    pub center: Point,
    pub rings: [Ring; 2],
}

impl RadiusOverlay {
    pub fn new(center: Point) -> Self {
        Self {
            center,
            rings: RING_DIAMETERS.map(|diameter| Ring {
                diameter,
                visible: true,
            }),
        }
    }
}

/// Session-wide controller of the single overlay instance.
#[derive(Debug, Clone)]
pub struct RadiusOverlayController {
    overlay: RadiusOverlay,
}

impl RadiusOverlayController {
    /// Create the overlay at `center`, normally the viewport center or the
    /// saved position.
    pub fn new(center: Point) -> Self {
        Self {
            overlay: RadiusOverlay::new(center),
        }
    }

    pub fn overlay(&self) -> &RadiusOverlay {
        &self.overlay
    }

    pub fn center(&self) -> Point {
        self.overlay.center
    }

    /// Move the overlay to `point` as given.
    pub fn recenter(&mut self, point: Point) {
        self.overlay.center = point;
        log::debug!("Overlay: recentered at ({:.1}, {:.1})", point.lat, point.lng);
    }

    /// Finish a drag of the center marker: snap the drop point and move there.
    /// Returns the snapped center.
    pub fn drag_end(&mut self, point: Point, grid_size: f64, snap_enabled: bool) -> Point {
        let snapped = snap(point, grid_size, snap_enabled);
        self.recenter(snapped);
        snapped
    }

    /// Flip the visibility of ring `index` (0 = inner, 1 = outer).
    /// Returns the new visibility, or `None` for an out-of-range index.
    pub fn toggle_ring(&mut self, index: usize) -> Option<bool> {
        let ring = self.overlay.rings.get_mut(index)?;
        ring.visible = !ring.visible;
        log::debug!("Overlay: ring {} visible = {}", index, ring.visible);
        Some(ring.visible)
    }
}
