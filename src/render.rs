//! Narrow interface to the rendering substrate.
//!
//! The core never draws. It tells a [`RenderSurface`] to place, update or
//! remove the visual for an entity and keeps the returned [`VisualHandle`]
//! next to the entity. Handles are non-owning: the store drops a handle in the
//! same call that removes its entity, and the session removes the visual
//! before anything else can observe it.

use crate::geometry::Measurement;
use crate::model::{Marker, Point, Zone};
use crate::overlay::RadiusOverlay;

/// Opaque reference to a visual owned by the rendering substrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VisualHandle(pub u64);

/// Operations the core drives on the map surface.
pub trait RenderSurface {
    /// Place a marker visual.
    fn place_marker(&mut self, marker: &Marker) -> VisualHandle;

    /// Refresh a marker visual after its position or content changed.
    fn update_marker(&mut self, handle: VisualHandle, marker: &Marker);

    /// Enable or disable dragging of a marker visual.
    fn set_draggable(&mut self, handle: VisualHandle, draggable: bool);

    /// Place a finished zone polygon.
    fn place_zone(&mut self, zone: &Zone) -> VisualHandle;

    /// Refresh a zone visual after a label or number change.
    fn update_zone(&mut self, handle: VisualHandle, zone: &Zone);

    /// Remove any visual previously returned by this surface.
    fn remove(&mut self, handle: VisualHandle);

    /// Draw the in-progress zone: first vertex marker, open polyline, and a
    /// filled preview once there are three or more vertices.
    fn show_zone_preview(&mut self, points: &[Point]);

    /// Remove the in-progress zone drawing.
    fn clear_zone_preview(&mut self);

    /// Draw or move the radius overlay.
    fn show_overlay(&mut self, overlay: &RadiusOverlay, pixels_per_unit: f64);

    /// Show a measurement between two endpoints.
    fn show_measurement(&mut self, from: Point, to: Point, measurement: &Measurement);

    /// Remove any measurement drawing.
    fn clear_measurement(&mut self);
}

/// Surface that draws nothing. Used by the headless driver.
#[derive(Debug, Default)]
pub struct NullSurface {
    next_handle: u64,
}

impl NullSurface {
    pub fn new() -> Self {
        Self::default()
    }

    fn issue(&mut self) -> VisualHandle {
        self.next_handle += 1;
        VisualHandle(self.next_handle)
    }
}

impl RenderSurface for NullSurface {
    fn place_marker(&mut self, _marker: &Marker) -> VisualHandle {
        self.issue()
    }

    fn update_marker(&mut self, _handle: VisualHandle, _marker: &Marker) {}

    fn set_draggable(&mut self, _handle: VisualHandle, _draggable: bool) {}

    fn place_zone(&mut self, _zone: &Zone) -> VisualHandle {
        self.issue()
    }

    fn update_zone(&mut self, _handle: VisualHandle, _zone: &Zone) {}

    fn remove(&mut self, _handle: VisualHandle) {}

    fn show_zone_preview(&mut self, _points: &[Point]) {}

    fn clear_zone_preview(&mut self) {}

    fn show_overlay(&mut self, _overlay: &RadiusOverlay, _pixels_per_unit: f64) {}

    fn show_measurement(&mut self, _from: Point, _to: Point, _measurement: &Measurement) {}

    fn clear_measurement(&mut self) {}
}
