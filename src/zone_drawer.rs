//! Polygon accumulation for zone drawing.
//!
//! Clicks add vertices; a click near the first vertex, once there are at
//! least three, closes the polygon into a [`Zone`]. Nothing partial ever
//! reaches the store.

use crate::constants::MIN_ZONE_VERTICES;
use crate::geometry::closes_polygon;
use crate::model::{Point, Zone, clamp_zone_number};
use crate::store::AnnotationStore;

/// What a click did to the drawer.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawerEvent {
    /// First vertex placed.
    Started,
    /// Another vertex appended; holds the new vertex count.
    VertexAdded(usize),
    /// Polygon closed and stored; holds the new zone's id.
    Finalized(String),
}

/// Vertex accumulator for the zone being drawn.
#[derive(Debug, Clone, Default)]
pub struct ZoneDrawer {
    points: Vec<Point>,
    /// Number chosen by the user for the next zone. `None` means the next
    /// sequential number.
    number_override: Option<u8>,
}

impl ZoneDrawer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Vertices placed so far.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn is_drawing(&self) -> bool {
        !self.points.is_empty()
    }

    /// Number the next finished zone will get.
    pub fn suggested_number(&self, store: &AnnotationStore) -> u8 {
        self.number_override
            .unwrap_or_else(|| store.next_zone_number())
    }

    /// Override the number for the next zone (clamped to `1..=99`).
    pub fn set_suggested_number(&mut self, number: i64) {
        self.number_override = Some(clamp_zone_number(number));
    }

    /// Handle a click at `point` while zone drawing is active.
    ///
    /// The closing radius is `max(grid_size, 1)` world units around the first
    /// vertex. The closing click itself is not a vertex.
    pub fn click(&mut self, point: Point, grid_size: f64, store: &mut AnnotationStore) -> DrawerEvent {
        let Some(&first) = self.points.first() else {
            self.points.push(point);
            log::info!("Zone: started at ({:.1}, {:.1})", point.lat, point.lng);
            return DrawerEvent::Started;
        };

        if self.points.len() >= MIN_ZONE_VERTICES && closes_polygon(first, point, grid_size) {
            return DrawerEvent::Finalized(self.finalize(store));
        }

        self.points.push(point);
        log::debug!(
            "Zone: added vertex {} at ({:.1}, {:.1})",
            self.points.len(),
            point.lat,
            point.lng
        );
        DrawerEvent::VertexAdded(self.points.len())
    }

    /// Drop the accumulated vertices and any number override. Returns
    /// whether any vertices were discarded.
    pub fn discard(&mut self) -> bool {
        let had_points = !self.points.is_empty();
        if had_points {
            log::debug!("Zone: discarded {} in-progress vertices", self.points.len());
        }
        self.points.clear();
        self.number_override = None;
        had_points
    }

    fn finalize(&mut self, store: &mut AnnotationStore) -> String {
        let number = self.suggested_number(store);
        let id = store.fresh_id("zone");
        let zone = Zone::new(id.clone(), number, std::mem::take(&mut self.points));
        log::info!(
            "Zone: created '{}' with {} vertices",
            zone.label,
            zone.points.len()
        );
        if let Err(e) = store.add_zone(zone) {
            log::warn!("Zone: could not store finished zone: {}", e);
        }
        self.number_override = None;
        id
    }
}
