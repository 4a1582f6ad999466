//! Global constants for mapnote

use std::time::Duration;

/// Map pixels per world unit. Fixed for the whole session.
pub const DEFAULT_PIXELS_PER_UNIT: f64 = 1.0;

/// Default snapping grid size in world units.
pub const DEFAULT_GRID_SIZE: f64 = 5.0;

/// Whether grid snapping starts enabled.
pub const DEFAULT_SNAP_ENABLED: bool = true;

/// Diameters (world units) of the two radius overlay rings, inner first.
pub const RING_DIAMETERS: [f64; 2] = [50.0, 70.0];

/// Quiet interval before a scheduled save is written.
pub const SAVE_DEBOUNCE: Duration = Duration::from_millis(150);

/// Key of the durable record in the key-value store.
pub const STORAGE_KEY: &str = "mapnote-state";

/// Minimum number of vertices for a zone polygon.
pub const MIN_ZONE_VERTICES: usize = 3;

/// Highest zone badge number.
pub const MAX_ZONE_NUMBER: u8 = 99;

/// Fill color for circle markers that do not carry one.
pub const DEFAULT_CIRCLE_COLOR: &str = "#ff0000";

/// Baseline entries of this type belong to the radius overlay, not the marker set.
pub const LEGACY_OVERLAY_TYPE: &str = "shiny";
