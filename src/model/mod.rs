//! Data models for mapnote.

mod marker;
mod point;
mod zone;

pub use marker::{AddTool, Marker, MarkerKind, MarkerPatch, MarkerSource};
pub use point::Point;
pub use zone::{Zone, ZonePatch, clamp_zone_number};
