//! mapnote - map annotation core
//!
//! Markers, zones and a radius overlay on a fixed-scale map. The crate owns
//! the data model, the editing modes, snapping and measurement, zone
//! drawing, and debounced persistence with a baseline merge on load. Drawing
//! is delegated to a [`render::RenderSurface`] supplied by the host.

pub mod assets;
pub mod config;
pub mod constants;
pub mod format;
pub mod geometry;
pub mod mode;
pub mod model;
pub mod overlay;
pub mod persistence;
pub mod render;
pub mod session;
pub mod store;
pub mod zone_drawer;

pub use session::{PositionOutcome, Session, SessionError};
