//! The durable record.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::format::{MarkerRecord, ZoneRecord};
use crate::model::Point;

/// Everything that survives a reload, written as one JSON document.
///
/// Marker lists carry the lock flag. `zones` is `None` until zones have been
/// saved once; a record without zones falls back to the baseline zones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default)]
    pub user_markers: Vec<MarkerRecord>,

    #[serde(default)]
    pub preset_markers: Vec<MarkerRecord>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zones: Option<Vec<ZoneRecord>>,

    /// Circle and sprite user markers, also tracked for the user export.
    #[serde(default)]
    pub custom_markers: Vec<MarkerRecord>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snap_enabled: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_size: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius_overlay_center: Option<Point>,
}

impl PersistedState {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Drop what `scope` resets. Settings and the overlay position are kept.
    pub fn clear(&mut self, scope: ResetScope) {
        self.user_markers.clear();
        self.custom_markers.clear();
        if scope == ResetScope::All {
            self.preset_markers.clear();
            self.zones = None;
        }
    }
}

/// How much user-authored state a reset discards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResetScope {
    /// User markers and custom markers.
    #[default]
    User,
    /// Additionally preset edits and saved zones.
    All,
}

impl FromStr for ResetScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" | "users" => Ok(ResetScope::User),
            "all" => Ok(ResetScope::All),
            other => Err(format!("unknown reset scope '{}'", other)),
        }
    }
}

impl fmt::Display for ResetScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResetScope::User => "user",
            ResetScope::All => "all",
        })
    }
}
