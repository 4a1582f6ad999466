//! Whole-document shapes: baseline dataset, imports, and exports.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::FormatError;
use super::records::{MarkerRecord, ZoneRecord};
use crate::constants::LEGACY_OVERLAY_TYPE;

/// Marker and zone records read from one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    pub markers: Vec<MarkerRecord>,
    pub zones: Vec<ZoneRecord>,
}

impl RecordSet {
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty() && self.zones.is_empty()
    }
}

/// Either a bare marker array or a `{markers, zones}` object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InputDocument {
    Bare(Vec<MarkerRecord>),
    Full {
        #[serde(default)]
        markers: Vec<MarkerRecord>,
        #[serde(default)]
        zones: Vec<ZoneRecord>,
    },
}

/// Parse a document in either accepted shape.
///
/// Unparsable text is a [`FormatError::Json`]; parsable JSON of any other
/// shape is a [`FormatError::InvalidStructure`].
pub fn parse_records(json: &str) -> Result<RecordSet, FormatError> {
    let value: Value = serde_json::from_str(json)?;
    if !value.is_array() && !value.is_object() {
        return Err(FormatError::invalid_structure(
            "expected a marker array or an object with `markers`",
        ));
    }
    let document: InputDocument = serde_json::from_value(value)
        .map_err(|e| FormatError::invalid_structure(e.to_string()))?;

    Ok(match document {
        InputDocument::Bare(markers) => RecordSet {
            markers,
            zones: Vec::new(),
        },
        InputDocument::Full { markers, zones } => RecordSet { markers, zones },
    })
}

/// Parse the shipped baseline dataset.
///
/// Legacy overlay entries are dropped; the radius overlay is not a marker.
pub fn parse_baseline(json: &str) -> Result<RecordSet, FormatError> {
    let mut records = parse_records(json)?;
    let before = records.markers.len();
    records.markers.retain(|m| !m.has_type(LEGACY_OVERLAY_TYPE));
    let dropped = before - records.markers.len();
    if dropped > 0 {
        log::debug!("Baseline: dropped {} legacy overlay entries", dropped);
    }
    Ok(records)
}

/// Parse a user import.
///
/// Only circle and sprite records survive; the fixed-asset kinds are
/// baseline-only. Nothing is applied here, so a failure leaves no trace.
pub fn parse_import(json: &str) -> Result<RecordSet, FormatError> {
    let mut records = parse_records(json)?;
    let before = records.markers.len();
    records.markers.retain(|m| m.marker_kind().is_custom());
    log::debug!(
        "Import: kept {} of {} marker records, {} zone records",
        records.markers.len(),
        before,
        records.zones.len()
    );
    Ok(records)
}

/// Full export document: `{markers, zones}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub markers: Vec<MarkerRecord>,
    pub zones: Vec<ZoneRecord>,
}

impl ExportDocument {
    pub fn to_json(&self) -> Result<String, FormatError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// User export document: `{markers}` holding only custom markers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserExportDocument {
    pub markers: Vec<MarkerRecord>,
}

impl UserExportDocument {
    pub fn to_json(&self) -> Result<String, FormatError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
