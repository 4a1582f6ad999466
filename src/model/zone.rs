//! Zone data model: numbered, labelled polygons.

use super::Point;
use crate::constants::MAX_ZONE_NUMBER;

/// A closed polygon with a numeric badge and label.
///
/// Polygon simplicity is not validated; self-intersecting outlines are kept
/// as drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    pub id: String,
    pub label: String,
    /// Badge number in `1..=99`.
    pub number: u8,
    /// Vertices in drawing order, at least three.
    pub points: Vec<Point>,
}

impl Zone {
    /// Create a zone with the default label for its number.
    pub fn new(id: impl Into<String>, number: u8, points: Vec<Point>) -> Self {
        let number = clamp_zone_number(i64::from(number));
        Self {
            id: id.into(),
            label: Self::default_label(number),
            number,
            points,
        }
    }

    /// `"Zone {number}"`.
    pub fn default_label(number: u8) -> String {
        format!("Zone {}", number)
    }

    /// Apply a rename/renumber patch. A blank label resets to the default.
    pub fn apply(&mut self, patch: &ZonePatch) {
        if let Some(number) = patch.number {
            self.number = clamp_zone_number(number);
        }
        if let Some(label) = &patch.label {
            let trimmed = label.trim();
            self.label = if trimmed.is_empty() {
                Self::default_label(self.number)
            } else {
                trimmed.to_string()
            };
        }
    }
}

/// Clamp any integer into the valid badge range.
pub fn clamp_zone_number(number: i64) -> u8 {
    number.clamp(1, i64::from(MAX_ZONE_NUMBER)) as u8
}

/// Inspector edit of a zone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZonePatch {
    pub label: Option<String>,
    pub number: Option<i64>,
}
