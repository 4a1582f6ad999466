//! Marker types: kinds, provenance, and inspector patches.

use serde::{Deserialize, Serialize};

use super::Point;
use crate::constants::DEFAULT_CIRCLE_COLOR;

/// Where a marker came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerSource {
    /// Shipped with the baseline dataset (possibly edited since).
    Preset,
    /// Authored locally.
    User,
}

impl MarkerSource {
    /// Prefix used when generating fresh ids.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            MarkerSource::Preset => "preset",
            MarkerSource::User => "user",
        }
    }
}

/// The closed set of marker kinds.
///
/// Kind-specific payload lives on the variant, so a circle always has a color,
/// a sprite always has a sticker name, and no other kind has either.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    Bench,
    Ladder,
    Elevator,
    Circle { color: String },
    Sprite { name: String },
}

impl MarkerKind {
    /// Type name as written in the record schema.
    pub fn type_name(&self) -> &'static str {
        match self {
            MarkerKind::Bench => "bench",
            MarkerKind::Ladder => "ladder",
            MarkerKind::Elevator => "elevator",
            MarkerKind::Circle { .. } => "circle",
            MarkerKind::Sprite { .. } => "sprite",
        }
    }

    /// Resolve a schema type name plus optional payload into a kind.
    ///
    /// Unknown or missing types fall back to a bench. A sprite without a
    /// sticker name degrades to a default-colored circle.
    pub fn from_parts(type_name: Option<&str>, color: Option<&str>, sprite: Option<&str>) -> Self {
        let type_name = type_name.map(|t| t.trim().to_ascii_lowercase());
        match type_name.as_deref() {
            Some("ladder") => MarkerKind::Ladder,
            Some("elevator") => MarkerKind::Elevator,
            Some("circle") => MarkerKind::circle(color),
            Some("sprite") => match sprite.map(str::trim).filter(|s| !s.is_empty()) {
                Some(name) => MarkerKind::Sprite {
                    name: name.to_string(),
                },
                None => MarkerKind::circle(None),
            },
            _ => MarkerKind::Bench,
        }
    }

    fn circle(color: Option<&str>) -> Self {
        let color = color
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CIRCLE_COLOR);
        MarkerKind::Circle {
            color: color.to_string(),
        }
    }

    /// Circle and sprite markers are the user's custom annotations.
    pub fn is_custom(&self) -> bool {
        matches!(self, MarkerKind::Circle { .. } | MarkerKind::Sprite { .. })
    }

    pub fn color(&self) -> Option<&str> {
        match self {
            MarkerKind::Circle { color } => Some(color),
            _ => None,
        }
    }

    pub fn sprite_name(&self) -> Option<&str> {
        match self {
            MarkerKind::Sprite { name } => Some(name),
            _ => None,
        }
    }

    /// Label used when a marker has none: the capitalized type, or the
    /// sticker's file stem for sprites.
    pub fn default_label(&self) -> String {
        match self {
            MarkerKind::Bench => "Bench".to_string(),
            MarkerKind::Ladder => "Ladder".to_string(),
            MarkerKind::Elevator => "Elevator".to_string(),
            MarkerKind::Circle { .. } => "Circle".to_string(),
            MarkerKind::Sprite { name } => sticker_stem(name).to_string(),
        }
    }
}

/// Strip directories and the extension from a sticker file name.
fn sticker_stem(name: &str) -> &str {
    let file = name.rsplit('/').next().unwrap_or(name);
    match file.rfind('.') {
        Some(0) | None => file,
        Some(dot) => &file[..dot],
    }
}

/// A typed point marker.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub id: String,
    pub kind: MarkerKind,
    pub source: MarkerSource,
    /// Never empty.
    pub label: String,
    pub position: Point,
    pub locked: bool,
}

impl Marker {
    /// Create an unlocked marker with the kind's default label.
    pub fn new(id: impl Into<String>, kind: MarkerKind, source: MarkerSource, position: Point) -> Self {
        let label = kind.default_label();
        Self {
            id: id.into(),
            kind,
            source,
            label,
            position,
            locked: false,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.set_label(label.into());
        self
    }

    pub fn is_preset(&self) -> bool {
        self.source == MarkerSource::Preset
    }

    /// Set the label, falling back to the kind's default when blank.
    pub fn set_label(&mut self, label: String) {
        let trimmed = label.trim();
        self.label = if trimmed.is_empty() {
            self.kind.default_label()
        } else {
            trimmed.to_string()
        };
    }

    /// Apply an inspector patch. Payload fields that do not fit the kind are ignored.
    pub fn apply(&mut self, patch: &MarkerPatch) {
        if let Some(position) = patch.position {
            self.position = position;
        }
        if let Some(color) = &patch.color {
            if let MarkerKind::Circle { color: current } = &mut self.kind {
                if !color.trim().is_empty() {
                    *current = color.trim().to_string();
                }
            }
        }
        if let Some(sprite) = &patch.sprite {
            if let MarkerKind::Sprite { name } = &mut self.kind {
                if !sprite.trim().is_empty() {
                    *name = sprite.trim().to_string();
                }
            }
        }
        if let Some(label) = &patch.label {
            self.set_label(label.clone());
        }
        if let Some(locked) = patch.locked {
            self.locked = locked;
        }
    }
}

/// Partial update of a marker, as produced by drag ends and the inspector.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerPatch {
    pub label: Option<String>,
    pub position: Option<Point>,
    pub color: Option<String>,
    pub sprite: Option<String>,
    pub locked: Option<bool>,
}

impl MarkerPatch {
    pub fn position(position: Point) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }

    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }

    pub fn locked(locked: bool) -> Self {
        Self {
            locked: Some(locked),
            ..Self::default()
        }
    }

    /// True when the patch touches nothing but the lock flag.
    pub fn only_changes_lock(&self) -> bool {
        self.locked.is_some()
            && self.label.is_none()
            && self.position.is_none()
            && self.color.is_none()
            && self.sprite.is_none()
    }
}

/// What the Adding mode places on click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddTool {
    Bench,
    Ladder,
    Elevator,
    Circle { color: String },
    Sprite { name: String },
}

impl Default for AddTool {
    fn default() -> Self {
        AddTool::Circle {
            color: DEFAULT_CIRCLE_COLOR.to_string(),
        }
    }
}

impl AddTool {
    /// The marker kind this tool produces.
    pub fn kind(&self) -> MarkerKind {
        match self {
            AddTool::Bench => MarkerKind::Bench,
            AddTool::Ladder => MarkerKind::Ladder,
            AddTool::Elevator => MarkerKind::Elevator,
            AddTool::Circle { color } => MarkerKind::circle(Some(color)),
            AddTool::Sprite { name } => MarkerKind::Sprite { name: name.clone() },
        }
    }

    /// Circle and sprite placements are user annotations; the fixed-asset
    /// kinds extend the preset set.
    pub fn source(&self) -> MarkerSource {
        if self.kind().is_custom() {
            MarkerSource::User
        } else {
            MarkerSource::Preset
        }
    }
}
