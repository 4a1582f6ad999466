//! Portable record schema for markers and zones.
//!
//! Records are deliberately loose: every field is kept as a raw JSON value so
//! partially hand-edited files still parse. Conversion into
//! typed [`Marker`]s and [`Zone`]s happens in the annotation store, which
//! applies the defaulting rules.
//!
//! `source` is never part of this schema. It is inferred from the collection
//! or file a record came from.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{Marker, MarkerKind, Point, Zone};

/// External marker record: `{id?, type, label?, lat, lng, color?, sprite?}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkerRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Value>,

    #[serde(default)]
    pub lat: Value,

    #[serde(default)]
    pub lng: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Value>,

    #[serde(default, alias = "spriteName", skip_serializing_if = "Option::is_none")]
    pub sprite: Option<Value>,

    /// Only written to the durable record, and only when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked: Option<Value>,
}

impl MarkerRecord {
    /// Build a record from a marker. `with_lock` controls whether the lock
    /// flag is carried (durable record) or dropped (portable export).
    pub fn from_marker(marker: &Marker, with_lock: bool) -> Self {
        Self {
            id: Some(Value::String(marker.id.clone())),
            kind: Some(Value::from(marker.kind.type_name())),
            label: Some(Value::String(marker.label.clone())),
            lat: number_value(marker.position.lat),
            lng: number_value(marker.position.lng),
            color: marker.kind.color().map(Value::from),
            sprite: marker.kind.sprite_name().map(Value::from),
            locked: (with_lock && marker.locked).then_some(Value::Bool(true)),
        }
    }

    /// The record's id as a string, if it carries a usable one.
    pub fn id_string(&self) -> Option<String> {
        self.id.as_ref().and_then(coerce_id)
    }

    pub fn type_text(&self) -> Option<String> {
        self.kind.as_ref().and_then(coerce_text)
    }

    pub fn label_text(&self) -> Option<String> {
        self.label.as_ref().and_then(coerce_text)
    }

    pub fn color_text(&self) -> Option<String> {
        self.color.as_ref().and_then(coerce_text)
    }

    pub fn sprite_text(&self) -> Option<String> {
        self.sprite.as_ref().and_then(coerce_text)
    }

    /// Kind after the defaulting rules.
    pub fn marker_kind(&self) -> MarkerKind {
        MarkerKind::from_parts(
            self.type_text().as_deref(),
            self.color_text().as_deref(),
            self.sprite_text().as_deref(),
        )
    }

    /// Position with invalid or missing coordinates read as 0.
    pub fn position(&self) -> Point {
        Point::new(
            coerce_number(&self.lat).unwrap_or(0.0),
            coerce_number(&self.lng).unwrap_or(0.0),
        )
    }

    pub fn is_locked(&self) -> bool {
        self.locked.as_ref().is_some_and(coerce_bool)
    }

    /// Whether the raw type names the given schema type.
    pub fn has_type(&self, type_name: &str) -> bool {
        self.type_text()
            .is_some_and(|k| k.trim().eq_ignore_ascii_case(type_name))
    }
}

/// A zone vertex: `{lat, lng}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointRecord {
    #[serde(default)]
    pub lat: Value,
    #[serde(default)]
    pub lng: Value,
}

impl PointRecord {
    pub fn from_point(point: &Point) -> Self {
        Self {
            lat: number_value(point.lat),
            lng: number_value(point.lng),
        }
    }

    /// The vertex, if both coordinates are numeric.
    pub fn to_point(&self) -> Option<Point> {
        Some(Point::new(
            coerce_number(&self.lat)?,
            coerce_number(&self.lng)?,
        ))
    }
}

/// External zone record: `{id?, label?, number?, points: [{lat, lng}, ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<Value>,

    #[serde(default)]
    pub points: Vec<PointRecord>,
}

impl ZoneRecord {
    pub fn from_zone(zone: &Zone) -> Self {
        Self {
            id: Some(Value::String(zone.id.clone())),
            label: Some(Value::String(zone.label.clone())),
            number: Some(Value::from(zone.number)),
            points: zone.points.iter().map(PointRecord::from_point).collect(),
        }
    }

    pub fn id_string(&self) -> Option<String> {
        self.id.as_ref().and_then(coerce_id)
    }

    pub fn label_text(&self) -> Option<String> {
        self.label.as_ref().and_then(coerce_text)
    }

    /// The badge number, if the record carries a numeric one.
    pub fn number_value(&self) -> Option<i64> {
        self.number
            .as_ref()
            .and_then(coerce_number)
            .map(|n| n.round() as i64)
    }

    /// Vertices whose coordinates are both numeric, in order.
    pub fn valid_points(&self) -> Vec<Point> {
        self.points.iter().filter_map(PointRecord::to_point).collect()
    }
}

/// Read a JSON value as a finite number. Numeric strings are accepted.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Read a JSON value as a flag.
pub fn coerce_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
        _ => false,
    }
}

/// Read a JSON value as text. Numbers are stringified; other values are absent.
pub fn coerce_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn coerce_id(value: &Value) -> Option<String> {
    let id = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!id.is_empty()).then_some(id)
}

/// Integral coordinates are written without a fractional part.
fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}
