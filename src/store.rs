//! Annotation store: canonical marker and zone collections.
//!
//! This module provides:
//! - Normalization of loose records into typed markers and zones
//! - CRUD with lock and preset-deletion guards
//! - The load-time merge of baseline presets with saved edits
//! - Deterministic export collection
//!
//! Every entity sits next to the optional handle of its visual, so removing
//! an entity hands its handle back to the caller in the same step.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::constants::{MAX_ZONE_NUMBER, MIN_ZONE_VERTICES};
use crate::format::{ExportDocument, MarkerRecord, RecordSet, UserExportDocument, ZoneRecord};
use crate::model::{
    Marker, MarkerPatch, MarkerSource, Zone, ZonePatch, clamp_zone_number,
};
use crate::render::VisualHandle;

// ============================================================================
// Errors and options
// ============================================================================

/// Rejected store mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Unknown marker: {0}")]
    UnknownMarker(String),

    #[error("Unknown zone: {0}")]
    UnknownZone(String),

    #[error("Marker id already in use: {0}")]
    DuplicateId(String),

    /// The marker is locked; unlock it first.
    #[error("Marker '{0}' is locked")]
    Locked(String),

    /// The operation needs explicit user confirmation before it can run.
    #[error("Removing '{0}' requires confirmation")]
    ConfirmationRequired(String),
}

/// Whether the user has confirmed a guarded removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Confirmation {
    #[default]
    Unconfirmed,
    Confirmed,
}

/// Which markers an export covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportScope {
    #[default]
    All,
    Preset,
    User,
}

impl ExportScope {
    fn includes(&self, source: MarkerSource) -> bool {
        match self {
            ExportScope::All => true,
            ExportScope::Preset => source == MarkerSource::Preset,
            ExportScope::User => source == MarkerSource::User,
        }
    }
}

impl FromStr for ExportScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(ExportScope::All),
            "preset" | "presets" => Ok(ExportScope::Preset),
            "user" | "users" => Ok(ExportScope::User),
            other => Err(format!("unknown export scope '{}'", other)),
        }
    }
}

impl fmt::Display for ExportScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExportScope::All => "all",
            ExportScope::Preset => "preset",
            ExportScope::User => "user",
        })
    }
}

/// Result of merging baseline presets with saved markers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedMarkers {
    pub presets: Vec<Marker>,
    pub users: Vec<Marker>,
}

/// Counts reported after an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub markers_added: usize,
    pub markers_replaced: usize,
    pub zones_added: usize,
    pub zones_replaced: usize,
    pub zones_dropped: usize,
}

// ============================================================================
// Entries
// ============================================================================

/// A marker together with its visual handle.
#[derive(Debug, Clone)]
pub struct MarkerEntry {
    pub marker: Marker,
    pub handle: Option<VisualHandle>,
}

/// A zone together with its visual handle.
#[derive(Debug, Clone)]
pub struct ZoneEntry {
    pub zone: Zone,
    pub handle: Option<VisualHandle>,
}

// ============================================================================
// Annotation Store
// ============================================================================

/// Owner of every marker and zone in the session.
#[derive(Debug, Default)]
pub struct AnnotationStore {
    /// id -> entry, for presets and user markers alike.
    markers: HashMap<String, MarkerEntry>,
    /// Preset ids in baseline order.
    preset_order: Vec<String>,
    /// User ids in creation order.
    user_order: Vec<String>,
    zones: Vec<ZoneEntry>,
    /// Counter for generating unique ids.
    next_id: u64,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }

    // ========================================================================
    // Normalization
    // ========================================================================

    /// Generate an id not used by any marker or zone, tagged by `prefix`.
    pub fn fresh_id(&mut self, prefix: &str) -> String {
        loop {
            let id = format!("{}-{}", prefix, self.next_id);
            self.next_id += 1;
            if !self.markers.contains_key(&id) && !self.zones.iter().any(|z| z.zone.id == id) {
                return id;
            }
        }
    }

    /// Turn a loose record into a legal marker. Never fails.
    ///
    /// Missing ids get a fresh id tagged by `source`; the kind, label,
    /// position and lock flag follow the defaulting rules of the record
    /// accessors.
    pub fn normalize(&mut self, raw: &MarkerRecord, source: MarkerSource) -> Marker {
        let id = match raw.id_string() {
            Some(id) => id,
            None => self.fresh_id(source.id_prefix()),
        };
        build_marker(raw, id, source)
    }

    /// Normalize the `index`th baseline record as a preset.
    ///
    /// A record without an id gets `baseline-{index + 1}`, so the same
    /// baseline yields the same ids on every load and after every reset.
    pub fn normalize_baseline(raw: &MarkerRecord, index: usize) -> Marker {
        let id = raw
            .id_string()
            .unwrap_or_else(|| format!("baseline-{}", index + 1));
        build_marker(raw, id, MarkerSource::Preset)
    }

    /// Turn a loose zone record into a zone.
    ///
    /// Only vertices with numeric coordinates survive. The result may hold
    /// fewer than three points; callers drop such zones.
    pub fn normalize_zone(&mut self, raw: &ZoneRecord) -> Zone {
        let id = match raw.id_string() {
            Some(id) => id,
            None => self.fresh_id("zone"),
        };
        self.build_zone(raw, id)
    }

    /// Like [`normalize_baseline`](Self::normalize_baseline), for zones.
    pub fn normalize_baseline_zone(&self, raw: &ZoneRecord, index: usize) -> Zone {
        let id = raw
            .id_string()
            .unwrap_or_else(|| format!("baseline-zone-{}", index + 1));
        self.build_zone(raw, id)
    }

    fn build_zone(&self, raw: &ZoneRecord, id: String) -> Zone {
        let number = match raw.number_value() {
            Some(n) => clamp_zone_number(n),
            None => self.next_zone_number(),
        };
        let mut zone = Zone::new(id, number, raw.valid_points());
        if let Some(label) = raw.label_text() {
            let label = label.trim();
            if !label.is_empty() {
                zone.label = label.to_string();
            }
        }
        zone
    }

    // ========================================================================
    // Markers
    // ========================================================================

    /// Insert a new marker.
    pub fn add(&mut self, marker: Marker) -> Result<(), StoreError> {
        if self.markers.contains_key(&marker.id) {
            return Err(StoreError::DuplicateId(marker.id));
        }
        match marker.source {
            MarkerSource::Preset => self.preset_order.push(marker.id.clone()),
            MarkerSource::User => self.user_order.push(marker.id.clone()),
        }
        log::debug!("Store: added {} marker {}", marker.kind.type_name(), marker.id);
        self.markers.insert(
            marker.id.clone(),
            MarkerEntry {
                marker,
                handle: None,
            },
        );
        Ok(())
    }

    /// Apply a patch to a marker.
    ///
    /// Locked markers only accept a patch that changes nothing but the lock.
    pub fn update(&mut self, id: &str, patch: &MarkerPatch) -> Result<&MarkerEntry, StoreError> {
        let entry = self
            .markers
            .get_mut(id)
            .ok_or_else(|| StoreError::UnknownMarker(id.to_string()))?;
        if entry.marker.locked && !patch.only_changes_lock() {
            return Err(StoreError::Locked(id.to_string()));
        }
        entry.marker.apply(patch);
        Ok(entry)
    }

    /// Remove a marker.
    ///
    /// Locked markers and preset markers are only removed once the caller
    /// passes [`Confirmation::Confirmed`]; otherwise nothing changes.
    pub fn remove(&mut self, id: &str, confirmation: Confirmation) -> Result<MarkerEntry, StoreError> {
        let entry = self
            .markers
            .get(id)
            .ok_or_else(|| StoreError::UnknownMarker(id.to_string()))?;
        if confirmation == Confirmation::Unconfirmed {
            if entry.marker.locked {
                return Err(StoreError::Locked(id.to_string()));
            }
            if entry.marker.is_preset() {
                return Err(StoreError::ConfirmationRequired(id.to_string()));
            }
        }

        let entry = self
            .markers
            .remove(id)
            .ok_or_else(|| StoreError::UnknownMarker(id.to_string()))?;
        self.preset_order.retain(|i| i != id);
        self.user_order.retain(|i| i != id);
        log::debug!("Store: removed marker {}", id);
        Ok(entry)
    }

    pub fn get(&self, id: &str) -> Option<&Marker> {
        self.markers.get(id).map(|e| &e.marker)
    }

    pub fn entry(&self, id: &str) -> Option<&MarkerEntry> {
        self.markers.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.markers.contains_key(id)
    }

    /// Attach the visual handle of a marker.
    pub fn set_handle(&mut self, id: &str, handle: Option<VisualHandle>) {
        if let Some(entry) = self.markers.get_mut(id) {
            entry.handle = handle;
        }
    }

    /// Preset markers in order.
    pub fn presets(&self) -> impl Iterator<Item = &Marker> {
        self.ordered(&self.preset_order)
    }

    /// User markers in order.
    pub fn users(&self) -> impl Iterator<Item = &Marker> {
        self.ordered(&self.user_order)
    }

    /// User markers of the circle and sprite kinds.
    pub fn custom_markers(&self) -> impl Iterator<Item = &Marker> {
        self.users().filter(|m| m.kind.is_custom())
    }

    /// All entries, presets first.
    pub fn entries(&self) -> impl Iterator<Item = &MarkerEntry> {
        self.preset_order
            .iter()
            .chain(self.user_order.iter())
            .filter_map(|id| self.markers.get(id))
    }

    fn ordered<'a>(&'a self, order: &'a [String]) -> impl Iterator<Item = &'a Marker> {
        order
            .iter()
            .filter_map(|id| self.markers.get(id).map(|e| &e.marker))
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    // ========================================================================
    // Zones
    // ========================================================================

    /// Next zone number: one past the highest in use, capped at 99.
    pub fn next_zone_number(&self) -> u8 {
        self.zones
            .iter()
            .map(|z| z.zone.number)
            .max()
            .map_or(1, |max| max.saturating_add(1).min(MAX_ZONE_NUMBER))
    }

    /// Append a finished zone.
    pub fn add_zone(&mut self, zone: Zone) -> Result<(), StoreError> {
        if self.zones.iter().any(|z| z.zone.id == zone.id) {
            return Err(StoreError::DuplicateId(zone.id));
        }
        log::debug!("Store: added zone {} ({} points)", zone.id, zone.points.len());
        self.zones.push(ZoneEntry { zone, handle: None });
        Ok(())
    }

    pub fn update_zone(&mut self, id: &str, patch: &ZonePatch) -> Result<&ZoneEntry, StoreError> {
        let entry = self
            .zones
            .iter_mut()
            .find(|z| z.zone.id == id)
            .ok_or_else(|| StoreError::UnknownZone(id.to_string()))?;
        entry.zone.apply(patch);
        Ok(entry)
    }

    pub fn remove_zone(&mut self, id: &str) -> Result<ZoneEntry, StoreError> {
        let index = self
            .zones
            .iter()
            .position(|z| z.zone.id == id)
            .ok_or_else(|| StoreError::UnknownZone(id.to_string()))?;
        log::debug!("Store: removed zone {}", id);
        Ok(self.zones.remove(index))
    }

    pub fn set_zone_handle(&mut self, id: &str, handle: Option<VisualHandle>) {
        if let Some(entry) = self.zones.iter_mut().find(|z| z.zone.id == id) {
            entry.handle = handle;
        }
    }

    pub fn zone(&self, id: &str) -> Option<&Zone> {
        self.zones.iter().map(|z| &z.zone).find(|z| z.id == id)
    }

    pub fn zones(&self) -> impl Iterator<Item = &Zone> {
        self.zones.iter().map(|z| &z.zone)
    }

    pub fn zone_entries(&self) -> impl Iterator<Item = &ZoneEntry> {
        self.zones.iter()
    }

    // ========================================================================
    // Bulk replacement
    // ========================================================================

    /// Replace every marker and zone, returning the handles of everything
    /// that was dropped.
    ///
    /// A user marker whose id is already taken by a preset gets a fresh id.
    /// Later duplicates within one collection are skipped.
    pub fn replace_all(
        &mut self,
        presets: Vec<Marker>,
        users: Vec<Marker>,
        zones: Vec<Zone>,
    ) -> Vec<VisualHandle> {
        let dropped = self.take_handles();
        self.markers.clear();
        self.preset_order.clear();
        self.user_order.clear();
        self.zones.clear();

        for marker in presets {
            if let Err(e) = self.add(marker) {
                log::warn!("Store: skipping preset: {}", e);
            }
        }
        for mut marker in users {
            if self.contains(&marker.id) {
                let fresh = self.fresh_id(MarkerSource::User.id_prefix());
                log::warn!("Store: user marker {} collides, renamed to {}", marker.id, fresh);
                marker.id = fresh;
            }
            if let Err(e) = self.add(marker) {
                log::warn!("Store: skipping user marker: {}", e);
            }
        }
        for zone in zones {
            if let Err(e) = self.add_zone(zone) {
                log::warn!("Store: skipping zone: {}", e);
            }
        }
        dropped
    }

    /// Remove every user marker, returning their entries.
    pub fn clear_users(&mut self) -> Vec<MarkerEntry> {
        let ids = std::mem::take(&mut self.user_order);
        ids.iter().filter_map(|id| self.markers.remove(id)).collect()
    }

    /// Detach and return every visual handle.
    pub fn take_handles(&mut self) -> Vec<VisualHandle> {
        let markers = self.markers.values_mut().filter_map(|e| e.handle.take());
        let zones = self.zones.iter_mut().filter_map(|z| z.handle.take());
        markers.chain(zones).collect()
    }

    // ========================================================================
    // Merge
    // ========================================================================

    /// Reconcile the baseline presets with saved markers.
    ///
    /// For each baseline preset, a saved preset with the same id replaces it.
    /// Saved presets whose id is absent from the baseline are appended in
    /// saved order. User markers come verbatim from the saved set. Each id
    /// appears once; later duplicates are dropped.
    pub fn merge_on_load(
        baseline: Vec<Marker>,
        saved_presets: Vec<Marker>,
        saved_users: Vec<Marker>,
    ) -> MergedMarkers {
        let mut saved_by_id: HashMap<String, Marker> = HashMap::new();
        let mut saved_order: Vec<String> = Vec::new();
        for marker in saved_presets {
            if saved_by_id.contains_key(&marker.id) {
                log::warn!("Merge: duplicate saved preset {} ignored", marker.id);
                continue;
            }
            saved_order.push(marker.id.clone());
            saved_by_id.insert(marker.id.clone(), marker);
        }

        let mut seen: HashSet<String> = HashSet::new();
        let mut presets = Vec::with_capacity(baseline.len() + saved_order.len());
        let mut replaced = 0;
        for marker in baseline {
            if !seen.insert(marker.id.clone()) {
                log::warn!("Merge: duplicate baseline preset {} ignored", marker.id);
                continue;
            }
            match saved_by_id.remove(&marker.id) {
                Some(saved) => {
                    replaced += 1;
                    presets.push(saved);
                }
                None => presets.push(marker),
            }
        }

        let mut orphaned = 0;
        for id in saved_order {
            if let Some(saved) = saved_by_id.remove(&id) {
                seen.insert(id);
                orphaned += 1;
                presets.push(saved);
            }
        }

        let users: Vec<Marker> = saved_users
            .into_iter()
            .map(|mut m| {
                m.source = MarkerSource::User;
                m
            })
            .collect();

        log::info!(
            "Merge: {} presets ({} edited, {} kept from earlier baselines), {} user markers",
            presets.len(),
            replaced,
            orphaned,
            users.len()
        );
        MergedMarkers { presets, users }
    }

    // ========================================================================
    // Import/Export
    // ========================================================================

    /// Markers in `scope` as portable records, sorted by `(type, label)`.
    ///
    /// The sort is stable, so equal keys keep store order and repeated
    /// exports of unchanged data are identical.
    pub fn collect_for_export(&self, scope: ExportScope) -> Vec<MarkerRecord> {
        let mut markers: Vec<&Marker> = self
            .presets()
            .chain(self.users())
            .filter(|m| scope.includes(m.source))
            .collect();
        markers.sort_by(|a, b| {
            a.kind
                .type_name()
                .cmp(b.kind.type_name())
                .then_with(|| a.label.cmp(&b.label))
        });
        markers
            .into_iter()
            .map(|m| MarkerRecord::from_marker(m, false))
            .collect()
    }

    /// Full export document for `scope`.
    pub fn export_document(&self, scope: ExportScope) -> ExportDocument {
        ExportDocument {
            markers: self.collect_for_export(scope),
            zones: self.zones().map(ZoneRecord::from_zone).collect(),
        }
    }

    /// Export of the custom user markers only.
    pub fn user_export_document(&self) -> UserExportDocument {
        UserExportDocument {
            markers: self
                .custom_markers()
                .map(|m| MarkerRecord::from_marker(m, false))
                .collect(),
        }
    }

    /// Apply parsed import records.
    ///
    /// Markers become unlocked user markers. An id held by a preset is
    /// replaced with a fresh one; an id held by a user marker replaces that
    /// marker in place. Zones with fewer than three valid points are dropped;
    /// others replace a zone with the same id or are appended.
    ///
    /// Callers re-render afterwards; visuals of replaced entities are dropped
    /// from the store and returned.
    pub fn apply_import(&mut self, records: &RecordSet) -> (ImportSummary, Vec<VisualHandle>) {
        let mut summary = ImportSummary::default();
        let mut dropped = Vec::new();

        for record in &records.markers {
            let mut marker = self.normalize(record, MarkerSource::User);
            marker.locked = false;

            match self.markers.get(&marker.id).map(|e| e.marker.source) {
                Some(MarkerSource::User) => {
                    if let Some(existing) = self.markers.get_mut(&marker.id) {
                        dropped.extend(existing.handle.take());
                        existing.marker = marker;
                        summary.markers_replaced += 1;
                    }
                    continue;
                }
                Some(MarkerSource::Preset) => {
                    marker.id = self.fresh_id(MarkerSource::User.id_prefix());
                }
                None => {}
            }
            if self.add(marker).is_ok() {
                summary.markers_added += 1;
            }
        }

        for record in &records.zones {
            let zone = self.normalize_zone(record);
            if zone.points.len() < MIN_ZONE_VERTICES {
                summary.zones_dropped += 1;
                continue;
            }
            match self.zones.iter_mut().find(|z| z.zone.id == zone.id) {
                Some(existing) => {
                    dropped.extend(existing.handle.take());
                    existing.zone = zone;
                    summary.zones_replaced += 1;
                }
                None => {
                    self.zones.push(ZoneEntry { zone, handle: None });
                    summary.zones_added += 1;
                }
            }
        }

        log::info!("Import applied: {:?}", summary);
        (summary, dropped)
    }
}

fn build_marker(raw: &MarkerRecord, id: String, source: MarkerSource) -> Marker {
    let mut marker = Marker::new(id, raw.marker_kind(), source, raw.position());
    if let Some(label) = raw.label_text() {
        marker.set_label(label);
    }
    marker.locked = raw.is_locked();
    marker
}

// ============================================================================
// Tests
// ============================================================================
