//! The session: one explicitly constructed value that owns every component.
//!
//! [`Session::start`] fetches the baseline and sticker catalog, loads the
//! durable record, merges, and draws everything. Each user action is a method
//! that mutates the store, keeps the render surface in step, and schedules a
//! save. The host calls [`Session::tick`] from its event loop and
//! [`Session::flush`] on shutdown.

use std::collections::HashSet;

use thiserror::Error;
use web_time::Instant;

use crate::assets::{AssetSource, StickerCatalog, load_baseline, load_sticker_catalog};
use crate::config::Settings;
use crate::constants::MIN_ZONE_VERTICES;
use crate::format::{FormatError, MarkerRecord, RecordSet, ZoneRecord, parse_import};
use crate::geometry::{Measurement, measure, snap};
use crate::mode::{ModeController, ModeKind, Route, Transition};
use crate::model::{AddTool, Marker, MarkerPatch, MarkerSource, Point, Zone, ZonePatch};
use crate::overlay::RadiusOverlayController;
use crate::persistence::{
    KeyValueStore, PersistedState, PersistenceManager, ResetScope, SaveScheduler, StorageError,
};
use crate::render::{RenderSurface, VisualHandle};
use crate::store::{AnnotationStore, Confirmation, ExportScope, ImportSummary, StoreError};
use crate::zone_drawer::{DrawerEvent, ZoneDrawer};

/// Errors surfaced to the boundary layer.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Import failed: {0}")]
    Format(#[from] FormatError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The action needs a mode that is not active.
    #[error("Not available outside {0} mode")]
    NotInMode(&'static str),

    #[error("Unknown sticker: {0}")]
    UnknownSticker(String),
}

/// What a position event did.
#[derive(Debug, Clone, PartialEq)]
pub enum PositionOutcome {
    Ignored,
    MeasureStarted(Point),
    Measured(Measurement),
    MarkerAdded(String),
    Zone(DrawerEvent),
}

/// A running annotation session.
pub struct Session {
    settings: Settings,
    store: AnnotationStore,
    modes: ModeController,
    drawer: ZoneDrawer,
    overlay: RadiusOverlayController,
    persistence: PersistenceManager,
    baseline: RecordSet,
    stickers: StickerCatalog,
    surface: Box<dyn RenderSurface>,
    add_tool: AddTool,
    snap_enabled: bool,
    grid_size: f64,
}

impl Session {
    /// Build the session and seed it from the baseline and the saved record.
    ///
    /// Missing assets and a missing or malformed record are not errors; the
    /// session starts with whatever could be loaded.
    pub fn start(
        settings: Settings,
        assets: &dyn AssetSource,
        storage: Box<dyn KeyValueStore>,
        surface: Box<dyn RenderSurface>,
        viewport_center: Point,
    ) -> Self {
        let baseline = load_baseline(assets, &settings.baseline_path);
        let stickers = load_sticker_catalog(assets, &settings.stickers_path);
        let persistence = PersistenceManager::new(
            storage,
            settings.storage_key.clone(),
            SaveScheduler::with_debounce(settings.save_debounce()),
        );
        let saved = persistence.load();

        let mut session = Self {
            snap_enabled: settings.default_snap_enabled,
            grid_size: settings.default_grid_size,
            settings,
            store: AnnotationStore::new(),
            modes: ModeController::new(),
            drawer: ZoneDrawer::new(),
            overlay: RadiusOverlayController::new(viewport_center),
            persistence,
            baseline,
            stickers,
            surface,
            add_tool: AddTool::default(),
        };

        if let Some(state) = &saved {
            if let Some(snap_enabled) = state.snap_enabled {
                session.snap_enabled = snap_enabled;
            }
            if let Some(grid_size) = state.grid_size.filter(|g| g.is_finite() && *g > 0.0) {
                session.grid_size = grid_size;
            }
            if let Some(center) = state.radius_overlay_center {
                session.overlay.recenter(center);
            }
        }
        session.load_entities(saved.as_ref());
        session.rebuild_visuals();

        log::info!(
            "Session started: {} presets, {} user markers, {} zones, {} stickers",
            session.store.presets().count(),
            session.store.users().count(),
            session.store.zones().count(),
            session.stickers.len()
        );
        session
    }

    /// Replace every marker and zone with the merge of baseline and `saved`.
    fn load_entities(&mut self, saved: Option<&PersistedState>) {
        let baseline: Vec<Marker> = self
            .baseline
            .markers
            .iter()
            .enumerate()
            .map(|(index, r)| AnnotationStore::normalize_baseline(r, index))
            .collect();

        let (saved_presets, saved_users) = match saved {
            Some(state) => {
                let presets: Vec<Marker> = state
                    .preset_markers
                    .iter()
                    .map(|r| self.store.normalize(r, MarkerSource::Preset))
                    .collect();
                let mut users: Vec<Marker> = state
                    .user_markers
                    .iter()
                    .map(|r| self.store.normalize(r, MarkerSource::User))
                    .collect();
                let mut seen: HashSet<String> = users.iter().map(|m| m.id.clone()).collect();
                for record in &state.custom_markers {
                    if record.id_string().is_some_and(|id| seen.contains(&id)) {
                        continue;
                    }
                    let marker = self.store.normalize(record, MarkerSource::User);
                    seen.insert(marker.id.clone());
                    users.push(marker);
                }
                (presets, users)
            }
            None => (Vec::new(), Vec::new()),
        };
        let merged = AnnotationStore::merge_on_load(baseline, saved_presets, saved_users);

        let candidates: Vec<Zone> = match saved.and_then(|s| s.zones.as_ref()) {
            Some(records) => records.iter().map(|r| self.store.normalize_zone(r)).collect(),
            None => self
                .baseline
                .zones
                .iter()
                .enumerate()
                .map(|(index, r)| self.store.normalize_baseline_zone(r, index))
                .collect(),
        };
        let mut zones: Vec<Zone> = Vec::with_capacity(candidates.len());
        for zone in candidates {
            if zone.points.len() < MIN_ZONE_VERTICES {
                log::warn!("Load: dropping zone {} with {} valid points", zone.id, zone.points.len());
                continue;
            }
            zones.push(zone);
        }

        for handle in self.store.replace_all(merged.presets, merged.users, zones) {
            self.surface.remove(handle);
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    pub fn modes(&self) -> &ModeController {
        &self.modes
    }

    pub fn overlay(&self) -> &RadiusOverlayController {
        &self.overlay
    }

    pub fn zone_drawer(&self) -> &ZoneDrawer {
        &self.drawer
    }

    pub fn stickers(&self) -> &StickerCatalog {
        &self.stickers
    }

    pub fn add_tool(&self) -> &AddTool {
        &self.add_tool
    }

    pub fn snap_enabled(&self) -> bool {
        self.snap_enabled
    }

    pub fn grid_size(&self) -> f64 {
        self.grid_size
    }

    pub fn pixels_per_unit(&self) -> f64 {
        self.settings.pixels_per_unit
    }

    pub fn is_save_pending(&self) -> bool {
        self.persistence.is_save_pending()
    }

    /// The record a save would write right now.
    pub fn snapshot(&self) -> PersistedState {
        persisted_state(&self.store, self.snap_enabled, self.grid_size, self.overlay.center())
    }

    // ========================================================================
    // Modes
    // ========================================================================

    /// Switch to `kind`, running exit and entry actions.
    pub fn enter_mode(&mut self, kind: ModeKind) -> Transition {
        let transition = self.modes.enter(kind);
        self.apply_transition(transition);
        transition
    }

    /// Turn `kind` on, or back to idle if it is on.
    pub fn toggle_mode(&mut self, kind: ModeKind) -> Transition {
        let transition = self.modes.toggle(kind);
        self.apply_transition(transition);
        transition
    }

    fn apply_transition(&mut self, transition: Transition) {
        if transition.exited(ModeKind::ZoneDrawing) && self.drawer.discard() {
            self.surface.clear_zone_preview();
        }
        if transition.exited(ModeKind::Measuring) {
            self.surface.clear_measurement();
        }
        if transition.exited(ModeKind::Editing) || transition.entered(ModeKind::Editing) {
            self.refresh_draggability();
        }
    }

    pub fn set_deleting(&mut self, on: bool) -> Result<(), SessionError> {
        if self.modes.set_deleting(on) {
            Ok(())
        } else {
            Err(SessionError::NotInMode(ModeKind::Editing.name()))
        }
    }

    /// Select what Adding mode places. Sprite tools must name a known sticker.
    pub fn set_tool(&mut self, tool: AddTool) -> Result<(), SessionError> {
        if let AddTool::Sprite { name } = &tool {
            if !self.stickers.contains(name) {
                return Err(SessionError::UnknownSticker(name.clone()));
            }
        }
        log::debug!("Tool: {:?}", tool);
        self.add_tool = tool;
        Ok(())
    }

    // ========================================================================
    // Position events
    // ========================================================================

    /// Handle a map click at `point` (world units) in the active mode.
    pub fn handle_position(&mut self, point: Point) -> Result<PositionOutcome, SessionError> {
        match self.modes.route(point) {
            Route::Ignore => Ok(PositionOutcome::Ignored),
            Route::MeasureStart(start) => {
                self.surface.clear_measurement();
                Ok(PositionOutcome::MeasureStarted(start))
            }
            Route::Measured { from, to } => {
                let measurement = measure(from, to, self.settings.pixels_per_unit);
                log::debug!(
                    "Measure: {} px / {} units",
                    measurement.pixels_text(),
                    measurement.units_text()
                );
                self.surface.show_measurement(from, to, &measurement);
                Ok(PositionOutcome::Measured(measurement))
            }
            Route::Add(point) => Ok(PositionOutcome::MarkerAdded(self.add_marker_at(point)?)),
            Route::ZoneVertex(point) => Ok(PositionOutcome::Zone(self.add_zone_vertex(point))),
        }
    }

    fn add_marker_at(&mut self, point: Point) -> Result<String, SessionError> {
        let position = snap(point, self.grid_size, self.snap_enabled);
        let source = self.add_tool.source();
        let id = self.store.fresh_id(source.id_prefix());
        let marker = Marker::new(id.clone(), self.add_tool.kind(), source, position);
        log::info!(
            "Added {} marker {} at ({}, {})",
            marker.kind.type_name(),
            id,
            position.lat,
            position.lng
        );
        self.store.add(marker)?;
        self.render_marker(&id);
        self.changed();
        Ok(id)
    }

    fn add_zone_vertex(&mut self, point: Point) -> DrawerEvent {
        let vertex = snap(point, self.grid_size, self.snap_enabled);
        let event = self.drawer.click(vertex, self.grid_size, &mut self.store);
        match &event {
            DrawerEvent::Finalized(id) => {
                self.surface.clear_zone_preview();
                self.render_zone(id);
                self.changed();
            }
            DrawerEvent::Started | DrawerEvent::VertexAdded(_) => {
                self.surface.show_zone_preview(self.drawer.points());
            }
        }
        event
    }

    // ========================================================================
    // Markers
    // ========================================================================

    /// Finish a drag of marker `id` at `point`. Returns the snapped position.
    ///
    /// A rejected move puts the visual back at the stored position.
    pub fn move_marker(&mut self, id: &str, point: Point) -> Result<Point, SessionError> {
        if !self.modes.is_active(ModeKind::Editing) {
            self.restore_marker_visual(id);
            return Err(SessionError::NotInMode(ModeKind::Editing.name()));
        }
        let position = snap(point, self.grid_size, self.snap_enabled);
        if let Err(e) = self.store.update(id, &MarkerPatch::position(position)) {
            log::warn!("Move of {} rejected: {}", id, e);
            self.restore_marker_visual(id);
            return Err(e.into());
        }
        self.render_marker(id);
        self.changed();
        Ok(position)
    }

    fn restore_marker_visual(&mut self, id: &str) {
        if let Some(entry) = self.store.entry(id) {
            if let Some(handle) = entry.handle {
                self.surface.update_marker(handle, &entry.marker);
            }
        }
    }

    /// Apply an inspector edit.
    pub fn edit_marker(&mut self, id: &str, patch: &MarkerPatch) -> Result<(), SessionError> {
        self.store.update(id, patch)?;
        self.render_marker(id);
        self.changed();
        Ok(())
    }

    /// Delete marker `id`. Preset and locked markers need `Confirmed`.
    pub fn delete_marker(&mut self, id: &str, confirmation: Confirmation) -> Result<(), SessionError> {
        let entry = self.store.remove(id, confirmation)?;
        if let Some(handle) = entry.handle {
            self.surface.remove(handle);
        }
        log::info!("Deleted marker {}", id);
        self.changed();
        Ok(())
    }

    /// A click on a marker visual. Deletes it in the deleting sub-mode;
    /// returns whether it did.
    pub fn marker_clicked(&mut self, id: &str, confirmation: Confirmation) -> Result<bool, SessionError> {
        if !self.modes.is_deleting() {
            return Ok(false);
        }
        self.delete_marker(id, confirmation)?;
        Ok(true)
    }

    // ========================================================================
    // Zones
    // ========================================================================

    pub fn suggested_zone_number(&self) -> u8 {
        self.drawer.suggested_number(&self.store)
    }

    pub fn set_suggested_zone_number(&mut self, number: i64) {
        self.drawer.set_suggested_number(number);
    }

    pub fn update_zone(&mut self, id: &str, patch: &ZonePatch) -> Result<(), SessionError> {
        self.store.update_zone(id, patch)?;
        self.render_zone(id);
        self.changed();
        Ok(())
    }

    pub fn delete_zone(&mut self, id: &str) -> Result<(), SessionError> {
        let entry = self.store.remove_zone(id)?;
        if let Some(handle) = entry.handle {
            self.surface.remove(handle);
        }
        log::info!("Deleted zone {}", id);
        self.changed();
        Ok(())
    }

    /// A click on a zone visual. Deletes it in the deleting sub-mode.
    pub fn zone_clicked(&mut self, id: &str) -> Result<bool, SessionError> {
        if !self.modes.is_deleting() {
            return Ok(false);
        }
        self.delete_zone(id)?;
        Ok(true)
    }

    // ========================================================================
    // Overlay and grid
    // ========================================================================

    /// Finish a drag of the overlay center. Returns the snapped center.
    pub fn overlay_drag_end(&mut self, point: Point) -> Point {
        let center = self.overlay.drag_end(point, self.grid_size, self.snap_enabled);
        self.surface.show_overlay(self.overlay.overlay(), self.settings.pixels_per_unit);
        self.changed();
        center
    }

    pub fn recenter_overlay(&mut self, point: Point) {
        self.overlay.recenter(point);
        self.surface.show_overlay(self.overlay.overlay(), self.settings.pixels_per_unit);
        self.changed();
    }

    pub fn toggle_ring(&mut self, index: usize) -> Option<bool> {
        let visible = self.overlay.toggle_ring(index)?;
        self.surface.show_overlay(self.overlay.overlay(), self.settings.pixels_per_unit);
        Some(visible)
    }

    pub fn set_snap_enabled(&mut self, enabled: bool) {
        self.snap_enabled = enabled;
        self.changed();
    }

    pub fn set_grid_size(&mut self, grid_size: f64) {
        self.grid_size = grid_size;
        self.changed();
    }

    // ========================================================================
    // Import/Export
    // ========================================================================

    /// Import a marker/zone document. Nothing changes unless it parses.
    pub fn import_json(&mut self, json: &str) -> Result<ImportSummary, SessionError> {
        let records = parse_import(json)?;
        let (summary, dropped) = self.store.apply_import(&records);
        for handle in dropped {
            self.surface.remove(handle);
        }
        self.render_all();
        self.changed();
        Ok(summary)
    }

    pub fn export_json(&self, scope: ExportScope) -> Result<String, SessionError> {
        Ok(self.store.export_document(scope).to_json()?)
    }

    pub fn export_user_json(&self) -> Result<String, SessionError> {
        Ok(self.store.user_export_document().to_json()?)
    }

    // ========================================================================
    // Reset and saving
    // ========================================================================

    /// Discard user-authored state in `scope` and save at once.
    ///
    /// The record is written first; the session only changes once it is.
    pub fn reset(&mut self, scope: ResetScope) -> Result<(), SessionError> {
        let state = self.snapshot();
        self.persistence.reset(scope, state)?;

        match scope {
            ResetScope::User => {
                for entry in self.store.clear_users() {
                    if let Some(handle) = entry.handle {
                        self.surface.remove(handle);
                    }
                }
            }
            ResetScope::All => {
                self.load_entities(None);
                self.rebuild_visuals();
            }
        }
        log::info!("Reset ({}) complete", scope);
        Ok(())
    }

    /// Write the record if the debounced save is due. Returns whether it wrote.
    pub fn tick(&mut self, now: Instant) -> bool {
        let store = &self.store;
        let (snap_enabled, grid_size, center) = (self.snap_enabled, self.grid_size, self.overlay.center());
        self.persistence
            .poll(now, || persisted_state(store, snap_enabled, grid_size, center))
    }

    /// Write now if a save is pending.
    pub fn flush(&mut self) -> Result<bool, SessionError> {
        let store = &self.store;
        let (snap_enabled, grid_size, center) = (self.snap_enabled, self.grid_size, self.overlay.center());
        Ok(self
            .persistence
            .flush(|| persisted_state(store, snap_enabled, grid_size, center))?)
    }

    /// Close the session, handing the storage backend back.
    pub fn into_storage(self) -> Box<dyn KeyValueStore> {
        self.persistence.into_storage()
    }

    fn changed(&mut self) {
        self.persistence.schedule_save();
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    /// Drop every visual and draw the whole session again.
    pub fn rebuild_visuals(&mut self) {
        for handle in self.store.take_handles() {
            self.surface.remove(handle);
        }
        self.surface.clear_zone_preview();
        self.render_all();
        self.surface.show_overlay(self.overlay.overlay(), self.settings.pixels_per_unit);
        if self.drawer.is_drawing() {
            self.surface.show_zone_preview(self.drawer.points());
        }
    }

    fn render_all(&mut self) {
        let marker_ids: Vec<String> = self.store.entries().map(|e| e.marker.id.clone()).collect();
        for id in &marker_ids {
            self.render_marker(id);
        }
        let zone_ids: Vec<String> = self.store.zones().map(|z| z.id.clone()).collect();
        for id in &zone_ids {
            self.render_zone(id);
        }
    }

    /// Place or refresh the visual of marker `id`.
    fn render_marker(&mut self, id: &str) {
        let editing = self.modes.is_active(ModeKind::Editing);
        let Some(entry) = self.store.entry(id) else {
            return;
        };
        let locked = entry.marker.locked;
        let (handle, placed) = match entry.handle {
            Some(handle) => {
                self.surface.update_marker(handle, &entry.marker);
                (handle, false)
            }
            None => (self.surface.place_marker(&entry.marker), true),
        };
        if placed {
            self.store.set_handle(id, Some(handle));
        }
        self.surface.set_draggable(handle, editing && !locked);
    }

    fn render_zone(&mut self, id: &str) {
        let Some(entry) = self.store.zone_entries().find(|z| z.zone.id == id) else {
            return;
        };
        let placed: Option<VisualHandle> = match entry.handle {
            Some(handle) => {
                self.surface.update_zone(handle, &entry.zone);
                None
            }
            None => Some(self.surface.place_zone(&entry.zone)),
        };
        if let Some(handle) = placed {
            self.store.set_zone_handle(id, Some(handle));
        }
    }

    /// Only unlocked markers can be dragged, and only while editing.
    fn refresh_draggability(&mut self) {
        let editing = self.modes.is_active(ModeKind::Editing);
        for entry in self.store.entries() {
            if let Some(handle) = entry.handle {
                self.surface.set_draggable(handle, editing && !entry.marker.locked);
            }
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("mode", &self.modes.kind())
            .field("markers", &self.store.marker_count())
            .field("snap_enabled", &self.snap_enabled)
            .field("grid_size", &self.grid_size)
            .finish_non_exhaustive()
    }
}

fn persisted_state(store: &AnnotationStore, snap_enabled: bool, grid_size: f64, center: Point) -> PersistedState {
    PersistedState {
        user_markers: store.users().map(|m| MarkerRecord::from_marker(m, true)).collect(),
        preset_markers: store.presets().map(|m| MarkerRecord::from_marker(m, true)).collect(),
        zones: Some(store.zones().map(ZoneRecord::from_zone).collect()),
        custom_markers: store
            .custom_markers()
            .map(|m| MarkerRecord::from_marker(m, true))
            .collect(),
        snap_enabled: Some(snap_enabled),
        grid_size: Some(grid_size),
        radius_overlay_center: Some(center),
    }
}

#[cfg(test)]
mod tests;
