use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use super::*;
use crate::assets::MemorySource;
use crate::model::MarkerKind;
use crate::overlay::RadiusOverlay;
use crate::persistence::MemoryStore;

const BASELINE: &str = r#"{
    "markers": [
        {"id": "pre-1", "type": "bench", "lat": 10, "lng": 20},
        {"id": "pre-2", "type": "ladder", "lat": 0, "lng": 0},
        {"id": "ov", "type": "shiny", "lat": 1, "lng": 1}
    ],
    "zones": [
        {"id": "z-base", "number": 3, "points": [{"lat": 0, "lng": 0}, {"lat": 0, "lng": 10}, {"lat": 10, "lng": 10}]}
    ]
}"#;

#[derive(Debug, Clone)]
enum Visual {
    Marker(Marker),
    Zone(Zone),
}

/// Everything the session drew, shared with the test body.
#[derive(Debug, Default)]
struct SurfaceLog {
    next: u64,
    live: HashMap<VisualHandle, Visual>,
    draggable: HashMap<VisualHandle, bool>,
    updates: Vec<(VisualHandle, Point)>,
    preview: Vec<Point>,
    measurement: Option<Measurement>,
    overlay: Option<RadiusOverlay>,
}

impl SurfaceLog {
    fn live_markers(&self) -> usize {
        self.live.values().filter(|v| matches!(v, Visual::Marker(_))).count()
    }

    fn live_zones(&self) -> usize {
        self.live.values().filter(|v| matches!(v, Visual::Zone(_))).count()
    }
}

struct RecordingSurface(Rc<RefCell<SurfaceLog>>);

impl RecordingSurface {
    fn issue(&self, visual: Visual) -> VisualHandle {
        let mut log = self.0.borrow_mut();
        log.next += 1;
        let handle = VisualHandle(log.next);
        log.live.insert(handle, visual);
        handle
    }
}

impl RenderSurface for RecordingSurface {
    fn place_marker(&mut self, marker: &Marker) -> VisualHandle {
        self.issue(Visual::Marker(marker.clone()))
    }

    fn update_marker(&mut self, handle: VisualHandle, marker: &Marker) {
        let mut log = self.0.borrow_mut();
        assert!(log.live.contains_key(&handle), "update of dead handle");
        log.updates.push((handle, marker.position));
        log.live.insert(handle, Visual::Marker(marker.clone()));
    }

    fn set_draggable(&mut self, handle: VisualHandle, draggable: bool) {
        self.0.borrow_mut().draggable.insert(handle, draggable);
    }

    fn place_zone(&mut self, zone: &Zone) -> VisualHandle {
        self.issue(Visual::Zone(zone.clone()))
    }

    fn update_zone(&mut self, handle: VisualHandle, zone: &Zone) {
        self.0.borrow_mut().live.insert(handle, Visual::Zone(zone.clone()));
    }

    fn remove(&mut self, handle: VisualHandle) {
        let mut log = self.0.borrow_mut();
        assert!(log.live.remove(&handle).is_some(), "double remove");
        log.draggable.remove(&handle);
    }

    fn show_zone_preview(&mut self, points: &[Point]) {
        self.0.borrow_mut().preview = points.to_vec();
    }

    fn clear_zone_preview(&mut self) {
        self.0.borrow_mut().preview.clear();
    }

    fn show_overlay(&mut self, overlay: &RadiusOverlay, _pixels_per_unit: f64) {
        self.0.borrow_mut().overlay = Some(*overlay);
    }

    fn show_measurement(&mut self, _from: Point, _to: Point, measurement: &Measurement) {
        self.0.borrow_mut().measurement = Some(*measurement);
    }

    fn clear_measurement(&mut self) {
        self.0.borrow_mut().measurement = None;
    }
}

fn assets() -> MemorySource {
    MemorySource::new()
        .with_file("markers.json", BASELINE)
        .with_file("stickers.json", r#"["star.png", "arrow.png"]"#)
}

fn start_with(storage: Box<dyn KeyValueStore>, settings: Settings) -> (Session, Rc<RefCell<SurfaceLog>>) {
    start_from(&assets(), storage, settings)
}

fn start_from(
    assets: &MemorySource,
    storage: Box<dyn KeyValueStore>,
    settings: Settings,
) -> (Session, Rc<RefCell<SurfaceLog>>) {
    let log = Rc::new(RefCell::new(SurfaceLog::default()));
    let session = Session::start(
        settings,
        assets,
        storage,
        Box::new(RecordingSurface(Rc::clone(&log))),
        Point::new(50.0, 50.0),
    );
    (session, log)
}

fn start(saved: Option<&str>) -> (Session, Rc<RefCell<SurfaceLog>>) {
    let mut store = MemoryStore::new();
    if let Some(json) = saved {
        store = store.with_entry("mapnote-state", json);
    }
    start_with(Box::new(store), Settings::default())
}

fn saved_record(storage: Box<dyn KeyValueStore>) -> PersistedState {
    let json = storage.get("mapnote-state").unwrap().unwrap();
    PersistedState::from_json(&json).unwrap()
}

#[test]
fn test_start_from_baseline_only() {
    let (session, log) = start(None);
    let ids: Vec<&str> = session.store().presets().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["pre-1", "pre-2"]);
    assert_eq!(session.store().users().count(), 0);
    assert_eq!(session.store().zones().count(), 1);
    assert_eq!(session.stickers().names(), ["arrow.png", "star.png"]);

    let log = log.borrow();
    assert_eq!(log.live_markers(), 2);
    assert_eq!(log.live_zones(), 1);
    assert_eq!(log.overlay.unwrap().center, Point::new(50.0, 50.0));
    assert!(!session.is_save_pending());
}

#[test]
fn test_saved_preset_wins_over_baseline() {
    let saved = r#"{"presetMarkers": [{"id": "pre-1", "type": "bench", "lat": 15, "lng": 25, "label": "Moved Bench"}]}"#;
    let (session, _log) = start(Some(saved));

    let moved: Vec<&Marker> = session.store().presets().filter(|m| m.id == "pre-1").collect();
    assert_eq!(moved.len(), 1);
    assert_eq!(moved[0].position, Point::new(15.0, 25.0));
    assert_eq!(moved[0].label, "Moved Bench");
    assert_eq!(session.store().presets().count(), 2);
}

#[test]
fn test_saved_settings_are_restored() {
    let saved = r#"{"snapEnabled": false, "gridSize": 2, "radiusOverlayCenter": {"lat": 7, "lng": 8}, "zones": []}"#;
    let (session, log) = start(Some(saved));
    assert!(!session.snap_enabled());
    assert_eq!(session.grid_size(), 2.0);
    assert_eq!(session.overlay().center(), Point::new(7.0, 8.0));
    // Saved zones take over from the baseline, even when empty.
    assert_eq!(session.store().zones().count(), 0);
    assert_eq!(log.borrow().overlay.unwrap().center, Point::new(7.0, 8.0));
}

#[test]
fn test_malformed_record_is_ignored() {
    let (session, _log) = start(Some("{\"userMarkers\": [oops"));
    assert_eq!(session.store().presets().count(), 2);
    assert_eq!(session.store().users().count(), 0);
}

#[test]
fn test_custom_markers_are_merged_into_users() {
    let saved = r##"{
        "userMarkers": [{"id": "user-a", "type": "circle", "lat": 1, "lng": 1, "color": "#00ff00"}],
        "customMarkers": [
            {"id": "user-a", "type": "circle", "lat": 9, "lng": 9},
            {"id": "user-b", "type": "sprite", "sprite": "star.png", "lat": 2, "lng": 2}
        ]
    }"##;
    let (session, _log) = start(Some(saved));
    let users: Vec<&Marker> = session.store().users().collect();
    assert_eq!(users.len(), 2);
    assert_eq!(users[0].position, Point::new(1.0, 1.0));
    assert_eq!(users[1].id, "user-b");
    assert_eq!(users[1].label, "star");
}

#[test]
fn test_click_places_snapped_marker() {
    let (mut session, log) = start(None);
    session.enter_mode(ModeKind::Adding);

    let outcome = session.handle_position(Point::new(12.0, 13.0)).unwrap();
    let PositionOutcome::MarkerAdded(id) = outcome else {
        panic!("Expected MarkerAdded, got {:?}", outcome);
    };
    let marker = session.store().get(&id).unwrap();
    assert_eq!(marker.position, Point::new(10.0, 15.0));
    assert_eq!(marker.source, MarkerSource::User);
    assert!(matches!(marker.kind, MarkerKind::Circle { .. }));
    assert_eq!(log.borrow().live_markers(), 3);
    assert!(session.is_save_pending());
}

#[test]
fn test_fixed_asset_tools_add_presets() {
    let (mut session, _log) = start(None);
    session.set_tool(AddTool::Elevator).unwrap();
    session.enter_mode(ModeKind::Adding);
    let PositionOutcome::MarkerAdded(id) = session.handle_position(Point::new(0.0, 0.0)).unwrap() else {
        panic!("Expected a marker");
    };
    assert!(session.store().get(&id).unwrap().is_preset());
    assert_eq!(session.store().presets().count(), 3);
}

#[test]
fn test_sprite_tool_requires_known_sticker() {
    let (mut session, _log) = start(None);
    let result = session.set_tool(AddTool::Sprite {
        name: "moon.png".to_string(),
    });
    assert!(matches!(result, Err(SessionError::UnknownSticker(name)) if name == "moon.png"));

    session
        .set_tool(AddTool::Sprite {
            name: "star.png".to_string(),
        })
        .unwrap();
    assert_eq!(
        session.add_tool(),
        &AddTool::Sprite {
            name: "star.png".to_string()
        }
    );
}

#[test]
fn test_idle_ignores_clicks() {
    let (mut session, _log) = start(None);
    assert_eq!(
        session.handle_position(Point::new(1.0, 1.0)).unwrap(),
        PositionOutcome::Ignored
    );
    assert!(!session.is_save_pending());
}

#[test]
fn test_measurement_uses_session_scale() {
    let mut settings = Settings::default();
    settings.pixels_per_unit = 2.0;
    let (mut session, log) = start_with(Box::new(MemoryStore::new()), settings);
    session.enter_mode(ModeKind::Measuring);

    assert_eq!(
        session.handle_position(Point::new(0.0, 0.0)).unwrap(),
        PositionOutcome::MeasureStarted(Point::new(0.0, 0.0))
    );
    let PositionOutcome::Measured(m) = session.handle_position(Point::new(3.0, 4.0)).unwrap() else {
        panic!("Expected a measurement");
    };
    assert_eq!(m.pixels_text(), "5.0");
    assert_eq!(m.units_text(), "2.50");
    assert!(log.borrow().measurement.is_some());

    session.enter_mode(ModeKind::Idle);
    assert!(log.borrow().measurement.is_none());
}

#[test]
fn test_zone_drawing_flow() {
    let (mut session, log) = start(Some(r#"{"zones": []}"#));
    session.enter_mode(ModeKind::ZoneDrawing);
    assert_eq!(session.suggested_zone_number(), 1);

    for (lat, lng) in [(0.0, 0.0), (0.0, 20.0), (20.0, 20.0)] {
        session.handle_position(Point::new(lat, lng)).unwrap();
    }
    assert_eq!(log.borrow().preview.len(), 3);

    let outcome = session.handle_position(Point::new(1.0, 1.0)).unwrap();
    let PositionOutcome::Zone(DrawerEvent::Finalized(id)) = outcome else {
        panic!("Expected a finished zone, got {:?}", outcome);
    };
    let zone = session.store().zone(&id).unwrap();
    assert_eq!(zone.points.len(), 3);
    assert_eq!(zone.label, "Zone 1");
    assert_eq!(session.suggested_zone_number(), 2);

    let log = log.borrow();
    assert!(log.preview.is_empty());
    assert_eq!(log.live_zones(), 1);
}

#[test]
fn test_leaving_zone_mode_discards_vertices() {
    let (mut session, log) = start(None);
    session.enter_mode(ModeKind::ZoneDrawing);
    session.set_suggested_zone_number(42);
    session.handle_position(Point::new(0.0, 0.0)).unwrap();
    session.handle_position(Point::new(0.0, 20.0)).unwrap();

    session.enter_mode(ModeKind::Adding);
    assert!(!session.zone_drawer().is_drawing());
    assert!(log.borrow().preview.is_empty());
    assert_eq!(session.store().zones().count(), 1);
    assert!(!session.is_save_pending());
    assert_eq!(session.suggested_zone_number(), 4);
}

#[test]
fn test_editing_toggles_draggability() {
    let saved = r#"{"presetMarkers": [{"id": "pre-1", "type": "bench", "lat": 10, "lng": 20, "locked": true}]}"#;
    let (mut session, log) = start(Some(saved));
    let handle = |id: &str, session: &Session| session.store().entry(id).unwrap().handle.unwrap();
    let locked = handle("pre-1", &session);
    let free = handle("pre-2", &session);

    assert!(!log.borrow().draggable[&free]);
    session.enter_mode(ModeKind::Editing);
    assert!(log.borrow().draggable[&free]);
    assert!(!log.borrow().draggable[&locked]);

    session.toggle_mode(ModeKind::Editing);
    assert!(!log.borrow().draggable[&free]);
}

#[test]
fn test_locked_move_is_rejected_and_visual_restored() {
    let saved = r#"{"presetMarkers": [{"id": "pre-1", "type": "bench", "lat": 10, "lng": 20, "locked": true}]}"#;
    let (mut session, log) = start(Some(saved));
    session.enter_mode(ModeKind::Editing);

    let result = session.move_marker("pre-1", Point::new(40.0, 40.0));
    assert!(matches!(
        result,
        Err(SessionError::Store(StoreError::Locked(_)))
    ));
    assert_eq!(
        session.store().get("pre-1").unwrap().position,
        Point::new(10.0, 20.0)
    );
    let handle = session.store().entry("pre-1").unwrap().handle.unwrap();
    assert_eq!(
        log.borrow().updates.last(),
        Some(&(handle, Point::new(10.0, 20.0)))
    );
    assert!(!session.is_save_pending());

    // Unlocking is still allowed, then the move goes through.
    session.edit_marker("pre-1", &MarkerPatch::locked(false)).unwrap();
    assert_eq!(
        session.move_marker("pre-1", Point::new(41.0, 39.0)).unwrap(),
        Point::new(40.0, 40.0)
    );
}

#[test]
fn test_move_outside_editing_is_rejected() {
    let (mut session, _log) = start(None);
    assert!(matches!(
        session.move_marker("pre-2", Point::new(5.0, 5.0)),
        Err(SessionError::NotInMode(_))
    ));
    assert!(matches!(
        session.set_deleting(true),
        Err(SessionError::NotInMode(_))
    ));
}

#[test]
fn test_deleting_requires_confirmation_for_presets() {
    let (mut session, log) = start(None);
    assert!(!session.marker_clicked("pre-1", Confirmation::Confirmed).unwrap());

    session.enter_mode(ModeKind::Editing);
    session.set_deleting(true).unwrap();
    let result = session.marker_clicked("pre-1", Confirmation::Unconfirmed);
    assert!(matches!(
        result,
        Err(SessionError::Store(StoreError::ConfirmationRequired(_)))
    ));
    assert!(session.store().contains("pre-1"));

    assert!(session.marker_clicked("pre-1", Confirmation::Confirmed).unwrap());
    assert!(!session.store().contains("pre-1"));
    assert_eq!(log.borrow().live_markers(), 1);

    assert!(session.zone_clicked("z-base").unwrap());
    assert_eq!(log.borrow().live_zones(), 0);
}

#[test]
fn test_update_zone_refreshes_visual() {
    let (mut session, log) = start(None);
    session
        .update_zone(
            "z-base",
            &ZonePatch {
                label: None,
                number: Some(250),
            },
        )
        .unwrap();
    assert_eq!(session.store().zone("z-base").unwrap().number, 99);
    let handle = session.store().zone_entries().next().unwrap().handle.unwrap();
    assert!(matches!(&log.borrow().live[&handle], Visual::Zone(z) if z.number == 99));
}

#[test]
fn test_overlay_drag_snaps_and_saves() {
    let (mut session, log) = start(None);
    assert_eq!(
        session.overlay_drag_end(Point::new(12.0, 13.0)),
        Point::new(10.0, 15.0)
    );
    assert_eq!(log.borrow().overlay.unwrap().center, Point::new(10.0, 15.0));
    assert!(session.is_save_pending());

    assert_eq!(session.toggle_ring(0), Some(false));
    assert!(!log.borrow().overlay.unwrap().rings[0].visible);
    assert_eq!(session.toggle_ring(5), None);
}

#[test]
fn test_import_is_atomic() {
    let (mut session, log) = start(None);
    assert!(matches!(
        session.import_json("{\"markers\": [{"),
        Err(SessionError::Format(_))
    ));
    assert!(matches!(
        session.import_json("42"),
        Err(SessionError::Format(_))
    ));
    assert_eq!(session.store().users().count(), 0);
    assert!(!session.is_save_pending());

    let summary = session
        .import_json(
            r#"[
                {"id": "pre-1", "type": "circle", "lat": 1, "lng": 1},
                {"type": "bench", "lat": 2, "lng": 2},
                {"id": "s1", "type": "sprite", "sprite": "star.png", "lat": 3, "lng": 3}
            ]"#,
        )
        .unwrap();
    assert_eq!(summary.markers_added, 2);
    assert_eq!(session.store().users().count(), 2);
    // The preset keeps its id; the import was renamed.
    assert_eq!(session.store().get("pre-1").unwrap().source, MarkerSource::Preset);
    assert_eq!(log.borrow().live_markers(), 4);
}

#[test]
fn test_export_then_import_round_trip() {
    let (mut session, _log) = start(None);
    session.enter_mode(ModeKind::Adding);
    session.handle_position(Point::new(5.0, 5.0)).unwrap();
    let json = session.export_user_json().unwrap();

    let (mut other, _log) = start(None);
    other.import_json(&json).unwrap();
    let a: Vec<&Marker> = session.store().users().collect();
    let b: Vec<&Marker> = other.store().users().collect();
    assert_eq!(a, b);

    assert_eq!(
        session.export_json(ExportScope::All).unwrap(),
        session.export_json(ExportScope::All).unwrap()
    );
}

#[test]
fn test_debounced_save_and_reload() {
    let (mut session, _log) = start(None);
    session.enter_mode(ModeKind::Adding);
    session.handle_position(Point::new(12.0, 13.0)).unwrap();
    session.set_grid_size(2.0);

    assert!(!session.tick(Instant::now()));
    assert!(session.tick(Instant::now() + Duration::from_secs(1)));
    assert!(!session.is_save_pending());

    let (reloaded, _log) = start_with(session.into_storage(), Settings::default());
    let users: Vec<&Marker> = reloaded.store().users().collect();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].position, Point::new(10.0, 15.0));
    assert_eq!(reloaded.grid_size(), 2.0);
}

#[test]
fn test_flush_writes_pending_save() {
    let (mut session, _log) = start(None);
    assert!(!session.flush().unwrap());
    session.set_snap_enabled(false);
    assert!(session.flush().unwrap());

    let state = saved_record(session.into_storage());
    assert_eq!(state.snap_enabled, Some(false));
    assert_eq!(state.preset_markers.len(), 2);
    assert_eq!(state.zones.map(|z| z.len()), Some(1));
}

#[test]
fn test_reset_user_keeps_preset_edits() {
    let (mut session, log) = start(None);
    session.enter_mode(ModeKind::Adding);
    session.handle_position(Point::new(1.0, 1.0)).unwrap();
    session.edit_marker("pre-1", &MarkerPatch::label("Renamed")).unwrap();

    session.reset(ResetScope::User).unwrap();
    assert_eq!(session.store().users().count(), 0);
    assert_eq!(session.store().get("pre-1").unwrap().label, "Renamed");
    assert_eq!(log.borrow().live_markers(), 2);
    assert!(!session.is_save_pending());

    let state = saved_record(session.into_storage());
    assert!(state.user_markers.is_empty());
    assert!(state.custom_markers.is_empty());
    assert_eq!(state.preset_markers.len(), 2);
}

#[test]
fn test_reset_all_restores_baseline() {
    let saved = r#"{
        "presetMarkers": [{"id": "pre-1", "type": "bench", "lat": 15, "lng": 25}],
        "zones": []
    }"#;
    let (mut session, log) = start(Some(saved));
    assert_eq!(session.store().zones().count(), 0);

    session.reset(ResetScope::All).unwrap();
    assert_eq!(
        session.store().get("pre-1").unwrap().position,
        Point::new(10.0, 20.0)
    );
    assert_eq!(session.store().zones().count(), 1);
    assert_eq!(log.borrow().live_markers(), 2);
    assert_eq!(log.borrow().live_zones(), 1);

    let state = saved_record(session.into_storage());
    assert!(state.preset_markers.is_empty());
    assert!(state.zones.is_none());
}

#[test]
fn test_idless_baseline_ids_survive_reset_and_reload() {
    let assets = MemorySource::new().with_file(
        "markers.json",
        r#"{
            "markers": [{"type": "bench", "lat": 1, "lng": 2}],
            "zones": [{"number": 1, "points": [{"lat": 0, "lng": 0}, {"lat": 0, "lng": 4}, {"lat": 4, "lng": 4}]}]
        }"#,
    );
    let preset_ids = |s: &Session| -> Vec<String> { s.store().presets().map(|m| m.id.clone()).collect() };
    let zone_ids = |s: &Session| -> Vec<String> { s.store().zones().map(|z| z.id.clone()).collect() };

    let (mut session, _log) = start_from(&assets, Box::new(MemoryStore::new()), Settings::default());
    assert_eq!(preset_ids(&session), ["baseline-1"]);
    assert_eq!(zone_ids(&session), ["baseline-zone-1"]);

    session.reset(ResetScope::All).unwrap();
    assert_eq!(preset_ids(&session), ["baseline-1"]);
    assert_eq!(zone_ids(&session), ["baseline-zone-1"]);

    session.set_snap_enabled(false);
    assert!(session.flush().unwrap());

    let (reloaded, log) = start_from(&assets, session.into_storage(), Settings::default());
    assert_eq!(preset_ids(&reloaded), ["baseline-1"]);
    assert_eq!(zone_ids(&reloaded), ["baseline-zone-1"]);
    assert_eq!(log.borrow().live_markers(), 1);
}
