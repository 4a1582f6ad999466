//! Editing modes and position-event routing.
//!
//! One tagged enum holds the active mode, so at most one of measuring,
//! adding, editing and zone drawing can be on at a time, and the deleting
//! flag only exists inside editing. Transient per-mode state (the pending
//! measurement endpoint) lives on the variant and disappears with it.

use crate::model::Point;

/// The active editing mode.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Mode {
    #[default]
    Idle,
    /// Measuring between two clicks; `start` is the first endpoint once placed.
    Measuring { start: Option<Point> },
    /// Placing markers with the current add tool.
    Adding,
    /// Dragging and inspecting markers; `deleting` turns clicks into deletions.
    Editing { deleting: bool },
    /// Accumulating zone vertices.
    ZoneDrawing,
}

/// Mode identity without per-mode state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeKind {
    Idle,
    Measuring,
    Adding,
    Editing,
    ZoneDrawing,
}

impl ModeKind {
    /// Get the display name for this mode.
    pub fn name(&self) -> &'static str {
        match self {
            ModeKind::Idle => "Idle",
            ModeKind::Measuring => "Measure",
            ModeKind::Adding => "Add",
            ModeKind::Editing => "Edit",
            ModeKind::ZoneDrawing => "Zone",
        }
    }

    fn initial(&self) -> Mode {
        match self {
            ModeKind::Idle => Mode::Idle,
            ModeKind::Measuring => Mode::Measuring { start: None },
            ModeKind::Adding => Mode::Adding,
            ModeKind::Editing => Mode::Editing { deleting: false },
            ModeKind::ZoneDrawing => Mode::ZoneDrawing,
        }
    }
}

impl Mode {
    pub fn kind(&self) -> ModeKind {
        match self {
            Mode::Idle => ModeKind::Idle,
            Mode::Measuring { .. } => ModeKind::Measuring,
            Mode::Adding => ModeKind::Adding,
            Mode::Editing { .. } => ModeKind::Editing,
            Mode::ZoneDrawing => ModeKind::ZoneDrawing,
        }
    }
}

/// A mode change, for running exit and entry actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: ModeKind,
    pub to: ModeKind,
}

impl Transition {
    /// Whether the mode actually changed.
    pub fn changed(&self) -> bool {
        self.from != self.to
    }

    pub fn exited(&self, kind: ModeKind) -> bool {
        self.changed() && self.from == kind
    }

    pub fn entered(&self, kind: ModeKind) -> bool {
        self.changed() && self.to == kind
    }
}

/// Where a position event goes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Route {
    /// No handler for the active mode.
    Ignore,
    /// First measurement endpoint placed.
    MeasureStart(Point),
    /// Second endpoint placed; the measurement is complete.
    Measured { from: Point, to: Point },
    /// Place a marker with the add tool.
    Add(Point),
    /// Feed the zone drawer.
    ZoneVertex(Point),
}

/// Owner of the active mode.
#[derive(Debug, Clone, Default)]
pub struct ModeController {
    mode: Mode,
}

impl ModeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn kind(&self) -> ModeKind {
        self.mode.kind()
    }

    pub fn is_active(&self, kind: ModeKind) -> bool {
        self.kind() == kind
    }

    pub fn is_deleting(&self) -> bool {
        matches!(self.mode, Mode::Editing { deleting: true })
    }

    /// Enter `kind`, leaving whatever mode was active.
    ///
    /// Re-entering the active mode keeps its state.
    pub fn enter(&mut self, kind: ModeKind) -> Transition {
        let from = self.kind();
        if from != kind {
            self.mode = kind.initial();
            log::debug!("Mode: {} -> {}", from.name(), kind.name());
        }
        Transition { from, to: kind }
    }

    /// Turn `kind` on, or back to idle if it is already on.
    pub fn toggle(&mut self, kind: ModeKind) -> Transition {
        if self.is_active(kind) {
            self.enter(ModeKind::Idle)
        } else {
            self.enter(kind)
        }
    }

    /// Set the deleting sub-flag. Only valid while editing; returns whether
    /// the flag was applied.
    pub fn set_deleting(&mut self, on: bool) -> bool {
        match &mut self.mode {
            Mode::Editing { deleting } => {
                *deleting = on;
                log::debug!("Mode: deleting = {}", on);
                true
            }
            _ => false,
        }
    }

    /// Route a position event to the active mode's handler.
    pub fn route(&mut self, point: Point) -> Route {
        match &mut self.mode {
            Mode::Idle | Mode::Editing { .. } => Route::Ignore,
            Mode::Measuring { start } => match start.take() {
                Some(from) => Route::Measured { from, to: point },
                None => {
                    *start = Some(point);
                    Route::MeasureStart(point)
                }
            },
            Mode::Adding => Route::Add(point),
            Mode::ZoneDrawing => Route::ZoneVertex(point),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modes_are_exclusive() {
        let mut modes = ModeController::new();
        modes.enter(ModeKind::Adding);
        let t = modes.enter(ModeKind::Measuring);
        assert!(t.exited(ModeKind::Adding));
        assert!(t.entered(ModeKind::Measuring));
        assert!(!modes.is_active(ModeKind::Adding));

        modes.enter(ModeKind::ZoneDrawing);
        assert_eq!(modes.kind(), ModeKind::ZoneDrawing);
    }

    #[test]
    fn test_deleting_only_while_editing() {
        let mut modes = ModeController::new();
        assert!(!modes.set_deleting(true));
        assert!(!modes.is_deleting());

        modes.enter(ModeKind::Editing);
        assert!(modes.set_deleting(true));
        assert!(modes.is_deleting());

        modes.toggle(ModeKind::Editing);
        assert_eq!(modes.kind(), ModeKind::Idle);
        modes.enter(ModeKind::Editing);
        assert!(!modes.is_deleting());
    }

    #[test]
    fn test_entering_adding_clears_deleting() {
        let mut modes = ModeController::new();
        modes.enter(ModeKind::Editing);
        modes.set_deleting(true);
        modes.enter(ModeKind::Adding);
        assert!(!modes.is_deleting());
    }

    #[test]
    fn test_idle_and_editing_ignore_positions() {
        let mut modes = ModeController::new();
        assert_eq!(modes.route(Point::new(1.0, 1.0)), Route::Ignore);
        modes.enter(ModeKind::Editing);
        assert_eq!(modes.route(Point::new(1.0, 1.0)), Route::Ignore);
    }

    #[test]
    fn test_measure_pairs_clicks() {
        let mut modes = ModeController::new();
        modes.enter(ModeKind::Measuring);
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert_eq!(modes.route(a), Route::MeasureStart(a));
        assert_eq!(modes.route(b), Route::Measured { from: a, to: b });
        assert_eq!(modes.route(b), Route::MeasureStart(b));
    }

    #[test]
    fn test_leaving_measuring_discards_endpoint() {
        let mut modes = ModeController::new();
        modes.enter(ModeKind::Measuring);
        modes.route(Point::new(5.0, 5.0));
        modes.enter(ModeKind::Adding);
        modes.enter(ModeKind::Measuring);
        assert_eq!(modes.mode(), Mode::Measuring { start: None });
    }

    #[test]
    fn test_reentering_keeps_state() {
        let mut modes = ModeController::new();
        modes.enter(ModeKind::Editing);
        modes.set_deleting(true);
        let t = modes.enter(ModeKind::Editing);
        assert!(!t.changed());
        assert!(modes.is_deleting());
    }
}
