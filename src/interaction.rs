//! Pointer gesture tracking.
//!
//! [`PointerState`] turns raw pointer events into [`GestureStep`]s. It owns no
//! textures: the caller runs the steps against the history and the canvas, in
//! order. A [`Stroke`] inside [`GestureStep::Apply`] is a copy of the pointer
//! geometry at the time the step was emitted, so state changes made by the
//! same event (a selection being translated on release, say) never leak into
//! the pass.

use smallvec::SmallVec;

use crate::tool::ToolKind;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    /// Marks "no previous position": the next paint pass draws a dot.
    pub const INVALID: Point = Point { x: -1.0, y: -1.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Only the [`Point::INVALID`] sentinel is invalid; positions beyond the
    /// top or left edge are real positions.
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    pub fn offset(&self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn to_array(self) -> [f32; 2] {
        [self.x, self.y]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

/// Gesture phase. The discriminants are written into the pass uniforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum GesturePhase {
    #[default]
    Up = 0,
    Down = 1,
    Dragging = 2,
}

/// Selection rectangle given by two corners in any order.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Selection {
    pub from: Point,
    pub to: Point,
}

impl Selection {
    pub fn new(from: Point, to: Point) -> Self {
        Self { from, to }
    }

    pub fn bounds(&self) -> (Point, Point) {
        (
            Point::new(self.from.x.min(self.to.x), self.from.y.min(self.to.y)),
            Point::new(self.from.x.max(self.to.x), self.from.y.max(self.to.y)),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.from.x == self.to.x || self.from.y == self.to.y
    }

    /// True when `point` lies inside the rectangle, edges excluded.
    pub fn contains_strictly(&self, point: Point) -> bool {
        let (min, max) = self.bounds();
        point.x > min.x && point.x < max.x && point.y > min.y && point.y < max.y
    }

    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        Self::new(self.from.offset(dx, dy), self.to.offset(dx, dy))
    }
}

/// Geometry handed to one commit or present pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    /// Previous position, or the gesture start for click-commit tools.
    pub from: Point,
    pub to: Point,
    pub phase: GesturePhase,
    pub selection: Selection,
    pub shift: bool,
    pub pressure: f32,
}

impl Stroke {
    pub fn new(from: Point, to: Point) -> Self {
        Self {
            from,
            to,
            phase: GesturePhase::Down,
            selection: Selection::default(),
            shift: false,
            pressure: 1.0,
        }
    }

    pub fn delta(&self) -> (f32, f32) {
        (self.to.x - self.from.x, self.to.y - self.from.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureStep {
    /// Capture the canvas into undo history before the next apply.
    Snapshot,
    /// Run a commit pass with this geometry.
    Apply(Stroke),
    /// Drop the newest history entry: its gesture never committed.
    DiscardSnapshot,
}

pub type GestureSteps = SmallVec<[GestureStep; 3]>;

/// Shortcut commands that bypass the gesture machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    Undo,
    Redo,
}

/// Maps a key-down to a history shortcut: Ctrl+Z undoes, Ctrl+Y and
/// Ctrl+Shift+Z redo.
pub fn key_command(key: char, modifiers: Modifiers) -> Option<KeyCommand> {
    if !modifiers.ctrl {
        return None;
    }
    match key.to_ascii_lowercase() {
        'z' if modifiers.shift => Some(KeyCommand::Redo),
        'z' => Some(KeyCommand::Undo),
        'y' => Some(KeyCommand::Redo),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointerState {
    pub current: Point,
    pub previous: Point,
    pub last_in_bounds: Point,
    pub modifiers: Modifiers,
    pub phase: GesturePhase,
    pub selection: Selection,
    /// The pointer is over the source.
    pub hovering: bool,
    pub pressure: f32,
    pending_commit: bool,
    canvas_size: (u32, u32),
}

impl PointerState {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            current: Point::default(),
            previous: Point::INVALID,
            last_in_bounds: Point::default(),
            modifiers: Modifiers::default(),
            phase: GesturePhase::Up,
            selection: Selection::default(),
            hovering: false,
            pressure: 1.0,
            pending_commit: false,
            canvas_size: (width, height),
        }
    }

    pub fn set_canvas_size(&mut self, width: u32, height: u32) {
        self.canvas_size = (width, height);
    }

    pub fn in_bounds(&self, point: Point) -> bool {
        point.x >= 0.0
            && point.y >= 0.0
            && point.x < self.canvas_size.0 as f32
            && point.y < self.canvas_size.1 as f32
    }

    /// A click-commit gesture has snapshotted but not painted yet.
    pub fn has_pending_commit(&self) -> bool {
        self.pending_commit
    }

    pub fn stroke(&self) -> Stroke {
        Stroke {
            from: self.previous,
            to: self.current,
            phase: self.phase,
            selection: self.selection,
            shift: self.modifiers.shift,
            pressure: self.pressure,
        }
    }

    pub fn press(
        &mut self,
        tool: ToolKind,
        button: MouseButton,
        position: Point,
        modifiers: Modifiers,
    ) -> GestureSteps {
        let mut steps = GestureSteps::new();
        self.modifiers = modifiers;
        if button != MouseButton::Left || tool == ToolKind::None || !self.in_bounds(position) {
            return steps;
        }
        if self.phase != GesturePhase::Up {
            // A release got lost; finish the old gesture before starting over.
            steps.extend(self.cancel());
        }

        self.current = position;
        self.last_in_bounds = position;
        self.hovering = true;

        if tool.paints_on_move() {
            self.previous = Point::INVALID;
            self.phase = GesturePhase::Down;
            steps.push(GestureStep::Snapshot);
            steps.push(GestureStep::Apply(self.stroke()));
        } else if tool == ToolKind::Stamp {
            self.previous = position;
            self.phase = GesturePhase::Down;
            steps.push(GestureStep::Snapshot);
            steps.push(GestureStep::Apply(self.stroke()));
        } else if tool.commits_on_release() {
            self.previous = position;
            self.phase = GesturePhase::Down;
            self.pending_commit = true;
            steps.push(GestureStep::Snapshot);
        } else if tool.is_selection() {
            self.previous = position;
            self.phase = if self.selection.contains_strictly(position) {
                GesturePhase::Dragging
            } else {
                GesturePhase::Down
            };
        }
        steps
    }

    pub fn motion(
        &mut self,
        tool: ToolKind,
        position: Point,
        modifiers: Modifiers,
        leave: bool,
    ) -> GestureSteps {
        let mut steps = GestureSteps::new();
        self.modifiers = modifiers;
        if tool.paints_on_move() {
            self.previous = self.current;
        }
        self.current = position;
        if self.in_bounds(position) {
            self.last_in_bounds = position;
        }
        self.hovering = !leave;

        if self.hovering && self.phase == GesturePhase::Down && tool.paints_on_move() {
            steps.push(GestureStep::Apply(self.stroke()));
        }
        steps
    }

    pub fn release(
        &mut self,
        tool: ToolKind,
        button: MouseButton,
        position: Point,
        modifiers: Modifiers,
    ) -> GestureSteps {
        let mut steps = GestureSteps::new();
        self.modifiers = modifiers;
        if button != MouseButton::Left || self.phase == GesturePhase::Up {
            return steps;
        }

        let position = if self.in_bounds(position) {
            position
        } else {
            self.last_in_bounds
        };
        if tool.paints_on_move() {
            self.previous = self.current;
        }
        self.current = position;

        match self.phase {
            GesturePhase::Up => {}
            GesturePhase::Down => {
                if self.pending_commit {
                    self.pending_commit = false;
                    if tool.commits_on_release() {
                        steps.push(GestureStep::Apply(self.stroke()));
                    } else {
                        steps.push(GestureStep::DiscardSnapshot);
                    }
                } else if tool.is_selection() {
                    self.selection = Selection::new(self.previous, position);
                }
            }
            GesturePhase::Dragging => {
                steps.push(GestureStep::Snapshot);
                steps.push(GestureStep::Apply(self.stroke()));
                let (dx, dy) = self.stroke().delta();
                self.selection = self.selection.translated(dx, dy);
            }
        }

        self.phase = GesturePhase::Up;
        if !tool.paints_on_move() {
            self.previous = self.current;
        }
        steps
    }

    /// Forces the gesture back to `Up` without committing anything.
    pub fn cancel(&mut self) -> GestureSteps {
        let mut steps = GestureSteps::new();
        if self.pending_commit {
            self.pending_commit = false;
            steps.push(GestureStep::DiscardSnapshot);
        }
        self.phase = GesturePhase::Up;
        steps
    }

    /// Drops the selection, e.g. after the canvas was resized.
    pub fn reset_selection(&mut self) {
        self.selection = Selection::default();
    }
}
