//! Pointer, wheel and keyboard handling for the note canvas.
//!
//! [`Engine`] owns the camera and the active gesture. Hosts forward raw DOM
//! events and act on the returned [`Action`]s: re-render, open the note form,
//! or show a note. It never touches the network or the DOM itself.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use tracing::trace;

use crate::camera::{Camera, Point, ViewportRect};
use crate::consts::{KEY_ZOOM_STEP, WHEEL_ZOOM_IN, WHEEL_ZOOM_OUT};
use crate::feed::NoteFeed;
use crate::input::{Button, Gesture, GestureStep, Key, Modifiers, WheelDelta};
use crate::note::NoteId;

/// Actions returned from input handlers for the host to process.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// An empty grid cell was clicked.
    CellClicked { x: i32, y: i32 },
    /// An existing note was clicked.
    NoteClicked { id: NoteId },
    SetCursor(&'static str),
    RenderNeeded,
}

#[derive(Debug, Default)]
pub struct Engine {
    pub camera: Camera,
    gesture: Gesture,
}

impl Engine {
    #[must_use]
    pub fn new(rect: ViewportRect) -> Self {
        Self { camera: Camera::new(rect), gesture: Gesture::Idle }
    }

    /// Update the container measurement after layout or resize.
    pub fn set_viewport(&mut self, rect: ViewportRect) -> Vec<Action> {
        self.camera.set_rect(rect);
        vec![Action::RenderNeeded]
    }

    #[must_use]
    pub fn camera(&self) -> Camera {
        self.camera
    }

    // --- Pointer ---

    pub fn on_pointer_down(&mut self, screen: Point, button: Button, _modifiers: Modifiers) -> Vec<Action> {
        if button != Button::Primary {
            return Vec::new();
        }
        self.gesture.press(screen);
        Vec::new()
    }

    pub fn on_pointer_move(&mut self, screen: Point, _modifiers: Modifiers) -> Vec<Action> {
        let had_panned = self.gesture.has_panned();
        match self.gesture.move_to(screen) {
            GestureStep::Hold => Vec::new(),
            GestureStep::Pan { dx, dy } => {
                self.camera.pan(dx, dy);
                let mut actions = Vec::with_capacity(2);
                if !had_panned {
                    actions.push(Action::SetCursor("grabbing"));
                }
                actions.push(Action::RenderNeeded);
                actions
            }
        }
    }

    /// Finish a press. A click on a note selects it; a click on empty grid
    /// reports the nearest cell. A press that panned restores the cursor
    /// first.
    pub fn on_pointer_up(&mut self, screen: Point, button: Button, notes: &NoteFeed) -> Vec<Action> {
        if button != Button::Primary {
            return Vec::new();
        }
        let mut actions = Vec::new();
        if self.gesture.has_panned() {
            actions.push(Action::SetCursor("default"));
        }
        let Some(at) = self.gesture.release(screen) else {
            return actions;
        };
        let world = self.camera.screen_to_world(at);
        if let Some(note) = notes.hit_test(world) {
            actions.push(Action::NoteClicked { id: note.id });
            return actions;
        }
        let (x, y) = world.round_to_cell();
        trace!(x, y, "engine: cell clicked");
        actions.push(Action::CellClicked { x, y });
        actions
    }

    /// Pointer left the canvas: abandon any press without clicking.
    pub fn on_pointer_leave(&mut self) -> Vec<Action> {
        let had_panned = self.gesture.has_panned();
        self.gesture = Gesture::Idle;
        if had_panned { vec![Action::SetCursor("default")] } else { Vec::new() }
    }

    // --- Wheel ---

    /// Plain wheel zooms the content at the pointer, Ctrl/Cmd+wheel (and
    /// trackpad pinch) zooms the outer level, Shift+wheel pans.
    pub fn on_wheel(&mut self, screen: Point, delta: WheelDelta, modifiers: Modifiers) -> Vec<Action> {
        if modifiers.shift {
            self.camera.pan(-delta.dx, -delta.dy);
            return vec![Action::RenderNeeded];
        }
        if delta.dy.abs() < f64::EPSILON {
            return Vec::new();
        }
        let factor = if delta.dy > 0.0 { WHEEL_ZOOM_OUT } else { WHEEL_ZOOM_IN };
        let changed = if modifiers.browser_zoom() {
            self.camera.browser_zoom_at(factor, screen)
        } else {
            self.camera.zoom_at(factor, screen)
        };
        if changed { vec![Action::RenderNeeded] } else { Vec::new() }
    }

    // --- Keyboard ---

    /// `+`/`=` zoom in, `-`/`_` zoom out, `0` resets. With Ctrl/Cmd the outer
    /// zoom is adjusted instead. Zoom anchors on the viewport centre.
    pub fn on_key_down(&mut self, key: &Key, modifiers: Modifiers) -> Vec<Action> {
        let center = self.camera.rect.center();
        let changed = match key.0.as_str() {
            "+" | "=" => self.zoom_by(KEY_ZOOM_STEP, center, modifiers),
            "-" | "_" => self.zoom_by(1.0 / KEY_ZOOM_STEP, center, modifiers),
            "0" if modifiers.browser_zoom() => {
                let factor = 1.0 / self.camera.view.browser_zoom;
                self.camera.browser_zoom_at(factor, center)
            }
            "0" => {
                let before = self.camera.view;
                self.camera.reset();
                before != self.camera.view
            }
            _ => false,
        };
        if changed { vec![Action::RenderNeeded] } else { Vec::new() }
    }

    // --- Zoom buttons ---

    pub fn zoom_in(&mut self) -> Vec<Action> {
        self.on_key_down(&Key::new("+"), Modifiers::default())
    }

    pub fn zoom_out(&mut self) -> Vec<Action> {
        self.on_key_down(&Key::new("-"), Modifiers::default())
    }

    pub fn reset_view(&mut self) -> Vec<Action> {
        self.on_key_down(&Key::new("0"), Modifiers::default())
    }

    fn zoom_by(&mut self, factor: f64, anchor: Point, modifiers: Modifiers) -> bool {
        if modifiers.browser_zoom() {
            self.camera.browser_zoom_at(factor, anchor)
        } else {
            self.camera.zoom_at(factor, anchor)
        }
    }
}
