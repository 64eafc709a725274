//! Input model: modifier keys, mouse buttons, and the click-or-drag state machine.
//!
//! A press pans the view while it moves and becomes a click when it is
//! released close to where it started. [`Gesture`] tracks the press between pointer-down and
//! pointer-up; the engine turns its transitions into actions.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use crate::camera::Point;
use crate::consts::CLICK_THRESHOLD_PX;

/// Keyboard/mouse modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    /// Ctrl on most platforms, Cmd on macOS. Redirects zoom to the outer level.
    #[must_use]
    pub fn browser_zoom(self) -> bool {
        self.ctrl || self.meta
    }
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Primary,
    Middle,
    Secondary,
}

/// A keyboard key as reported by the browser (e.g. `"+"`, `"Escape"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

impl Key {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self(name.to_owned())
    }
}

/// Wheel / trackpad scroll delta in pixels (positive `dy` = scroll down).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelDelta {
    pub dx: f64,
    pub dy: f64,
}

/// Whether a press that travelled from `down` to `up` counts as a click.
#[must_use]
pub fn is_click(down: Point, up: Point) -> bool {
    down.distance(up) < CLICK_THRESHOLD_PX
}

/// Press in progress between pointer-down and pointer-up.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Gesture {
    #[default]
    Idle,
    /// Primary button is down.
    Pressed {
        /// Where the press started.
        down: Point,
        /// Last pointer position already applied to the view.
        last: Point,
        /// Set once any movement has been applied to the view.
        panned: bool,
    },
}

/// What a pointer movement means for the view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureStep {
    /// Nothing to apply.
    Hold,
    /// Pan by this screen-space delta.
    Pan { dx: f64, dy: f64 },
}

impl Gesture {
    pub fn press(&mut self, at: Point) {
        *self = Self::Pressed { down: at, last: at, panned: false };
    }

    /// Advance the press to `at`. Every movement pans by the delta since the
    /// last applied position.
    pub fn move_to(&mut self, at: Point) -> GestureStep {
        let Self::Pressed { last, panned, .. } = self else {
            return GestureStep::Hold;
        };
        let (dx, dy) = (at.x - last.x, at.y - last.y);
        if dx == 0.0 && dy == 0.0 {
            return GestureStep::Hold;
        }
        *panned = true;
        *last = at;
        GestureStep::Pan { dx, dy }
    }

    /// End the press. Returns the release point when it lands within the
    /// click radius of the press point, however far the pointer wandered.
    pub fn release(&mut self, at: Point) -> Option<Point> {
        match std::mem::take(self) {
            Self::Pressed { down, .. } if is_click(down, at) => Some(at),
            _ => None,
        }
    }

    /// Whether this press has moved the view.
    #[must_use]
    pub fn has_panned(&self) -> bool {
        matches!(self, Self::Pressed { panned: true, .. })
    }
}
