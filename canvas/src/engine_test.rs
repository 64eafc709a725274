#![allow(clippy::float_cmp)]

use time::OffsetDateTime;
use uuid::Uuid;

use super::*;
use crate::consts::{MAX_ZOOM, MIN_ZOOM};
use crate::note::Note;

// =============================================================
// Helpers
// =============================================================

fn engine() -> Engine {
    Engine::new(ViewportRect::new(0.0, 0.0, 800.0, 600.0))
}

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn none() -> Modifiers {
    Modifiers::default()
}

fn ctrl() -> Modifiers {
    Modifiers { ctrl: true, ..Default::default() }
}

fn note_at(x: i32, y: i32) -> Note {
    Note {
        id: Uuid::new_v4(),
        created_at: OffsetDateTime::UNIX_EPOCH,
        sent_to: "Alice".into(),
        message: "Hi".into(),
        x,
        y,
        color: "#fff3a0".into(),
        report_count: 0,
    }
}

fn click(engine: &mut Engine, at: Point, notes: &NoteFeed) -> Vec<Action> {
    engine.on_pointer_down(at, Button::Primary, none());
    engine.on_pointer_up(at, Button::Primary, notes)
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

// =============================================================
// Clicks
// =============================================================

#[test]
fn click_at_grid_origin_reports_cell_zero() {
    let mut e = engine();
    let actions = click(&mut e, pt(120.0, 120.0), &NoteFeed::new());
    assert_eq!(actions, vec![Action::CellClicked { x: 0, y: 0 }]);
}

#[test]
fn click_rounds_to_nearest_cell() {
    let mut e = engine();
    // 200px at the default view is cell 26.67.
    let actions = click(&mut e, pt(200.0, 200.0), &NoteFeed::new());
    assert_eq!(actions, vec![Action::CellClicked { x: 27, y: 27 }]);
}

#[test]
fn click_on_note_selects_it() {
    let mut e = engine();
    let mut notes = NoteFeed::new();
    let n = note_at(0, 0);
    notes.insert(n.clone());
    // Three screen pixels in is inside the note square.
    let actions = click(&mut e, pt(123.0, 123.0), &notes);
    assert_eq!(actions, vec![Action::NoteClicked { id: n.id }]);
}

#[test]
fn small_wobble_pans_and_still_clicks() {
    let mut e = engine();
    e.on_pointer_down(pt(120.0, 120.0), Button::Primary, none());
    let moved = e.on_pointer_move(pt(123.0, 120.0), none());
    assert_eq!(moved, vec![Action::SetCursor("grabbing"), Action::RenderNeeded]);
    let actions = e.on_pointer_up(pt(123.0, 120.0), Button::Primary, &NoteFeed::new());
    assert!(matches!(actions.as_slice(), [Action::SetCursor("default"), Action::CellClicked { .. }]));
}

#[test]
fn drag_away_and_back_is_a_click() {
    let mut e = engine();
    e.on_pointer_down(pt(100.0, 100.0), Button::Primary, none());
    e.on_pointer_move(pt(150.0, 100.0), none());
    let back = e.on_pointer_move(pt(101.0, 100.0), none());
    assert_eq!(back, vec![Action::RenderNeeded]);
    let up = e.on_pointer_up(pt(101.0, 100.0), Button::Primary, &NoteFeed::new());
    assert!(matches!(up.as_slice(), [Action::SetCursor("default"), Action::CellClicked { .. }]));
}

#[test]
fn drag_past_threshold_pans_instead_of_clicking() {
    let mut e = engine();
    e.on_pointer_down(pt(100.0, 100.0), Button::Primary, none());
    let moved = e.on_pointer_move(pt(106.0, 100.0), none());
    assert_eq!(moved, vec![Action::SetCursor("grabbing"), Action::RenderNeeded]);
    // 6px at scale 0.6 is 10 world px.
    assert!(approx(e.camera().view.offset_x, 210.0));

    let up = e.on_pointer_up(pt(106.0, 100.0), Button::Primary, &NoteFeed::new());
    assert_eq!(up, vec![Action::SetCursor("default")]);
}

#[test]
fn release_just_past_threshold_is_not_a_click() {
    let mut e = engine();
    e.on_pointer_down(pt(100.0, 100.0), Button::Primary, none());
    let up = e.on_pointer_up(pt(105.01, 100.0), Button::Primary, &NoteFeed::new());
    assert!(up.is_empty());
}

#[test]
fn secondary_button_is_ignored() {
    let mut e = engine();
    assert!(e.on_pointer_down(pt(120.0, 120.0), Button::Secondary, none()).is_empty());
    assert!(e.on_pointer_up(pt(120.0, 120.0), Button::Secondary, &NoteFeed::new()).is_empty());
}

#[test]
fn pointer_leave_abandons_press() {
    let mut e = engine();
    e.on_pointer_down(pt(120.0, 120.0), Button::Primary, none());
    e.on_pointer_leave();
    assert!(e.on_pointer_up(pt(120.0, 120.0), Button::Primary, &NoteFeed::new()).is_empty());
}

// =============================================================
// Wheel
// =============================================================

#[test]
fn wheel_down_zooms_out_around_pointer() {
    let mut e = engine();
    let anchor = pt(300.0, 200.0);
    let before = e.camera().screen_to_world(anchor);
    let actions = e.on_wheel(anchor, WheelDelta { dx: 0.0, dy: 100.0 }, none());
    assert_eq!(actions, vec![Action::RenderNeeded]);
    assert!(approx(e.camera().view.zoom, 0.6 * 0.9));
    let after = e.camera().screen_to_world(anchor);
    assert!(approx(before.x, after.x) && approx(before.y, after.y));
}

#[test]
fn wheel_up_zooms_in() {
    let mut e = engine();
    e.on_wheel(pt(0.0, 0.0), WheelDelta { dx: 0.0, dy: -10.0 }, none());
    assert!(approx(e.camera().view.zoom, 0.6 * 1.1));
}

#[test]
fn wheel_at_max_zoom_is_a_no_op() {
    let mut e = engine();
    e.camera.view.zoom = MAX_ZOOM;
    let before = e.camera().view;
    assert!(e.on_wheel(pt(10.0, 10.0), WheelDelta { dx: 0.0, dy: -10.0 }, none()).is_empty());
    assert_eq!(e.camera().view, before);
}

#[test]
fn ctrl_wheel_changes_browser_zoom() {
    let mut e = engine();
    e.on_wheel(pt(50.0, 50.0), WheelDelta { dx: 0.0, dy: -1.0 }, ctrl());
    assert!(approx(e.camera().view.browser_zoom, 1.1));
    assert!(approx(e.camera().view.zoom, 0.6));
}

#[test]
fn shift_wheel_pans() {
    let mut e = engine();
    e.on_wheel(pt(0.0, 0.0), WheelDelta { dx: 0.0, dy: 60.0 }, Modifiers { shift: true, ..Default::default() });
    assert!(approx(e.camera().view.offset_y, 100.0));
    assert!(approx(e.camera().view.zoom, 0.6));
}

#[test]
fn horizontal_only_wheel_does_not_zoom() {
    let mut e = engine();
    assert!(e.on_wheel(pt(0.0, 0.0), WheelDelta { dx: 30.0, dy: 0.0 }, none()).is_empty());
}

// =============================================================
// Keyboard
// =============================================================

#[test]
fn plus_and_equals_zoom_in() {
    for key in ["+", "="] {
        let mut e = engine();
        assert_eq!(e.on_key_down(&Key::new(key), none()), vec![Action::RenderNeeded]);
        assert!(approx(e.camera().view.zoom, 0.6 * 1.1));
    }
}

#[test]
fn minus_and_underscore_zoom_out() {
    for key in ["-", "_"] {
        let mut e = engine();
        e.on_key_down(&Key::new(key), none());
        assert!(approx(e.camera().view.zoom, 0.6 / 1.1));
    }
}

#[test]
fn keyboard_zoom_keeps_centre_fixed() {
    let mut e = engine();
    let center = pt(400.0, 300.0);
    let before = e.camera().screen_to_world(center);
    e.on_key_down(&Key::new("+"), none());
    let after = e.camera().screen_to_world(center);
    assert!(approx(before.x, after.x) && approx(before.y, after.y));
}

#[test]
fn zero_resets_view() {
    let mut e = engine();
    e.on_key_down(&Key::new("+"), none());
    e.camera.pan(30.0, 30.0);
    assert_eq!(e.on_key_down(&Key::new("0"), none()), vec![Action::RenderNeeded]);
    assert_eq!(e.camera().view, crate::camera::ViewState::default());
    assert!(e.on_key_down(&Key::new("0"), none()).is_empty(), "already at defaults");
}

#[test]
fn ctrl_keys_target_browser_zoom() {
    let mut e = engine();
    e.on_key_down(&Key::new("="), ctrl());
    assert!(approx(e.camera().view.browser_zoom, 1.1));
    assert!(approx(e.camera().view.zoom, 0.6));

    e.on_key_down(&Key::new("0"), ctrl());
    assert!(approx(e.camera().view.browser_zoom, 1.0));
}

#[test]
fn zoom_out_clamps_at_minimum() {
    let mut e = engine();
    for _ in 0..50 {
        e.zoom_out();
    }
    assert!(approx(e.camera().view.zoom, MIN_ZOOM));
    assert!(e.zoom_out().is_empty());
}

#[test]
fn unknown_key_does_nothing() {
    let mut e = engine();
    assert!(e.on_key_down(&Key::new("Escape"), none()).is_empty());
}

#[test]
fn set_viewport_requests_render() {
    let mut e = Engine::default();
    assert_eq!(e.set_viewport(ViewportRect::new(10.0, 20.0, 300.0, 200.0)), vec![Action::RenderNeeded]);
    assert_eq!(e.camera().rect.left, 10.0);
}
