use super::*;

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

// =============================================================
// Modifiers
// =============================================================

#[test]
fn modifiers_default_all_false() {
    let m = Modifiers::default();
    assert!(!m.shift && !m.ctrl && !m.alt && !m.meta);
    assert!(!m.browser_zoom());
}

#[test]
fn ctrl_or_meta_targets_browser_zoom() {
    assert!(Modifiers { ctrl: true, ..Default::default() }.browser_zoom());
    assert!(Modifiers { meta: true, ..Default::default() }.browser_zoom());
    assert!(!Modifiers { shift: true, ..Default::default() }.browser_zoom());
}

// =============================================================
// Click threshold
// =============================================================

#[test]
fn just_under_threshold_is_click() {
    assert!(is_click(pt(0.0, 0.0), pt(4.99, 0.0)));
}

#[test]
fn just_over_threshold_is_drag() {
    assert!(!is_click(pt(0.0, 0.0), pt(5.01, 0.0)));
}

#[test]
fn exactly_threshold_is_drag() {
    assert!(!is_click(pt(0.0, 0.0), pt(3.0, 4.0)));
}

// =============================================================
// Gesture
// =============================================================

#[test]
fn press_release_in_place_is_click() {
    let mut g = Gesture::default();
    g.press(pt(10.0, 10.0));
    assert_eq!(g.release(pt(12.0, 11.0)), Some(pt(12.0, 11.0)));
    assert_eq!(g, Gesture::Idle);
}

#[test]
fn small_moves_pan_and_still_click() {
    let mut g = Gesture::default();
    g.press(pt(0.0, 0.0));
    assert_eq!(g.move_to(pt(4.0, 0.0)), GestureStep::Pan { dx: 4.0, dy: 0.0 });
    assert!(g.has_panned());
    assert_eq!(g.release(pt(4.0, 0.0)), Some(pt(4.0, 0.0)));
}

#[test]
fn moves_pan_by_delta_from_last_position() {
    let mut g = Gesture::default();
    g.press(pt(0.0, 0.0));
    assert_eq!(g.move_to(pt(5.5, 0.0)), GestureStep::Pan { dx: 5.5, dy: 0.0 });
    assert_eq!(g.move_to(pt(7.5, 3.0)), GestureStep::Pan { dx: 2.0, dy: 3.0 });
}

#[test]
fn repeated_position_holds() {
    let mut g = Gesture::default();
    g.press(pt(3.0, 3.0));
    assert_eq!(g.move_to(pt(3.0, 3.0)), GestureStep::Hold);
    assert!(!g.has_panned());
}

#[test]
fn drag_back_near_origin_is_a_click() {
    let mut g = Gesture::default();
    g.press(pt(100.0, 100.0));
    g.move_to(pt(150.0, 100.0));
    g.move_to(pt(101.0, 100.0));
    assert_eq!(g.release(pt(101.0, 100.0)), Some(pt(101.0, 100.0)));
}

#[test]
fn release_without_press_is_ignored() {
    let mut g = Gesture::default();
    assert_eq!(g.release(pt(0.0, 0.0)), None);
    assert_eq!(g.move_to(pt(50.0, 0.0)), GestureStep::Hold);
}

#[test]
fn fast_release_far_away_is_not_click() {
    let mut g = Gesture::default();
    g.press(pt(0.0, 0.0));
    assert_eq!(g.release(pt(5.01, 0.0)), None);
}
