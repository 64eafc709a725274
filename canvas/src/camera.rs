//! Viewport transform for the infinite note grid.
//!
//! Screen space is CSS pixels relative to the page (what pointer events
//! report). World space is expressed in grid units: one unit is
//! [`GRID_SIZE_PX`] world pixels. Two scale levels stack on top of each other:
//! the content `zoom` driven by wheel and keyboard, and an outer
//! `browser_zoom` that models page-level magnification. The offset is stored
//! in world pixels, so it is applied after both scales are divided out.

#[cfg(test)]
#[path = "camera_test.rs"]
mod camera_test;

use crate::consts::{
    DEFAULT_OFFSET, DEFAULT_ZOOM, GRID_SIZE_PX, MAX_BROWSER_ZOOM, MAX_ZOOM, MIN_BROWSER_ZOOM, MIN_ZOOM,
};
use crate::note::GridArea;

/// A point in either screen or world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point in the same space.
    #[must_use]
    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Snap a fractional grid position to the nearest cell.
    ///
    /// Rounds rather than floors, so a click lands on whichever cell corner
    /// is closest.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn round_to_cell(self) -> (i32, i32) {
        (self.x.round() as i32, self.y.round() as i32)
    }
}

/// Bounding rectangle of the canvas container in screen space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewportRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl ViewportRect {
    #[must_use]
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height }
    }

    /// True when the container has not been laid out (or is hidden).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    /// Centre of the container in screen space.
    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.left + self.width / 2.0, self.top + self.height / 2.0)
    }
}

/// Zoom and offset of the viewport.
///
/// `zoom` stays within `[MIN_ZOOM, MAX_ZOOM]` and `browser_zoom` within
/// `[MIN_BROWSER_ZOOM, MAX_BROWSER_ZOOM]`; every mutation clamps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    pub zoom: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    pub browser_zoom: f64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self { zoom: DEFAULT_ZOOM, offset_x: DEFAULT_OFFSET, offset_y: DEFAULT_OFFSET, browser_zoom: 1.0 }
    }
}

impl ViewState {
    /// Effective screen pixels per world pixel.
    #[must_use]
    pub fn scale(&self) -> f64 {
        self.zoom * self.browser_zoom
    }
}

/// Camera state plus the container it projects into.
#[derive(Debug, Clone, Copy, Default)]
pub struct Camera {
    pub view: ViewState,
    pub rect: ViewportRect,
}

impl Camera {
    #[must_use]
    pub fn new(rect: ViewportRect) -> Self {
        Self { view: ViewState::default(), rect }
    }

    /// Update the container measurement after a resize.
    pub fn set_rect(&mut self, rect: ViewportRect) {
        self.rect = rect;
    }

    /// Convert a screen-space point to fractional grid coordinates.
    ///
    /// An unmeasured (zero-size) container maps everything to the origin.
    #[must_use]
    pub fn screen_to_world(&self, screen: Point) -> Point {
        if self.rect.is_empty() {
            return Point::new(0.0, 0.0);
        }
        let world_px = self.world_px_at(screen);
        Point::new(world_px.x / GRID_SIZE_PX, world_px.y / GRID_SIZE_PX)
    }

    /// Convert grid coordinates to a screen-space point.
    #[must_use]
    pub fn world_to_screen(&self, world: Point) -> Point {
        if self.rect.is_empty() {
            return Point::new(0.0, 0.0);
        }
        let scale = self.view.scale();
        Point::new(
            (world.x * GRID_SIZE_PX + self.view.offset_x) * scale + self.rect.left,
            (world.y * GRID_SIZE_PX + self.view.offset_y) * scale + self.rect.top,
        )
    }

    /// Convert a screen-space distance (pixels) to grid units.
    #[must_use]
    pub fn screen_dist_to_world(&self, screen_dist: f64) -> f64 {
        screen_dist / self.view.scale() / GRID_SIZE_PX
    }

    /// Move the view by a screen-space delta.
    ///
    /// The delta is divided by the combined scale so content tracks the
    /// pointer at every zoom level.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        let scale = self.view.scale();
        self.view.offset_x += dx / scale;
        self.view.offset_y += dy / scale;
    }

    /// Multiply the content zoom by `factor`, keeping the world point under
    /// `anchor` stationary. Returns `false` when clamping leaves the zoom
    /// unchanged (state untouched).
    pub fn zoom_at(&mut self, factor: f64, anchor: Point) -> bool {
        let next = (self.view.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        if (next - self.view.zoom).abs() < f64::EPSILON {
            return false;
        }
        let world_px = self.world_px_at(anchor);
        let rel = self.relative(anchor);
        self.view.zoom = next;
        self.view.offset_x = rel.x / self.view.browser_zoom / next - world_px.x;
        self.view.offset_y = rel.y / self.view.browser_zoom / next - world_px.y;
        true
    }

    /// Multiply the outer browser zoom by `factor` with the same anchoring
    /// rule as [`Camera::zoom_at`].
    pub fn browser_zoom_at(&mut self, factor: f64, anchor: Point) -> bool {
        let next = (self.view.browser_zoom * factor).clamp(MIN_BROWSER_ZOOM, MAX_BROWSER_ZOOM);
        if (next - self.view.browser_zoom).abs() < f64::EPSILON {
            return false;
        }
        let world_px = self.world_px_at(anchor);
        let rel = self.relative(anchor);
        self.view.browser_zoom = next;
        self.view.offset_x = rel.x / next / self.view.zoom - world_px.x;
        self.view.offset_y = rel.y / next / self.view.zoom - world_px.y;
        true
    }

    /// Restore default zoom, offset and browser zoom.
    pub fn reset(&mut self) {
        self.view = ViewState::default();
    }

    /// Grid cells covered by the container, widened to whole cells.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn visible_area(&self) -> GridArea {
        let top_left = self.screen_to_world(Point::new(self.rect.left, self.rect.top));
        let bottom_right =
            self.screen_to_world(Point::new(self.rect.left + self.rect.width, self.rect.top + self.rect.height));
        GridArea {
            min_x: top_left.x.floor() as i32,
            max_x: bottom_right.x.ceil() as i32,
            min_y: top_left.y.floor() as i32,
            max_y: bottom_right.y.ceil() as i32,
        }
    }

    fn relative(&self, screen: Point) -> Point {
        Point::new(screen.x - self.rect.left, screen.y - self.rect.top)
    }

    fn world_px_at(&self, screen: Point) -> Point {
        let rel = self.relative(screen);
        Point::new(
            rel.x / self.view.browser_zoom / self.view.zoom - self.view.offset_x,
            rel.y / self.view.browser_zoom / self.view.zoom - self.view.offset_y,
        )
    }
}
