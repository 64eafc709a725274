//! Shared numeric constants for the canvas crate.

// ── Grid ────────────────────────────────────────────────────────

/// Size of one grid cell in world pixels (1 grid unit at combined zoom 1.0).
pub const GRID_SIZE_PX: f64 = 5.0;

/// Rendered note square in world pixels; 4.8 grid units.
pub const NOTE_SIZE_PX: f64 = 24.0;

// ── Zoom ────────────────────────────────────────────────────────

/// Minimum content zoom.
pub const MIN_ZOOM: f64 = 0.5;

/// Maximum content zoom.
pub const MAX_ZOOM: f64 = 3.0;

/// Minimum outer (browser) zoom.
pub const MIN_BROWSER_ZOOM: f64 = 0.25;

/// Maximum outer (browser) zoom.
pub const MAX_BROWSER_ZOOM: f64 = 4.0;

/// Content zoom on first load and after reset.
pub const DEFAULT_ZOOM: f64 = 0.6;

/// Offset (world pixels) on first load and after reset.
pub const DEFAULT_OFFSET: f64 = 200.0;

/// Wheel factor applied when scrolling down.
pub const WHEEL_ZOOM_OUT: f64 = 0.9;

/// Wheel factor applied when scrolling up.
pub const WHEEL_ZOOM_IN: f64 = 1.1;

/// Multiplicative step for keyboard and toolbar zoom.
pub const KEY_ZOOM_STEP: f64 = 1.1;

// ── Gestures ────────────────────────────────────────────────────

/// Pointer travel (screen pixels) below which a press/release is a click.
pub const CLICK_THRESHOLD_PX: f64 = 5.0;

// ── Notes ───────────────────────────────────────────────────────

/// Sticky-note yellow used when a note carries no color.
pub const DEFAULT_NOTE_COLOR: &str = "#fff3a0";

/// Maximum recipient length in characters.
pub const SENT_TO_MAX_LENGTH: usize = 15;

/// Maximum message length in characters.
pub const MESSAGE_MAX_LENGTH: usize = 150;

// ── Throttling ──────────────────────────────────────────────────

/// Rolling window for the posts-per-hour counter, in milliseconds.
pub const RATE_LIMIT_WINDOW_MS: i64 = 60 * 60 * 1000;

/// Lifetime of a local "already reported" marker, in milliseconds.
pub const REPORT_MARKER_TTL_MS: i64 = 30 * 24 * 60 * 60 * 1000;
