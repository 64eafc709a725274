//! Note model shared by the client core and the server.
//!
//! A [`Note`] is immutable after creation except for `report_count`. Fields
//! that older rows may lack (`color`, `report_count`) deserialize to their
//! documented defaults instead of being optional.

#[cfg(test)]
#[path = "note_test.rs"]
mod note_test;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::consts::DEFAULT_NOTE_COLOR;

/// Unique identifier for a note.
pub type NoteId = Uuid;

fn default_color() -> String {
    DEFAULT_NOTE_COLOR.to_owned()
}

/// A note as stored and sent over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub sent_to: String,
    pub message: String,
    pub x: i32,
    pub y: i32,
    /// Hex color. Defaults to sticky-note yellow (`#fff3a0`) when absent.
    #[serde(default = "default_color")]
    pub color: String,
    /// Number of reports received. Defaults to `0` when absent.
    #[serde(default)]
    pub report_count: u32,
}

impl Note {
    /// Whether the note's cell falls within `area`.
    #[must_use]
    pub fn is_within(&self, area: &GridArea) -> bool {
        area.contains(self.x, self.y)
    }
}

/// Payload for creating a note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteDraft {
    pub sent_to: String,
    pub message: String,
    pub x: i32,
    pub y: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl NoteDraft {
    /// Color to persist: the requested one or the default.
    #[must_use]
    pub fn color_or_default(&self) -> &str {
        self.color.as_deref().unwrap_or(DEFAULT_NOTE_COLOR)
    }
}

/// Inclusive bounding box of grid cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridArea {
    pub min_x: i32,
    pub max_x: i32,
    pub min_y: i32,
    pub max_y: i32,
}

impl GridArea {
    /// Whether the cell `(x, y)` lies inside the box, edges included.
    #[must_use]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        (self.min_x..=self.max_x).contains(&x) && (self.min_y..=self.max_y).contains(&y)
    }
}
