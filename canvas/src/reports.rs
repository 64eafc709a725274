//! Local record of notes this client has already reported.
//!
//! Same persistence pattern as the cooldown store: one JSON array in
//! key/value storage, pruned of entries older than thirty days on every read.

#[cfg(test)]
#[path = "reports_test.rs"]
mod reports_test;

use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::clock::Clock;
use crate::consts::REPORT_MARKER_TTL_MS;
use crate::note::NoteId;
use crate::storage::{KeyValueStore, StorageError, read_json, write_json};

/// Storage key for the reported-notes array.
pub const REPORTS_KEY: &str = "unsent_canvas_reports";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportMarker {
    note_id: NoteId,
    reported_at: i64,
}

pub struct ReportRegistry {
    storage: Rc<dyn KeyValueStore>,
    clock: Rc<dyn Clock>,
}

impl ReportRegistry {
    #[must_use]
    pub fn new(storage: Rc<dyn KeyValueStore>, clock: Rc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    #[must_use]
    pub fn has_reported(&self, id: NoteId) -> bool {
        self.markers().iter().any(|m| m.note_id == id)
    }

    /// Remember that `id` was reported. Returns `false` if it already was.
    ///
    /// # Errors
    ///
    /// Returns an error if the marker could not be persisted.
    pub fn record(&self, id: NoteId) -> Result<bool, StorageError> {
        let mut markers = self.markers();
        if markers.iter().any(|m| m.note_id == id) {
            return Ok(false);
        }
        markers.push(ReportMarker { note_id: id, reported_at: self.clock.now_ms() });
        write_json(self.storage.as_ref(), REPORTS_KEY, &markers)?;
        Ok(true)
    }

    /// Number of live markers.
    #[must_use]
    pub fn count(&self) -> usize {
        self.markers().len()
    }

    pub fn clear(&self) {
        if let Err(e) = self.storage.remove(REPORTS_KEY) {
            warn!(error = %e, "reports: failed to clear markers");
        }
    }

    /// Live markers, writing back the pruned list when any expired.
    fn markers(&self) -> Vec<ReportMarker> {
        let Some(stored) = read_json::<Vec<ReportMarker>>(self.storage.as_ref(), REPORTS_KEY) else {
            return Vec::new();
        };
        let cutoff = self.clock.now_ms() - REPORT_MARKER_TTL_MS;
        let live: Vec<ReportMarker> = stored
            .iter()
            .filter(|m| m.reported_at > cutoff)
            .cloned()
            .collect();
        if live.len() != stored.len() {
            if let Err(e) = write_json(self.storage.as_ref(), REPORTS_KEY, &live) {
                warn!(error = %e, "reports: failed to rewrite pruned markers");
            }
        }
        live
    }
}
