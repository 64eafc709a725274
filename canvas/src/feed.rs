//! Live collection of notes and the change feed that keeps it current.
//!
//! [`NoteFeed`] holds every known note newest-first. It is filled once by a
//! bulk load and then patched by insert/delete events. Events can arrive while
//! the bulk load is still in flight; those are remembered and reconciled when
//! the load lands so neither side clobbers the other.
//!
//! [`ChangeFeed`] is the subscription seam. [`LocalFeed`] is the in-process
//! hub: transport frames pumped into it reach every subscriber. The browser
//! transport is [`crate::realtime::WsChangeFeed`].

#[cfg(test)]
#[path = "feed_test.rs"]
mod feed_test;

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::camera::Point;
use crate::consts::{GRID_SIZE_PX, NOTE_SIZE_PX};
use crate::note::{GridArea, Note, NoteId};

// =============================================================================
// NOTE FEED
// =============================================================================

#[derive(Debug, Default)]
pub struct NoteFeed {
    notes: Vec<Note>,
    loading: bool,
    /// Ids deleted by the feed while a bulk load was in flight.
    deleted_during_load: HashSet<NoteId>,
}

impl NoteFeed {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_load(&mut self) {
        self.loading = true;
        self.deleted_during_load.clear();
    }

    /// Replace the collection with a bulk-load result.
    ///
    /// Notes inserted by the feed during the load are kept; notes deleted by
    /// the feed during the load are dropped even if the load returned them.
    pub fn finish_load(&mut self, loaded: Vec<Note>) {
        let loaded_ids: HashSet<NoteId> = loaded.iter().map(|n| n.id).collect();
        let arrived: Vec<Note> = self
            .notes
            .drain(..)
            .filter(|n| !loaded_ids.contains(&n.id))
            .collect();
        self.notes = loaded
            .into_iter()
            .chain(arrived)
            .filter(|n| !self.deleted_during_load.contains(&n.id))
            .collect();
        self.notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        self.loading = false;
        self.deleted_during_load.clear();
        debug!(count = self.notes.len(), "feed: load finished");
    }

    /// Abandon a load without touching the collection.
    pub fn cancel_load(&mut self) {
        self.loading = false;
        self.deleted_during_load.clear();
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Prepend a note unless one with the same id is present.
    pub fn insert(&mut self, note: Note) -> bool {
        if self.notes.iter().any(|n| n.id == note.id) {
            return false;
        }
        self.notes.insert(0, note);
        true
    }

    pub fn remove(&mut self, id: NoteId) -> bool {
        if self.loading {
            self.deleted_during_load.insert(id);
        }
        let before = self.notes.len();
        self.notes.retain(|n| n.id != id);
        self.notes.len() != before
    }

    /// Update a note's report counter. Returns `false` for unknown ids.
    pub fn set_report_count(&mut self, id: NoteId, report_count: u32) -> bool {
        match self.notes.iter_mut().find(|n| n.id == id) {
            Some(note) => {
                note.report_count = report_count;
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn get(&self, id: NoteId) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == id)
    }

    /// All notes, newest first.
    #[must_use]
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.notes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn notes_in_area(&self, area: GridArea) -> impl Iterator<Item = &Note> {
        self.notes.iter().filter(move |n| n.is_within(&area))
    }

    /// The newest note whose square covers the grid point `at`.
    ///
    /// A note is drawn with its top-left corner on its cell and spans
    /// [`NOTE_SIZE_PX`] world pixels in each direction.
    #[must_use]
    pub fn hit_test(&self, at: Point) -> Option<&Note> {
        let span = NOTE_SIZE_PX / GRID_SIZE_PX;
        self.notes.iter().find(|n| {
            let (x, y) = (f64::from(n.x), f64::from(n.y));
            (x..=x + span).contains(&at.x) && (y..=y + span).contains(&at.y)
        })
    }
}

// =============================================================================
// WIRE EVENTS
// =============================================================================

/// One change-feed message: `{"event":"insert"|"delete","note":{...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "note", rename_all = "snake_case")]
pub enum FeedEvent {
    Insert(Note),
    Delete(Note),
}

impl FeedEvent {
    #[must_use]
    pub fn note(&self) -> &Note {
        match self {
            Self::Insert(note) | Self::Delete(note) => note,
        }
    }
}

// =============================================================================
// SUBSCRIPTIONS
// =============================================================================

pub type NoteHandler = Box<dyn FnMut(Note)>;

/// A source of note insert/delete events.
pub trait ChangeFeed {
    /// Register handlers. Events stop when the returned handle is dropped or
    /// [`Subscription::unsubscribe`] is called.
    fn subscribe(&self, on_insert: NoteHandler, on_delete: NoteHandler) -> Subscription;
}

/// Handle for an active subscription. Cancels on drop.
#[must_use = "dropping a subscription cancels it"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self { cancel: Some(Box::new(cancel)) }
    }

    /// A handle with nothing to cancel.
    pub fn detached() -> Self {
        Self { cancel: None }
    }

    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

// =============================================================================
// LOCAL HUB
// =============================================================================

struct Handlers {
    on_insert: NoteHandler,
    on_delete: NoteHandler,
}

#[derive(Default)]
struct Hub {
    next_id: u64,
    subscribers: Vec<(u64, Rc<RefCell<Handlers>>)>,
}

/// In-process fan-out of [`FeedEvent`]s. Clones share subscribers.
#[derive(Clone, Default)]
pub struct LocalFeed {
    hub: Rc<RefCell<Hub>>,
}

impl LocalFeed {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.hub.borrow().subscribers.len()
    }

    /// Deliver an event to every current subscriber.
    pub fn publish(&self, event: &FeedEvent) {
        // Snapshot so handlers may subscribe or unsubscribe while we iterate.
        let targets: Vec<Rc<RefCell<Handlers>>> = self
            .hub
            .borrow()
            .subscribers
            .iter()
            .map(|(_, h)| Rc::clone(h))
            .collect();
        for target in targets {
            let Ok(mut handlers) = target.try_borrow_mut() else {
                warn!(note_id = %event.note().id, "feed: skipping re-entrant delivery");
                continue;
            };
            match event {
                FeedEvent::Insert(note) => (handlers.on_insert)(note.clone()),
                FeedEvent::Delete(note) => (handlers.on_delete)(note.clone()),
            }
        }
    }

    /// Decode a transport frame and publish it.
    ///
    /// # Errors
    ///
    /// Returns the decode error for malformed frames; nothing is delivered.
    pub fn publish_json(&self, frame: &str) -> Result<(), serde_json::Error> {
        let event: FeedEvent = serde_json::from_str(frame)?;
        self.publish(&event);
        Ok(())
    }
}

impl ChangeFeed for LocalFeed {
    fn subscribe(&self, on_insert: NoteHandler, on_delete: NoteHandler) -> Subscription {
        let id = {
            let mut hub = self.hub.borrow_mut();
            hub.next_id += 1;
            let id = hub.next_id;
            hub.subscribers
                .push((id, Rc::new(RefCell::new(Handlers { on_insert, on_delete }))));
            id
        };
        let hub: Weak<RefCell<Hub>> = Rc::downgrade(&self.hub);
        Subscription::new(move || {
            if let Some(hub) = hub.upgrade() {
                hub.borrow_mut().subscribers.retain(|(sid, _)| *sid != id);
            }
        })
    }
}
