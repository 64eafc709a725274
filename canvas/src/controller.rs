//! Interaction controller: the composition root of the client core.
//!
//! DESIGN
//! ======
//! The controller owns every piece of client state (note feed, cooldown
//! store, report registry, open form) and is the only component that talks
//! to the [`NoteStore`]. Methods take `&self` and use `RefCell`/`Cell`
//! internally so a host can keep several async calls in flight at once.
//! No `RefCell` borrow is ever held across an `.await`.
//!
//! LIFECYCLE
//! =========
//! [`InteractionController::teardown`] flips a liveness flag and cancels the
//! feed subscription and the cooldown ticker. Requests that complete afterwards still record facts
//! that outlive the view (a post happened, a note was reported) but never
//! touch view state.

#[cfg(test)]
#[path = "controller_test.rs"]
mod controller_test;

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::cooldown::{CooldownConfig, CooldownStatus, CooldownStore, PostGate};
use crate::feed::{ChangeFeed, NoteFeed, Subscription};
use crate::moderation::{ContentCheck, DefaultModerator, ModerationVerdict};
use crate::note::{GridArea, Note, NoteDraft, NoteId};
use crate::reports::ReportRegistry;
use crate::storage::KeyValueStore;
use crate::store::{NoteStore, StoreError};
use crate::ticker::Ticker;
use crate::validation::{ValidationErrors, validate_draft};

/// How often a watched cooldown is re-read for display.
const COOLDOWN_TICK: Duration = Duration::from_secs(1);

pub type CooldownHandler = Box<dyn FnMut(CooldownStatus)>;

// =============================================================================
// TYPES
// =============================================================================

/// What the user typed into the note form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormInput {
    pub sent_to: String,
    pub message: String,
    pub color: Option<String>,
}

/// The open note form, anchored to one grid cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteForm {
    pub x: i32,
    pub y: i32,
    pub submitting: bool,
    /// Error from the last failed submit, shown above the inputs.
    pub error: Option<String>,
    pub field_errors: ValidationErrors,
}

impl NoteForm {
    fn at(x: i32, y: i32) -> Self {
        Self { x, y, submitting: false, error: None, field_errors: ValidationErrors::default() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Posting is not allowed right now; no form was opened.
    Blocked(PostGate),
    /// The open form is still submitting; it stays as it is.
    Busy,
    FormOpened { x: i32, y: i32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    /// This client reported the note before; nothing was sent.
    AlreadyReported,
    Reported { report_count: u32 },
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("no note form is open")]
    NoForm,
    #[error("a submission is already in progress")]
    InFlight,
    #[error("{}", .0.user_message())]
    Blocked(PostGate),
    #[error(transparent)]
    Invalid(ValidationErrors),
    #[error("{0}")]
    Moderated(String),
    #[error(transparent)]
    Store(StoreError),
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("note not found")]
    NotFound,
    #[error(transparent)]
    Store(StoreError),
}

// =============================================================================
// CONTROLLER
// =============================================================================

pub struct InteractionController {
    store: Rc<dyn NoteStore>,
    feed: Rc<RefCell<NoteFeed>>,
    cooldown: Rc<RefCell<CooldownStore>>,
    reports: ReportRegistry,
    moderator: Box<dyn ContentCheck>,
    form: RefCell<Option<NoteForm>>,
    alive: Rc<Cell<bool>>,
    subscription: RefCell<Option<Subscription>>,
    cooldown_ticker: RefCell<Option<Subscription>>,
}

impl InteractionController {
    /// Build a controller over persistent `storage`. Cooldown state left by
    /// earlier sessions is reconciled immediately.
    pub fn new(
        store: Rc<dyn NoteStore>,
        storage: Rc<dyn KeyValueStore>,
        clock: Rc<dyn Clock>,
        config: CooldownConfig,
    ) -> Self {
        let cooldown = CooldownStore::load(Rc::clone(&storage), Rc::clone(&clock), config);
        Self {
            store,
            feed: Rc::new(RefCell::new(NoteFeed::new())),
            cooldown: Rc::new(RefCell::new(cooldown)),
            reports: ReportRegistry::new(storage, clock),
            moderator: Box::new(DefaultModerator::new()),
            form: RefCell::new(None),
            alive: Rc::new(Cell::new(true)),
            subscription: RefCell::new(None),
            cooldown_ticker: RefCell::new(None),
        }
    }

    /// Replace the bundled moderator.
    #[must_use]
    pub fn with_moderator(mut self, moderator: Box<dyn ContentCheck>) -> Self {
        self.moderator = moderator;
        self
    }

    /// Shared handle to the live note collection, for rendering and hit-tests.
    #[must_use]
    pub fn feed(&self) -> Rc<RefCell<NoteFeed>> {
        Rc::clone(&self.feed)
    }

    #[must_use]
    pub fn form(&self) -> Option<NoteForm> {
        self.form.borrow().clone()
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive.get()
    }

    // --- Loading ---

    /// Fetch every note and replace the collection.
    ///
    /// # Errors
    ///
    /// Returns the store error; the collection is left as it was.
    pub async fn load(&self) -> Result<usize, StoreError> {
        self.feed.borrow_mut().begin_load();
        let result = self.store.list_notes().await;
        self.finish_load(result)
    }

    /// Fetch only the notes inside `area` (typically the visible viewport).
    ///
    /// # Errors
    ///
    /// Returns the store error; the collection is left as it was.
    pub async fn load_area(&self, area: GridArea) -> Result<usize, StoreError> {
        self.feed.borrow_mut().begin_load();
        let result = self.store.list_notes_by_area(area).await;
        self.finish_load(result)
    }

    fn finish_load(&self, result: Result<Vec<Note>, StoreError>) -> Result<usize, StoreError> {
        match result {
            Ok(notes) if self.is_alive() => {
                let mut feed = self.feed.borrow_mut();
                feed.finish_load(notes);
                Ok(feed.len())
            }
            Ok(notes) => Ok(notes.len()),
            Err(e) => {
                warn!(error = %e, "controller: failed to load notes");
                self.feed.borrow_mut().cancel_load();
                Err(e)
            }
        }
    }

    /// Start applying insert/delete events from `source`. Replaces any
    /// earlier subscription.
    pub fn attach_feed(&self, source: &dyn ChangeFeed) {
        let on_insert = {
            let feed = Rc::downgrade(&self.feed);
            let alive = Rc::clone(&self.alive);
            Box::new(move |note: Note| apply_to_feed(&feed, &alive, |f| f.insert(note)))
        };
        let on_delete = {
            let feed = Rc::downgrade(&self.feed);
            let alive = Rc::clone(&self.alive);
            Box::new(move |note: Note| apply_to_feed(&feed, &alive, |f| f.remove(note.id)))
        };
        let subscription = source.subscribe(on_insert, on_delete);
        *self.subscription.borrow_mut() = Some(subscription);
    }

    // --- Form ---

    /// A click on an empty cell. Opens the form unless posting is blocked or
    /// the open form is mid-submit.
    pub fn on_canvas_click(&self, x: i32, y: i32) -> ClickOutcome {
        if self.form.borrow().as_ref().is_some_and(|form| form.submitting) {
            debug!(x, y, "controller: click ignored while submitting");
            return ClickOutcome::Busy;
        }
        let gate = self.cooldown.borrow_mut().gate();
        if !gate.is_open() {
            debug!(?gate, "controller: click blocked");
            *self.form.borrow_mut() = None;
            return ClickOutcome::Blocked(gate);
        }
        *self.form.borrow_mut() = Some(NoteForm::at(x, y));
        ClickOutcome::FormOpened { x, y }
    }

    pub fn cancel_form(&self) {
        *self.form.borrow_mut() = None;
    }

    /// Whether the open form is the one a submit for cell `(x, y)` started.
    fn is_submitting_at(&self, x: i32, y: i32) -> bool {
        self.form.borrow().as_ref().is_some_and(|form| form.submitting && form.x == x && form.y == y)
    }

    /// Validate and publish the open form.
    ///
    /// # Errors
    ///
    /// Nothing is sent when the form is missing or busy, posting is blocked,
    /// or validation or moderation rejects the input. Store failures keep
    /// the form open with the error attached.
    pub async fn submit(&self, input: FormInput) -> Result<Note, SubmitError> {
        let draft = self.prepare(input)?;

        let result = self.store.create_note(&draft).await;

        match result {
            Ok(note) => {
                if let Err(e) = self.cooldown.borrow_mut().record_post_time() {
                    warn!(error = %e, "controller: failed to persist post time");
                }
                if self.is_alive() {
                    self.feed.borrow_mut().insert(note.clone());
                    if self.is_submitting_at(draft.x, draft.y) {
                        *self.form.borrow_mut() = None;
                    }
                }
                info!(note_id = %note.id, x = note.x, y = note.y, "controller: note created");
                Ok(note)
            }
            Err(e) => {
                warn!(error = %e, "controller: create failed");
                if self.is_alive() && self.is_submitting_at(draft.x, draft.y) {
                    if let Some(form) = self.form.borrow_mut().as_mut() {
                        form.submitting = false;
                        form.error = Some(e.user_message());
                    }
                }
                Err(SubmitError::Store(e))
            }
        }
    }

    /// Everything a submit checks before touching the network. Marks the form
    /// as submitting on success.
    fn prepare(&self, input: FormInput) -> Result<NoteDraft, SubmitError> {
        let mut slot = self.form.borrow_mut();
        let form = slot.as_mut().ok_or(SubmitError::NoForm)?;
        if form.submitting {
            return Err(SubmitError::InFlight);
        }

        let gate = self.cooldown.borrow_mut().gate();
        if !gate.is_open() {
            form.error = Some(gate.user_message());
            return Err(SubmitError::Blocked(gate));
        }

        let raw = NoteDraft { sent_to: input.sent_to, message: input.message, x: form.x, y: form.y, color: input.color };
        let draft = match validate_draft(&raw) {
            Ok(draft) => draft,
            Err(errors) => {
                form.field_errors = errors.clone();
                form.error = None;
                return Err(SubmitError::Invalid(errors));
            }
        };
        if let ModerationVerdict::Rejected { reason } = self.moderator.check(&draft.message) {
            form.error = Some(reason.clone());
            return Err(SubmitError::Moderated(reason));
        }

        form.submitting = true;
        form.error = None;
        form.field_errors = ValidationErrors::default();
        Ok(draft)
    }

    // --- Reports ---

    /// Report a note once per client.
    ///
    /// # Errors
    ///
    /// [`ReportError::NotFound`] when the note no longer exists; other store
    /// failures as [`ReportError::Store`]. The local marker is only written
    /// after the store accepts the report.
    pub async fn report(&self, id: NoteId) -> Result<ReportOutcome, ReportError> {
        if self.reports.has_reported(id) {
            return Ok(ReportOutcome::AlreadyReported);
        }
        match self.store.increment_report_count(id).await {
            Ok(report_count) => {
                if let Err(e) = self.reports.record(id) {
                    warn!(%id, error = %e, "controller: failed to persist report marker");
                }
                if self.is_alive() {
                    self.feed.borrow_mut().set_report_count(id, report_count);
                }
                info!(%id, report_count, "controller: note reported");
                Ok(ReportOutcome::Reported { report_count })
            }
            Err(StoreError::NotFound) => {
                if self.is_alive() {
                    self.feed.borrow_mut().remove(id);
                }
                Err(ReportError::NotFound)
            }
            Err(e) => {
                warn!(%id, error = %e, "controller: report failed");
                Err(ReportError::Store(e))
            }
        }
    }

    #[must_use]
    pub fn has_reported(&self, id: NoteId) -> bool {
        self.reports.has_reported(id)
    }

    // --- Cooldown ---

    /// Snapshot for the host's once-a-second countdown.
    pub fn cooldown_status(&self) -> CooldownStatus {
        self.cooldown.borrow_mut().status()
    }

    /// Push a fresh [`CooldownStatus`] to `on_tick` once a second until
    /// teardown. Replaces any earlier watch.
    pub fn watch_cooldown(&self, ticker: &dyn Ticker, mut on_tick: CooldownHandler) {
        let cooldown = Rc::downgrade(&self.cooldown);
        let alive = Rc::clone(&self.alive);
        let tick = Box::new(move || {
            if !alive.get() {
                return;
            }
            let Some(cooldown) = cooldown.upgrade() else {
                return;
            };
            let status = match cooldown.try_borrow_mut() {
                Ok(mut store) => store.status(),
                Err(_) => {
                    warn!("controller: cooldown busy, skipping tick");
                    return;
                }
            };
            on_tick(status);
        });
        *self.cooldown_ticker.borrow_mut() = Some(ticker.every(COOLDOWN_TICK, tick));
    }

    /// Stop applying results to this view and cancel the feed subscription
    /// and the cooldown ticker.
    pub fn teardown(&self) {
        self.alive.set(false);
        if let Some(subscription) = self.subscription.borrow_mut().take() {
            subscription.unsubscribe();
        }
        if let Some(ticker) = self.cooldown_ticker.borrow_mut().take() {
            ticker.unsubscribe();
        }
        *self.form.borrow_mut() = None;
        debug!("controller: torn down");
    }
}

impl Drop for InteractionController {
    fn drop(&mut self) {
        self.alive.set(false);
    }
}

fn apply_to_feed(feed: &Weak<RefCell<NoteFeed>>, alive: &Cell<bool>, apply: impl FnOnce(&mut NoteFeed) -> bool) {
    if !alive.get() {
        return;
    }
    let Some(feed) = feed.upgrade() else {
        return;
    };
    match feed.try_borrow_mut() {
        Ok(mut feed) => {
            apply(&mut feed);
        }
        Err(_) => warn!("controller: feed busy, dropping change event"),
    }
}
