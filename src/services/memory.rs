//! In-process note repository, used when no database is configured and in tests.

use canvas::note::{Note, NoteDraft, NoteId};
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::notes::{NoteError, NoteFilter, NoteRepository};

#[derive(Default)]
pub struct MemoryNoteRepository {
    /// Insertion order; listing reverses it before sorting.
    notes: RwLock<Vec<Note>>,
}

impl MemoryNoteRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl NoteRepository for MemoryNoteRepository {
    async fn insert(&self, draft: &NoteDraft) -> Result<Note, NoteError> {
        let note = Note {
            id: Uuid::new_v4(),
            created_at: OffsetDateTime::now_utc(),
            sent_to: draft.sent_to.clone(),
            message: draft.message.clone(),
            x: draft.x,
            y: draft.y,
            color: draft.color_or_default().to_owned(),
            report_count: 0,
        };
        self.notes.write().await.push(note.clone());
        Ok(note)
    }

    async fn list(&self, filter: &NoteFilter) -> Result<Vec<Note>, NoteError> {
        let notes = self.notes.read().await;
        // Reversed first so the stable sort keeps later inserts ahead on equal timestamps.
        let mut matching: Vec<Note> = notes.iter().rev().filter(|n| filter.matches(n)).cloned().collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }

    async fn increment_report_count(&self, id: NoteId) -> Result<Option<u32>, NoteError> {
        let mut notes = self.notes.write().await;
        Ok(notes.iter_mut().find(|n| n.id == id).map(|note| {
            note.report_count = note.report_count.saturating_add(1);
            note.report_count
        }))
    }

    async fn delete(&self, id: NoteId) -> Result<Option<Note>, NoteError> {
        let mut notes = self.notes.write().await;
        Ok(notes.iter().position(|n| n.id == id).map(|index| notes.remove(index)))
    }

    async fn ping(&self) -> Result<(), NoteError> {
        Ok(())
    }
}
