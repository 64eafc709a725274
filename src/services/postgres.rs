//! Postgres note repository.
//!
//! DESIGN
//! ======
//! Plain runtime-checked queries against the `notes` table created by the
//! embedded migration. Listing uses one query per filter shape so each can
//! use its own index. The report increment is a single `UPDATE ... RETURNING`
//! so concurrent reports never lose a count.

use canvas::note::{GridArea, Note, NoteDraft, NoteId};
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::notes::{NoteError, NoteFilter, NoteRepository};

const NOTE_COLUMNS: &str = "id, created_at, sent_to, message, x, y, color, report_count";

/// Row shape of the `notes` table.
#[derive(Debug, sqlx::FromRow)]
struct NoteRow {
    id: Uuid,
    created_at: OffsetDateTime,
    sent_to: String,
    message: String,
    x: i32,
    y: i32,
    color: String,
    report_count: i32,
}

impl From<NoteRow> for Note {
    fn from(row: NoteRow) -> Self {
        Self {
            id: row.id,
            created_at: row.created_at,
            sent_to: row.sent_to,
            message: row.message,
            x: row.x,
            y: row.y,
            color: row.color,
            report_count: u32::try_from(row.report_count).unwrap_or_default(),
        }
    }
}

pub struct PgNoteRepository {
    pool: PgPool,
}

impl PgNoteRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl NoteRepository for PgNoteRepository {
    async fn insert(&self, draft: &NoteDraft) -> Result<Note, NoteError> {
        let row = sqlx::query_as::<_, NoteRow>(&format!(
            "INSERT INTO notes (sent_to, message, x, y, color) VALUES ($1, $2, $3, $4, $5) RETURNING {NOTE_COLUMNS}"
        ))
        .bind(&draft.sent_to)
        .bind(&draft.message)
        .bind(draft.x)
        .bind(draft.y)
        .bind(draft.color_or_default())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn list(&self, filter: &NoteFilter) -> Result<Vec<Note>, NoteError> {
        let rows = match filter {
            NoteFilter::All => {
                sqlx::query_as::<_, NoteRow>(&format!("SELECT {NOTE_COLUMNS} FROM notes ORDER BY created_at DESC"))
                    .fetch_all(&self.pool)
                    .await?
            }
            NoteFilter::Area(GridArea { min_x, max_x, min_y, max_y }) => {
                sqlx::query_as::<_, NoteRow>(&format!(
                    "SELECT {NOTE_COLUMNS} FROM notes \
                     WHERE x BETWEEN $1 AND $2 AND y BETWEEN $3 AND $4 \
                     ORDER BY created_at DESC"
                ))
                .bind(*min_x)
                .bind(*max_x)
                .bind(*min_y)
                .bind(*max_y)
                .fetch_all(&self.pool)
                .await?
            }
            NoteFilter::SentTo(sent_to) => {
                sqlx::query_as::<_, NoteRow>(&format!(
                    "SELECT {NOTE_COLUMNS} FROM notes WHERE sent_to = $1 ORDER BY created_at DESC"
                ))
                .bind(sent_to)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows.into_iter().map(Note::from).collect())
    }

    async fn increment_report_count(&self, id: NoteId) -> Result<Option<u32>, NoteError> {
        let count: Option<i32> =
            sqlx::query_scalar("UPDATE notes SET report_count = report_count + 1 WHERE id = $1 RETURNING report_count")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(count.map(|c| u32::try_from(c).unwrap_or_default()))
    }

    async fn delete(&self, id: NoteId) -> Result<Option<Note>, NoteError> {
        let row = sqlx::query_as::<_, NoteRow>(&format!("DELETE FROM notes WHERE id = $1 RETURNING {NOTE_COLUMNS}"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Note::from))
    }

    async fn ping(&self) -> Result<(), NoteError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
