//! Domain services used by the HTTP and websocket routes.
//!
//! ARCHITECTURE
//! ============
//! [`notes`] owns the note rules (required fields, rate limits, validation,
//! moderation, change-feed publication) behind the [`notes::NoteRepository`]
//! seam. [`memory`] and [`postgres`] are the two repository backends; route
//! handlers only translate HTTP to service calls and back.

pub mod memory;
pub mod notes;
pub mod postgres;
