//! Field validation and sanitization for note submissions.
//!
//! Runs on the client before any network call and again on the server, which
//! never trusts the client's copy. Every error is scoped to the field that
//! caused it so the form can render it next to the right input.

#[cfg(test)]
#[path = "validation_test.rs"]
mod validation_test;

use std::fmt;

use serde::Serialize;

use crate::consts::{DEFAULT_NOTE_COLOR, MESSAGE_MAX_LENGTH, SENT_TO_MAX_LENGTH};
use crate::note::NoteDraft;
use crate::patterns::{HTML_TAG, MESSAGE_REPEAT, PROFANITY, UNSAFE_CHARS};

/// Messages longer than this are checked for shouting.
const CAPS_MIN_LENGTH: usize = 10;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    SentTo,
    Message,
    Color,
    Coordinates,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: Field,
    pub message: String,
}

/// All problems found in one submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation failed: {}", self.summary())
    }
}

impl std::error::Error for ValidationErrors {}

impl ValidationErrors {
    pub fn push(&mut self, field: Field, message: impl Into<String>) {
        self.errors.push(FieldError { field, message: message.into() });
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    /// Messages attached to one field.
    pub fn for_field(&self, field: Field) -> impl Iterator<Item = &str> {
        self.errors
            .iter()
            .filter(move |e| e.field == field)
            .map(|e| e.message.as_str())
    }

    /// All messages joined with `, `.
    #[must_use]
    pub fn summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Append every error from `other`.
    pub fn merge(&mut self, other: ValidationErrors) {
        self.errors.extend(other.errors);
    }

    fn into_result<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

// =============================================================================
// SANITIZATION
// =============================================================================

/// Strip markup tags and the characters `< > ' " &`, then trim.
#[must_use]
pub fn sanitize(input: &str) -> String {
    let untagged = HTML_TAG.remove_all(input);
    UNSAFE_CHARS.remove_all(&untagged).trim().to_owned()
}

// =============================================================================
// FIELDS
// =============================================================================

/// Validate a recipient name and return its sanitized form.
///
/// # Errors
///
/// Returns field errors for an empty or over-long recipient.
pub fn validate_sent_to(sent_to: &str) -> Result<String, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    if sent_to.trim().is_empty() {
        errors.push(Field::SentTo, "Recipient cannot be empty");
        return Err(errors);
    }
    if sent_to.chars().count() > SENT_TO_MAX_LENGTH {
        errors.push(Field::SentTo, format!("Recipient name must be {SENT_TO_MAX_LENGTH} characters or less"));
    }
    let sanitized = sanitize(sent_to);
    if errors.is_empty() && sanitized.is_empty() {
        errors.push(Field::SentTo, "Recipient cannot be empty");
    }
    errors.into_result(sanitized)
}

/// Validate a message body and return its sanitized form.
///
/// # Errors
///
/// Returns field errors for empty, over-long, profane, or spammy messages.
pub fn validate_message(message: &str) -> Result<String, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    if message.trim().is_empty() {
        errors.push(Field::Message, "Message cannot be empty");
        return Err(errors);
    }

    let length = message.chars().count();
    if length > MESSAGE_MAX_LENGTH {
        errors.push(Field::Message, format!("Message must be {MESSAGE_MAX_LENGTH} characters or less"));
    }
    if PROFANITY.is_match(message) {
        errors.push(Field::Message, "Message contains inappropriate language");
    }
    if MESSAGE_REPEAT.is_match(message) {
        errors.push(Field::Message, "Message contains excessive repeated characters");
    }
    let capitals = message.chars().filter(char::is_ascii_uppercase).count();
    if length > CAPS_MIN_LENGTH && capitals * 10 > length * 7 {
        errors.push(Field::Message, "Message contains excessive capital letters");
    }

    let sanitized = sanitize(message);
    if errors.is_empty() && sanitized.is_empty() {
        errors.push(Field::Message, "Message cannot be empty");
    }
    errors.into_result(sanitized)
}

/// Validate an optional hex color, defaulting to sticky-note yellow.
///
/// # Errors
///
/// Returns a field error when the color is not `#rgb` or `#rrggbb`.
pub fn validate_color(color: Option<&str>) -> Result<String, ValidationErrors> {
    let Some(color) = color.map(str::trim).filter(|c| !c.is_empty()) else {
        return Ok(DEFAULT_NOTE_COLOR.to_owned());
    };
    let mut errors = ValidationErrors::default();
    let valid = color
        .strip_prefix('#')
        .is_some_and(|hex| matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit()));
    if !valid {
        errors.push(Field::Color, "Color must be a hex value like #fff3a0");
    }
    errors.into_result(color.to_ascii_lowercase())
}

/// Coerce raw coordinates to integer grid cells.
///
/// # Errors
///
/// Returns a field error for non-finite or out-of-range values.
#[allow(clippy::cast_possible_truncation)]
pub fn validate_coordinates(x: f64, y: f64) -> Result<(i32, i32), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let in_range = |v: f64| v.is_finite() && v.round() >= f64::from(i32::MIN) && v.round() <= f64::from(i32::MAX);
    if !in_range(x) || !in_range(y) {
        errors.push(Field::Coordinates, format!("Invalid coordinates: x={x}, y={y}"));
    }
    errors.into_result((x.round() as i32, y.round() as i32))
}

/// Validate and sanitize a whole draft.
///
/// # Errors
///
/// Returns every field error found, not just the first.
pub fn validate_draft(draft: &NoteDraft) -> Result<NoteDraft, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let sent_to = validate_sent_to(&draft.sent_to).unwrap_or_else(|e| {
        errors.merge(e);
        String::new()
    });
    let message = validate_message(&draft.message).unwrap_or_else(|e| {
        errors.merge(e);
        String::new()
    });
    let color = validate_color(draft.color.as_deref()).unwrap_or_else(|e| {
        errors.merge(e);
        String::new()
    });
    errors.into_result(NoteDraft { sent_to, message, x: draft.x, y: draft.y, color: Some(color) })
}
