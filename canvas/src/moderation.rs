//! Pluggable content checks run before a note is submitted.
//!
//! [`ContentCheck`] is the seam: hosts can swap in a stricter (or remote)
//! moderator, and tests can swap in one that always allows. The bundled
//! [`DefaultModerator`] applies cheap heuristics for spam and abusive text.

#[cfg(test)]
#[path = "moderation_test.rs"]
mod moderation_test;

use regex::Regex;

use crate::patterns::{self, INAPPROPRIATE, LONG_DIGITS, PROMO, SPAM_REPEAT, URL};

/// Longest text the moderator will look at.
const MAX_CONTENT_LENGTH: usize = 500;

/// Outcome of a content check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModerationVerdict {
    Allowed,
    Rejected { reason: String },
}

impl ModerationVerdict {
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    fn rejected(reason: &str) -> Self {
        Self::Rejected { reason: reason.to_owned() }
    }
}

/// Decides whether free text may be published.
pub trait ContentCheck {
    fn check(&self, content: &str) -> ModerationVerdict;
}

/// Accepts everything. Useful when moderation happens elsewhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl ContentCheck for AllowAll {
    fn check(&self, _content: &str) -> ModerationVerdict {
        ModerationVerdict::Allowed
    }
}

/// Heuristic moderator with an extendable block list.
#[derive(Debug, Clone, Default)]
pub struct DefaultModerator {
    blocked_words: Vec<String>,
    blocked: Option<Regex>,
}

impl DefaultModerator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add words (matched whole, case-insensitively) that reject a message.
    #[must_use]
    pub fn with_blocked_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.blocked_words
            .extend(words.into_iter().map(|w| w.as_ref().trim().to_lowercase()).filter(|w| !w.is_empty()));
        self.blocked = patterns::word_list(&self.blocked_words);
        self
    }
}

impl ContentCheck for DefaultModerator {
    fn check(&self, content: &str) -> ModerationVerdict {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return ModerationVerdict::rejected("Content cannot be empty");
        }
        if trimmed.chars().count() > MAX_CONTENT_LENGTH {
            return ModerationVerdict::rejected("Content too long (max 500 characters)");
        }

        let lower = trimmed.to_lowercase();
        if looks_like_spam(&lower) {
            return ModerationVerdict::rejected("Content appears to be spam");
        }
        if INAPPROPRIATE.is_match(&lower) {
            return ModerationVerdict::rejected("Content contains inappropriate material");
        }
        if patterns::is_match(self.blocked.as_ref(), &lower) {
            return ModerationVerdict::rejected("Content contains inappropriate language");
        }
        ModerationVerdict::Allowed
    }
}

/// Spam heuristics over lowercased text.
fn looks_like_spam(lower: &str) -> bool {
    SPAM_REPEAT.is_match(lower)
        || patterns::is_repeated_unit(lower)
        || URL.is_match(lower)
        || PROMO.is_match(lower)
        || LONG_DIGITS.is_match(lower)
}
