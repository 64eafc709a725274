//! Compiled text patterns shared by validation and moderation.
//!
//! Every pattern is compiled once on first use. The `regex` crate has no
//! backreferences, so "the same character N times" is spelled out as an
//! alternation over every character from space through Latin Extended-B.

#[cfg(test)]
#[path = "patterns_test.rs"]
mod patterns_test;

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use tracing::error;

/// A lazily compiled pattern. One whose source failed to compile is logged
/// once and matches nothing.
pub(crate) struct Pattern(LazyLock<Option<Regex>>);

impl Pattern {
    const fn new(init: fn() -> Option<Regex>) -> Self {
        Self(LazyLock::new(init))
    }

    pub(crate) fn regex(&self) -> Option<&Regex> {
        LazyLock::force(&self.0).as_ref()
    }

    pub(crate) fn is_match(&self, text: &str) -> bool {
        is_match(self.regex(), text)
    }

    pub(crate) fn remove_all<'t>(&self, text: &'t str) -> Cow<'t, str> {
        match self.regex() {
            Some(re) => re.replace_all(text, ""),
            None => Cow::Borrowed(text),
        }
    }
}

const PROFANITY_WORDS: &[&str] = &["damn", "hell", "crap", "shit", "fuck", "bitch", "bastard", "ass", "piss"];
const PROMO_WORDS: &[&str] = &["buy", "sale", "discount", "offer", "deal", "free", "win", "winner", "prize"];
const INAPPROPRIATE_WORDS: &[&str] = &["hate", "violence", "threat"];

/// Run of one repeated character a message may not contain.
const MESSAGE_REPEAT_RUN: usize = 5;

/// Run of one repeated character that marks content as spam.
const SPAM_REPEAT_RUN: usize = 11;

/// Repetitions of a 1-3 character unit that make a whole text spam.
const SPAM_UNIT_REPEATS: usize = 6;

pub(crate) static HTML_TAG: Pattern = Pattern::new(|| compile(r"<[^>]*>"));
pub(crate) static UNSAFE_CHARS: Pattern = Pattern::new(|| compile(r#"[<>'"&]"#));
pub(crate) static PROFANITY: Pattern = Pattern::new(|| word_list(PROFANITY_WORDS));
pub(crate) static PROMO: Pattern = Pattern::new(|| word_list(PROMO_WORDS));
pub(crate) static INAPPROPRIATE: Pattern = Pattern::new(|| word_list(INAPPROPRIATE_WORDS));
pub(crate) static URL: Pattern = Pattern::new(|| compile(r"(?i)https?://\S"));
pub(crate) static LONG_DIGITS: Pattern = Pattern::new(|| compile(r"\b[0-9]{10,}\b"));
pub(crate) static MESSAGE_REPEAT: Pattern = Pattern::new(|| repeated_char(MESSAGE_REPEAT_RUN));
pub(crate) static SPAM_REPEAT: Pattern = Pattern::new(|| repeated_char(SPAM_REPEAT_RUN));

/// All statics, for checking that each compiles.
#[cfg(test)]
pub(crate) fn all() -> [(&'static str, &'static Pattern); 9] {
    [
        ("html_tag", &HTML_TAG),
        ("unsafe_chars", &UNSAFE_CHARS),
        ("profanity", &PROFANITY),
        ("promo", &PROMO),
        ("inappropriate", &INAPPROPRIATE),
        ("url", &URL),
        ("long_digits", &LONG_DIGITS),
        ("message_repeat", &MESSAGE_REPEAT),
        ("spam_repeat", &SPAM_REPEAT),
    ]
}

pub(crate) fn compile(source: &str) -> Option<Regex> {
    match Regex::new(source) {
        Ok(regex) => Some(regex),
        Err(e) => {
            error!(error = %e, "patterns: failed to compile");
            None
        }
    }
}

/// Case-insensitive whole-word match against any of `words`. `None` for an
/// empty list.
pub(crate) fn word_list<S: AsRef<str>>(words: &[S]) -> Option<Regex> {
    if words.is_empty() {
        return None;
    }
    let alternatives = words
        .iter()
        .map(|w| regex::escape(w.as_ref()))
        .collect::<Vec<_>>()
        .join("|");
    compile(&format!(r"(?i)\b(?:{alternatives})\b"))
}

fn repeated_char(run: usize) -> Option<Regex> {
    let alternatives = (' '..='\u{24f}')
        .filter(|c| !c.is_control())
        .map(|c| format!("{}{{{run},}}", regex::escape(c.encode_utf8(&mut [0; 4]))))
        .collect::<Vec<_>>()
        .join("|");
    compile(&alternatives)
}

pub(crate) fn is_match(pattern: Option<&Regex>, text: &str) -> bool {
    pattern.is_some_and(|re| re.is_match(text))
}

/// Whether the whole of `text` is one 1-3 character unit repeated at least
/// [`SPAM_UNIT_REPEATS`] times. The unit can only be a prefix, so one
/// anchored pattern per candidate length is enough.
pub(crate) fn is_repeated_unit(text: &str) -> bool {
    (1..=3).any(|len| {
        let Some((end, _)) = text.char_indices().nth(len) else {
            return false;
        };
        let unit = regex::escape(&text[..end]);
        is_match(compile(&format!("^(?:{unit}){{{SPAM_UNIT_REPEATS},}}$")).as_ref(), text)
    })
}
