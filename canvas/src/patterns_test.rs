use super::*;

#[test]
fn every_static_pattern_compiles() {
    for (name, pattern) in all() {
        assert!(pattern.regex().is_some(), "{name} failed to compile");
    }
}

#[test]
fn tag_strip_leaves_lone_brackets() {
    assert_eq!(HTML_TAG.remove_all("<b>bold</b> and <i>it</i>"), "bold and it");
    assert_eq!(HTML_TAG.remove_all("1 < 2"), "1 < 2");
}

#[test]
fn word_list_matches_whole_words_only() {
    let re = word_list(&["win", "a.b"]);
    assert!(is_match(re.as_ref(), "you WIN"));
    assert!(!is_match(re.as_ref(), "window"));
    assert!(is_match(re.as_ref(), "see a.b now"));
    assert!(!is_match(re.as_ref(), "see axb now"), "entries are escaped");
}

#[test]
fn empty_word_list_matches_nothing() {
    let empty: [&str; 0] = [];
    assert!(word_list(&empty).is_none());
    assert!(!is_match(None, "anything"));
}

#[test]
fn repeated_char_threshold() {
    assert!(MESSAGE_REPEAT.is_match("zzzzz"));
    assert!(!MESSAGE_REPEAT.is_match("zzzz zzzz"));
    assert!(SPAM_REPEAT.is_match(&"!".repeat(11)));
    assert!(!SPAM_REPEAT.is_match(&"!".repeat(10)));
}

#[test]
fn repeated_unit_must_cover_the_whole_text() {
    assert!(is_repeated_unit("xoxoxoxoxoxo"));
    assert!(is_repeated_unit("......"));
    assert!(!is_repeated_unit("xoxoxoxoxoxo!"));
    assert!(!is_repeated_unit("xoxoxoxoxo"));
    assert!(is_repeated_unit("a.ba.ba.ba.ba.ba.b"), "unit metacharacters are escaped");
    assert!(!is_repeated_unit("aXbaYbaZbaWbaVbaUb"));
}

#[test]
fn urls_need_a_host_character() {
    assert!(URL.is_match("go to https://x.io"));
    assert!(URL.is_match("HTTP://X.IO"));
    assert!(!URL.is_match("https:// nothing"));
}

#[test]
fn long_digit_runs_stand_alone() {
    assert!(LONG_DIGITS.is_match("call 0123456789 now"));
    assert!(!LONG_DIGITS.is_match("x0123456789"));
    assert!(!LONG_DIGITS.is_match("012345678"));
}
