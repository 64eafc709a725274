use std::collections::HashMap;

use super::*;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect();
    move |key| map.get(key).cloned()
}

#[test]
fn empty_environment_yields_defaults() {
    let config = Config::from_lookup(lookup(&[])).unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.port, 3000);
    assert_eq!(config.database_url, None);
    assert_eq!(config.cooldown.cooldown_minutes, 2);
    assert_eq!(config.cooldown.max_posts_per_hour, 30);
    assert_eq!(config.rate_limits.create_note.limit, 720);
    assert_eq!(config.rate_limits.create_note.window, Duration::from_secs(1440 * 60));
    assert_eq!(config.rate_limits.report_note.limit, 14_400);
    assert_eq!(config.report_moderation_threshold, 5);
}

#[test]
fn values_are_read_from_lookup() {
    let config = Config::from_lookup(lookup(&[
        ("PORT", "8080"),
        ("DATABASE_URL", "postgres://localhost/unsent"),
        ("COOLDOWN_MINUTES", "5"),
        ("NOTE_RATE_LIMIT", " 10 "),
        ("NOTE_RATE_WINDOW_MINUTES", "60"),
        ("FEED_CAPACITY", "16"),
    ]))
    .unwrap();

    assert_eq!(config.port, 8080);
    assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/unsent"));
    assert_eq!(config.cooldown.cooldown_minutes, 5);
    assert_eq!(config.rate_limits.create_note, RateLimit::new(10, Duration::from_secs(3600)));
    assert_eq!(config.feed_capacity, 16);
}

#[test]
fn blank_database_url_means_memory() {
    let config = Config::from_lookup(lookup(&[("DATABASE_URL", "  ")])).unwrap();
    assert_eq!(config.database_url, None);
}

#[test]
fn unparseable_value_is_an_error() {
    let err = Config::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
    assert_eq!(err, ConfigError::Invalid { key: "PORT".into(), value: "eighty".into() });
}

#[test]
fn zero_limit_is_an_error() {
    let err = Config::from_lookup(lookup(&[("REPORT_RATE_LIMIT", "0")])).unwrap_err();
    assert_eq!(err, ConfigError::Zero { key: "REPORT_RATE_LIMIT".into() });
}

#[test]
fn blocked_words_are_split_and_lowercased() {
    let config = Config::from_lookup(lookup(&[("BLOCKED_WORDS", "Spam, eggs,, ")])).unwrap();
    assert_eq!(config.blocked_words, vec!["spam".to_owned(), "eggs".to_owned()]);
}
