use super::*;

#[test]
fn success_body_decodes() {
    let body = r#"{"id":"00000000-0000-0000-0000-000000000009","report_count":4}"#;
    let receipt: ReportReceipt = decode_response(200, body).unwrap();
    assert_eq!(receipt.report_count, 4);
}

#[test]
fn garbage_success_body_is_decode_error() {
    let err = decode_response::<ReportReceipt>(200, "<html>").unwrap_err();
    assert!(matches!(err, StoreError::Decode(_)));
}

#[test]
fn bad_request_carries_server_message_and_details() {
    let body = r#"{"error":"Validation failed","details":[{"field":"message","message":"Message cannot be empty"}]}"#;
    assert_eq!(
        error_from_status(400, body),
        StoreError::Invalid("Validation failed: Message cannot be empty".into())
    );
}

#[test]
fn string_details_are_appended() {
    let body = r#"{"error":"Missing required fields","details":"sent_to"}"#;
    assert_eq!(error_from_status(400, body), StoreError::Invalid("Missing required fields: sent_to".into()));
}

#[test]
fn not_found_is_distinct() {
    assert_eq!(error_from_status(404, r#"{"error":"Note not found"}"#), StoreError::NotFound);
}

#[test]
fn too_many_requests_is_rate_limited() {
    let err = error_from_status(429, r#"{"error":"Rate limit exceeded. Please try again later."}"#);
    assert_eq!(err, StoreError::RateLimited("Rate limit exceeded. Please try again later.".into()));
    assert_eq!(err.user_message(), "Rate limit exceeded. Please try again later.");
}

#[test]
fn unparseable_error_body_falls_back() {
    assert_eq!(
        error_from_status(502, ""),
        StoreError::Server { status: 502, message: "HTTP 502".into() }
    );
    assert_eq!(
        error_from_status(500, "boom"),
        StoreError::Server { status: 500, message: "boom".into() }
    );
}

#[test]
fn base_url_trailing_slash_is_trimmed() {
    let store = HttpNoteStore::new("http://localhost:3000/");
    assert_eq!(store.url(), "http://localhost:3000/api/notes");
}
