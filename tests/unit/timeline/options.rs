use super::*;

#[test]
fn defaults_match_constants() {
    let opts = TimelineOptions::default();
    assert_eq!(opts.request_count, DEFAULT_REQUEST_COUNT);
    assert_eq!(opts.request_timeout, DEFAULT_REQUEST_TIMEOUT);
    assert!(opts.io_options.is_empty());
}

#[test]
fn missing_fields_fall_back_to_defaults() {
    let opts: TimelineOptions =
        serde_json::from_str(r#"{ "request_count": 4, "io_options": { "SequenceIO/ThreadCount": "3" } }"#)
            .unwrap();
    assert_eq!(opts.request_count, 4);
    assert_eq!(opts.request_timeout, DEFAULT_REQUEST_TIMEOUT);
    assert_eq!(
        opts.io_options.get("SequenceIO/ThreadCount").map(String::as_str),
        Some("3")
    );

    let json = serde_json::to_string(&opts).unwrap();
    let back: TimelineOptions = serde_json::from_str(&json).unwrap();
    assert_eq!(back, opts);
}
