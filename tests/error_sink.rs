//! The error sink installs process-wide state, so everything about it is
//! checked from a single test in its own binary.

use {
    logwriter::{configure_error_sink, error_sink, write_to_log_quietly, LogWriterError},
    std::fs,
};

#[test]
fn error_sink_captures_diagnostics_and_is_configured_once() {
    let dir = tempfile::tempdir().unwrap();
    assert!(error_sink().is_none());

    let missing = dir.path().join("missing");
    let err = configure_error_sink("errors.log", &missing).unwrap_err();
    assert!(matches!(err, LogWriterError::PathUnavailable { .. }), "got {err:?}");
    assert!(error_sink().is_none());

    let sink_path = configure_error_sink("errors.log", dir.path()).unwrap();
    assert_eq!(sink_path, dir.path().join("errors.log"));
    assert_eq!(error_sink(), Some(sink_path.as_path()));

    tracing::error!("disk quota exceeded");
    tracing::info!("below the sink threshold");
    write_to_log_quietly("lost", &missing, "app.log");

    let contents = fs::read_to_string(&sink_path).unwrap();
    assert!(contents.contains("disk quota exceeded"), "sink contents: {contents}");
    assert!(!contents.contains("below the sink threshold"));
    assert!(contents.contains("failed to write log record"), "sink contents: {contents}");

    let err = configure_error_sink("other.log", dir.path()).unwrap_err();
    match err {
        LogWriterError::ErrorSinkAlreadyConfigured(path) => assert_eq!(path, sink_path),
        other => panic!("unexpected error {other:?}"),
    }
    assert!(!dir.path().join("other.log").exists());
}
