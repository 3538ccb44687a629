//! Tests for `src/logging.rs`.

use trustgate::logging::{LoggingGuard, LOG_FILE_PREFIX};

#[test]
fn logging_guard_is_send() {
    fn assert_send<T: Send>() {}
    assert_send::<LoggingGuard>();
}

#[test]
fn init_production_creates_logs_dir() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let logs_dir = tmp.path().join("logs");
    assert!(!logs_dir.exists());

    // Only one global subscriber can exist per process; a second init is
    // tolerated, so only the directory is asserted.
    let guard = trustgate::logging::init_production(&logs_dir).expect("init");
    assert!(logs_dir.exists(), "logs directory should be created");
    drop(guard);
}

#[test]
fn init_cli_can_be_called_repeatedly() {
    trustgate::logging::init_cli();
    trustgate::logging::init_cli();
}

#[test]
fn log_file_prefix_names_the_tool() {
    assert!(LOG_FILE_PREFIX.starts_with("trustgate"));
}
