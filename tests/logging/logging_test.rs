//! File logging setup.

use rolebot::logging::{init_cli, init_with_file, CONVERSATION_TARGET};

#[test]
fn file_logging_creates_directory_and_installs_once() {
    let dir = match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(err) => panic!("tempdir should be created: {err}"),
    };
    let logs_dir = dir.path().join("nested").join("logs");

    let guard = init_with_file(&logs_dir, "debug").expect("first install succeeds");
    assert!(logs_dir.is_dir());
    tracing::debug!(target: CONVERSATION_TARGET, user = "hi", "exchange");

    // A second global subscriber is refused; the console variant ignores it.
    assert!(init_with_file(&logs_dir, "debug").is_err());
    init_cli("info");
    drop(guard);
}
