#![allow(clippy::expect_used, clippy::unwrap_used)]
//! Integration tests for `supervise` against real processes and a real
//! Unix socket.

use std::os::unix::net::UnixListener;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use kiosk_cli::config::KioskConfig;
use kiosk_cli::error::SupervisorError;
use kiosk_cli::logging::Logger;
use kiosk_cli::supervisor::{Settings, SystemRuntime, supervise};

/// The signal handler can only be installed once per process.
fn runtime() -> &'static SystemRuntime {
    static RUNTIME: OnceLock<SystemRuntime> = OnceLock::new();
    RUNTIME.get_or_init(|| SystemRuntime::install().expect("install signal handler"))
}

fn settings(runtime_dir: &Path, program: &str, args: &[&str]) -> Settings {
    let mut settings = Settings::new(
        &KioskConfig::default(),
        Some(runtime_dir.to_path_buf()),
        Some("wayland-test".to_string()),
    );
    settings.socket_timeout = Duration::from_millis(300);
    settings.poll_interval = Duration::from_millis(20);
    settings.grace_period = Duration::from_millis(200);
    settings.retry_backoff = Duration::from_millis(10);
    settings.max_attempts = 3;
    settings.program = program.to_string();
    settings.args = args.iter().map(ToString::to_string).collect();
    settings
}

#[test]
fn times_out_without_a_socket() {
    let dir = tempfile::tempdir().unwrap();
    let log = Logger::new("supervise-test");
    let err = supervise(&settings(dir.path(), "true", &[]), runtime(), &log).unwrap_err();
    assert!(matches!(err, SupervisorError::SocketTimeout { .. }), "{err}");
}

#[test]
fn crashing_browser_exhausts_retries() {
    let dir = tempfile::tempdir().unwrap();
    let _socket = UnixListener::bind(dir.path().join("wayland-test")).unwrap();
    let log = Logger::new("supervise-test");
    let err = supervise(&settings(dir.path(), "false", &[]), runtime(), &log).unwrap_err();
    assert!(matches!(err, SupervisorError::RetriesExhausted { attempts: 3 }));
}

#[test]
fn healthy_run_returns_its_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let _socket = UnixListener::bind(dir.path().join("wayland-test")).unwrap();
    let log = Logger::new("supervise-test");
    let code = supervise(
        &settings(dir.path(), "sh", &["-c", "sleep 0.4; exit 3"]),
        runtime(),
        &log,
    )
    .unwrap();
    assert_eq!(code, 3);
}

#[test]
fn missing_binary_is_a_spawn_error_after_every_attempt() {
    let dir = tempfile::tempdir().unwrap();
    let _socket = UnixListener::bind(dir.path().join("wayland-test")).unwrap();
    let log = Logger::new("supervise-test");
    let err = supervise(
        &settings(dir.path(), "/nonexistent/chromium", &[]),
        runtime(),
        &log,
    )
    .unwrap_err();
    assert!(matches!(err, SupervisorError::Spawn { .. }));
}
