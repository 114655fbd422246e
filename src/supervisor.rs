//! Browser supervision: wait for the compositor's socket, then launch the
//! browser with a bounded crash-retry loop.
//!
//! A run that outlives the grace period is considered healthy; its exit is
//! returned to the caller and restarting is left to systemd.
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::config::{BrowserConfig, KioskConfig};
use crate::error::SupervisorError;
use crate::logging::Log;

/// Flags every kiosk browser launch starts with.
pub const CHROMIUM_FLAGS: &[&str] = &[
    "--kiosk",
    "--noerrdialogs",
    "--disable-infobars",
    "--no-first-run",
    "--ozone-platform=wayland",
    "--enable-features=OverlayScrollbar",
    "--disable-session-crashed-bubble",
    "--disable-component-update",
    "--check-for-update-interval=31536000",
    "--password-store=basic",
];

/// Lower bound on the socket poll interval.
const MIN_POLL: Duration = Duration::from_millis(10);

/// Slice length used by [`SystemRuntime::sleep`] to notice interrupts.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Full argument list: fixed flags, configured extras, then the URL.
///
/// # Examples
///
/// ```
/// use kiosk_cli::config::BrowserConfig;
/// use kiosk_cli::supervisor::browser_args;
///
/// let args = browser_args(&BrowserConfig::default(), "https://example.com");
/// assert_eq!(args.first().map(String::as_str), Some("--kiosk"));
/// assert_eq!(args.last().map(String::as_str), Some("https://example.com"));
/// ```
#[must_use]
pub fn browser_args(browser: &BrowserConfig, url: &str) -> Vec<String> {
    CHROMIUM_FLAGS
        .iter()
        .map(|f| (*f).to_string())
        .chain(browser.extra_flags.iter().cloned())
        .chain(std::iter::once(url.to_string()))
        .collect()
}

/// Resolved supervisor parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Wayland socket to wait for.
    pub socket: PathBuf,
    /// How long to wait for the socket before giving up.
    pub socket_timeout: Duration,
    /// Delay between socket checks.
    pub poll_interval: Duration,
    /// Minimum runtime for a launch to count as healthy.
    pub grace_period: Duration,
    /// Upper bound on launches.
    pub max_attempts: u32,
    /// Delay between a crash and the next launch.
    pub retry_backoff: Duration,
    /// Browser executable.
    pub program: String,
    /// Browser arguments.
    pub args: Vec<String>,
}

impl Settings {
    /// Build settings from the config, with the socket location taken from
    /// `runtime_dir` and `wayland_display` when given (normally the
    /// `XDG_RUNTIME_DIR` and `WAYLAND_DISPLAY` environment variables).
    #[must_use]
    pub fn new(
        config: &KioskConfig,
        runtime_dir: Option<PathBuf>,
        wayland_display: Option<String>,
    ) -> Self {
        let browser = &config.browser;
        let runtime_dir = runtime_dir.unwrap_or_else(|| {
            PathBuf::from(format!("/run/user/{}", nix::unistd::geteuid().as_raw()))
        });
        let display = wayland_display
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| browser.wayland_display.clone());
        Self {
            socket: runtime_dir.join(display),
            socket_timeout: Duration::from_secs(browser.socket_timeout_secs),
            poll_interval: Duration::from_millis(browser.poll_interval_ms),
            grace_period: Duration::from_secs(browser.grace_period_secs),
            max_attempts: browser.max_attempts,
            retry_backoff: Duration::from_secs(browser.retry_backoff_secs),
            program: browser.binary.clone(),
            args: browser_args(browser, &config.url),
        }
    }

    /// [`Settings::new`] with the socket location read from the environment.
    #[must_use]
    pub fn from_env(config: &KioskConfig) -> Self {
        Self::new(
            config,
            std::env::var_os("XDG_RUNTIME_DIR")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            std::env::var("WAYLAND_DISPLAY").ok(),
        )
    }
}

/// How a single browser launch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    /// Exit code, `None` when the process was killed by a signal.
    pub code: Option<i32>,
    /// Wall-clock runtime.
    pub elapsed: Duration,
}

/// Side effects of the supervisor, injectable for tests.
pub trait Runtime {
    /// Whether `path` exists and is a Unix socket.
    fn socket_exists(&self, path: &Path) -> bool;
    /// Block for `duration` (may return early when interrupted).
    fn sleep(&self, duration: Duration);
    /// Run `program` to completion.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorError::Spawn`] when the program cannot start.
    fn run(&self, program: &str, args: &[String]) -> Result<RunOutcome, SupervisorError>;
    /// Whether SIGINT or SIGTERM has been received.
    fn interrupted(&self) -> bool;
}

/// [`Runtime`] backed by the real clock, filesystem and process table.
#[derive(Debug, Clone)]
pub struct SystemRuntime {
    stop: Arc<AtomicBool>,
}

impl SystemRuntime {
    /// Create the runtime and route SIGINT/SIGTERM to its stop flag.
    ///
    /// # Errors
    ///
    /// Fails if a signal handler is already installed.
    pub fn install() -> anyhow::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))?;
        Ok(Self { stop })
    }
}

impl Runtime for SystemRuntime {
    fn socket_exists(&self, path: &Path) -> bool {
        use std::os::unix::fs::FileTypeExt as _;
        std::fs::metadata(path).is_ok_and(|m| m.file_type().is_socket())
    }

    fn sleep(&self, duration: Duration) {
        let deadline = Instant::now() + duration;
        while !self.interrupted() {
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                break;
            }
            std::thread::sleep(left.min(SLEEP_SLICE));
        }
    }

    fn run(&self, program: &str, args: &[String]) -> Result<RunOutcome, SupervisorError> {
        let started = Instant::now();
        let status = Command::new(program)
            .args(args)
            .status()
            .map_err(|source| SupervisorError::Spawn {
                program: program.to_string(),
                source,
            })?;
        Ok(RunOutcome {
            code: status.code(),
            elapsed: started.elapsed(),
        })
    }

    fn interrupted(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}

/// Poll for the display socket until it appears or the timeout elapses.
///
/// Time is accounted as the sum of the sleeps, so a fake runtime never has
/// to advance a clock.
fn wait_for_socket(
    settings: &Settings,
    runtime: &dyn Runtime,
    log: &dyn Log,
) -> Result<(), SupervisorError> {
    let poll = settings.poll_interval.max(MIN_POLL);
    let mut waited = Duration::ZERO;
    while !runtime.socket_exists(&settings.socket) {
        if runtime.interrupted() {
            return Err(SupervisorError::Interrupted { attempts: 0 });
        }
        if waited >= settings.socket_timeout {
            return Err(SupervisorError::SocketTimeout {
                path: settings.socket.clone(),
                waited,
            });
        }
        runtime.sleep(poll);
        waited += poll;
    }
    log.debug(&format!(
        "display socket {} ready after {waited:?}",
        settings.socket.display()
    ));
    Ok(())
}

/// Wait for the display, then launch the browser until one run is healthy.
///
/// Returns the exit code of the healthy run (`0` if it was killed by a
/// signal). A launch that cannot be spawned counts as a crashed attempt.
///
/// # Errors
///
/// Fails when the socket never appears or a stop signal arrives. Once every
/// attempt is used up it returns [`SupervisorError::Spawn`] if the last one
/// could not start, [`SupervisorError::RetriesExhausted`] otherwise.
pub fn supervise(
    settings: &Settings,
    runtime: &dyn Runtime,
    log: &dyn Log,
) -> Result<i32, SupervisorError> {
    wait_for_socket(settings, runtime, log)?;

    let mut spawn_error = None;
    for attempt in 1..=settings.max_attempts {
        if runtime.interrupted() {
            return Err(SupervisorError::Interrupted {
                attempts: attempt - 1,
            });
        }
        log.info(&format!(
            "starting {} (attempt {attempt}/{})",
            settings.program, settings.max_attempts
        ));
        match runtime.run(&settings.program, &settings.args) {
            Ok(outcome) if outcome.elapsed >= settings.grace_period => {
                log.info(&format!(
                    "{} exited after {:?} with {:?}",
                    settings.program, outcome.elapsed, outcome.code
                ));
                return Ok(outcome.code.unwrap_or(0));
            }
            Ok(outcome) => {
                log.warn(&format!(
                    "{} exited after {:?} (code {:?}), inside the {:?} grace period",
                    settings.program, outcome.elapsed, outcome.code, settings.grace_period
                ));
                spawn_error = None;
            }
            Err(e) => {
                log.warn(&e.to_string());
                spawn_error = Some(e);
            }
        }
        if attempt < settings.max_attempts {
            runtime.sleep(settings.retry_backoff);
        }
    }

    Err(spawn_error.unwrap_or(SupervisorError::RetriesExhausted {
        attempts: settings.max_attempts,
    }))
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::logging::TaskEntry;
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;

    #[derive(Default)]
    struct NullLog;

    impl Log for NullLog {
        fn stage(&self, _: &str) {}
        fn info(&self, _: &str) {}
        fn debug(&self, _: &str) {}
        fn warn(&self, _: &str) {}
        fn error(&self, _: &str) {}
        fn dry_run(&self, _: &str) {}
        fn record_task(&self, _: TaskEntry) {}
    }

    /// Scripted runtime: the socket appears after `socket_after` checks and
    /// each launch pops the next outcome.
    struct FakeRuntime {
        socket_after: Option<u32>,
        checks: Cell<u32>,
        outcomes: RefCell<VecDeque<RunOutcome>>,
        launches: Cell<u32>,
        sleeps: RefCell<Vec<Duration>>,
        interrupt_after_launches: Option<u32>,
        spawn_failures: u32,
    }

    impl FakeRuntime {
        fn new(socket_after: Option<u32>, outcomes: Vec<RunOutcome>) -> Self {
            Self {
                socket_after,
                checks: Cell::new(0),
                outcomes: RefCell::new(outcomes.into()),
                launches: Cell::new(0),
                sleeps: RefCell::new(Vec::new()),
                interrupt_after_launches: None,
                spawn_failures: 0,
            }
        }
    }

    impl Runtime for FakeRuntime {
        fn socket_exists(&self, _: &Path) -> bool {
            let n = self.checks.get();
            self.checks.set(n + 1);
            self.socket_after.is_some_and(|after| n >= after)
        }

        fn sleep(&self, duration: Duration) {
            self.sleeps.borrow_mut().push(duration);
        }

        fn run(&self, program: &str, _: &[String]) -> Result<RunOutcome, SupervisorError> {
            self.launches.set(self.launches.get() + 1);
            if self.launches.get() <= self.spawn_failures {
                return Err(SupervisorError::Spawn {
                    program: program.to_string(),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                });
            }
            Ok(self.outcomes.borrow_mut().pop_front().unwrap_or_else(crash))
        }

        fn interrupted(&self) -> bool {
            self.interrupt_after_launches
                .is_some_and(|n| self.launches.get() >= n)
        }
    }

    fn crash() -> RunOutcome {
        RunOutcome {
            code: Some(1),
            elapsed: Duration::from_secs(1),
        }
    }

    fn healthy(code: Option<i32>) -> RunOutcome {
        RunOutcome {
            code,
            elapsed: Duration::from_secs(3600),
        }
    }

    fn settings() -> Settings {
        Settings::new(
            &KioskConfig::default(),
            Some(PathBuf::from("/run/user/1000")),
            None,
        )
    }

    #[test]
    fn args_order_flags_extras_url() {
        let browser = BrowserConfig {
            extra_flags: vec!["--force-device-scale-factor=1.5".to_string()],
            ..BrowserConfig::default()
        };
        let args = browser_args(&browser, "https://example.com");
        assert_eq!(args.len(), CHROMIUM_FLAGS.len() + 2);
        assert_eq!(args[CHROMIUM_FLAGS.len()], "--force-device-scale-factor=1.5");
        assert_eq!(args.last().unwrap(), "https://example.com");
    }

    #[test]
    fn settings_follow_config_and_env() {
        let s = Settings::new(
            &KioskConfig::default(),
            Some(PathBuf::from("/run/user/1000")),
            Some("wayland-1".to_string()),
        );
        assert_eq!(s.socket, PathBuf::from("/run/user/1000/wayland-1"));
        assert_eq!(s.max_attempts, 5);
        assert_eq!(s.grace_period, Duration::from_secs(10));
        assert_eq!(settings().socket, PathBuf::from("/run/user/1000/wayland-0"));
    }

    #[test]
    fn healthy_first_run_returns_its_code() {
        let rt = FakeRuntime::new(Some(0), vec![healthy(Some(0))]);
        assert_eq!(supervise(&settings(), &rt, &NullLog).unwrap(), 0);
        assert_eq!(rt.launches.get(), 1);
    }

    #[test]
    fn signal_killed_healthy_run_maps_to_zero() {
        let rt = FakeRuntime::new(Some(0), vec![healthy(None)]);
        assert_eq!(supervise(&settings(), &rt, &NullLog).unwrap(), 0);
    }

    #[test]
    fn crash_then_healthy_retries_with_backoff() {
        let rt = FakeRuntime::new(Some(0), vec![crash(), crash(), healthy(Some(3))]);
        assert_eq!(supervise(&settings(), &rt, &NullLog).unwrap(), 3);
        assert_eq!(rt.launches.get(), 3);
        assert_eq!(
            *rt.sleeps.borrow(),
            vec![Duration::from_secs(5), Duration::from_secs(5)]
        );
    }

    #[test]
    fn launches_at_most_max_attempts() {
        let rt = FakeRuntime::new(Some(0), vec![]);
        let err = supervise(&settings(), &rt, &NullLog).unwrap_err();
        assert!(matches!(err, SupervisorError::RetriesExhausted { attempts: 5 }));
        assert_eq!(rt.launches.get(), 5);
        assert_eq!(rt.sleeps.borrow().len(), 4, "no backoff after the last attempt");
    }

    #[test]
    fn spawn_failure_counts_as_a_crashed_attempt() {
        let mut rt = FakeRuntime::new(Some(0), vec![healthy(Some(0))]);
        rt.spawn_failures = 2;
        assert_eq!(supervise(&settings(), &rt, &NullLog).unwrap(), 0);
        assert_eq!(rt.launches.get(), 3);
        assert_eq!(rt.sleeps.borrow().len(), 2);
    }

    #[test]
    fn unstartable_browser_uses_every_attempt() {
        let mut rt = FakeRuntime::new(Some(0), vec![]);
        rt.spawn_failures = u32::MAX;
        let err = supervise(&settings(), &rt, &NullLog).unwrap_err();
        assert!(matches!(err, SupervisorError::Spawn { .. }), "{err}");
        assert_eq!(rt.launches.get(), 5);
    }

    #[test]
    fn crash_after_spawn_failure_reports_exhaustion() {
        let mut s = settings();
        s.max_attempts = 2;
        let mut rt = FakeRuntime::new(Some(0), vec![crash()]);
        rt.spawn_failures = 1;
        let err = supervise(&s, &rt, &NullLog).unwrap_err();
        assert!(matches!(err, SupervisorError::RetriesExhausted { attempts: 2 }));
    }

    #[test]
    fn zero_attempts_never_launches() {
        let mut s = settings();
        s.max_attempts = 0;
        let rt = FakeRuntime::new(Some(0), vec![healthy(Some(0))]);
        let err = supervise(&s, &rt, &NullLog).unwrap_err();
        assert!(matches!(err, SupervisorError::RetriesExhausted { attempts: 0 }));
        assert_eq!(rt.launches.get(), 0);
    }

    #[test]
    fn waits_for_socket_before_launching() {
        let rt = FakeRuntime::new(Some(3), vec![healthy(Some(0))]);
        supervise(&settings(), &rt, &NullLog).unwrap();
        assert_eq!(rt.sleeps.borrow().len(), 3);
        assert!(
            rt.sleeps
                .borrow()
                .iter()
                .all(|d| *d == Duration::from_millis(500))
        );
    }

    #[test]
    fn socket_timeout_never_launches() {
        let rt = FakeRuntime::new(None, vec![healthy(Some(0))]);
        let err = supervise(&settings(), &rt, &NullLog).unwrap_err();
        match err {
            SupervisorError::SocketTimeout { path, waited } => {
                assert_eq!(path, PathBuf::from("/run/user/1000/wayland-0"));
                assert_eq!(waited, Duration::from_secs(30));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(rt.launches.get(), 0);
        assert_eq!(rt.sleeps.borrow().len(), 60);
    }

    #[test]
    fn zero_poll_interval_is_clamped() {
        let mut s = settings();
        s.poll_interval = Duration::ZERO;
        s.socket_timeout = Duration::from_millis(50);
        let rt = FakeRuntime::new(None, vec![]);
        assert!(matches!(
            supervise(&s, &rt, &NullLog),
            Err(SupervisorError::SocketTimeout { .. })
        ));
        assert_eq!(rt.sleeps.borrow().len(), 5);
    }

    #[test]
    fn interrupt_stops_retries() {
        let mut rt = FakeRuntime::new(Some(0), vec![]);
        rt.interrupt_after_launches = Some(2);
        let err = supervise(&settings(), &rt, &NullLog).unwrap_err();
        assert!(matches!(err, SupervisorError::Interrupted { attempts: 2 }));
        assert_eq!(rt.launches.get(), 2);
    }
}
