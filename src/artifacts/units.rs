//! systemd unit files: a small builder/parser and the kiosk units.
use std::fmt::Write as _;

use thiserror::Error;

use super::{BROWSER_UNIT, GENERATED_HEADER, LABWC_UNIT, LAUNCH_SCRIPT, RESTART_UNIT};
use crate::config::KioskConfig;
use crate::user::KioskUser;

/// A line that does not fit unit-file grammar.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct UnitParseError {
    /// 1-based line number.
    pub line: usize,
    /// What was wrong.
    pub message: String,
}

/// One `[Section]` with its entries in order; keys may repeat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitSection {
    /// Section name without brackets.
    pub name: String,
    /// `(key, value)` pairs.
    pub entries: Vec<(String, String)>,
}

/// An ordered unit file.
///
/// ```
/// use kiosk_cli::artifacts::units::UnitFile;
///
/// let unit = UnitFile::new()
///     .section("Unit")
///     .entry("Description", "demo")
///     .section("Service")
///     .entry("ExecStart", "/bin/true");
/// let text = unit.render();
/// assert_eq!(UnitFile::parse(&text).unwrap(), unit);
/// assert_eq!(unit.values("Service", "ExecStart"), vec!["/bin/true"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitFile {
    /// Sections in file order.
    pub sections: Vec<UnitSection>,
}

impl UnitFile {
    /// Create an empty unit.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            sections: Vec::new(),
        }
    }

    /// Start a new section; later entries go into it.
    #[must_use]
    pub fn section(mut self, name: &str) -> Self {
        self.sections.push(UnitSection {
            name: name.to_string(),
            entries: Vec::new(),
        });
        self
    }

    /// Append `key=value` to the current section.
    ///
    /// Entries added before any section are placed in an implicit
    /// `[Unit]` section.
    #[must_use]
    pub fn entry(mut self, key: &str, value: impl Into<String>) -> Self {
        if self.sections.is_empty() {
            self = self.section("Unit");
        }
        if let Some(section) = self.sections.last_mut() {
            section.entries.push((key.to_string(), value.into()));
        }
        self
    }

    /// Append an entry only when `value` is `Some`.
    #[must_use]
    pub fn entry_opt(self, key: &str, value: Option<String>) -> Self {
        match value {
            Some(v) => self.entry(key, v),
            None => self,
        }
    }

    /// All values of `key` in `section`, in order.
    #[must_use]
    pub fn values(&self, section: &str, key: &str) -> Vec<&str> {
        self.sections
            .iter()
            .filter(|s| s.name == section)
            .flat_map(|s| s.entries.iter())
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Render with the generated-file header.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = format!("{GENERATED_HEADER}\n");
        for section in &self.sections {
            let _ = write!(out, "\n[{}]\n", section.name);
            for (key, value) in &section.entries {
                let _ = writeln!(out, "{key}={value}");
            }
        }
        out
    }

    /// Parse unit-file text.  Comments (`#`, `;`) and blank lines are
    /// skipped; line continuations are not supported.
    ///
    /// # Errors
    ///
    /// Returns an error for entries outside a section, malformed section
    /// headers, or lines without `=`.
    pub fn parse(text: &str) -> Result<Self, UnitParseError> {
        let mut unit = Self::new();
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            let err = |message: &str| UnitParseError {
                line: idx + 1,
                message: message.to_string(),
            };
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if let Some(header) = line.strip_prefix('[') {
                let name = header
                    .strip_suffix(']')
                    .filter(|n| !n.is_empty() && !n.contains(['[', ']']))
                    .ok_or_else(|| err("malformed section header"))?;
                unit = unit.section(name);
                continue;
            }
            let (key, value) = line
                .split_once('=')
                .ok_or_else(|| err("expected key=value"))?;
            let key = key.trim();
            if key.is_empty() || key.contains(char::is_whitespace) {
                return Err(err("invalid key"));
            }
            let section = unit
                .sections
                .last_mut()
                .ok_or_else(|| err("entry before first section"))?;
            section
                .entries
                .push((key.to_string(), value.trim().to_string()));
        }
        Ok(unit)
    }
}

fn log_target(config: &KioskConfig, file: &str) -> String {
    format!("append:{}", config.logs.dir.join(file).display())
}

/// `labwc-kiosk.service`: the compositor on tty7 with its own PAM session.
#[must_use]
pub fn labwc_service(config: &KioskConfig, user: &KioskUser) -> UnitFile {
    let log = log_target(config, "labwc.log");
    UnitFile::new()
        .section("Unit")
        .entry("Description", "Kiosk Wayland compositor (labwc)")
        .entry("Wants", "seatd.service")
        .entry("After", "seatd.service systemd-user-sessions.service")
        .section("Service")
        .entry("Type", "simple")
        .entry("User", user.name.as_str())
        .entry("PAMName", "login")
        .entry("TTYPath", "/dev/tty7")
        .entry("StandardInput", "tty-fail")
        .entry("UtmpIdentifier", "tty7")
        .entry(
            "Environment",
            format!("XDG_RUNTIME_DIR={}", user.runtime_dir().display()),
        )
        .entry("Environment", "XDG_SESSION_TYPE=wayland")
        .entry("Environment", "LIBSEAT_BACKEND=seatd")
        .entry("ExecStart", "/usr/bin/labwc")
        .entry("Restart", "always")
        .entry("RestartSec", "3")
        .entry("StandardOutput", log.as_str())
        .entry("StandardError", log)
        .section("Install")
        .entry("WantedBy", "multi-user.target")
}

/// `chromium-kiosk.service`: the supervised browser, bound to the compositor.
#[must_use]
pub fn browser_service(config: &KioskConfig, user: &KioskUser) -> UnitFile {
    let log = log_target(config, "chromium.log");
    UnitFile::new()
        .section("Unit")
        .entry("Description", "Kiosk browser")
        .entry("After", LABWC_UNIT)
        .entry("BindsTo", LABWC_UNIT)
        .section("Service")
        .entry("Type", "simple")
        .entry("User", user.name.as_str())
        .entry(
            "Environment",
            format!("XDG_RUNTIME_DIR={}", user.runtime_dir().display()),
        )
        .entry(
            "Environment",
            format!("WAYLAND_DISPLAY={}", config.browser.wayland_display),
        )
        .entry("ExecStart", LAUNCH_SCRIPT)
        .entry("Restart", "always")
        .entry("RestartSec", "5")
        .entry("StandardOutput", log.as_str())
        .entry("StandardError", log)
        .section("Install")
        .entry("WantedBy", "multi-user.target")
}

/// `kiosk-restart.service`: restart compositor and browser once.
#[must_use]
pub fn restart_service() -> UnitFile {
    UnitFile::new()
        .section("Unit")
        .entry("Description", "Restart the kiosk session")
        .section("Service")
        .entry("Type", "oneshot")
        .entry(
            "ExecStart",
            format!("/bin/systemctl restart {LABWC_UNIT} {BROWSER_UNIT}"),
        )
}

/// `kiosk-restart.timer`: trigger [`restart_service`] on the configured calendar.
#[must_use]
pub fn restart_timer(config: &KioskConfig) -> UnitFile {
    UnitFile::new()
        .section("Unit")
        .entry("Description", "Daily kiosk restart")
        .section("Timer")
        .entry("OnCalendar", config.restart.on_calendar.as_str())
        .entry("Unit", RESTART_UNIT)
        .entry("Persistent", "false")
        .section("Install")
        .entry("WantedBy", "timers.target")
}

/// `getty@tty1.service.d/autologin.conf`: log the kiosk user in on tty1.
#[must_use]
pub fn autologin_dropin(user: &KioskUser) -> UnitFile {
    UnitFile::new()
        .section("Service")
        .entry("ExecStart", "")
        .entry(
            "ExecStart",
            format!(
                "-/sbin/agetty --autologin {} --noclear %I $TERM",
                user.name
            ),
        )
        .entry("Type", "idle")
}
