//! Desired-state descriptor (`kiosk.toml`).
//!
//! Every field has a default, so a missing or empty file describes the
//! stock kiosk.
pub mod toml_loader;
pub mod validation;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::resources::boot_config;

/// Default location of the descriptor.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/kiosk/kiosk.toml";

/// Top-level kiosk configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KioskConfig {
    /// Kiosk user; falls back to `--user`, then `$SUDO_USER`.
    pub user: Option<String>,
    /// Page shown by the browser.
    pub url: String,
    /// Packages to install with apt.
    pub packages: Vec<String>,
    /// System groups to create if absent.
    pub create_groups: Vec<String>,
    /// Supplementary groups for the kiosk user.
    pub groups: Vec<String>,
    /// Output settings.
    pub display: DisplayConfig,
    /// Browser and supervisor settings.
    pub browser: BrowserConfig,
    /// Firmware boot files.
    pub boot: BootConfig,
    /// Nightly restart timer.
    pub restart: RestartConfig,
    /// Kiosk service logs.
    pub logs: LogsConfig,
}

impl Default for KioskConfig {
    fn default() -> Self {
        Self {
            user: None,
            url: "https://example.com".to_string(),
            packages: strings(&[
                "labwc",
                "seatd",
                "wlr-randr",
                "swayidle",
                "wtype",
                "chromium-browser",
            ]),
            create_groups: strings(&["seat"]),
            groups: strings(&["video", "render", "input", "seat"]),
            display: DisplayConfig::default(),
            browser: BrowserConfig::default(),
            boot: BootConfig::default(),
            restart: RestartConfig::default(),
            logs: LogsConfig::default(),
        }
    }
}

impl KioskConfig {
    /// Load the descriptor at `path`; a missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        toml_loader::load_config(path)
            .with_context(|| format!("loading kiosk config from {}", path.display()))
    }
}

/// `[display]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DisplayConfig {
    /// wlr output name.
    pub output: String,
    /// Mode passed to `wlr-randr --mode`, e.g. `1920x1080@60`.
    pub mode: Option<String>,
    /// Output transform (`normal`, `90`, `180`, `270`, `flipped*`).
    pub transform: Option<String>,
    /// Blank the screen after this many idle seconds; 0 disables.
    pub blank_after_secs: u64,
    /// Send a synthetic keypress this often; 0 disables.
    pub keepalive_interval_secs: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            output: "HDMI-A-1".to_string(),
            mode: Some("1920x1080@60".to_string()),
            transform: None,
            blank_after_secs: 0,
            keepalive_interval_secs: 300,
        }
    }
}

/// `[browser]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrowserConfig {
    /// Browser executable.
    pub binary: String,
    /// Flags appended after the fixed kiosk flags.
    pub extra_flags: Vec<String>,
    /// Wayland socket name under `$XDG_RUNTIME_DIR`.
    pub wayland_display: String,
    /// How long to wait for the display socket.
    pub socket_timeout_secs: u64,
    /// Socket poll interval.
    pub poll_interval_ms: u64,
    /// A run shorter than this counts as a crash.
    pub grace_period_secs: u64,
    /// Maximum number of launches.
    pub max_attempts: u32,
    /// Pause between crash and relaunch.
    pub retry_backoff_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            binary: "chromium-browser".to_string(),
            extra_flags: Vec::new(),
            wayland_display: "wayland-0".to_string(),
            socket_timeout_secs: 30,
            poll_interval_ms: 500,
            grace_period_secs: 10,
            max_attempts: 5,
            retry_backoff_secs: 5,
        }
    }
}

/// A `config.txt` value; TOML integers are accepted for convenience.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum BootValue {
    /// Quoted value.
    Text(String),
    /// Bare integer.
    Integer(i64),
}

impl fmt::Display for BootValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Integer(i) => write!(f, "{i}"),
        }
    }
}

/// `[boot]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BootConfig {
    /// Firmware config path.
    pub config_txt: PathBuf,
    /// Kernel command line path.
    pub cmdline_txt: PathBuf,
    /// Keys to comment out.
    pub suppress: Vec<String>,
    /// Tokens asserted on the kernel command line.
    pub cmdline: Vec<String>,
    /// Keys asserted in `config.txt`, appended in key order when absent.
    pub settings: BTreeMap<String, BootValue>,
}

impl Default for BootConfig {
    fn default() -> Self {
        let settings = [
            ("disable_overscan", 1),
            ("hdmi_force_hotplug", 1),
            ("max_framebuffers", 2),
            ("disable_splash", 1),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), BootValue::Integer(v)))
        .collect();
        Self {
            config_txt: PathBuf::from("/boot/firmware/config.txt"),
            cmdline_txt: PathBuf::from("/boot/firmware/cmdline.txt"),
            suppress: strings(&["hdmi_group", "hdmi_mode"]),
            cmdline: strings(&["consoleblank=0", "logo.nologo", "vt.global_cursor_default=0"]),
            settings,
        }
    }
}

impl BootConfig {
    /// Settings as `(key, value)` string pairs.
    ///
    /// Keys and values that cannot be written as one matchable
    /// `config.txt` line are left out; validation reports them.
    #[must_use]
    pub fn setting_pairs(&self) -> Vec<(String, String)> {
        self.settings
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .filter(|(k, v)| boot_config::is_valid_key(k) && boot_config::is_valid_value(v))
            .collect()
    }
}

/// `[restart]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RestartConfig {
    /// Install the nightly restart timer.
    pub enabled: bool,
    /// systemd `OnCalendar=` expression.
    pub on_calendar: String,
}

impl Default for RestartConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            on_calendar: "*-*-* 04:00:00".to_string(),
        }
    }
}

/// `[logs]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogsConfig {
    /// Directory for compositor and browser logs.
    pub dir: PathBuf,
    /// Days of rotated logs to keep.
    pub rotate_days: u32,
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("/var/log/kiosk"),
            rotate_days: 7,
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        let config: KioskConfig = toml::from_str("").unwrap();
        assert_eq!(config, KioskConfig::default());
    }

    #[test]
    fn missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = KioskConfig::load(&dir.path().join("kiosk.toml")).unwrap();
        assert_eq!(config, KioskConfig::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: KioskConfig = toml::from_str(
            r#"
            url = "https://dashboard.local"
            [browser]
            max_attempts = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.url, "https://dashboard.local");
        assert_eq!(config.browser.max_attempts, 3);
        assert_eq!(config.browser.grace_period_secs, 10);
        assert_eq!(config.display.output, "HDMI-A-1");
    }

    #[test]
    fn boot_settings_accept_strings_and_integers() {
        let config: KioskConfig = toml::from_str(
            r#"
            [boot.settings]
            gpu_mem = 128
            dtoverlay = "vc4-kms-v3d"
            "#,
        )
        .unwrap();
        assert_eq!(
            config.boot.setting_pairs(),
            vec![
                ("dtoverlay".to_string(), "vc4-kms-v3d".to_string()),
                ("gpu_mem".to_string(), "128".to_string()),
            ]
        );
    }

    #[test]
    fn default_boot_settings() {
        let pairs = BootConfig::default().setting_pairs();
        assert!(pairs.contains(&("hdmi_force_hotplug".to_string(), "1".to_string())));
        assert!(pairs.contains(&("max_framebuffers".to_string(), "2".to_string())));
        assert_eq!(pairs.len(), 4);
    }

    #[test]
    fn setting_pairs_skip_unwritable_entries() {
        let config: KioskConfig = toml::from_str(
            r#"
            [boot.settings]
            "dtparam=audio" = "on"
            disable_splash = "1\nhdmi_mode=4"
            gpu_mem = 128
            "#,
        )
        .unwrap();
        assert_eq!(
            config.boot.setting_pairs(),
            vec![("gpu_mem".to_string(), "128".to_string())]
        );
    }

    #[test]
    fn unknown_field_is_rejected() {
        let result: Result<KioskConfig, _> = toml::from_str("ulr = \"typo\"");
        assert!(result.is_err());
    }

    #[test]
    fn invalid_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kiosk.toml");
        std::fs::write(&path, "url = [").unwrap();
        let err = KioskConfig::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("kiosk.toml"));
    }
}
