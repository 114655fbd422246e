//! Non-fatal configuration checks, reported before any task runs.
use super::{BootConfig, BrowserConfig, DisplayConfig, KioskConfig};
use crate::resources::boot_config::{is_valid_key, is_valid_value};

/// Transforms understood by `wlr-randr --transform`.
const VALID_TRANSFORMS: &[&str] = &[
    "normal",
    "90",
    "180",
    "270",
    "flipped",
    "flipped-90",
    "flipped-180",
    "flipped-270",
];

/// A validation warning detected during configuration loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// The configuration section (e.g. "browser", "boot").
    pub source: String,
    /// The specific key that triggered the warning.
    pub item: String,
    /// Human-readable warning message.
    pub message: String,
}

impl ValidationWarning {
    /// Create a new warning.
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        item: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            item: item.into(),
            message: message.into(),
        }
    }
}

/// Trait for configuration validators.
pub trait ConfigValidator {
    /// Validate the configuration and return any warnings found.
    fn validate(&self) -> Vec<ValidationWarning>;
}

/// Top-level keys: `url`, `packages`, `groups`.
#[derive(Debug)]
pub struct GeneralValidator<'a> {
    config: &'a KioskConfig,
}

impl ConfigValidator for GeneralValidator<'_> {
    fn validate(&self) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        let url = self.config.url.trim();
        if url.is_empty() {
            warnings.push(ValidationWarning::new("kiosk", "url", "url is empty"));
        } else if !url.contains("://") {
            warnings.push(ValidationWarning::new(
                "kiosk",
                "url",
                format!("'{url}' has no scheme (e.g. https://)"),
            ));
        }
        if self.config.packages.is_empty() {
            warnings.push(ValidationWarning::new(
                "kiosk",
                "packages",
                "package list is empty; nothing will be installed",
            ));
        }
        for group in &self.config.create_groups {
            if !self.config.groups.contains(group) {
                warnings.push(ValidationWarning::new(
                    "kiosk",
                    group,
                    "group is created but the kiosk user is not added to it",
                ));
            }
        }
        warnings
    }
}

/// `[browser]` timings.
#[derive(Debug)]
pub struct BrowserValidator<'a> {
    browser: &'a BrowserConfig,
}

impl ConfigValidator for BrowserValidator<'_> {
    fn validate(&self) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        if self.browser.max_attempts == 0 {
            warnings.push(ValidationWarning::new(
                "browser",
                "max_attempts",
                "max_attempts is 0; the browser will never be launched",
            ));
        }
        if self.browser.poll_interval_ms == 0 {
            warnings.push(ValidationWarning::new(
                "browser",
                "poll_interval_ms",
                "poll_interval_ms is 0; the socket wait will busy-loop",
            ));
        }
        if self.browser.binary.trim().is_empty() {
            warnings.push(ValidationWarning::new(
                "browser",
                "binary",
                "browser binary is empty",
            ));
        }
        warnings
    }
}

/// `[boot]` keys and tokens.
#[derive(Debug)]
pub struct BootValidator<'a> {
    boot: &'a BootConfig,
}

impl ConfigValidator for BootValidator<'_> {
    fn validate(&self) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        for (key, value) in &self.boot.settings {
            if !is_valid_key(key) {
                warnings.push(ValidationWarning::new(
                    "boot.settings",
                    key,
                    "key must not be empty or contain '=', '#' or whitespace; ignored",
                ));
            } else if !is_valid_value(&value.to_string()) {
                warnings.push(ValidationWarning::new(
                    "boot.settings",
                    key,
                    "value must not contain a line break; ignored",
                ));
            }
            if self.boot.suppress.contains(key) {
                warnings.push(ValidationWarning::new(
                    "boot",
                    key,
                    "key is both set and suppressed; it will be set",
                ));
            }
        }
        for key in &self.boot.suppress {
            if !is_valid_key(key) {
                warnings.push(ValidationWarning::new(
                    "boot.suppress",
                    key,
                    "key must not be empty or contain '=', '#' or whitespace",
                ));
            }
        }
        for token in &self.boot.cmdline {
            if token.is_empty() || token.contains(char::is_whitespace) {
                warnings.push(ValidationWarning::new(
                    "boot.cmdline",
                    token,
                    "token must be a single non-empty word",
                ));
            }
        }
        warnings
    }
}

/// `[display]` values.
#[derive(Debug)]
pub struct DisplayValidator<'a> {
    display: &'a DisplayConfig,
}

impl ConfigValidator for DisplayValidator<'_> {
    fn validate(&self) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();
        if let Some(transform) = &self.display.transform
            && !VALID_TRANSFORMS.contains(&transform.as_str())
        {
            warnings.push(ValidationWarning::new(
                "display",
                "transform",
                format!(
                    "'{transform}' is not one of {}",
                    VALID_TRANSFORMS.join(", ")
                ),
            ));
        }
        if self.display.output.trim().is_empty() {
            warnings.push(ValidationWarning::new(
                "display",
                "output",
                "output name is empty",
            ));
        }
        warnings
    }
}

/// Run every validator over `config`.
#[must_use]
pub fn validate_all(config: &KioskConfig) -> Vec<ValidationWarning> {
    let validators: [&dyn ConfigValidator; 4] = [
        &GeneralValidator { config },
        &BrowserValidator {
            browser: &config.browser,
        },
        &BootValidator { boot: &config.boot },
        &DisplayValidator {
            display: &config.display,
        },
    ];
    validators.iter().flat_map(|v| v.validate()).collect()
}
