//! Renderers for every file the kiosk owns.
//!
//! Each function is pure: it takes configuration and returns file content,
//! leaving placement and permissions to the tasks.
pub mod labwc;
pub mod logrotate;
pub mod scripts;
pub mod units;

/// First line of every generated shell or config file.
pub const GENERATED_HEADER: &str = "# Generated by kiosk-setup; local changes are overwritten.";

/// Browser launch script started by `chromium-kiosk.service`.
pub const LAUNCH_SCRIPT: &str = "/opt/kiosk/launch-browser.sh";

/// Where the running binary is copied for the launch script.
pub const INSTALLED_BINARY: &str = "/usr/local/bin/kiosk-setup";

/// Directory for generated system units.
pub const SYSTEMD_DIR: &str = "/etc/systemd/system";

/// Compositor service.
pub const LABWC_UNIT: &str = "labwc-kiosk.service";

/// Browser service.
pub const BROWSER_UNIT: &str = "chromium-kiosk.service";

/// Oneshot that restarts the kiosk services.
pub const RESTART_UNIT: &str = "kiosk-restart.service";

/// Timer that triggers [`RESTART_UNIT`].
pub const RESTART_TIMER: &str = "kiosk-restart.timer";

/// Console autologin drop-in.
pub const AUTOLOGIN_DROPIN: &str = "/etc/systemd/system/getty@tty1.service.d/autologin.conf";

/// logrotate rule for the kiosk logs.
pub const LOGROTATE_RULE: &str = "/etc/logrotate.d/kiosk";

/// Quote `value` for POSIX `sh`.
///
/// ```
/// use kiosk_cli::artifacts::shell_quote;
///
/// assert_eq!(shell_quote("https://example.com/?a=1&b=2"), "'https://example.com/?a=1&b=2'");
/// assert_eq!(shell_quote("it's"), r"'it'\''s'");
/// ```
#[must_use]
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Escape text for use in XML attribute values and character data.
#[must_use]
pub fn xml_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xml_escape_replaces_markup() {
        assert_eq!(
            xml_escape(r#"pkill -f "a<b>" & 'c'"#),
            "pkill -f &quot;a&lt;b&gt;&quot; &amp; &apos;c&apos;"
        );
    }

    #[test]
    fn shell_quote_plain() {
        assert_eq!(shell_quote("chromium-browser"), "'chromium-browser'");
    }
}
