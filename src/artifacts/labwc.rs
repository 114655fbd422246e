//! labwc compositor files and the login-shell session fallback.
use std::fmt::Write as _;
use std::path::Path;

use super::{GENERATED_HEADER, LABWC_UNIT, LAUNCH_SCRIPT, shell_quote, xml_escape};
use crate::config::{BrowserConfig, DisplayConfig};

/// Guard substring for the `~/.profile` block.
pub const PROFILE_GUARD: &str = "labwc";

/// Session marker exported by `~/.wayland-session`.
const FALLBACK_MARKER: &str = "KIOSK_SESSION=fallback";

/// `~/.config/labwc/rc.xml`: no decorations, no gaps, only kiosk keybinds.
///
/// `Ctrl+Alt+R` kills the browser (its service restarts it) and
/// `Ctrl+Alt+BackSpace` exits the compositor.
#[must_use]
pub fn rc_xml(browser: &BrowserConfig) -> String {
    let restart = xml_escape(&format!("pkill -f {}", browser.binary));
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!-- Generated by kiosk-setup; local changes are overwritten. -->
<labwc_config>
  <core>
    <decoration>server</decoration>
    <gap>0</gap>
  </core>
  <focus>
    <followMouse>no</followMouse>
  </focus>
  <windowRules>
    <windowRule identifier="chromium*" serverDecoration="no" skipTaskbar="yes" />
  </windowRules>
  <keyboard>
    <keybind key="C-A-r">
      <action name="Execute" command="{restart}" />
    </keybind>
    <keybind key="C-A-BackSpace">
      <action name="Exit" />
    </keybind>
  </keyboard>
</labwc_config>
"#
    )
}

/// `~/.config/labwc/autostart`, sourced by labwc once it is up.
///
/// Backgrounds the output mode command, optional idle blanking, the
/// keep-alive loop and, in a login-shell session, the browser itself.
#[must_use]
pub fn autostart(display: &DisplayConfig, logs_dir: &Path) -> String {
    let output = shell_quote(&display.output);
    let mut out = format!("{GENERATED_HEADER}\n\n");

    let mut randr = format!("wlr-randr --output {output}");
    if let Some(mode) = &display.mode {
        let _ = write!(randr, " --mode {}", shell_quote(mode));
    }
    if let Some(transform) = &display.transform {
        let _ = write!(randr, " --transform {}", shell_quote(transform));
    }
    if display.mode.is_some() || display.transform.is_some() {
        let _ = writeln!(out, "{randr} &\n");
    }

    if display.blank_after_secs > 0 {
        let _ = writeln!(
            out,
            "swayidle -w timeout {} \"wlr-randr --output {output} --off\" \
             resume \"wlr-randr --output {output} --on\" &\n",
            display.blank_after_secs
        );
    }

    if display.keepalive_interval_secs > 0 {
        let _ = writeln!(
            out,
            "# Keep the session from idling.\n\
             (while sleep {}; do wtype -k F24; done) &\n",
            display.keepalive_interval_secs
        );
    }

    let log = shell_quote(&logs_dir.join("chromium.log").display().to_string());
    let _ = writeln!(
        out,
        "# Started from a login shell: no browser service is bound to this compositor.\n\
         if [ \"${{KIOSK_SESSION:-}}\" = fallback ]; then\n\
         \x20 {LAUNCH_SCRIPT} >>{log} 2>&1 &\n\
         fi"
    );
    out
}

/// `~/.config/labwc/environment`.
#[must_use]
pub fn environment() -> String {
    format!(
        "{GENERATED_HEADER}\n\
         XDG_CURRENT_DESKTOP=labwc:wlroots\n\
         XDG_SESSION_TYPE=wayland\n\
         WLR_NO_HARDWARE_CURSORS=1\n"
    )
}

/// `~/.wayland-session`: start labwc from a login shell.
#[must_use]
pub fn wayland_session(logs_dir: &Path) -> String {
    let log = shell_quote(&logs_dir.join("labwc-session.log").display().to_string());
    format!(
        "#!/bin/sh\n\
         {GENERATED_HEADER}\n\
         export XDG_SESSION_TYPE=wayland\n\
         export XDG_RUNTIME_DIR=\"${{XDG_RUNTIME_DIR:-/run/user/$(id -u)}}\"\n\
         export {FALLBACK_MARKER}\n\
         exec labwc >>{log} 2>&1\n"
    )
}

/// Block appended to `~/.profile`: on tty1, start the session when the
/// compositor service is not already running.
#[must_use]
pub fn profile_block() -> String {
    format!(
        "# kiosk: start labwc on tty1 when {LABWC_UNIT} is not running\n\
         if [ -z \"${{WAYLAND_DISPLAY:-}}\" ] && [ \"$(tty)\" = /dev/tty1 ]; then\n\
         \x20 case \"$(systemctl is-active {LABWC_UNIT} 2>/dev/null)\" in\n\
         \x20   active|activating) ;;\n\
         \x20   *) exec \"$HOME/.wayland-session\" ;;\n\
         \x20 esac\n\
         fi\n"
    )
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    /// Check that every opened element is closed in order.
    fn assert_balanced_xml(xml: &str) {
        let mut stack: Vec<String> = Vec::new();
        let mut rest = xml;
        while let Some(start) = rest.find('<') {
            let end = rest[start..].find('>').unwrap() + start;
            let tag = &rest[start + 1..end];
            rest = &rest[end + 1..];
            if tag.starts_with('?') || tag.starts_with('!') || tag.ends_with('/') {
                continue;
            }
            if let Some(name) = tag.strip_prefix('/') {
                assert_eq!(stack.pop().as_deref(), Some(name), "unbalanced </{name}>");
            } else {
                let name = tag.split_whitespace().next().unwrap();
                stack.push(name.to_string());
            }
        }
        assert!(stack.is_empty(), "unclosed elements: {stack:?}");
    }

    #[test]
    fn rc_xml_is_well_formed() {
        let xml = rc_xml(&BrowserConfig::default());
        assert!(xml.starts_with("<?xml"));
        assert_balanced_xml(&xml);
        assert!(xml.contains(r#"command="pkill -f chromium-browser""#));
    }

    #[test]
    fn rc_xml_escapes_binary() {
        let browser = BrowserConfig {
            binary: "/opt/a&b/chrome".to_string(),
            ..BrowserConfig::default()
        };
        let xml = rc_xml(&browser);
        assert!(xml.contains("pkill -f /opt/a&amp;b/chrome"));
        assert_balanced_xml(&xml);
    }

    #[test]
    fn autostart_defaults() {
        let text = autostart(&DisplayConfig::default(), &PathBuf::from("/var/log/kiosk"));
        assert!(text.contains("wlr-randr --output 'HDMI-A-1' --mode '1920x1080@60' &"));
        assert!(!text.contains("swayidle"));
        assert!(text.contains("while sleep 300; do wtype -k F24; done"));
        assert!(text.contains("/opt/kiosk/launch-browser.sh >>'/var/log/kiosk/chromium.log' 2>&1 &"));
    }

    #[test]
    fn autostart_blanking_and_no_keepalive() {
        let display = DisplayConfig {
            transform: Some("90".to_string()),
            blank_after_secs: 600,
            keepalive_interval_secs: 0,
            ..DisplayConfig::default()
        };
        let text = autostart(&display, &PathBuf::from("/var/log/kiosk"));
        assert!(text.contains("--transform '90' &"));
        assert!(text.contains("swayidle -w timeout 600"));
        assert!(!text.contains("wtype"));
    }

    #[test]
    fn autostart_without_mode_skips_randr() {
        let display = DisplayConfig {
            mode: None,
            ..DisplayConfig::default()
        };
        let text = autostart(&display, &PathBuf::from("/var/log/kiosk"));
        assert!(!text.contains("wlr-randr --output 'HDMI-A-1' &"));
        assert!(!text.contains("--mode"));
    }

    #[test]
    fn session_marks_fallback_and_execs_labwc() {
        let text = wayland_session(&PathBuf::from("/var/log/kiosk"));
        assert!(text.starts_with("#!/bin/sh\n"));
        assert!(text.contains("export KIOSK_SESSION=fallback\n"));
        assert!(text.contains("exec labwc >>'/var/log/kiosk/labwc-session.log' 2>&1\n"));
    }

    #[test]
    fn profile_block_contains_guard() {
        let block = profile_block();
        assert!(block.contains(PROFILE_GUARD));
        assert!(block.ends_with("fi\n"));
    }

    #[test]
    fn environment_lines_are_key_value() {
        for line in environment().lines().filter(|l| !l.starts_with('#')) {
            assert!(line.contains('='), "{line}");
        }
    }
}
