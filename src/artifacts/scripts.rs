//! Helper scripts: diagnostics, manual browser test and the service launcher.
use std::fmt::Write as _;
use std::path::Path;

use super::{
    BROWSER_UNIT, GENERATED_HEADER, INSTALLED_BINARY, LABWC_UNIT, RESTART_TIMER, shell_quote,
};
use crate::config::KioskConfig;
use crate::user::KioskUser;

/// `/opt/kiosk/launch-browser.sh`: export the Wayland environment and hand
/// over to `kiosk-setup supervise`.
#[must_use]
pub fn launch_script(config: &KioskConfig, user: &KioskUser, config_path: &Path) -> String {
    format!(
        "#!/bin/sh\n\
         {GENERATED_HEADER}\n\
         export XDG_RUNTIME_DIR=\"${{XDG_RUNTIME_DIR:-{runtime}}}\"\n\
         export WAYLAND_DISPLAY=\"${{WAYLAND_DISPLAY:-{display}}}\"\n\
         exec {INSTALLED_BINARY} --config {config} supervise\n",
        runtime = user.runtime_dir().display(),
        display = config.browser.wayland_display,
        config = shell_quote(&config_path.display().to_string()),
    )
}

/// `~/kiosk-test.sh`: stop the browser service and open the URL once in a
/// normal window on the running compositor.
#[must_use]
pub fn test_script(config: &KioskConfig) -> String {
    format!(
        "#!/bin/sh\n\
         {GENERATED_HEADER}\n\
         # Usage: ~/kiosk-test.sh [URL]\n\
         set -eu\n\
         URL=\"${{1:-{url}}}\"\n\
         export XDG_RUNTIME_DIR=\"${{XDG_RUNTIME_DIR:-/run/user/$(id -u)}}\"\n\
         export WAYLAND_DISPLAY=\"${{WAYLAND_DISPLAY:-{display}}}\"\n\
         if [ ! -S \"$XDG_RUNTIME_DIR/$WAYLAND_DISPLAY\" ]; then\n\
         \x20 echo \"no Wayland socket at $XDG_RUNTIME_DIR/$WAYLAND_DISPLAY; is labwc running?\" >&2\n\
         \x20 exit 1\n\
         fi\n\
         sudo systemctl stop {BROWSER_UNIT} 2>/dev/null || true\n\
         pkill -f {binary} 2>/dev/null || true\n\
         sleep 1\n\
         exec {binary} --ozone-platform=wayland --no-first-run \"$URL\"\n",
        url = config.url.replace(['"', '`', '$', '\\'], ""),
        display = config.browser.wayland_display,
        binary = shell_quote(&config.browser.binary),
    )
}

/// `~/kiosk-diagnose.sh`: print everything useful for a support request.
#[must_use]
pub fn diagnose_script(config: &KioskConfig, user: &KioskUser, config_txt: &Path) -> String {
    let mut out = format!(
        "#!/bin/sh\n\
         {GENERATED_HEADER}\n\
         section() {{ printf '\\n=== %s ===\\n' \"$1\"; }}\n\n\
         section board\n\
         tr -d '\\0' </proc/device-tree/model 2>/dev/null; echo\n\
         uname -a\n\
         uptime\n\n\
         section user\n\
         id {user}\n\n\
         section services\n",
        user = shell_quote(&user.name)
    );
    for unit in ["seatd.service", LABWC_UNIT, BROWSER_UNIT, RESTART_TIMER] {
        let _ = writeln!(
            out,
            "printf '%-28s %-10s %s\\n' {unit} \"$(systemctl is-enabled {unit} 2>&1)\" \"$(systemctl is-active {unit} 2>&1)\""
        );
    }
    let _ = write!(
        out,
        "\nsection display\n\
         ls -l {runtime}/{display} 2>&1\n\
         WAYLAND_DISPLAY={display} XDG_RUNTIME_DIR={runtime} wlr-randr 2>&1 | head -n 20\n\n\
         section boot\n\
         grep -Ev '^[[:space:]]*(#|$)' {config_txt}\n\n\
         section logs\n\
         for f in {logs}/*.log; do\n\
         \x20 [ -f \"$f\" ] || continue\n\
         \x20 echo \"--- $f\"\n\
         \x20 tail -n 20 \"$f\"\n\
         done\n\
         journalctl -b -u {LABWC_UNIT} -u {BROWSER_UNIT} --no-pager -n 40 2>&1\n",
        runtime = user.runtime_dir().display(),
        display = config.browser.wayland_display,
        config_txt = shell_quote(&config_txt.display().to_string()),
        logs = config.logs.dir.display(),
    );
    out
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn user() -> KioskUser {
        KioskUser {
            name: "pi".to_string(),
            uid: 1000,
            gid: 1000,
            home: PathBuf::from("/home/pi"),
        }
    }

    #[test]
    fn launch_script_execs_supervisor() {
        let text = launch_script(
            &KioskConfig::default(),
            &user(),
            Path::new("/etc/kiosk/kiosk.toml"),
        );
        assert!(text.starts_with("#!/bin/sh\n"));
        assert!(text.contains("XDG_RUNTIME_DIR:-/run/user/1000"));
        assert!(text.contains("WAYLAND_DISPLAY:-wayland-0"));
        assert!(text.ends_with(
            "exec /usr/local/bin/kiosk-setup --config '/etc/kiosk/kiosk.toml' supervise\n"
        ));
    }

    #[test]
    fn test_script_uses_configured_url_and_binary() {
        let config = KioskConfig {
            url: "https://status.local/$(boom)".to_string(),
            ..KioskConfig::default()
        };
        let text = test_script(&config);
        assert!(text.contains("URL=\"${1:-https://status.local/(boom)}\""));
        assert!(text.contains("exec 'chromium-browser' --ozone-platform=wayland"));
        assert!(text.contains("systemctl stop chromium-kiosk.service"));
    }

    #[test]
    fn diagnose_script_covers_units_and_logs() {
        let text = diagnose_script(
            &KioskConfig::default(),
            &user(),
            Path::new("/boot/firmware/config.txt"),
        );
        for unit in [LABWC_UNIT, BROWSER_UNIT, RESTART_TIMER, "seatd.service"] {
            assert!(text.contains(&format!("systemctl is-active {unit}")), "{unit}");
        }
        assert!(text.contains("for f in /var/log/kiosk/*.log; do"));
        assert!(text.contains("grep -Ev '^[[:space:]]*(#|$)' '/boot/firmware/config.txt'"));
        assert!(text.contains("id 'pi'"));
    }
}
