#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing
)]
//! Integration tests for the `install` command.
//!
//! These run the full task list against a temporary image root, so host
//! commands are not applicable and every generated file lands under the
//! temp directory.

mod common;

use std::any::TypeId;
use std::collections::HashSet;
use std::sync::Arc;

use kiosk_cli::artifacts::units::UnitFile;
use kiosk_cli::cli::InstallOpts;
use kiosk_cli::commands::{install::select_tasks, run_tasks_to_completion};
use kiosk_cli::config::KioskConfig;
use kiosk_cli::logging::Logger;
use kiosk_cli::tasks::{self, Task};

use common::ImageRoot;

fn install(image: &ImageRoot, config: KioskConfig, parallel: bool) {
    let log = Arc::new(Logger::new("install-test"));
    let mut ctx = image.context(config, &log);
    ctx.parallel = parallel;
    let all = tasks::all_install_tasks();
    let selected: Vec<&dyn Task> = all.iter().map(Box::as_ref).collect();
    run_tasks_to_completion(&selected, &ctx, &log).expect("install should succeed");
}

// ---------------------------------------------------------------------------
// Task list
// ---------------------------------------------------------------------------

#[test]
fn install_task_names() {
    let all = tasks::all_install_tasks();
    let names: Vec<&str> = all.iter().map(|t| t.name()).collect();
    insta::assert_snapshot!(names.join("\n"), @r"
    Install packages
    Configure user groups
    Write compositor config
    Write session launcher
    Configure profile fallback
    Patch boot config
    Configure console autologin
    Write helper scripts
    Write browser launcher
    Write systemd units
    Enable kiosk services
    ");
}

#[test]
fn install_task_type_ids_are_unique() {
    let all = tasks::all_install_tasks();
    let ids: HashSet<TypeId> = all.iter().map(|t| t.task_id()).collect();
    assert_eq!(ids.len(), all.len());
}

#[test]
fn only_and_skip_filter_by_name() {
    let all = tasks::all_install_tasks();
    let opts = InstallOpts {
        skip: vec!["fallback".to_string()],
        only: vec!["session".to_string(), "profile".to_string()],
    };
    let names: Vec<&str> = select_tasks(&all, &opts).iter().map(|t| t.name()).collect();
    assert_eq!(names, vec!["Write session launcher"]);
}

// ---------------------------------------------------------------------------
// Full runs against an image root
// ---------------------------------------------------------------------------

#[test]
fn writes_every_managed_file() {
    let image = ImageRoot::new();
    install(&image, KioskConfig::default(), false);

    for path in [
        "home/pi/.config/labwc/rc.xml",
        "home/pi/.config/labwc/autostart",
        "home/pi/.config/labwc/environment",
        "home/pi/.wayland-session",
        "home/pi/.profile",
        "home/pi/kiosk-diagnose.sh",
        "home/pi/kiosk-test.sh",
        "etc/systemd/system/getty@tty1.service.d/autologin.conf",
        "etc/systemd/system/labwc-kiosk.service",
        "etc/systemd/system/chromium-kiosk.service",
        "etc/systemd/system/kiosk-restart.service",
        "etc/systemd/system/kiosk-restart.timer",
        "etc/logrotate.d/kiosk",
        "opt/kiosk/launch-browser.sh",
        "usr/local/bin/kiosk-setup",
    ] {
        assert!(image.path().join(path).is_file(), "{path} not written");
    }
    assert!(image.path().join("var/log/kiosk").is_dir());
}

#[test]
fn second_run_is_a_no_op() {
    let image = ImageRoot::new();
    install(&image, KioskConfig::default(), false);
    let first = image.snapshot();
    install(&image, KioskConfig::default(), false);
    assert_eq!(image.snapshot(), first);
}

#[test]
fn parallel_and_sequential_runs_agree() {
    let sequential = ImageRoot::new();
    let parallel = ImageRoot::new();
    install(&sequential, KioskConfig::default(), false);
    install(&parallel, KioskConfig::default(), true);
    assert_eq!(parallel.snapshot(), sequential.snapshot());
}

#[test]
fn dry_run_changes_nothing() {
    let image = ImageRoot::new();
    let before = image.snapshot();
    let log = Arc::new(Logger::new("install-test"));
    let mut ctx = image.context(KioskConfig::default(), &log);
    ctx.dry_run = true;
    let all = tasks::all_install_tasks();
    let selected: Vec<&dyn Task> = all.iter().map(Box::as_ref).collect();
    run_tasks_to_completion(&selected, &ctx, &log).unwrap();
    assert_eq!(image.snapshot(), before);
}

#[test]
fn config_txt_has_one_line_per_desired_key() {
    let image = ImageRoot::new();
    install(&image, KioskConfig::default(), false);
    install(&image, KioskConfig::default(), false);

    let text = image.read("/boot/firmware/config.txt");
    let active: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.starts_with('#') && l.contains('='))
        .collect();
    for (key, value) in KioskConfig::default().boot.setting_pairs() {
        let lines: Vec<&str> = active
            .iter()
            .copied()
            .filter(|l| l.split('=').next() == Some(key.as_str()))
            .collect();
        assert_eq!(lines, vec![format!("{key}={value}")], "{key}");
    }
    for key in ["hdmi_group", "hdmi_mode"] {
        assert!(
            !active.iter().any(|l| l.starts_with(&format!("{key}="))),
            "{key} still active"
        );
    }
    assert!(text.contains("[cm4]\notg_mode=1\n"));
    assert!(text.ends_with('\n') && !text.ends_with("\n\n"));
    assert_eq!(
        image.read("/boot/firmware/config.txt.kiosk-bak"),
        common::STOCK_CONFIG_TXT
    );
}

#[test]
fn cmdline_stays_on_one_line() {
    let image = ImageRoot::new();
    install(&image, KioskConfig::default(), false);
    let text = image.read("/boot/firmware/cmdline.txt");
    assert_eq!(text.lines().count(), 1);
    for token in ["consoleblank=0", "logo.nologo", "vt.global_cursor_default=0", "rootwait"] {
        assert_eq!(
            text.split_whitespace().filter(|t| *t == token).count(),
            1,
            "{token}"
        );
    }
}

#[test]
fn units_declare_compositor_and_browser_ordering() {
    let image = ImageRoot::new();
    install(&image, KioskConfig::default(), false);

    let labwc =
        UnitFile::parse(&image.read("/etc/systemd/system/labwc-kiosk.service")).unwrap();
    assert_eq!(labwc.values("Unit", "Wants"), vec!["seatd.service"]);
    assert_eq!(
        labwc.values("Unit", "After"),
        vec!["seatd.service systemd-user-sessions.service"]
    );

    let browser =
        UnitFile::parse(&image.read("/etc/systemd/system/chromium-kiosk.service")).unwrap();
    assert_eq!(browser.values("Unit", "After"), vec!["labwc-kiosk.service"]);
    assert_eq!(browser.values("Unit", "BindsTo"), vec!["labwc-kiosk.service"]);
    assert_eq!(
        browser.values("Service", "ExecStart"),
        vec!["/opt/kiosk/launch-browser.sh"]
    );

    let timer = UnitFile::parse(&image.read("/etc/systemd/system/kiosk-restart.timer")).unwrap();
    assert_eq!(timer.values("Timer", "Unit"), vec!["kiosk-restart.service"]);
    UnitFile::parse(&image.read("/etc/systemd/system/kiosk-restart.service")).unwrap();
    UnitFile::parse(&image.read("/etc/systemd/system/getty@tty1.service.d/autologin.conf"))
        .unwrap();
}

#[test]
fn profile_fallback_inserted_once() {
    let image = ImageRoot::new();
    std::fs::write(
        image.path().join("home/pi/.profile"),
        "# ~/.profile\nPATH=\"$HOME/bin:$PATH\"\n",
    )
    .unwrap();

    install(&image, KioskConfig::default(), false);
    install(&image, KioskConfig::default(), false);

    let text = image.read("/home/pi/.profile");
    assert!(text.starts_with("# ~/.profile\nPATH=\"$HOME/bin:$PATH\"\n"));
    assert_eq!(text.matches(".wayland-session").count(), 1);
}

#[test]
fn custom_url_reaches_the_launcher_config() {
    let image = ImageRoot::new();
    let config: KioskConfig = toml::from_str(
        "url = \"https://dashboard.example.org/wall\"\n\
         [browser]\n\
         extra_flags = [\"--force-device-scale-factor=1.5\"]\n",
    )
    .unwrap();
    install(&image, config, false);
    let test_script = image.read("/home/pi/kiosk-test.sh");
    assert!(test_script.contains("https://dashboard.example.org/wall"));
}

#[test]
fn missing_boot_partition_is_skipped_not_failed() {
    let image = ImageRoot::new();
    std::fs::remove_dir_all(image.path().join("boot")).unwrap();
    install(&image, KioskConfig::default(), false);
    assert!(!image.path().join("boot").exists());
}
