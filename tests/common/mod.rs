// Shared helpers for integration tests.
//
// Provides a temporary image root with a stock Raspberry Pi OS boot
// partition, and a context for provisioning it, so each integration test
// runs against an isolated filesystem without repeating setup.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use kiosk_cli::config::KioskConfig;
use kiosk_cli::exec::{ExecResult, Executor};
use kiosk_cli::logging::{Log, Logger};
use kiosk_cli::platform::Platform;
use kiosk_cli::tasks::Context;
use kiosk_cli::user::KioskUser;

/// Stock `config.txt` from Raspberry Pi OS Bookworm (trimmed).
pub const STOCK_CONFIG_TXT: &str = "\
# For more options and information see
# http://rptl.io/configtxt
dtparam=audio=on
#hdmi_force_hotplug=1
hdmi_group=1
hdmi_mode=16
camera_auto_detect=1
display_auto_detect=1
dtoverlay=vc4-kms-v3d
max_framebuffers=2

[cm4]
otg_mode=1

[all]
";

/// Stock `cmdline.txt`.
pub const STOCK_CMDLINE_TXT: &str = "console=serial0,115200 console=tty1 root=PARTUUID=4e639091-02 rootfstype=ext4 fsck.repair=yes rootwait quiet splash\n";

/// Executor for image roots: no host command may run.
#[derive(Debug, Default)]
pub struct NoCommands;

impl Executor for NoCommands {
    fn run(&self, program: &str, _: &[&str]) -> anyhow::Result<ExecResult> {
        anyhow::bail!("unexpected command: {program}")
    }

    fn run_with_env(
        &self,
        program: &str,
        _: &[&str],
        _: &[(&str, &str)],
    ) -> anyhow::Result<ExecResult> {
        anyhow::bail!("unexpected command: {program}")
    }

    fn run_unchecked(&self, program: &str, _: &[&str]) -> anyhow::Result<ExecResult> {
        anyhow::bail!("unexpected command: {program}")
    }

    fn which(&self, _: &str) -> bool {
        false
    }
}

/// A mounted-image stand-in backed by a [`tempfile::TempDir`].
pub struct ImageRoot {
    /// Temporary directory acting as `/`.
    pub dir: tempfile::TempDir,
}

impl ImageRoot {
    /// An image with a boot partition and an empty home for `pi`.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let boot = dir.path().join("boot/firmware");
        std::fs::create_dir_all(&boot).expect("create boot dir");
        std::fs::write(boot.join("config.txt"), STOCK_CONFIG_TXT).expect("write config.txt");
        std::fs::write(boot.join("cmdline.txt"), STOCK_CMDLINE_TXT).expect("write cmdline.txt");
        std::fs::create_dir_all(dir.path().join("home/pi")).expect("create home");
        Self { dir }
    }

    /// Path to the image root.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Read a file by its path on the booted image.
    pub fn read(&self, live: &str) -> String {
        let path = self.path().join(live.trim_start_matches('/'));
        std::fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("reading {}: {e}", path.display()))
    }

    /// Context for provisioning this image with `config`.
    ///
    /// The kiosk user is owned by the test process so `chown` needs no
    /// privileges.
    pub fn context(&self, config: KioskConfig, log: &Arc<Logger>) -> Context {
        Context {
            config: Arc::new(config),
            config_path: PathBuf::from("/etc/kiosk/kiosk.toml"),
            platform: Arc::new(Platform {
                model: Some("Raspberry Pi 5 Model B Rev 1.0".to_string()),
            }),
            user: Arc::new(KioskUser {
                name: "pi".to_string(),
                uid: nix::unistd::getuid().as_raw(),
                gid: nix::unistd::getgid().as_raw(),
                home: PathBuf::from("/home/pi"),
            }),
            log: Arc::clone(log) as Arc<dyn Log>,
            dry_run: false,
            root: self.path().to_path_buf(),
            executor: Arc::new(NoCommands),
            parallel: false,
        }
    }

    /// Every regular file under the root, keyed by relative path.
    ///
    /// The installed binary copy is left out; its bytes are the test
    /// executable.
    pub fn snapshot(&self) -> BTreeMap<PathBuf, Vec<u8>> {
        let mut files = BTreeMap::new();
        collect(self.path(), self.path(), &mut files);
        files.remove(Path::new("usr/local/bin/kiosk-setup"));
        files
    }
}

fn collect(root: &Path, dir: &Path, out: &mut BTreeMap<PathBuf, Vec<u8>>) {
    for entry in std::fs::read_dir(dir).expect("read dir") {
        let path = entry.expect("dir entry").path();
        if path.is_dir() {
            collect(root, &path, out);
        } else {
            let rel = path.strip_prefix(root).expect("under root").to_path_buf();
            out.insert(rel, std::fs::read(&path).expect("read file"));
        }
    }
}
