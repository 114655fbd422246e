//! Host detection: Raspberry Pi model and boot partition layout.
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Boot partition mount point on Bookworm and later.
const FIRMWARE_DIR: &str = "/boot/firmware";

/// Boot partition mount point before Bookworm.
const LEGACY_BOOT_DIR: &str = "/boot";

/// Information about the host being provisioned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    /// Board model from the device tree, e.g. `Raspberry Pi 4 Model B Rev 1.4`.
    pub model: Option<String>,
}

impl Platform {
    /// Detect the platform under `root`.
    #[must_use]
    pub fn detect(root: &Path) -> Self {
        let model = std::fs::read(under_root(root, Path::new("/proc/device-tree/model")))
            .ok()
            .map(|bytes| {
                String::from_utf8_lossy(&bytes)
                    .trim_end_matches('\0')
                    .trim()
                    .to_string()
            })
            .filter(|m| !m.is_empty());
        Self { model }
    }

    /// Whether the device tree names a Raspberry Pi.
    #[must_use]
    pub fn is_raspberry_pi(&self) -> bool {
        self.model
            .as_deref()
            .is_some_and(|m| m.starts_with("Raspberry Pi"))
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.model {
            Some(model) => f.write_str(model),
            None => f.write_str("unknown board"),
        }
    }
}

/// Re-anchor an absolute `path` under `root`.
///
/// ```
/// use kiosk_cli::platform::under_root;
/// use std::path::Path;
///
/// assert_eq!(under_root(Path::new("/"), Path::new("/etc/x")), Path::new("/etc/x"));
/// assert_eq!(
///     under_root(Path::new("/mnt/img"), Path::new("/etc/x")),
///     Path::new("/mnt/img/etc/x")
/// );
/// ```
#[must_use]
pub fn under_root(root: &Path, path: &Path) -> PathBuf {
    let relative: PathBuf = path
        .components()
        .filter(|c| !matches!(c, Component::RootDir | Component::Prefix(_)))
        .collect();
    root.join(relative)
}

/// Resolve a boot file, falling back to the pre-Bookworm `/boot` layout.
///
/// `configured` is returned (re-anchored under `root`) when it exists or
/// when no legacy counterpart exists either; the caller then reports the
/// file as missing.
#[must_use]
pub fn resolve_boot_file(root: &Path, configured: &Path) -> PathBuf {
    let primary = under_root(root, configured);
    if primary.exists() {
        return primary;
    }
    if let Ok(rest) = configured.strip_prefix(FIRMWARE_DIR) {
        let legacy = under_root(root, &Path::new(LEGACY_BOOT_DIR).join(rest));
        if legacy.exists() {
            return legacy;
        }
    }
    primary
}
