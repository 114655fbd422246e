//! Filesystem helpers shared by file-backed resources.
use anyhow::{Context as _, Result};
use sha2::{Digest as _, Sha256};
use std::os::unix::fs::PermissionsExt as _;
use std::path::{Path, PathBuf};

/// Numeric owner applied to files written into the kiosk user's home.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owner {
    /// User ID.
    pub uid: u32,
    /// Group ID.
    pub gid: u32,
}

/// Create `dir` and any missing ancestors, handing newly created directories
/// to `owner` when given.
///
/// Directories that already exist are left untouched.
///
/// # Errors
///
/// Returns an error if a directory cannot be created or chowned.
pub fn create_dirs(dir: &Path, owner: Option<Owner>) -> Result<()> {
    let missing: Vec<PathBuf> = dir
        .ancestors()
        .take_while(|p| !p.as_os_str().is_empty() && !p.exists())
        .map(Path::to_path_buf)
        .collect();
    for path in missing.iter().rev() {
        std::fs::create_dir(path)
            .or_else(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    Ok(())
                } else {
                    Err(e)
                }
            })
            .with_context(|| format!("creating directory {}", path.display()))?;
        if let Some(owner) = owner {
            chown(path, owner)?;
        }
    }
    Ok(())
}

/// Write `contents` to `path` atomically: a sibling temp file is written,
/// given `mode` and `owner`, then renamed over the target.
///
/// # Errors
///
/// Returns an error if the parent directory cannot be created, or if the
/// temp file cannot be written, chmodded, chowned or renamed.
pub fn write_atomic(path: &Path, contents: &[u8], mode: u32, owner: Option<Owner>) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("{} has no parent directory", path.display()))?;
    create_dirs(parent, owner)?;

    let file_name = path
        .file_name()
        .with_context(|| format!("{} has no file name", path.display()))?;
    let tmp = parent.join(format!(".{}.kiosk-tmp", file_name.to_string_lossy()));

    let staged = stage(&tmp, contents, mode, owner).and_then(|()| rename_into_place(&tmp, path));
    discard_on_error(&tmp, staged)
}

fn stage(tmp: &Path, contents: &[u8], mode: u32, owner: Option<Owner>) -> Result<()> {
    std::fs::write(tmp, contents).with_context(|| format!("writing {}", tmp.display()))?;
    std::fs::set_permissions(tmp, std::fs::Permissions::from_mode(mode))
        .with_context(|| format!("setting mode {mode:o} on {}", tmp.display()))?;
    if let Some(owner) = owner {
        chown(tmp, owner)?;
    }
    Ok(())
}

fn rename_into_place(tmp: &Path, path: &Path) -> Result<()> {
    std::fs::rename(tmp, path)
        .with_context(|| format!("renaming {} to {}", tmp.display(), path.display()))
}

/// Remove the temp file when staging or renaming failed.
fn discard_on_error(tmp: &Path, result: Result<()>) -> Result<()> {
    if result.is_err() {
        let _ = std::fs::remove_file(tmp);
    }
    result
}

/// Replace the contents of an existing file via temp file and rename,
/// leaving permission bits and ownership alone.
///
/// Used for files on the FAT boot partition, where `chmod` is rejected.
///
/// # Errors
///
/// Returns an error if the temp file cannot be written or renamed.
pub fn replace_contents(path: &Path, contents: &[u8]) -> Result<()> {
    let tmp = path.with_extension("kiosk-tmp");
    let staged = std::fs::write(&tmp, contents)
        .with_context(|| format!("writing {}", tmp.display()))
        .and_then(|()| rename_into_place(&tmp, path));
    discard_on_error(&tmp, staged)
}

/// Copy `path` to `<path>.kiosk-bak` unless a backup already exists.
///
/// The first backup is the pristine file; later runs never overwrite it.
///
/// # Errors
///
/// Returns an error if the copy fails.
pub fn backup_once(path: &Path) -> Result<()> {
    let mut backup = path.as_os_str().to_owned();
    backup.push(".kiosk-bak");
    let backup = PathBuf::from(backup);
    if backup.exists() {
        return Ok(());
    }
    std::fs::copy(path, &backup)
        .map(|_| ())
        .with_context(|| format!("backing up {} to {}", path.display(), backup.display()))
}

/// Change ownership of `path`.
///
/// # Errors
///
/// Returns an error if the `chown` system call fails.
pub fn chown(path: &Path, owner: Owner) -> Result<()> {
    std::os::unix::fs::chown(path, Some(owner.uid), Some(owner.gid))
        .with_context(|| format!("chown {}:{} {}", owner.uid, owner.gid, path.display()))
}

/// Permission bits (without the file type) of `path`, if it exists.
#[must_use]
pub fn mode_of(path: &Path) -> Option<u32> {
    std::fs::metadata(path)
        .ok()
        .map(|m| m.permissions().mode() & 0o7777)
}

/// First 12 hex digits of the SHA-256 of `bytes`, used to describe drift.
#[must_use]
pub fn short_digest(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest
        .iter()
        .take(6)
        .map(|b| format!("{b:02x}"))
        .collect()
}
