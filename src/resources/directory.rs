//! Directory that must exist with a given owner.
use anyhow::{Context as _, Result};
use std::os::unix::fs::MetadataExt as _;
use std::path::PathBuf;

use super::fs::{Owner, chown, create_dirs};
use super::{Applicable, Resource, ResourceChange, ResourceState};

/// A directory such as the kiosk log directory, writable by the kiosk user.
#[derive(Debug, Clone)]
pub struct DirectoryResource {
    /// Absolute path (already prefixed with the provisioning root).
    pub path: PathBuf,
    /// Required owner, if any.
    pub owner: Option<Owner>,
}

impl DirectoryResource {
    #[must_use]
    pub const fn new(path: PathBuf, owner: Option<Owner>) -> Self {
        Self { path, owner }
    }
}

impl Applicable for DirectoryResource {
    fn description(&self) -> String {
        format!("{}/", self.path.display())
    }

    fn apply(&self) -> Result<ResourceChange> {
        create_dirs(&self.path, self.owner)?;
        if let Some(owner) = self.owner {
            chown(&self.path, owner)?;
        }
        Ok(ResourceChange::Applied)
    }
}

impl Resource for DirectoryResource {
    fn current_state(&self) -> Result<ResourceState> {
        let meta = match std::fs::metadata(&self.path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ResourceState::Missing);
            }
            Err(e) => {
                return Err(e).with_context(|| format!("inspecting {}", self.path.display()));
            }
        };
        if !meta.is_dir() {
            return Ok(ResourceState::Invalid {
                reason: "exists and is not a directory".to_string(),
            });
        }
        match self.owner {
            Some(owner) if meta.uid() != owner.uid || meta.gid() != owner.gid => {
                Ok(ResourceState::Incorrect {
                    current: format!("owned by {}:{}", meta.uid(), meta.gid()),
                })
            }
            _ => Ok(ResourceState::Correct),
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn me() -> Owner {
        Owner {
            uid: nix::unistd::getuid().as_raw(),
            gid: nix::unistd::getgid().as_raw(),
        }
    }

    #[test]
    fn creates_nested_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = DirectoryResource::new(tmp.path().join("var/log/kiosk"), Some(me()));
        assert_eq!(dir.current_state().unwrap(), ResourceState::Missing);
        dir.apply().unwrap();
        assert_eq!(dir.current_state().unwrap(), ResourceState::Correct);
    }

    #[test]
    fn foreign_owner_is_incorrect() {
        let tmp = tempfile::tempdir().unwrap();
        let other = Owner {
            uid: me().uid + 1,
            gid: me().gid,
        };
        let dir = DirectoryResource::new(tmp.path().to_path_buf(), Some(other));
        assert!(matches!(
            dir.current_state().unwrap(),
            ResourceState::Incorrect { .. }
        ));
    }

    #[test]
    fn regular_file_is_invalid() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("kiosk");
        std::fs::write(&path, "").unwrap();
        let dir = DirectoryResource::new(path, None);
        assert!(matches!(
            dir.current_state().unwrap(),
            ResourceState::Invalid { .. }
        ));
    }
}
