//! Fully generated file resource.
use anyhow::{Context as _, Result};
use std::path::PathBuf;

use super::fs::{Owner, mode_of, short_digest, write_atomic};
use super::{Applicable, Resource, ResourceChange, ResourceState};

/// A file whose entire content is owned by this tool.
///
/// The file is rewritten whenever its content or permission bits differ
/// from the desired ones; it is never merged with what is on disk.
#[derive(Debug, Clone)]
pub struct ManagedFile {
    /// Absolute target path (already prefixed with the provisioning root).
    pub path: PathBuf,
    /// Desired file content.
    pub content: Vec<u8>,
    /// Desired permission bits (e.g. `0o644`).
    pub mode: u32,
    /// Owner to apply to the file and any directories created for it.
    pub owner: Option<Owner>,
}

impl ManagedFile {
    /// Create a regular `0644` root-owned file.
    #[must_use]
    pub fn new(path: PathBuf, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path,
            content: content.into(),
            mode: 0o644,
            owner: None,
        }
    }

    /// Set the permission bits.
    #[must_use]
    pub const fn with_mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }

    /// Make the file executable (`0755`).
    #[must_use]
    pub const fn executable(self) -> Self {
        self.with_mode(0o755)
    }

    /// Hand the file (and any directories created for it) to `owner`.
    #[must_use]
    pub const fn owned_by(mut self, owner: Option<Owner>) -> Self {
        self.owner = owner;
        self
    }
}

impl Applicable for ManagedFile {
    fn description(&self) -> String {
        self.path.display().to_string()
    }

    fn apply(&self) -> Result<ResourceChange> {
        write_atomic(&self.path, &self.content, self.mode, self.owner)?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for ManagedFile {
    fn current_state(&self) -> Result<ResourceState> {
        let meta = match std::fs::symlink_metadata(&self.path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ResourceState::Missing);
            }
            Err(e) => {
                return Err(e).with_context(|| format!("inspecting {}", self.path.display()));
            }
        };
        if meta.is_dir() {
            return Ok(ResourceState::Invalid {
                reason: "target is a directory".to_string(),
            });
        }

        let current = std::fs::read(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        if current != self.content {
            return Ok(ResourceState::Incorrect {
                current: format!(
                    "content {} != {}",
                    short_digest(&current),
                    short_digest(&self.content)
                ),
            });
        }
        match mode_of(&self.path) {
            Some(mode) if mode != self.mode => Ok(ResourceState::Incorrect {
                current: format!("mode {mode:o}"),
            }),
            _ => Ok(ResourceState::Correct),
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let file = ManagedFile::new(dir.path().join("rc.xml"), "<x/>".to_string());
        assert_eq!(file.current_state().unwrap(), ResourceState::Missing);
    }

    #[test]
    fn apply_then_check_is_correct() {
        let dir = tempfile::tempdir().unwrap();
        let file = ManagedFile::new(dir.path().join("nested/rc.xml"), "<x/>".to_string());
        assert_eq!(file.apply().unwrap(), ResourceChange::Applied);
        assert_eq!(file.current_state().unwrap(), ResourceState::Correct);
    }

    #[test]
    fn different_content_is_incorrect() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("autostart");
        std::fs::write(&path, "edited by hand\n").unwrap();
        let file = ManagedFile::new(path, "generated\n".to_string());
        let state = file.current_state().unwrap();
        assert!(
            matches!(state, ResourceState::Incorrect { ref current } if current.starts_with("content")),
            "expected content drift, got {state:?}"
        );
    }

    #[test]
    fn wrong_mode_is_incorrect() {
        let dir = tempfile::tempdir().unwrap();
        let file = ManagedFile::new(dir.path().join("run.sh"), "#!/bin/sh\n".to_string());
        file.apply().unwrap();
        let executable = file.clone().executable();
        assert_eq!(
            executable.current_state().unwrap(),
            ResourceState::Incorrect {
                current: "mode 644".to_string()
            }
        );
        executable.apply().unwrap();
        assert_eq!(executable.current_state().unwrap(), ResourceState::Correct);
    }

    #[test]
    fn directory_target_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let file = ManagedFile::new(dir.path().to_path_buf(), String::new());
        assert!(matches!(
            file.current_state().unwrap(),
            ResourceState::Invalid { .. }
        ));
    }
}
