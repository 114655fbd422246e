//! Append-once block in a user-edited shell profile.
use anyhow::{Context as _, Result};
use std::path::PathBuf;

use super::fs::{Owner, mode_of, write_atomic};
use super::{Applicable, Resource, ResourceChange, ResourceState};

/// A block appended to a file unless a guard substring is already present.
///
/// The rest of the file belongs to the user and is never rewritten.
#[derive(Debug, Clone)]
pub struct ProfileSnippetResource {
    /// Target file (typically `~/.profile`).
    pub path: PathBuf,
    /// Substring whose presence means the block is already installed.
    pub guard: String,
    /// Block to append.
    pub block: String,
    /// Owner for a newly created file.
    pub owner: Option<Owner>,
}

impl ProfileSnippetResource {
    /// Create a new snippet resource.
    #[must_use]
    pub const fn new(path: PathBuf, guard: String, block: String, owner: Option<Owner>) -> Self {
        Self {
            path,
            guard,
            block,
            owner,
        }
    }

    fn existing(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading {}", self.path.display())),
        }
    }
}

impl Applicable for ProfileSnippetResource {
    fn description(&self) -> String {
        self.path.display().to_string()
    }

    fn apply(&self) -> Result<ResourceChange> {
        let mut text = self.existing()?.unwrap_or_default();
        if text.contains(&self.guard) {
            return Ok(ResourceChange::AlreadyCorrect);
        }
        if !text.is_empty() {
            if !text.ends_with('\n') {
                text.push('\n');
            }
            text.push('\n');
        }
        text.push_str(&self.block);
        let mode = mode_of(&self.path).unwrap_or(0o644);
        write_atomic(&self.path, text.as_bytes(), mode, self.owner)?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for ProfileSnippetResource {
    fn current_state(&self) -> Result<ResourceState> {
        match self.existing()? {
            None => Ok(ResourceState::Missing),
            Some(text) if text.contains(&self.guard) => Ok(ResourceState::Correct),
            Some(_) => Ok(ResourceState::Incorrect {
                current: format!("no '{}' block", self.guard),
            }),
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    const BLOCK: &str = "if [ \"$(tty)\" = /dev/tty1 ]; then\n  exec labwc\nfi\n";

    fn snippet(path: PathBuf) -> ProfileSnippetResource {
        ProfileSnippetResource::new(path, "labwc".to_string(), BLOCK.to_string(), None)
    }

    #[test]
    fn appends_after_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".profile");
        std::fs::write(&path, "export EDITOR=vi").unwrap();
        let resource = snippet(path.clone());
        assert!(resource.needs_change().unwrap());
        assert_eq!(resource.apply().unwrap(), ResourceChange::Applied);
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, format!("export EDITOR=vi\n\n{BLOCK}"));
    }

    #[test]
    fn inserted_once_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".profile");
        let resource = snippet(path.clone());
        resource.apply().unwrap();
        assert_eq!(resource.apply().unwrap(), ResourceChange::AlreadyCorrect);
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.matches("exec labwc").count(), 1);
        assert_eq!(resource.current_state().unwrap(), ResourceState::Correct);
    }

    #[test]
    fn existing_guard_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".profile");
        std::fs::write(&path, "# start labwc by hand\n").unwrap();
        let resource = snippet(path.clone());
        assert_eq!(resource.current_state().unwrap(), ResourceState::Correct);
        assert_eq!(resource.apply().unwrap(), ResourceChange::AlreadyCorrect);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "# start labwc by hand\n"
        );
    }

    #[test]
    fn keeps_file_mode() {
        use std::os::unix::fs::PermissionsExt as _;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".profile");
        std::fs::write(&path, "umask 022\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600)).unwrap();
        snippet(path.clone()).apply().unwrap();
        assert_eq!(mode_of(&path), Some(0o600));
    }
}
