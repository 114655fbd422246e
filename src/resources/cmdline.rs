//! Kernel command line (`cmdline.txt`) token assertions.
use anyhow::{Context as _, Result};
use std::path::PathBuf;

use super::fs::{backup_once, replace_contents};
use super::{Applicable, Resource, ResourceChange, ResourceState};

/// Key used to match a token: the part before `=`, or the whole bare flag.
fn token_key(token: &str) -> &str {
    token.split_once('=').map_or(token, |(k, _)| k)
}

/// Ensure every token in `desired` is present exactly once.
///
/// A `key=value` token replaces the first existing token with the same key
/// and drops later ones; a bare flag is appended when absent.  The result is
/// a single line with a trailing newline.  Empty tokens and tokens holding
/// whitespace are ignored.
///
/// ```
/// use kiosk_cli::resources::cmdline::patch;
///
/// let desired = vec!["consoleblank=0".to_string(), "logo.nologo".to_string()];
/// let out = patch("console=tty1 consoleblank=600 rootwait\n", &desired);
/// assert_eq!(out, "console=tty1 consoleblank=0 rootwait logo.nologo\n");
/// ```
#[must_use]
pub fn patch(text: &str, desired: &[String]) -> String {
    let desired: Vec<&str> = desired
        .iter()
        .map(String::as_str)
        .filter(|t| !t.is_empty() && !t.contains(char::is_whitespace))
        .collect();
    let mut tokens: Vec<String> = Vec::new();
    let mut placed: Vec<&str> = Vec::new();

    for token in text.split_whitespace() {
        let key = token_key(token);
        match desired.iter().copied().find(|d| token_key(d) == key) {
            Some(_) if placed.contains(&key) => {}
            Some(want) => {
                placed.push(token_key(want));
                tokens.push(want.to_string());
            }
            None => tokens.push(token.to_string()),
        }
    }
    for want in desired {
        let key = token_key(want);
        if !placed.contains(&key) {
            placed.push(key);
            tokens.push(want.to_string());
        }
    }

    let mut line = tokens.join(" ");
    line.push('\n');
    line
}

/// `cmdline.txt` with asserted tokens.
#[derive(Debug, Clone)]
pub struct CmdlineResource {
    /// Path to `cmdline.txt`.
    pub path: PathBuf,
    /// Tokens that must be present.
    pub tokens: Vec<String>,
}

impl CmdlineResource {
    /// Create a new cmdline resource.
    #[must_use]
    pub const fn new(path: PathBuf, tokens: Vec<String>) -> Self {
        Self { path, tokens }
    }

    fn read(&self) -> Result<String> {
        std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))
    }
}

impl Applicable for CmdlineResource {
    fn description(&self) -> String {
        self.path.display().to_string()
    }

    fn apply(&self) -> Result<ResourceChange> {
        let current = self.read()?;
        let patched = patch(&current, &self.tokens);
        if patched == current {
            return Ok(ResourceChange::AlreadyCorrect);
        }
        backup_once(&self.path)?;
        replace_contents(&self.path, patched.as_bytes())?;
        Ok(ResourceChange::Applied)
    }
}

impl Resource for CmdlineResource {
    fn current_state(&self) -> Result<ResourceState> {
        if !self.path.is_file() {
            return Ok(ResourceState::Invalid {
                reason: format!("{} not found", self.path.display()),
            });
        }
        let current = self.read()?;
        if patch(&current, &self.tokens) == current {
            return Ok(ResourceState::Correct);
        }
        let present: Vec<&str> = current.split_whitespace().collect();
        let absent: Vec<&str> = self
            .tokens
            .iter()
            .map(String::as_str)
            .filter(|t| !present.contains(t))
            .collect();
        Ok(ResourceState::Incorrect {
            current: if absent.is_empty() {
                "duplicate tokens".to_string()
            } else {
                format!("missing {}", absent.join(" "))
            },
        })
    }
}
