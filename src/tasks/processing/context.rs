use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::KioskConfig;
use crate::exec::Executor;
use crate::logging::Log;
use crate::platform::{Platform, under_root};
use crate::resources::fs::Owner;
use crate::user::KioskUser;

/// Shared context for task execution.
#[derive(Clone)]
pub struct Context {
    /// Desired state loaded from `kiosk.toml`.
    pub config: Arc<KioskConfig>,
    /// Path the config was loaded from, baked into the launch script.
    pub config_path: PathBuf,
    /// Board detected under the provisioning root.
    pub platform: Arc<Platform>,
    /// Account the kiosk session runs as.
    pub user: Arc<KioskUser>,
    /// Logger for output and task recording.
    pub log: Arc<dyn Log>,
    /// Report changes without applying them.
    pub dry_run: bool,
    /// Filesystem prefix every managed path is written under.
    pub root: PathBuf,
    /// Command executor (for testing or real system calls).
    pub executor: Arc<dyn Executor>,
    /// Whether to process resources in parallel using Rayon.
    pub parallel: bool,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("config_path", &self.config_path)
            .field("platform", &self.platform)
            .field("user", &self.user.name)
            .field("dry_run", &self.dry_run)
            .field("root", &self.root)
            .field("parallel", &self.parallel)
            .finish_non_exhaustive()
    }
}

impl Context {
    /// `path` re-anchored under the provisioning root.
    #[must_use]
    pub fn path(&self, path: impl AsRef<Path>) -> PathBuf {
        under_root(&self.root, path.as_ref())
    }

    /// Inverse of [`Context::path`]: where `path` lives once the image boots.
    #[must_use]
    pub fn live_path(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.root)
            .map_or_else(|_| path.to_path_buf(), |rel| Path::new("/").join(rel))
    }

    /// The kiosk user's home under the provisioning root.
    #[must_use]
    pub fn home(&self) -> PathBuf {
        self.path(&self.user.home)
    }

    /// Ownership for files in the kiosk user's home.
    #[must_use]
    pub fn owner(&self) -> Option<Owner> {
        Some(self.user.owner())
    }

    /// Whether the run targets the live system rather than a mounted image.
    ///
    /// Host commands (`apt-get`, `usermod`, `systemctl`) only make sense
    /// against the live system.
    #[must_use]
    pub fn is_live_root(&self) -> bool {
        self.root == Path::new("/")
    }

    /// Create a copy of this context with a different logger.
    ///
    /// Used by the parallel scheduler to give each task its own buffered
    /// logger.
    #[must_use]
    pub fn with_log(&self, log: Arc<dyn Log>) -> Self {
        Self {
            log,
            ..self.clone()
        }
    }
}
