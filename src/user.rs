//! Resolution of the account the kiosk session runs as.
use std::path::{Path, PathBuf};

use crate::error::PreconditionError;
use crate::resources::fs::Owner;

/// The unprivileged account that owns the kiosk session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KioskUser {
    /// Login name.
    pub name: String,
    /// Numeric user ID.
    pub uid: u32,
    /// Primary group ID.
    pub gid: u32,
    /// Home directory as recorded in the password database.
    pub home: PathBuf,
}

impl KioskUser {
    /// Ownership for files written into the user's home.
    #[must_use]
    pub const fn owner(&self) -> Owner {
        Owner {
            uid: self.uid,
            gid: self.gid,
        }
    }

    /// `$XDG_RUNTIME_DIR` systemd-logind creates for this user.
    #[must_use]
    pub fn runtime_dir(&self) -> PathBuf {
        PathBuf::from(format!("/run/user/{}", self.uid))
    }

    /// Pick and look up the kiosk user.
    ///
    /// The name comes from `--user`, then the config file, then
    /// `$SUDO_USER`.  When `root` is not `/`, the account is looked up in
    /// `<root>/etc/passwd` instead of the host database.
    ///
    /// # Errors
    ///
    /// Fails when no name is available, the account does not exist, or it
    /// is the superuser.
    pub fn resolve(
        root: &Path,
        cli_user: Option<&str>,
        config_user: Option<&str>,
    ) -> Result<Self, PreconditionError> {
        let name = cli_user
            .or(config_user)
            .map(str::to_string)
            .or_else(|| std::env::var("SUDO_USER").ok())
            .filter(|n| !n.is_empty())
            .ok_or(PreconditionError::UserUnspecified)?;
        if name == "root" {
            return Err(PreconditionError::RootUser);
        }
        let user = if root == Path::new("/") {
            lookup_host(&name)
        } else {
            lookup_passwd_file(&root.join("etc/passwd"), &name)
        }
        .ok_or_else(|| PreconditionError::UnknownUser(name.clone()))?;
        if user.uid == 0 {
            return Err(PreconditionError::RootUser);
        }
        Ok(user)
    }
}

fn lookup_host(name: &str) -> Option<KioskUser> {
    let user = nix::unistd::User::from_name(name).ok().flatten()?;
    Some(KioskUser {
        name: user.name,
        uid: user.uid.as_raw(),
        gid: user.gid.as_raw(),
        home: user.dir,
    })
}

/// Find `name` in a `passwd(5)` file.
fn lookup_passwd_file(path: &Path, name: &str) -> Option<KioskUser> {
    let text = std::fs::read_to_string(path).ok()?;
    text.lines().find_map(|line| {
        let fields: Vec<&str> = line.split(':').collect();
        match fields.as_slice() {
            [login, _, uid, gid, _, home, ..] if *login == name => Some(KioskUser {
                name: name.to_string(),
                uid: uid.parse().ok()?,
                gid: gid.parse().ok()?,
                home: PathBuf::from(home),
            }),
            _ => None,
        }
    })
}
