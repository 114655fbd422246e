use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::DEFAULT_CONFIG_PATH;

/// Provision a Raspberry Pi as a web kiosk.
#[derive(Parser, Debug)]
#[command(
    name = "kiosk-setup",
    about = "Declarative provisioning for Raspberry Pi web kiosks",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Show debug output on the console
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone)]
pub struct GlobalOpts {
    /// Report what would change without changing anything
    #[arg(short = 'd', long, global = true)]
    pub dry_run: bool,

    /// Desired-state descriptor
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Filesystem prefix to provision (e.g. a mounted image)
    #[arg(long, global = true, default_value = "/")]
    pub root: PathBuf,

    /// Kiosk user (default: config `user`, then $SUDO_USER)
    #[arg(short, long, global = true)]
    pub user: Option<String>,

    /// Run tasks sequentially
    #[arg(long = "no-parallel", global = true, action = clap::ArgAction::SetFalse)]
    pub parallel: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Provision the kiosk
    Install(InstallOpts),
    /// Wait for the display socket and supervise the browser
    Supervise,
    /// Print version information
    Version,
}

impl Command {
    /// Name used for the log file under the cache directory.
    #[must_use]
    pub const fn log_name(&self) -> &'static str {
        match self {
            Self::Install(_) => "install",
            Self::Supervise => "supervise",
            Self::Version => "version",
        }
    }
}

/// Options for the `install` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct InstallOpts {
    /// Skip tasks whose name contains any of these (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub skip: Vec<String>,

    /// Run only tasks whose name contains any of these (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,
}
