//! Command: print version information.

/// Build version: `KIOSK_VERSION` set by the build script, else the crate
/// version with a `dev-` prefix.
#[must_use]
pub fn version() -> &'static str {
    option_env!("KIOSK_VERSION").unwrap_or(concat!("dev-", env!("CARGO_PKG_VERSION")))
}

/// Print the kiosk-setup version to stdout.
pub fn run() {
    println!("kiosk-setup {}", version());
}
