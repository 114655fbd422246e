//! logrotate rule for the kiosk log directory.
use super::GENERATED_HEADER;
use crate::config::LogsConfig;

/// `/etc/logrotate.d/kiosk`.
///
/// The services append to their logs without reopening them, hence
/// `copytruncate`.
#[must_use]
pub fn rule(logs: &LogsConfig) -> String {
    format!(
        "{GENERATED_HEADER}\n\
         {dir}/*.log {{\n\
         \x20   daily\n\
         \x20   rotate {days}\n\
         \x20   missingok\n\
         \x20   notifempty\n\
         \x20   compress\n\
         \x20   delaycompress\n\
         \x20   copytruncate\n\
         }}\n",
        dir = logs.dir.display(),
        days = logs.rotate_days,
    )
}
