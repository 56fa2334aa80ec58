pub mod backup_adapter;
pub mod provisioning_adapter;
pub mod runner;
pub mod sql_utils;

use std::process::Command;

/// Checks if the sqlcmd client is available on PATH.
pub fn check_sqlcmd_availability() -> bool {
    Command::new("sqlcmd")
        .arg("-?")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}
