use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::error::Error;
use std::fs::File;
use std::io::Read;

use crate::domain::errors::{BackupError, Result};

/// Top-level configuration for one run, loaded once before the pipeline
/// starts and never mutated afterwards.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub destination: DestinationConfig,
    pub notification: NotificationConfig,
    pub provisioning: Option<ProvisioningConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub server: String,
    pub database: String,
    /// Directory where the engine writes the snapshot. When absent, the
    /// engine's registered default backup directory is queried at run time.
    pub default_backup_dir: Option<String>,
    /// Wall-clock bound for one backup-tool invocation, in seconds.
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DestinationConfig {
    /// Secondary directory the snapshot and archive are moved into.
    pub directory: String,
    /// Where the run log lives; defaults to the destination directory.
    pub log_dir: Option<String>,
    #[serde(default)]
    pub on_archive_failure: ArchiveFailurePolicy,
}

/// What the pipeline does when the archive stage fails after a good backup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveFailurePolicy {
    /// Stop the run and send a failure notification.
    #[default]
    Abort,
    /// Relocate whatever exists and report degraded success.
    Continue,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotificationConfig {
    pub from: String,
    pub to: String,
    /// App password for the sending account.
    pub password: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProvisioningConfig {
    /// Administrative credentials; without them the tool uses the invoking
    /// account's trusted connection.
    pub admin_user: Option<String>,
    pub admin_password: Option<String>,
    pub login_name: String,
    pub login_password: String,
    pub user_name: String,
    pub roles: Vec<String>,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file (YAML or JSON)
    #[arg(short, long)]
    pub config: String,

    // Overrides for ad-hoc runs
    #[arg(long)]
    pub server: Option<String>,
    #[arg(long)]
    pub database: Option<String>,
    #[arg(short, long)]
    pub destination: Option<String>,

    #[command(subcommand)]
    pub command: Option<PipelineCommand>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum PipelineCommand {
    /// Run the snapshot -> archive -> relocate -> notify pipeline (default)
    Run,
    /// Create the configured login/user and grant its roles (idempotent)
    EnsurePrincipal,
    /// Drop the configured user and login (idempotent)
    DropPrincipal,
}

impl AppConfig {
    pub fn from_file(path: &str) -> std::result::Result<Self, Box<dyn Error>> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let config: AppConfig = if path.ends_with(".json") {
            serde_json::from_str(&contents)?
        } else {
            serde_yaml::from_str(&contents)?
        };

        Ok(config)
    }

    pub fn merge_cli(&mut self, args: &CliArgs) {
        if let Some(s) = &args.server {
            self.database.server = s.clone();
        }
        if let Some(d) = &args.database {
            self.database.database = d.clone();
        }
        if let Some(dest) = &args.destination {
            self.destination.directory = dest.clone();
        }
    }

    /// Checks the fields the backup pipeline's stages will actually use.
    pub fn validate_for_backup(&self) -> Result<()> {
        require("database.server", &self.database.server)?;
        require("database.database", &self.database.database)?;
        require("destination.directory", &self.destination.directory)?;
        require("notification.from", &self.notification.from)?;
        require("notification.to", &self.notification.to)?;
        require("notification.password", &self.notification.password)?;
        Ok(())
    }

    /// Checks the fields the provisioning operations need; notification
    /// settings are not required here.
    pub fn validate_for_provisioning(&self) -> Result<&ProvisioningConfig> {
        require("database.server", &self.database.server)?;
        require("database.database", &self.database.database)?;
        let provisioning = self.provisioning.as_ref().ok_or_else(|| {
            BackupError::Config("missing 'provisioning' configuration section".to_string())
        })?;
        require("provisioning.login_name", &provisioning.login_name)?;
        require("provisioning.user_name", &provisioning.user_name)?;
        Ok(provisioning)
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(BackupError::Config(format!("missing required field: {}", field)))
    } else {
        Ok(())
    }
}
