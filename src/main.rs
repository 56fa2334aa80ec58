//! # SQL Server Backup Pipeline
//!
//! A small operations utility that automates two administrative tasks
//! against a SQL Server instance: a staged backup pipeline (snapshot ->
//! archive -> relocate -> notify) and idempotent lifecycle management of a
//! login/user/role-grant triple.
//!
//! This application follows the **Hexagonal Architecture** (Ports and
//! Adapters) to keep the run sequencing independent of `sqlcmd`, the ZIP
//! writer, the filesystem, and the SMTP relay.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod logging;
pub mod ports;

use crate::application::orchestrator::PipelineOrchestrator;
use crate::config::{AppConfig, CliArgs, PipelineCommand};
use crate::infrastructure::archive::zip_adapter::ZipArchiveAdapter;
use crate::infrastructure::smtp::lettre_mailer::LettreMailer;
use crate::infrastructure::sqlcmd::backup_adapter::SqlcmdBackupAdapter;
use crate::infrastructure::sqlcmd::provisioning_adapter::SqlcmdProvisioningAdapter;
use crate::infrastructure::storage::local_relocation_adapter::LocalRelocationAdapter;
use crate::ports::provisioning_port::PrincipalProvisioner;
use clap::Parser;
use log::{error, info, warn};
use std::process;
use std::sync::Arc;

const SQLCMD: &str = "sqlcmd";

fn main() {
    // 1. Initialize Logging
    env_logger::init();

    // 2. Parse Arguments
    let args = CliArgs::parse();

    // 3. Load Config
    let mut config = match AppConfig::from_file(&args.config) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {}", e);
            process::exit(1);
        }
    };
    config.merge_cli(&args);

    if !infrastructure::sqlcmd::check_sqlcmd_availability() {
        warn!("sqlcmd not found on PATH; database operations will fail");
    }

    // 4. Dispatch
    match args.command.unwrap_or(PipelineCommand::Run) {
        PipelineCommand::Run => run_pipeline(config),
        PipelineCommand::EnsurePrincipal => ensure_principal(&config),
        PipelineCommand::DropPrincipal => drop_principal(&config),
    }
}

fn run_pipeline(config: AppConfig) {
    let backup = Arc::new(SqlcmdBackupAdapter::new(
        SQLCMD,
        config.database.server.clone(),
        config.database.timeout_secs,
    ));
    let mailer = Arc::new(LettreMailer::new(config.notification.clone()));

    let orchestrator = PipelineOrchestrator::new(
        backup,
        Arc::new(ZipArchiveAdapter),
        Arc::new(LocalRelocationAdapter),
        mailer,
        config,
    );

    match orchestrator.run() {
        Ok(report) if report.succeeded() => {
            info!("Backup pipeline finished; artifacts:");
            for path in &report.artifacts {
                info!("  {}", path.display());
            }
        }
        Ok(report) => {
            error!(
                "Backup pipeline ended at {}; see {}",
                report.outcome,
                report.log_path.display()
            );
            process::exit(1);
        }
        Err(e) => {
            error!("Backup pipeline aborted: {}", e);
            process::exit(1);
        }
    }
}

fn ensure_principal(config: &AppConfig) {
    let provisioning = match config.validate_for_provisioning() {
        Ok(p) => p,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            process::exit(1);
        }
    };
    let adapter = SqlcmdProvisioningAdapter::new(
        SQLCMD,
        config.database.server.clone(),
        provisioning.admin_user.clone(),
        provisioning.admin_password.clone(),
        config.database.timeout_secs,
    );
    if let Err(e) = adapter.ensure_login_and_user(
        &config.database.database,
        &provisioning.login_name,
        &provisioning.login_password,
        &provisioning.user_name,
        &provisioning.roles,
    ) {
        error!("Provisioning failed: {}", e);
        process::exit(1);
    }
}

fn drop_principal(config: &AppConfig) {
    let provisioning = match config.validate_for_provisioning() {
        Ok(p) => p,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            process::exit(1);
        }
    };
    let adapter = SqlcmdProvisioningAdapter::new(
        SQLCMD,
        config.database.server.clone(),
        provisioning.admin_user.clone(),
        provisioning.admin_password.clone(),
        config.database.timeout_secs,
    );
    if let Err(e) = adapter.drop_login_and_user(
        &config.database.database,
        &provisioning.user_name,
        &provisioning.login_name,
    ) {
        error!("Deprovisioning failed: {}", e);
        process::exit(1);
    }
}
