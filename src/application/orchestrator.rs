//! The core application logic that sequences the backup pipeline.
//!
//! This module coordinates the snapshot producer, the archiver, the
//! relocator, and the mailer: one strictly sequential run per invocation,
//! short-circuiting on the first failed stage. State transitions are written
//! to the run log by name, so the log alone tells an operator how far a run
//! got even when the notification email never left.

use crate::application::run_lock::RunLock;
use crate::config::{AppConfig, ArchiveFailurePolicy};
use crate::domain::entities::{Artifact, ArtifactKind, RunReport, RunState, StageResult};
use crate::domain::errors::Result;
use crate::logging::RunLogger;
use crate::ports::archive_port::Archiver;
use crate::ports::backup_port::BackupTool;
use crate::ports::mailer_port::Mailer;
use crate::ports::relocation_port::Relocator;
use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const SUBJECT_SUCCESS: &str = "Backup exitoso";
const SUBJECT_FAILURE: &str = "Error en backup";

/// Per-run state fixed at start.
///
/// The timestamp names both the log file and the snapshot; it is computed
/// exactly once so a run that straddles a minute boundary still produces
/// consistently named files.
pub struct RunContext {
    pub timestamp: String,
    pub logger: RunLogger,
}

impl RunContext {
    pub fn begin(config: &AppConfig) -> Self {
        let timestamp = Local::now().format("%Y%m%d_%H%M").to_string();
        let log_dir = config
            .destination
            .log_dir
            .as_deref()
            .unwrap_or(&config.destination.directory);
        // RunLogger tolerates a missing directory; creation is attempted so
        // the normal case gets a trail from the first line on.
        let _ = std::fs::create_dir_all(log_dir);
        let log_path = Path::new(log_dir).join(format!("log_{}.log", timestamp));
        Self {
            timestamp,
            logger: RunLogger::new(log_path),
        }
    }
}

/// Orchestrates the end-to-end backup run for one database.
pub struct PipelineOrchestrator {
    backup: Arc<dyn BackupTool>,
    archiver: Arc<dyn Archiver>,
    relocator: Arc<dyn Relocator>,
    mailer: Arc<dyn Mailer>,
    config: AppConfig,
}

impl PipelineOrchestrator {
    /// Creates a new PipelineOrchestrator with the provided components.
    pub fn new(
        backup: Arc<dyn BackupTool>,
        archiver: Arc<dyn Archiver>,
        relocator: Arc<dyn Relocator>,
        mailer: Arc<dyn Mailer>,
        config: AppConfig,
    ) -> Self {
        Self {
            backup,
            archiver,
            relocator,
            mailer,
            config,
        }
    }

    /// Entry point for one full run.
    ///
    /// Returns `Err` only for pre-stage conditions (invalid configuration,
    /// lock held). Stage failures are handled inside: logged, notified, and
    /// reported through the returned `RunReport`.
    pub fn run(&self) -> Result<RunReport> {
        self.config.validate_for_backup()?;

        let ctx = RunContext::begin(&self.config);
        let logger = &ctx.logger;
        let db = self.config.database.database.clone();

        let _lock = match RunLock::acquire(
            Path::new(&self.config.destination.directory),
            &db,
            &ctx.timestamp,
        ) {
            Ok(lock) => lock,
            Err(e) => {
                logger.record(&format!("Aborting before backup: {}", e));
                return Err(e);
            }
        };

        logger.record(&format!("=== BACKUP RUN {} ({}) ===", ctx.timestamp, db));
        self.record_state(logger, RunState::BackupPending);

        // ---- BACKUP ----
        let backup_result = self.backup_stage(&ctx);
        if !backup_result.succeeded {
            return Ok(self.abort(logger, RunState::BackupFailed, &backup_result.diagnostics, Vec::new()));
        }
        let snapshot = match backup_result.output {
            Some(path) => Artifact::new(ArtifactKind::Snapshot, path),
            None => {
                return Ok(self.abort(
                    logger,
                    RunState::BackupFailed,
                    "backup stage reported success without an artifact",
                    Vec::new(),
                ))
            }
        };
        // The tool's claim is never trusted over the filesystem.
        if !snapshot.verify_exists() {
            return Ok(self.abort(
                logger,
                RunState::BackupFailed,
                &format!("snapshot missing on disk: {}", snapshot.path.display()),
                Vec::new(),
            ));
        }
        self.record_state(logger, RunState::BackupDone);

        // ---- ARCHIVE ----
        let archive_result = match self.archiver.compress(logger, &snapshot.path) {
            Ok(result) => result,
            Err(e) => StageResult::failure(e.to_string()),
        };
        // The archive gets the same treatment as the snapshot: it only
        // counts if the container is really on disk.
        let archive = match (archive_result.succeeded, archive_result.output) {
            (true, Some(path)) => {
                let artifact = Artifact::new(ArtifactKind::Archive, path);
                if artifact.verify_exists() {
                    Ok(artifact)
                } else {
                    Err(format!("archive missing on disk: {}", artifact.path.display()))
                }
            }
            (true, None) => Err("archive stage reported success without an artifact".to_string()),
            (false, _) => Err(archive_result.diagnostics),
        };

        let mut to_relocate = vec![snapshot.path.clone()];
        let mut degraded = false;
        match archive {
            Ok(artifact) => {
                self.record_state(logger, RunState::ArchiveDone);
                to_relocate.push(artifact.path);
            }
            Err(diagnostics) => match self.config.destination.on_archive_failure {
                ArchiveFailurePolicy::Abort => {
                    return Ok(self.abort(logger, RunState::ArchiveFailed, &diagnostics, Vec::new()));
                }
                ArchiveFailurePolicy::Continue => {
                    self.record_state(logger, RunState::ArchiveFailed);
                    logger.record(&diagnostics);
                    logger.record("Continuing without archive (on_archive_failure = continue)");
                    degraded = true;
                }
            },
        }

        // ---- RELOCATE ----
        let destination = Path::new(&self.config.destination.directory);
        let outcome = self.relocator.relocate(logger, &to_relocate, destination);
        if let Some((path, reason)) = &outcome.failed {
            let detail = format!(
                "Relocation failed for {}: {} ({} of {} artifacts moved)",
                path.display(),
                reason,
                outcome.moved.len(),
                to_relocate.len()
            );
            return Ok(self.abort(logger, RunState::RelocateFailed, &detail, outcome.moved.clone()));
        }
        self.record_state(logger, RunState::RelocateDone);

        // ---- NOTIFY ----
        let mut body = format!(
            "Estimad@s,\n\nEl backup de la base {} se generó correctamente.\n\nRutas finales:\n",
            db
        );
        for path in &outcome.moved {
            body.push_str(&format!("{}\n", path.display()));
        }
        if degraded {
            body.push_str("\nAdvertencia: el archivo ZIP no pudo generarse; revisar el log.\n");
        }
        body.push_str("\nSaludos Cordiales\n");
        self.send_notification(logger, SUBJECT_SUCCESS, &body);
        self.record_state(logger, RunState::Notified);
        self.record_state(logger, RunState::End);

        Ok(RunReport {
            outcome: RunState::RelocateDone,
            artifacts: outcome.moved,
            log_path: logger.path().to_path_buf(),
        })
    }

    /// Runs the backup stage, folding every failure mode into a
    /// `StageResult` at the stage boundary.
    fn backup_stage(&self, ctx: &RunContext) -> StageResult {
        let logger = &ctx.logger;
        let db = &self.config.database.database;

        let backup_dir = match &self.config.database.default_backup_dir {
            Some(dir) => PathBuf::from(dir),
            None => match self.backup.default_backup_dir(logger) {
                Ok(Some(dir)) => dir,
                Ok(None) => {
                    return StageResult::failure(
                        "no backup directory configured and none registered on the engine",
                    )
                }
                Err(e) => return StageResult::failure(e.to_string()),
            },
        };

        let snapshot_path = backup_dir.join(format!("{}_{}.bak", db, ctx.timestamp));
        match self.backup.run_backup(logger, db, &snapshot_path) {
            Ok(result) => result,
            Err(e) => StageResult::failure(e.to_string()),
        }
    }

    /// Ends a run after a failed stage: log it, notify, transition to END.
    fn abort(
        &self,
        logger: &RunLogger,
        state: RunState,
        detail: &str,
        artifacts: Vec<PathBuf>,
    ) -> RunReport {
        self.record_state(logger, state);
        logger.record(detail);
        let body = format!(
            "No se pudo completar el respaldo de la base {}.\n\nDetalle: {}\n\nRevisar log:\n{}",
            self.config.database.database,
            detail,
            logger.path().display()
        );
        self.send_notification(logger, SUBJECT_FAILURE, &body);
        self.record_state(logger, RunState::End);
        RunReport {
            outcome: state,
            artifacts,
            log_path: logger.path().to_path_buf(),
        }
    }

    /// Best-effort delivery: a mailer error is logged and swallowed so the
    /// run's recorded outcome never depends on the operator being told.
    fn send_notification(&self, logger: &RunLogger, subject: &str, body: &str) {
        logger.record("Sending notification email...");
        match self.mailer.notify(subject, body) {
            Ok(()) => logger.record("Notification email sent."),
            Err(e) => logger.record(&format!("ERROR sending notification: {}", e)),
        }
    }

    fn record_state(&self, logger: &RunLogger, state: RunState) {
        logger.record(&format!("state: {}", state));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DatabaseConfig, DestinationConfig, NotificationConfig};
    use crate::domain::entities::RelocationOutcome;
    use crate::domain::errors::BackupError;
    use crate::infrastructure::archive::zip_adapter::ZipArchiveAdapter;
    use crate::infrastructure::storage::local_relocation_adapter::LocalRelocationAdapter;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    // ---- Mock ports ----

    struct FileWritingBackup {
        calls: AtomicUsize,
    }
    impl FileWritingBackup {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }
    impl BackupTool for FileWritingBackup {
        fn run_backup(
            &self,
            _logger: &RunLogger,
            _database: &str,
            destination: &Path,
        ) -> Result<StageResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            fs::write(destination, b"snapshot-bytes").unwrap();
            Ok(StageResult::success(destination.to_path_buf(), "backed up"))
        }
        fn default_backup_dir(&self, _logger: &RunLogger) -> Result<Option<PathBuf>> {
            Ok(None)
        }
    }

    /// Exits "successfully" but writes nothing, like an engine that put the
    /// snapshot somewhere else.
    struct LyingBackup;
    impl BackupTool for LyingBackup {
        fn run_backup(
            &self,
            _logger: &RunLogger,
            _database: &str,
            destination: &Path,
        ) -> Result<StageResult> {
            Ok(StageResult::success(destination.to_path_buf(), "trust me"))
        }
        fn default_backup_dir(&self, _logger: &RunLogger) -> Result<Option<PathBuf>> {
            Ok(None)
        }
    }

    struct FailingBackup;
    impl BackupTool for FailingBackup {
        fn run_backup(
            &self,
            _logger: &RunLogger,
            _database: &str,
            _destination: &Path,
        ) -> Result<StageResult> {
            Ok(StageResult::failure("sqlcmd exited with failure: Login failed"))
        }
        fn default_backup_dir(&self, _logger: &RunLogger) -> Result<Option<PathBuf>> {
            Ok(None)
        }
    }

    struct CountingArchiver {
        inner: ZipArchiveAdapter,
        calls: AtomicUsize,
    }
    impl CountingArchiver {
        fn new() -> Self {
            Self {
                inner: ZipArchiveAdapter,
                calls: AtomicUsize::new(0),
            }
        }
    }
    impl Archiver for CountingArchiver {
        fn compress(&self, logger: &RunLogger, source: &Path) -> Result<StageResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.compress(logger, source)
        }
    }

    struct FailingArchiver {
        calls: AtomicUsize,
    }
    impl FailingArchiver {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }
    impl Archiver for FailingArchiver {
        fn compress(&self, _logger: &RunLogger, source: &Path) -> Result<StageResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(StageResult::failure(format!(
                "could not archive {}: disk full",
                source.display()
            )))
        }
    }

    struct CountingRelocator {
        inner: LocalRelocationAdapter,
        calls: AtomicUsize,
    }
    impl CountingRelocator {
        fn new() -> Self {
            Self {
                inner: LocalRelocationAdapter,
                calls: AtomicUsize::new(0),
            }
        }
    }
    impl Relocator for CountingRelocator {
        fn relocate(
            &self,
            logger: &RunLogger,
            artifacts: &[PathBuf],
            destination: &Path,
        ) -> RelocationOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.relocate(logger, artifacts, destination)
        }
    }

    struct RecordingMailer {
        sent: Mutex<Vec<(String, String)>>,
    }
    impl RecordingMailer {
        fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
            }
        }
        fn messages(&self) -> Vec<(String, String)> {
            self.sent.lock().unwrap().clone()
        }
    }
    impl Mailer for RecordingMailer {
        fn notify(&self, subject: &str, body: &str) -> Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push((subject.to_string(), body.to_string()));
            Ok(())
        }
    }

    struct FailingMailer;
    impl Mailer for FailingMailer {
        fn notify(&self, _subject: &str, _body: &str) -> Result<()> {
            Err(BackupError::Notification("relay unreachable".to_string()))
        }
    }

    // ---- Fixtures ----

    struct Fixture {
        _root: tempfile::TempDir,
        engine_dir: PathBuf,
        dest_dir: PathBuf,
        log_dir: PathBuf,
    }

    fn fixture() -> Fixture {
        let root = tempfile::tempdir().unwrap();
        let engine_dir = root.path().join("engine");
        let dest_dir = root.path().join("secondary");
        let log_dir = root.path().join("logs");
        fs::create_dir_all(&engine_dir).unwrap();
        Fixture {
            engine_dir,
            dest_dir,
            log_dir,
            _root: root,
        }
    }

    fn config_for(fx: &Fixture, policy: ArchiveFailurePolicy) -> AppConfig {
        AppConfig {
            database: DatabaseConfig {
                server: "S1".to_string(),
                database: "SalesDB".to_string(),
                default_backup_dir: Some(fx.engine_dir.to_string_lossy().into_owned()),
                timeout_secs: Some(5),
            },
            destination: DestinationConfig {
                directory: fx.dest_dir.to_string_lossy().into_owned(),
                log_dir: Some(fx.log_dir.to_string_lossy().into_owned()),
                on_archive_failure: policy,
            },
            notification: NotificationConfig {
                from: "backup@example.com".to_string(),
                to: "ops@example.com".to_string(),
                password: "app-password".to_string(),
            },
            provisioning: None,
        }
    }

    fn dest_basenames(fx: &Fixture) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(&fx.dest_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        names
    }

    fn log_contents(report: &RunReport) -> String {
        fs::read_to_string(&report.log_path).unwrap()
    }

    // ---- Tests ----

    #[test]
    fn full_run_relocates_both_artifacts_and_notifies_success_once() {
        let fx = fixture();
        let mailer = Arc::new(RecordingMailer::new());
        let orchestrator = PipelineOrchestrator::new(
            Arc::new(FileWritingBackup::new()),
            Arc::new(CountingArchiver::new()),
            Arc::new(CountingRelocator::new()),
            mailer.clone(),
            config_for(&fx, ArchiveFailurePolicy::Abort),
        );

        let report = orchestrator.run().unwrap();
        assert!(report.succeeded());
        assert_eq!(report.outcome, RunState::RelocateDone);

        // Exactly the snapshot and its archive, both named after the run.
        let names = dest_basenames(&fx);
        assert_eq!(names.len(), 2);
        assert!(names[0].starts_with("SalesDB_") && names[0].ends_with(".bak"));
        assert!(names[1].starts_with("SalesDB_") && names[1].ends_with(".zip"));
        assert_eq!(names[0].trim_end_matches(".bak"), names[1].trim_end_matches(".zip"));

        // The engine directory no longer holds the snapshot.
        assert_eq!(fs::read_dir(&fx.engine_dir).unwrap().count(), 0);

        let messages = mailer.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].0, SUBJECT_SUCCESS);
        for path in &report.artifacts {
            assert!(messages[0].1.contains(&path.display().to_string()));
        }

        let log = log_contents(&report);
        for state in ["BACKUP_PENDING", "BACKUP_DONE", "ARCHIVE_DONE", "RELOCATE_DONE", "NOTIFIED", "END"] {
            assert!(log.contains(&format!("state: {}", state)), "missing {}", state);
        }

        // The run lock was released.
        assert!(!fx.dest_dir.join("SalesDB.lock").exists());
    }

    #[test]
    fn backup_failure_short_circuits_and_notifies_failure() {
        let fx = fixture();
        let archiver = Arc::new(CountingArchiver::new());
        let relocator = Arc::new(CountingRelocator::new());
        let mailer = Arc::new(RecordingMailer::new());
        let orchestrator = PipelineOrchestrator::new(
            Arc::new(FailingBackup),
            archiver.clone(),
            relocator.clone(),
            mailer.clone(),
            config_for(&fx, ArchiveFailurePolicy::Abort),
        );

        let report = orchestrator.run().unwrap();
        assert_eq!(report.outcome, RunState::BackupFailed);
        assert!(report.artifacts.is_empty());

        // Later stages were never invoked.
        assert_eq!(archiver.calls.load(Ordering::SeqCst), 0);
        assert_eq!(relocator.calls.load(Ordering::SeqCst), 0);

        let messages = mailer.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].0, SUBJECT_FAILURE);

        let log = log_contents(&report);
        assert!(log.contains("state: BACKUP_FAILED"));
        assert!(log.contains("state: END"));
        assert!(!log.contains("state: ARCHIVE_DONE"));
    }

    #[test]
    fn a_success_claim_without_a_file_on_disk_fails_the_backup() {
        let fx = fixture();
        let mailer = Arc::new(RecordingMailer::new());
        let orchestrator = PipelineOrchestrator::new(
            Arc::new(LyingBackup),
            Arc::new(CountingArchiver::new()),
            Arc::new(CountingRelocator::new()),
            mailer.clone(),
            config_for(&fx, ArchiveFailurePolicy::Abort),
        );

        let report = orchestrator.run().unwrap();
        assert_eq!(report.outcome, RunState::BackupFailed);
        assert_eq!(mailer.messages()[0].0, SUBJECT_FAILURE);
    }

    #[test]
    fn archive_failure_aborts_under_the_canonical_policy() {
        let fx = fixture();
        let relocator = Arc::new(CountingRelocator::new());
        let mailer = Arc::new(RecordingMailer::new());
        let orchestrator = PipelineOrchestrator::new(
            Arc::new(FileWritingBackup::new()),
            Arc::new(FailingArchiver::new()),
            relocator.clone(),
            mailer.clone(),
            config_for(&fx, ArchiveFailurePolicy::Abort),
        );

        let report = orchestrator.run().unwrap();
        assert_eq!(report.outcome, RunState::ArchiveFailed);
        assert_eq!(relocator.calls.load(Ordering::SeqCst), 0);
        assert_eq!(mailer.messages()[0].0, SUBJECT_FAILURE);

        let log = log_contents(&report);
        assert!(log.contains("state: ARCHIVE_FAILED"));
        assert!(log.contains("state: END"));
    }

    #[test]
    fn archive_failure_with_continue_policy_reports_degraded_success() {
        let fx = fixture();
        let mailer = Arc::new(RecordingMailer::new());
        let orchestrator = PipelineOrchestrator::new(
            Arc::new(FileWritingBackup::new()),
            Arc::new(FailingArchiver::new()),
            Arc::new(CountingRelocator::new()),
            mailer.clone(),
            config_for(&fx, ArchiveFailurePolicy::Continue),
        );

        let report = orchestrator.run().unwrap();
        assert!(report.succeeded());

        // Only the snapshot reached the destination.
        let names = dest_basenames(&fx);
        assert_eq!(names.len(), 1);
        assert!(names[0].ends_with(".bak"));

        let messages = mailer.messages();
        assert_eq!(messages[0].0, SUBJECT_SUCCESS);
        assert!(messages[0].1.contains("Advertencia"));

        let log = log_contents(&report);
        assert!(log.contains("state: ARCHIVE_FAILED"));
        assert!(log.contains("state: RELOCATE_DONE"));
    }

    #[test]
    fn mailer_failure_never_changes_the_recorded_outcome() {
        let fx = fixture();
        let orchestrator = PipelineOrchestrator::new(
            Arc::new(FileWritingBackup::new()),
            Arc::new(CountingArchiver::new()),
            Arc::new(CountingRelocator::new()),
            Arc::new(FailingMailer),
            config_for(&fx, ArchiveFailurePolicy::Abort),
        );

        let report = orchestrator.run().unwrap();
        assert!(report.succeeded());

        let log = log_contents(&report);
        assert!(log.contains("state: RELOCATE_DONE"));
        assert!(log.contains("ERROR sending notification"));
        assert!(log.contains("state: END"));
    }

    #[test]
    fn a_held_lock_fails_the_run_before_any_stage() {
        let fx = fixture();
        let backup = Arc::new(FileWritingBackup::new());
        fs::create_dir_all(&fx.dest_dir).unwrap();
        fs::write(fx.dest_dir.join("SalesDB.lock"), "202401011200\n").unwrap();

        let orchestrator = PipelineOrchestrator::new(
            backup.clone(),
            Arc::new(CountingArchiver::new()),
            Arc::new(CountingRelocator::new()),
            Arc::new(RecordingMailer::new()),
            config_for(&fx, ArchiveFailurePolicy::Abort),
        );

        let err = orchestrator.run().unwrap_err();
        assert!(matches!(err, BackupError::Lock(_)));
        assert_eq!(backup.calls.load(Ordering::SeqCst), 0);
    }
}
