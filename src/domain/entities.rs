//! # Domain Entities
//!
//! Entities are the "Nouns" of the pipeline: the files a run produces
//! (`Artifact`), the report card each stage hands back (`StageResult`), the
//! position of the run in its state machine (`RunState`), and the summary
//! returned to the caller (`RunReport`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// `ArtifactKind` identifies which stage produced a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArtifactKind {
    /// The raw `.bak` snapshot written by the database engine.
    Snapshot,
    /// The compressed container wrapping the snapshot.
    Archive,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Snapshot => write!(f, "SNAPSHOT"),
            ArtifactKind::Archive => write!(f, "ARCHIVE"),
        }
    }
}

/// `Artifact` is a path-identified file produced by a stage.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
}

impl Artifact {
    pub fn new(kind: ArtifactKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    /// Checks the filesystem for the artifact.
    ///
    /// The backup tool can report success without writing a file to the
    /// expected path, so existence is never inferred from a return code.
    pub fn verify_exists(&self) -> bool {
        self.path.exists()
    }
}

/// `StageResult` is the report card for one pipeline stage.
#[derive(Debug, Clone)]
pub struct StageResult {
    /// Whether the stage's output is actually usable by the next stage.
    pub succeeded: bool,
    /// The file the stage produced, when there is one.
    pub output: Option<PathBuf>,
    /// Captured stdout/stderr or error text from the stage.
    pub diagnostics: String,
}

impl StageResult {
    /// Helper to create a successful result.
    pub fn success(output: PathBuf, diagnostics: impl Into<String>) -> Self {
        Self {
            succeeded: true,
            output: Some(output),
            diagnostics: diagnostics.into(),
        }
    }

    /// Helper to create a failure result.
    pub fn failure(diagnostics: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            output: None,
            diagnostics: diagnostics.into(),
        }
    }
}

/// Outcome of relocating a batch of artifacts.
///
/// Relocation is not atomic across artifacts: `moved` lists what landed in
/// the destination before any failure, so callers can report partial moves.
#[derive(Debug, Clone)]
pub struct RelocationOutcome {
    /// Final paths of the artifacts that were moved, in input order.
    pub moved: Vec<PathBuf>,
    /// The artifact that failed, with the reason, if any did.
    pub failed: Option<(PathBuf, String)>,
}

impl RelocationOutcome {
    pub fn succeeded(&self) -> bool {
        self.failed.is_none()
    }
}

/// `RunState` is where a run currently sits in the pipeline state machine.
///
/// Transitions are logged by name, so the run's log file alone is enough to
/// determine the final outcome even when the notification email never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Start,
    BackupPending,
    BackupDone,
    BackupFailed,
    ArchiveDone,
    ArchiveFailed,
    RelocateDone,
    RelocateFailed,
    Notified,
    End,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Start => "START",
            RunState::BackupPending => "BACKUP_PENDING",
            RunState::BackupDone => "BACKUP_DONE",
            RunState::BackupFailed => "BACKUP_FAILED",
            RunState::ArchiveDone => "ARCHIVE_DONE",
            RunState::ArchiveFailed => "ARCHIVE_FAILED",
            RunState::RelocateDone => "RELOCATE_DONE",
            RunState::RelocateFailed => "RELOCATE_FAILED",
            RunState::Notified => "NOTIFIED",
            RunState::End => "END",
        };
        write!(f, "{}", name)
    }
}

/// `RunReport` summarizes one finished run for the caller.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// The terminal stage state the run reached before END.
    pub outcome: RunState,
    /// Final paths of the artifacts that reached the destination.
    pub artifacts: Vec<PathBuf>,
    /// The run's log file, the durable record of what happened.
    pub log_path: PathBuf,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.outcome == RunState::RelocateDone
    }
}
