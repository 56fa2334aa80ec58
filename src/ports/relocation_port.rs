//! # Relocation Port
//!
//! Contract for moving run artifacts to their durable secondary location.

use crate::domain::entities::RelocationOutcome;
use crate::logging::RunLogger;
use std::path::{Path, PathBuf};

/// `Relocator` moves artifacts into a destination directory.
pub trait Relocator: Send + Sync {
    /// Ensures `destination` exists (idempotent) and moves each artifact
    /// into it, preserving basenames and overwriting on collision.
    ///
    /// Not atomic across artifacts: the outcome reports which artifacts
    /// landed before any failure.
    fn relocate(
        &self,
        logger: &RunLogger,
        artifacts: &[PathBuf],
        destination: &Path,
    ) -> RelocationOutcome;
}
