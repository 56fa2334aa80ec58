//! # Archive Port
//!
//! Contract for wrapping a produced artifact into a compressed container.

use crate::domain::entities::StageResult;
use crate::domain::errors::Result;
use crate::logging::RunLogger;
use std::path::Path;

/// `Archiver` produces a single-entry compressed container for a snapshot.
pub trait Archiver: Send + Sync {
    /// Compresses `source` into a container at a deterministic sibling path
    /// (same base name, archive extension). The source file is left in
    /// place; the next stage relocates both.
    fn compress(&self, logger: &RunLogger, source: &Path) -> Result<StageResult>;
}
