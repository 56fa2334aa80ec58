// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Backup Port
//!
//! This Port defines the contract for the "Snapshot Producer".
//!
//! Anything that implements `BackupTool` must be able to instruct the
//! database engine to write a full snapshot to a given path and report
//! whether the file actually exists afterwards.

use crate::domain::entities::StageResult;
use crate::domain::errors::Result;
use crate::logging::RunLogger;
use std::path::{Path, PathBuf};

/// `BackupTool` produces a point-in-time snapshot of one database.
pub trait BackupTool: Send + Sync {
    /// Writes a full snapshot of `database` to `destination`, replacing any
    /// file already at that path.
    ///
    /// The returned `StageResult` is successful only when the snapshot file
    /// exists on disk after the tool exits; the tool's exit code alone is
    /// never trusted.
    fn run_backup(&self, logger: &RunLogger, database: &str, destination: &Path)
        -> Result<StageResult>;

    /// The engine's registered default backup directory, if discoverable.
    ///
    /// Used when no backup directory is configured for the run.
    fn default_backup_dir(&self, logger: &RunLogger) -> Result<Option<PathBuf>>;
}
