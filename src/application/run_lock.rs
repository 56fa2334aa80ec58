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

//! Run-scope locking.
//!
//! Snapshot names carry minute-granularity timestamps, so two concurrent
//! runs against the same database would silently overwrite each other's
//! artifacts. A lock file keyed by database name serializes runs; it is
//! released on every exit path when the guard drops.

use crate::domain::errors::{BackupError, Result};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Guard holding the run-scope lock for one database.
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Takes the lock for `database` inside `dir`, creating `dir` if needed.
    ///
    /// The lock file records the owning run's timestamp so an operator can
    /// see who holds it.
    pub fn acquire(dir: &Path, database: &str, run_timestamp: &str) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.lock", database));
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                let _ = writeln!(file, "{}", run_timestamp);
                Ok(Self { path })
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(BackupError::Lock(format!(
                "another run holds {}",
                path.display()
            ))),
            Err(e) => Err(BackupError::Io(e)),
        }
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}
