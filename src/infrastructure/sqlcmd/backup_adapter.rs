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

//! Infrastructure adapter that produces database snapshots through `sqlcmd`.

use crate::domain::entities::StageResult;
use crate::domain::errors::Result;
use crate::infrastructure::sqlcmd::runner::run_tool;
use crate::infrastructure::sqlcmd::sql_utils::{bracket, escape_literal, validate_identifier};
use crate::logging::RunLogger;
use crate::ports::backup_port::BackupTool;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default wall-clock bound for one `sqlcmd` invocation.
pub const DEFAULT_TIMEOUT_SECS: u64 = 1800;

/// Concrete implementation of `BackupTool` for SQL Server.
///
/// The engine is never linked in-process; snapshots are requested through
/// the `sqlcmd` client with an argument-vector invocation (no shell), and
/// the snapshot file's presence on disk is the authoritative success signal.
pub struct SqlcmdBackupAdapter {
    program: String,
    server: String,
    timeout: Duration,
}

impl SqlcmdBackupAdapter {
    /// Creates a new adapter for `server`. `program` is the client binary,
    /// normally `sqlcmd`.
    pub fn new(program: impl Into<String>, server: impl Into<String>, timeout_secs: Option<u64>) -> Self {
        Self {
            program: program.into(),
            server: server.into(),
            timeout: Duration::from_secs(timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
        }
    }

    fn invoke(&self, extra_args: &[&str], query: &str) -> Result<super::runner::ToolOutput> {
        let mut args: Vec<String> = vec!["-S".to_string(), self.server.clone()];
        args.extend(extra_args.iter().map(|s| s.to_string()));
        args.push("-Q".to_string());
        args.push(query.to_string());
        run_tool(&self.program, &args, self.timeout)
    }
}

impl BackupTool for SqlcmdBackupAdapter {
    fn run_backup(
        &self,
        logger: &RunLogger,
        database: &str,
        destination: &Path,
    ) -> Result<StageResult> {
        validate_identifier(database)?;
        // WITH INIT: an existing file at the destination is replaced, never
        // appended to.
        let query = format!(
            "BACKUP DATABASE {} TO DISK = N'{}' WITH INIT",
            bracket(database),
            escape_literal(&destination.to_string_lossy())
        );

        logger.record(&format!("Running backup -> {}", destination.display()));

        let out = self.invoke(&[], &query)?;
        if !out.stdout.is_empty() {
            logger.record(&format!("STDOUT:\n{}", out.stdout.trim_end()));
        }
        if !out.stderr.is_empty() {
            logger.record(&format!("STDERR:\n{}", out.stderr.trim_end()));
        }

        // Exit code 0 is necessary but not sufficient: the engine can accept
        // the command and still write nothing at the expected path.
        if !out.exit_ok {
            return Ok(StageResult::failure(format!(
                "{} exited with failure: {}",
                self.program,
                out.stderr.trim()
            )));
        }
        if !destination.exists() {
            return Ok(StageResult::failure(format!(
                "{} reported success but no snapshot exists at {}",
                self.program,
                destination.display()
            )));
        }
        Ok(StageResult::success(destination.to_path_buf(), out.stdout))
    }

    fn default_backup_dir(&self, logger: &RunLogger) -> Result<Option<PathBuf>> {
        logger.record("Querying engine default backup directory...");
        let query = "SET NOCOUNT ON; \
             EXEC master.dbo.xp_instance_regread \
             N'HKEY_LOCAL_MACHINE', \
             N'Software\\Microsoft\\MSSQLServer\\MSSQLServer', \
             N'BackupDirectory';";

        // -h -1 drops headers, -W trims trailing whitespace.
        let out = self.invoke(&["-h", "-1", "-W"], query)?;
        if !out.exit_ok {
            return Ok(None);
        }

        let dir = out
            .stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty() && (line.contains('\\') || line.contains('/')))
            .map(PathBuf::from);
        Ok(dir)
    }
}
