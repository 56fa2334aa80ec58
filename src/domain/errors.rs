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

//! Core error definitions for the backup pipeline.
//!
//! This module provides a centralized `BackupError` enum and a `Result` type
//! used throughout the application. The variants separate the three failure
//! families the pipeline cares about: external-process failures, I/O
//! failures, and notification failures. The first two are fatal to a run;
//! notification failures are always logged and swallowed by the caller.

use thiserror::Error;

/// Error types encountered during a pipeline run.
#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("External process failure: {0}")]
    ExternalProcess(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive failed: {0}")]
    Archive(String),

    #[error("Notification failed: {0}")]
    Notification(String),

    #[error("Run lock unavailable: {0}")]
    Lock(String),
}

/// A specialized Result type for the backup pipeline.
pub type Result<T> = std::result::Result<T, BackupError>;
