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

//! # Mailer Port
//!
//! Contract for delivering the single outcome message of a run.

use crate::domain::errors::Result;

/// `Mailer` sends one plain-text message to the configured operator address.
///
/// Delivery is best-effort: callers log and swallow any error, and the run's
/// recorded outcome never changes because the operator could not be told.
pub trait Mailer: Send + Sync {
    fn notify(&self, subject: &str, body: &str) -> Result<()>;
}
