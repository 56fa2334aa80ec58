//! Helpers for building T-SQL fragments from configuration values.
//!
//! Configuration strings are never interpolated raw into a command:
//! identifiers must pass a strict allowlist before being bracket-quoted, and
//! string literals are escaped by quote doubling.

use crate::domain::errors::{BackupError, Result};

/// Validates a SQL Server identifier (database, login, user, or role name).
///
/// Allows ASCII alphanumerics, underscore, and dollar. Everything else is
/// rejected so bracket quoting cannot be escaped from.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(BackupError::Config("empty SQL identifier".to_string()));
    }
    if name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
    {
        Ok(())
    } else {
        Err(BackupError::Config(format!(
            "invalid SQL identifier: {}",
            name
        )))
    }
}

/// Wraps a validated identifier in brackets.
pub fn bracket(name: &str) -> String {
    format!("[{}]", name)
}

/// Escapes a value for use inside a single-quoted T-SQL literal.
pub fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_identifiers() {
        assert!(validate_identifier("SalesDB").is_ok());
        assert!(validate_identifier("db_owner").is_ok());
        assert!(validate_identifier("user$2").is_ok());
    }

    #[test]
    fn rejects_quoting_and_separator_characters() {
        for bad in ["", "Sales DB", "x]y", "a;b", "n'ame", "d--b", "a.b"] {
            assert!(validate_identifier(bad).is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn literal_escaping_doubles_quotes() {
        assert_eq!(escape_literal("it's"), "it''s");
        assert_eq!(escape_literal("plain"), "plain");
    }

    #[test]
    fn bracket_wraps_name() {
        assert_eq!(bracket("SalesDB"), "[SalesDB]");
    }
}
