//! Infrastructure adapter for the login/user/role lifecycle.
//!
//! Every statement is guarded with `IF EXISTS` / `IF NOT EXISTS`, so both
//! operations can be re-run safely against principals already in the desired
//! state. Each operation is a single `sqlcmd` process; the session is
//! released when the process exits, on every path.

use crate::domain::errors::{BackupError, Result};
use crate::infrastructure::sqlcmd::runner::run_tool;
use crate::infrastructure::sqlcmd::sql_utils::{bracket, escape_literal, validate_identifier};
use crate::ports::provisioning_port::PrincipalProvisioner;
use log::info;
use std::time::Duration;

/// Concrete implementation of `PrincipalProvisioner` for SQL Server.
pub struct SqlcmdProvisioningAdapter {
    program: String,
    server: String,
    admin_user: Option<String>,
    admin_password: Option<String>,
    timeout: Duration,
}

impl SqlcmdProvisioningAdapter {
    pub fn new(
        program: impl Into<String>,
        server: impl Into<String>,
        admin_user: Option<String>,
        admin_password: Option<String>,
        timeout_secs: Option<u64>,
    ) -> Self {
        Self {
            program: program.into(),
            server: server.into(),
            admin_user,
            admin_password,
            timeout: Duration::from_secs(timeout_secs.unwrap_or(super::backup_adapter::DEFAULT_TIMEOUT_SECS)),
        }
    }

    fn invoke(&self, script: &str) -> Result<()> {
        let mut args: Vec<String> = vec!["-S".to_string(), self.server.clone()];
        // Admin credentials are optional; without them sqlcmd uses the
        // invoking account's trusted connection.
        if let (Some(user), Some(pass)) = (&self.admin_user, &self.admin_password) {
            args.push("-U".to_string());
            args.push(user.clone());
            args.push("-P".to_string());
            args.push(pass.clone());
        }
        args.push("-b".to_string());
        args.push("-Q".to_string());
        args.push(script.to_string());

        let out = run_tool(&self.program, &args, self.timeout)?;
        if !out.stdout.trim().is_empty() {
            info!("{}", out.stdout.trim_end());
        }
        if out.exit_ok {
            Ok(())
        } else {
            Err(BackupError::ExternalProcess(format!(
                "{} failed: {}",
                self.program,
                out.stderr.trim()
            )))
        }
    }
}

/// Builds the idempotent create-login/create-user/grant-roles script.
fn build_ensure_script(
    database: &str,
    login: &str,
    login_password: &str,
    user: &str,
    roles: &[String],
) -> Result<String> {
    validate_identifier(database)?;
    validate_identifier(login)?;
    validate_identifier(user)?;
    for role in roles {
        validate_identifier(role)?;
    }

    let mut script = format!(
        "IF NOT EXISTS (SELECT * FROM sys.server_principals WHERE name = N'{login_lit}') \
         BEGIN CREATE LOGIN {login_id} WITH PASSWORD = N'{password_lit}'; END; \
         USE {db_id}; \
         IF NOT EXISTS (SELECT * FROM sys.database_principals WHERE name = N'{user_lit}') \
         BEGIN CREATE USER {user_id} FOR LOGIN {login_id}; END;",
        login_lit = escape_literal(login),
        login_id = bracket(login),
        password_lit = escape_literal(login_password),
        db_id = bracket(database),
        user_lit = escape_literal(user),
        user_id = bracket(user),
    );
    for role in roles {
        script.push_str(&format!(
            " EXEC sp_addrolemember N'{}', N'{}';",
            escape_literal(role),
            escape_literal(user)
        ));
    }
    Ok(script)
}

/// Builds the idempotent drop-user/drop-login script.
fn build_drop_script(database: &str, user: &str, login: &str) -> Result<String> {
    validate_identifier(database)?;
    validate_identifier(user)?;
    validate_identifier(login)?;

    Ok(format!(
        "USE {db_id}; \
         IF EXISTS (SELECT * FROM sys.database_principals WHERE name = N'{user_lit}') \
         BEGIN DROP USER {user_id}; END; \
         IF EXISTS (SELECT * FROM sys.server_principals WHERE name = N'{login_lit}') \
         BEGIN DROP LOGIN {login_id}; END;",
        db_id = bracket(database),
        user_lit = escape_literal(user),
        user_id = bracket(user),
        login_lit = escape_literal(login),
        login_id = bracket(login),
    ))
}

impl PrincipalProvisioner for SqlcmdProvisioningAdapter {
    fn ensure_login_and_user(
        &self,
        database: &str,
        login: &str,
        login_password: &str,
        user: &str,
        roles: &[String],
    ) -> Result<()> {
        info!("Ensuring login '{}' and user '{}' on {}", login, user, database);
        let script = build_ensure_script(database, login, login_password, user, roles)?;
        self.invoke(&script)?;
        info!("Login/user/roles in desired state");
        Ok(())
    }

    fn drop_login_and_user(&self, database: &str, user: &str, login: &str) -> Result<()> {
        info!("Dropping user '{}' and login '{}' on {}", user, login, database);
        let script = build_drop_script(database, user, login)?;
        self.invoke(&script)?;
        info!("User/login removed (or already absent)");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_script_guards_every_statement() {
        let roles = vec!["db_owner".to_string(), "db_datareader".to_string()];
        let script =
            build_ensure_script("SalesDB", "backup_login", "p'w", "backup_user", &roles).unwrap();

        assert!(script.contains("IF NOT EXISTS (SELECT * FROM sys.server_principals"));
        assert!(script.contains("CREATE LOGIN [backup_login] WITH PASSWORD = N'p''w'"));
        assert!(script.contains("USE [SalesDB];"));
        assert!(script.contains("CREATE USER [backup_user] FOR LOGIN [backup_login]"));
        assert!(script.contains("EXEC sp_addrolemember N'db_owner', N'backup_user';"));
        assert!(script.contains("EXEC sp_addrolemember N'db_datareader', N'backup_user';"));
    }

    #[test]
    fn drop_script_is_guarded_and_ordered_user_first() {
        let script = build_drop_script("SalesDB", "backup_user", "backup_login").unwrap();
        let user_pos = script.find("DROP USER [backup_user]").unwrap();
        let login_pos = script.find("DROP LOGIN [backup_login]").unwrap();
        assert!(user_pos < login_pos);
        assert!(script.contains("IF EXISTS"));
    }

    #[test]
    fn unsafe_identifiers_never_reach_the_tool() {
        let err = build_ensure_script("SalesDB", "x]; DROP--", "pw", "u", &[]).unwrap_err();
        assert!(err.to_string().contains("invalid SQL identifier"));

        let err = build_drop_script("Sales DB", "u", "l").unwrap_err();
        assert!(err.to_string().contains("invalid SQL identifier"));
    }

    #[cfg(unix)]
    #[test]
    fn ensure_succeeds_against_a_zero_exit_tool() {
        let adapter =
            SqlcmdProvisioningAdapter::new("true", "S1", None, None, Some(5));
        adapter
            .ensure_login_and_user("SalesDB", "l", "pw", "u", &[])
            .unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn drop_surfaces_tool_failure() {
        let adapter =
            SqlcmdProvisioningAdapter::new("false", "S1", None, None, Some(5));
        let err = adapter.drop_login_and_user("SalesDB", "u", "l").unwrap_err();
        assert!(matches!(err, BackupError::ExternalProcess(_)));
    }
}
