//! # Provisioning Port
//!
//! Contract for the login/user/role-grant lifecycle, used independently of
//! the backup pipeline. Both operations are idempotent: re-running them
//! against principals already in the desired state is a no-op.

use crate::domain::errors::Result;

/// `PrincipalProvisioner` manages a server login and its database user.
pub trait PrincipalProvisioner: Send + Sync {
    /// Creates the login (if missing), the database user (if missing), and
    /// grants each role in `roles` to the user.
    fn ensure_login_and_user(
        &self,
        database: &str,
        login: &str,
        login_password: &str,
        user: &str,
        roles: &[String],
    ) -> Result<()>;

    /// Drops the database user (if present) and then the login (if present).
    fn drop_login_and_user(&self, database: &str, user: &str, login: &str) -> Result<()>;
}
