use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{AuthConfig, BootstrapAdminConfig};
use crate::workflows::registration::repository::RepositoryError;
use crate::workflows::registration::validate::{is_plausible_email, ValidationReport};

use super::authorization;
use super::domain::{Admin, AdminId, AdminProfile, Capability, NewAdmin, Role};
use super::password::{hash_password, verify_password};
use super::repository::AdminRepository;
use super::session::TokenSessions;

const MIN_PASSWORD_LEN: usize = 6;

/// Issued on a successful login.
#[derive(Debug, Clone, Serialize)]
pub struct LoginSession {
    pub token: String,
    pub admin: AdminProfile,
}

/// Partial profile edit; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Error raised by admin account and session operations.
#[derive(Debug, thiserror::Error)]
pub enum AdminServiceError {
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("missing or invalid bearer token")]
    Unauthorized,
    #[error("insufficient role for this action")]
    Forbidden,
    #[error(transparent)]
    Validation(#[from] ValidationReport),
    #[error("username or email is already in use")]
    Conflict,
    #[error("current password does not match")]
    PasswordMismatch,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Account management and bearer-session issuance for the admin surface.
pub struct AdminService<A> {
    admins: Arc<A>,
    sessions: TokenSessions,
}

impl<A> AdminService<A>
where
    A: AdminRepository + 'static,
{
    pub fn new(admins: Arc<A>, auth: AuthConfig) -> Self {
        Self {
            admins,
            sessions: TokenSessions::new(Duration::hours(auth.token_ttl_hours)),
        }
    }

    /// Verify credentials and issue a bearer token. Unknown usernames,
    /// wrong passwords, and deactivated accounts are indistinguishable to
    /// the caller.
    pub fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<LoginSession, AdminServiceError> {
        let mut admin = self
            .admins
            .fetch_by_username(username.trim())?
            .ok_or(AdminServiceError::InvalidCredentials)?;

        if !admin.is_active || !verify_password(password, &admin.password_hash) {
            return Err(AdminServiceError::InvalidCredentials);
        }

        let now = Utc::now();
        admin.last_login = Some(now);
        let admin = self.admins.update(admin)?;

        let token = self.sessions.issue(&admin.id, now);
        Ok(LoginSession {
            token,
            admin: admin.profile(),
        })
    }

    /// Resolve a bearer token to an active admin account.
    pub fn authenticate(&self, token: &str) -> Result<Admin, AdminServiceError> {
        let admin_id = self
            .sessions
            .resolve(token, Utc::now())
            .ok_or(AdminServiceError::Unauthorized)?;

        let admin = self
            .admins
            .fetch(&admin_id)?
            .ok_or(AdminServiceError::Unauthorized)?;

        if !admin.is_active {
            return Err(AdminServiceError::Unauthorized);
        }
        Ok(admin)
    }

    pub fn logout(&self, token: &str) {
        self.sessions.revoke(token);
    }

    pub fn update_profile(
        &self,
        id: &AdminId,
        update: ProfileUpdate,
    ) -> Result<AdminProfile, AdminServiceError> {
        let mut report = ValidationReport::new();
        if let Some(full_name) = &update.full_name {
            if full_name.trim().is_empty() {
                report.push("full_name", "full name must not be empty");
            }
        }
        let email = update
            .email
            .map(|email| email.trim().to_ascii_lowercase());
        if let Some(email) = &email {
            if !is_plausible_email(email) {
                report.push("email", "email address is not valid");
            }
        }
        report.into_result()?;

        let mut admin = self
            .admins
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;

        if let Some(email) = email {
            if email != admin.email {
                if let Some(existing) = self.admins.fetch_by_email(&email)? {
                    if existing.id != admin.id {
                        return Err(AdminServiceError::Conflict);
                    }
                }
                admin.email = email;
            }
        }
        if let Some(full_name) = update.full_name {
            admin.full_name = full_name;
        }

        let admin = self.admins.update(admin)?;
        Ok(admin.profile())
    }

    pub fn change_password(
        &self,
        id: &AdminId,
        current: &str,
        new: &str,
    ) -> Result<(), AdminServiceError> {
        if new.len() < MIN_PASSWORD_LEN {
            let mut report = ValidationReport::new();
            report.push("new_password", "password must be at least 6 characters");
            return Err(report.into());
        }

        let mut admin = self
            .admins
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;

        if !verify_password(current, &admin.password_hash) {
            return Err(AdminServiceError::PasswordMismatch);
        }

        admin.password_hash = hash_password(new);
        self.admins.update(admin)?;
        Ok(())
    }

    /// Create a new admin account. Requires the super-admin role on the
    /// acting account regardless of its capability list.
    pub fn create_admin(
        &self,
        acting: &Admin,
        new: NewAdmin,
    ) -> Result<AdminProfile, AdminServiceError> {
        if !authorization::authorize_role(acting, &[Role::SuperAdmin]) {
            return Err(AdminServiceError::Forbidden);
        }

        let username = new.username.trim().to_string();
        let email = new.email.trim().to_ascii_lowercase();

        let mut report = ValidationReport::new();
        if username.is_empty() {
            report.push("username", "username is required");
        }
        if !is_plausible_email(&email) {
            report.push("email", "email address is not valid");
        }
        if new.password.len() < MIN_PASSWORD_LEN {
            report.push("password", "password must be at least 6 characters");
        }
        if new.full_name.trim().is_empty() {
            report.push("full_name", "full name is required");
        }
        report.into_result()?;

        if self.admins.fetch_by_username(&username)?.is_some()
            || self.admins.fetch_by_email(&email)?.is_some()
        {
            return Err(AdminServiceError::Conflict);
        }

        let admin = Admin {
            id: AdminId::unassigned(),
            username,
            email,
            password_hash: hash_password(&new.password),
            full_name: new.full_name,
            role: new.role,
            permissions: new.permissions,
            is_active: true,
            last_login: None,
            created_at: Utc::now(),
        };

        let stored = self.admins.insert(admin)?;
        Ok(stored.profile())
    }

    /// List every account, super-admin only. Hashes never leave this layer.
    pub fn list_admins(&self, acting: &Admin) -> Result<Vec<AdminProfile>, AdminServiceError> {
        if !authorization::authorize_role(acting, &[Role::SuperAdmin]) {
            return Err(AdminServiceError::Forbidden);
        }
        let admins = self.admins.list()?;
        Ok(admins.iter().map(Admin::profile).collect())
    }

    /// Seed the configured super admin on first start. Returns `None` when
    /// the username already exists.
    pub fn bootstrap_super_admin(
        &self,
        config: &BootstrapAdminConfig,
    ) -> Result<Option<AdminProfile>, AdminServiceError> {
        if self
            .admins
            .fetch_by_username(&config.username)?
            .is_some()
        {
            return Ok(None);
        }

        let admin = Admin {
            id: AdminId::unassigned(),
            username: config.username.clone(),
            email: config.email.trim().to_ascii_lowercase(),
            password_hash: hash_password(&config.password),
            full_name: config.full_name.clone(),
            role: Role::SuperAdmin,
            permissions: Capability::ALL.into_iter().collect(),
            is_active: true,
            last_login: None,
            created_at: Utc::now(),
        };

        let stored = self.admins.insert(admin)?;
        Ok(Some(stored.profile()))
    }
}
