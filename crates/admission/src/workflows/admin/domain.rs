use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for admin accounts, assigned by the record store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AdminId(pub String);

impl AdminId {
    pub fn unassigned() -> Self {
        Self(String::new())
    }

    pub fn is_unassigned(&self) -> bool {
        self.0.is_empty()
    }
}

/// Coarse role an admin operates under. Independent of the capability set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Reviewer,
    SuperAdmin,
}

/// Named permission tokens held by an admin, independent of role.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ViewRegistrations,
    EditRegistrations,
    ApproveRegistrations,
    ManageAdmins,
    ViewReports,
}

impl Capability {
    pub const ALL: [Capability; 5] = [
        Capability::ViewRegistrations,
        Capability::EditRegistrations,
        Capability::ApproveRegistrations,
        Capability::ManageAdmins,
        Capability::ViewReports,
    ];
}

/// One reviewer/operator account. The password hash never leaves the
/// service layer; API responses use [`AdminProfile`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admin {
    pub id: AdminId,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: String,
    pub role: Role,
    pub permissions: BTreeSet<Capability>,
    pub is_active: bool,
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Admin {
    pub fn profile(&self) -> AdminProfile {
        AdminProfile {
            id: self.id.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            role: self.role,
            permissions: self.permissions.clone(),
            is_active: self.is_active,
            last_login: self.last_login,
        }
    }
}

/// Credential-free view of an admin account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminProfile {
    pub id: AdminId,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub permissions: BTreeSet<Capability>,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
}

/// Payload for creating a new admin account.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAdmin {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: Role,
    #[serde(default)]
    pub permissions: BTreeSet<Capability>,
}
