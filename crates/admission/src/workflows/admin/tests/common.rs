use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::config::{AuthConfig, BootstrapAdminConfig};
use crate::workflows::admin::domain::{Admin, AdminId, NewAdmin, Role};
use crate::workflows::admin::repository::AdminRepository;
use crate::workflows::admin::service::AdminService;
use crate::workflows::registration::repository::RepositoryError;

#[derive(Default)]
pub(super) struct MemoryAdminRepository {
    pub(super) admins: Mutex<HashMap<AdminId, Admin>>,
}

impl AdminRepository for MemoryAdminRepository {
    fn insert(&self, mut admin: Admin) -> Result<Admin, RepositoryError> {
        let mut guard = self.admins.lock().expect("admin mutex poisoned");
        if guard
            .values()
            .any(|stored| stored.username == admin.username || stored.email == admin.email)
        {
            return Err(RepositoryError::Conflict);
        }
        admin.id = AdminId(Uuid::new_v4().to_string());
        guard.insert(admin.id.clone(), admin.clone());
        Ok(admin)
    }

    fn update(&self, admin: Admin) -> Result<Admin, RepositoryError> {
        let mut guard = self.admins.lock().expect("admin mutex poisoned");
        if !guard.contains_key(&admin.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(admin.id.clone(), admin.clone());
        Ok(admin)
    }

    fn fetch(&self, id: &AdminId) -> Result<Option<Admin>, RepositoryError> {
        let guard = self.admins.lock().expect("admin mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn fetch_by_username(&self, username: &str) -> Result<Option<Admin>, RepositoryError> {
        let guard = self.admins.lock().expect("admin mutex poisoned");
        Ok(guard
            .values()
            .find(|admin| admin.username == username)
            .cloned())
    }

    fn fetch_by_email(&self, email: &str) -> Result<Option<Admin>, RepositoryError> {
        let guard = self.admins.lock().expect("admin mutex poisoned");
        Ok(guard.values().find(|admin| admin.email == email).cloned())
    }

    fn list(&self) -> Result<Vec<Admin>, RepositoryError> {
        let guard = self.admins.lock().expect("admin mutex poisoned");
        let mut admins: Vec<Admin> = guard.values().cloned().collect();
        admins.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(admins)
    }
}

pub(super) fn service() -> (
    AdminService<MemoryAdminRepository>,
    Arc<MemoryAdminRepository>,
) {
    service_with_ttl(AuthConfig::default())
}

pub(super) fn service_with_ttl(
    auth: AuthConfig,
) -> (
    AdminService<MemoryAdminRepository>,
    Arc<MemoryAdminRepository>,
) {
    let repository = Arc::new(MemoryAdminRepository::default());
    (AdminService::new(repository.clone(), auth), repository)
}

pub(super) fn bootstrap_config() -> BootstrapAdminConfig {
    BootstrapAdminConfig {
        username: "admin".to_string(),
        email: "admin@example.org".to_string(),
        password: "admin123".to_string(),
        full_name: "Super Administrator".to_string(),
    }
}

/// Seed the bootstrap super admin and return the stored account.
pub(super) fn seeded_super_admin(
    service: &AdminService<MemoryAdminRepository>,
    repository: &MemoryAdminRepository,
) -> Admin {
    service
        .bootstrap_super_admin(&bootstrap_config())
        .expect("bootstrap runs")
        .expect("bootstrap creates the account");
    repository
        .fetch_by_username("admin")
        .expect("lookup succeeds")
        .expect("account present")
}

pub(super) fn new_admin(username: &str, email: &str, role: Role) -> NewAdmin {
    NewAdmin {
        username: username.to_string(),
        email: email.to_string(),
        password: "changeme1".to_string(),
        full_name: "Registration Reviewer".to_string(),
        role,
        permissions: Default::default(),
    }
}
