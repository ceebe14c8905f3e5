use super::domain::{Admin, AdminId};
use crate::workflows::registration::repository::RepositoryError;

/// Storage abstraction over admin accounts.
///
/// `insert` assigns the account identity and enforces uniqueness of
/// username and email, failing with [`RepositoryError::Conflict`].
pub trait AdminRepository: Send + Sync {
    fn insert(&self, admin: Admin) -> Result<Admin, RepositoryError>;
    fn update(&self, admin: Admin) -> Result<Admin, RepositoryError>;
    fn fetch(&self, id: &AdminId) -> Result<Option<Admin>, RepositoryError>;
    fn fetch_by_username(&self, username: &str) -> Result<Option<Admin>, RepositoryError>;
    fn fetch_by_email(&self, email: &str) -> Result<Option<Admin>, RepositoryError>;
    fn list(&self) -> Result<Vec<Admin>, RepositoryError>;
}
