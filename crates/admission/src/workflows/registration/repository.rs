use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{
    ApplicationId, ApplicationRecord, DocumentType, RegistrationNumber, RegistrationStatus,
};

/// Storage abstraction over application records so the workflow can be
/// exercised in isolation.
///
/// `insert` assigns the record identity (any caller-supplied id is
/// replaced), stores the record at revision 1, and enforces uniqueness of
/// registration number and applicant email. `update` is conditional: the
/// submitted record's `revision` must match the stored copy, and the
/// stored revision is bumped on success.
pub trait ApplicationRepository: Send + Sync {
    fn insert(&self, record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError>;
    fn update(&self, record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError>;
    fn fetch(
        &self,
        number: &RegistrationNumber,
    ) -> Result<Option<ApplicationRecord>, RepositoryError>;
    fn fetch_by_id(&self, id: &ApplicationId)
        -> Result<Option<ApplicationRecord>, RepositoryError>;
    fn find_by_email(&self, email: &str) -> Result<Option<ApplicationRecord>, RepositoryError>;
    /// Newest-first listing with status filter, substring search, and
    /// page/limit windowing.
    fn list(&self, filter: &RegistrationFilter) -> Result<RegistrationPage, RepositoryError>;
    /// Every record, optionally narrowed to one status. Export path.
    fn all(
        &self,
        status: Option<RegistrationStatus>,
    ) -> Result<Vec<ApplicationRecord>, RepositoryError>;
    fn status_counts(&self) -> Result<BTreeMap<RegistrationStatus, u64>, RepositoryError>;
    /// Draft records created at or before the cutoff, for reminder sweeps.
    fn stale_drafts(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<ApplicationRecord>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("record was modified by another writer")]
    StaleRevision,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Listing filter for the admin index.
#[derive(Debug, Clone)]
pub struct RegistrationFilter {
    pub status: Option<RegistrationStatus>,
    pub search: Option<String>,
    pub page: usize,
    pub limit: usize,
}

impl Default for RegistrationFilter {
    fn default() -> Self {
        Self {
            status: None,
            search: None,
            page: 1,
            limit: 10,
        }
    }
}

impl RegistrationFilter {
    /// True when the record passes the status and search predicates.
    pub fn matches(&self, record: &ApplicationRecord) -> bool {
        if let Some(status) = self.status {
            if record.status != status {
                return false;
            }
        }
        match &self.search {
            Some(needle) if !needle.trim().is_empty() => {
                let needle = needle.trim().to_lowercase();
                record
                    .registration_number
                    .as_str()
                    .to_lowercase()
                    .contains(&needle)
                    || record.personal.full_name.to_lowercase().contains(&needle)
                    || record.personal.email.to_lowercase().contains(&needle)
            }
            _ => true,
        }
    }
}

/// One page of listing results plus pagination bookkeeping.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationPage {
    pub records: Vec<ApplicationRecord>,
    pub page: usize,
    pub limit: usize,
    pub total: usize,
}

impl RegistrationPage {
    pub fn pages(&self) -> usize {
        if self.limit == 0 {
            return 0;
        }
        self.total.div_ceil(self.limit)
    }
}

/// Blob storage for uploaded document binaries, keyed by registration
/// number and document slot. Returns the stored reference recorded on the
/// application.
pub trait DocumentStore: Send + Sync {
    fn store(
        &self,
        number: &RegistrationNumber,
        document: DocumentType,
        payload: &[u8],
        original_name: &str,
        content_type: &str,
    ) -> Result<StoredBlob, BlobError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub storage_key: String,
    pub filename: String,
}

#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("blob storage unavailable: {0}")]
    Unavailable(String),
}
