use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use admission::workflows::admin::{Admin, AdminId, AdminRepository};
use admission::workflows::registration::{
    AllocatorError, ApplicationId, ApplicationRecord, ApplicationRepository, BlobError,
    DocumentStore, DocumentType, MessageChannel, Notice, NotificationError,
    RegistrationFilter, RegistrationNumber, RegistrationNumberAllocator, RegistrationPage,
    RegistrationStatus, RepositoryError, StoredBlob, TextChannel,
};
use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::info;
use uuid::Uuid;

const MAX_SEQUENCE: u32 = 9999;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
pub(crate) struct InMemoryApplicationRepository {
    records: Mutex<HashMap<RegistrationNumber, ApplicationRecord>>,
}

impl ApplicationRepository for InMemoryApplicationRepository {
    fn insert(&self, mut record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.registration_number)
            || guard
                .values()
                .any(|stored| stored.personal.email == record.personal.email)
        {
            return Err(RepositoryError::Conflict);
        }
        record.id = ApplicationId(Uuid::new_v4().to_string());
        record.revision = 1;
        guard.insert(record.registration_number.clone(), record.clone());
        Ok(record)
    }

    fn update(&self, mut record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let stored = guard
            .get(&record.registration_number)
            .ok_or(RepositoryError::NotFound)?;
        if stored.revision != record.revision {
            return Err(RepositoryError::StaleRevision);
        }
        record.revision += 1;
        guard.insert(record.registration_number.clone(), record.clone());
        Ok(record)
    }

    fn fetch(
        &self,
        number: &RegistrationNumber,
    ) -> Result<Option<ApplicationRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(number).cloned())
    }

    fn fetch_by_id(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<ApplicationRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.values().find(|record| &record.id == id).cloned())
    }

    fn find_by_email(&self, email: &str) -> Result<Option<ApplicationRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .find(|record| record.personal.email == email)
            .cloned())
    }

    fn list(&self, filter: &RegistrationFilter) -> Result<RegistrationPage, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut matching: Vec<ApplicationRecord> = guard
            .values()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect();
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.registration_number.cmp(&a.registration_number))
        });

        let total = matching.len();
        let start = filter.page.saturating_sub(1).saturating_mul(filter.limit);
        let records = matching
            .into_iter()
            .skip(start)
            .take(filter.limit)
            .collect();

        Ok(RegistrationPage {
            records,
            page: filter.page,
            limit: filter.limit,
            total,
        })
    }

    fn all(
        &self,
        status: Option<RegistrationStatus>,
    ) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut records: Vec<ApplicationRecord> = guard
            .values()
            .filter(|record| status.is_none_or(|status| record.status == status))
            .cloned()
            .collect();
        records.sort_by(|a, b| a.registration_number.cmp(&b.registration_number));
        Ok(records)
    }

    fn status_counts(&self) -> Result<BTreeMap<RegistrationStatus, u64>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        let mut counts = BTreeMap::new();
        for record in guard.values() {
            *counts.entry(record.status).or_insert(0) += 1;
        }
        Ok(counts)
    }

    fn stale_drafts(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| {
                record.status == RegistrationStatus::Draft && record.created_at <= cutoff
            })
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub(crate) struct InMemoryAdminRepository {
    admins: Mutex<HashMap<AdminId, Admin>>,
}

impl AdminRepository for InMemoryAdminRepository {
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

/// Per-year atomic counter backing registration-number allocation.
#[derive(Default)]
pub(crate) struct InMemoryRegistrationCounter {
    counters: Mutex<HashMap<i32, u32>>,
}

impl RegistrationNumberAllocator for InMemoryRegistrationCounter {
    fn next(&self, year: i32) -> Result<RegistrationNumber, AllocatorError> {
        let mut counters = self.counters.lock().expect("counter mutex poisoned");
        let counter = counters.entry(year).or_insert(0);
        if *counter >= MAX_SEQUENCE {
            return Err(AllocatorError::Exhausted { year });
        }
        *counter += 1;
        Ok(RegistrationNumber::compose(year, *counter))
    }
}

/// Blob store keeping uploads in memory, keyed by registration number and
/// document slot.
#[derive(Default)]
pub(crate) struct InMemoryDocumentStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl DocumentStore for InMemoryDocumentStore {
    fn store(
        &self,
        number: &RegistrationNumber,
        document: DocumentType,
        payload: &[u8],
        original_name: &str,
        _content_type: &str,
    ) -> Result<StoredBlob, BlobError> {
        let token = Uuid::new_v4();
        let extension = original_name.rsplit_once('.').map(|(_, ext)| ext);
        let filename = match extension {
            Some(ext) => format!("{document}-{token}.{ext}"),
            None => format!("{document}-{token}"),
        };
        let storage_key = format!("mem://documents/{number}/{document}/{token}");

        let mut guard = self.blobs.lock().expect("blob mutex poisoned");
        guard.insert(storage_key.clone(), payload.to_vec());

        Ok(StoredBlob {
            storage_key,
            filename,
        })
    }
}

/// Stand-in message transport that logs instead of delivering.
pub(crate) struct LogMessageChannel;

impl MessageChannel for LogMessageChannel {
    fn deliver(&self, notice: &Notice) -> Result<(), NotificationError> {
        info!(
            registration_number = %notice.registration_number,
            recipient = %notice.recipient_email,
            template = notice.template(),
            "message notification dispatched"
        );
        Ok(())
    }
}

/// Stand-in text transport that logs instead of delivering.
pub(crate) struct LogTextChannel;

impl TextChannel for LogTextChannel {
    fn deliver(&self, notice: &Notice) -> Result<(), NotificationError> {
        info!(
            registration_number = %notice.registration_number,
            recipient = %notice.recipient_phone,
            template = notice.template(),
            "text notification dispatched"
        );
        Ok(())
    }
}
