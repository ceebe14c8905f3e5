use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::config::{ChannelConfig, NotificationConfig, UploadConfig};
use crate::workflows::admin::domain::{Admin, AdminId, Capability, Role};
use crate::workflows::registration::allocator::{
    AllocatorError, RegistrationNumberAllocator, MAX_SEQUENCE,
};
use crate::workflows::registration::domain::{
    AcademicData, Achievement, Address, ApplicationId, ApplicationRecord, DocumentDescriptor,
    DocumentType, Gender, Parent, ParentData, PersonalData, PreviousSchool, RegistrationNumber,
    RegistrationStatus,
};
use crate::workflows::registration::notify::{
    MessageChannel, Notice, NotificationDispatcher, NotificationError, TextChannel,
};
use crate::workflows::registration::repository::{
    ApplicationRepository, BlobError, DocumentStore, RegistrationFilter, RegistrationPage,
    RepositoryError, StoredBlob,
};
use crate::workflows::registration::router::RegistrationRouterState;
use crate::workflows::registration::service::{NewRegistration, RegistrationService};

pub(super) fn personal_data(email: &str) -> PersonalData {
    PersonalData {
        full_name: "Ahmad Fauzi".to_string(),
        nick_name: Some("Fauzi".to_string()),
        gender: Gender::Male,
        birth_place: "Bandung".to_string(),
        birth_date: NaiveDate::from_ymd_opt(2013, 4, 17).expect("valid date"),
        religion: None,
        address: Address {
            street: "Jl. Merdeka 12".to_string(),
            village: None,
            district: None,
            city: "Bandung".to_string(),
            postal_code: Some("40111".to_string()),
        },
        phone_number: "+62-811-0000-111".to_string(),
        email: email.to_string(),
    }
}

pub(super) fn parent_data() -> ParentData {
    ParentData {
        father: Parent {
            name: "Budi Fauzi".to_string(),
            occupation: Some("Teacher".to_string()),
            phone_number: Some("+62-811-0000-222".to_string()),
            education: None,
        },
        mother: Parent {
            name: "Siti Fauzi".to_string(),
            occupation: None,
            phone_number: None,
            education: None,
        },
        guardian: None,
    }
}

pub(super) fn academic_data() -> AcademicData {
    AcademicData {
        previous_school: PreviousSchool {
            name: "SD Negeri 4".to_string(),
            address: None,
            graduation_year: Some(2025),
        },
        last_grade: "88.5".to_string(),
        achievements: vec![Achievement {
            title: "Math olympiad finalist".to_string(),
            level: Some("province".to_string()),
            year: Some(2024),
        }],
    }
}

pub(super) fn descriptor(document: DocumentType) -> DocumentDescriptor {
    DocumentDescriptor {
        filename: format!("{document}-0001.pdf"),
        original_name: format!("{document}.pdf"),
        storage_key: format!("mem://documents/{document}/0001"),
        content_type: "application/pdf".to_string(),
        uploaded_at: Utc::now(),
    }
}

pub(super) fn reviewer(capabilities: &[Capability]) -> Admin {
    Admin {
        id: AdminId("adm-reviewer".to_string()),
        username: "reviewer".to_string(),
        email: "reviewer@example.org".to_string(),
        password_hash: String::new(),
        full_name: "Registration Reviewer".to_string(),
        role: Role::Reviewer,
        permissions: capabilities.iter().copied().collect(),
        is_active: true,
        last_login: None,
        created_at: Utc::now(),
    }
}

#[derive(Default)]
pub(super) struct MemoryRepository {
    pub(super) records: Mutex<HashMap<RegistrationNumber, ApplicationRecord>>,
}

impl ApplicationRepository for MemoryRepository {
    fn insert(&self, mut record: ApplicationRecord) -> Result<ApplicationRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.registration_number) {
            return Err(RepositoryError::Conflict);
        }
        if guard
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
pub(super) struct MemoryCounter {
    pub(super) counters: Mutex<HashMap<i32, u32>>,
}

impl RegistrationNumberAllocator for MemoryCounter {
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

#[derive(Default)]
pub(super) struct MemoryDocuments;

impl DocumentStore for MemoryDocuments {
    fn store(
        &self,
        number: &RegistrationNumber,
        document: DocumentType,
        _payload: &[u8],
        _original_name: &str,
        _content_type: &str,
    ) -> Result<StoredBlob, BlobError> {
        let token = Uuid::new_v4();
        Ok(StoredBlob {
            storage_key: format!("mem://documents/{number}/{document}/{token}"),
            filename: format!("{document}-{token}"),
        })
    }
}

#[derive(Default)]
pub(super) struct RecordingMessageChannel {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingMessageChannel {
    pub(super) fn notices(&self) -> Vec<Notice> {
        self.notices.lock().expect("channel mutex poisoned").clone()
    }
}

impl MessageChannel for RecordingMessageChannel {
    fn deliver(&self, notice: &Notice) -> Result<(), NotificationError> {
        self.notices
            .lock()
            .expect("channel mutex poisoned")
            .push(notice.clone());
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct RecordingTextChannel {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingTextChannel {
    pub(super) fn notices(&self) -> Vec<Notice> {
        self.notices.lock().expect("channel mutex poisoned").clone()
    }
}

impl TextChannel for RecordingTextChannel {
    fn deliver(&self, notice: &Notice) -> Result<(), NotificationError> {
        self.notices
            .lock()
            .expect("channel mutex poisoned")
            .push(notice.clone());
        Ok(())
    }
}

pub(super) struct FailingTextChannel;

impl TextChannel for FailingTextChannel {
    fn deliver(&self, _notice: &Notice) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("gateway offline".to_string()))
    }
}

pub(super) fn enabled_notifications() -> NotificationConfig {
    NotificationConfig {
        message: ChannelConfig { enabled: true },
        text: ChannelConfig { enabled: true },
    }
}

pub(super) struct Harness {
    pub(super) service: Arc<RegistrationService<MemoryRepository>>,
    pub(super) repository: Arc<MemoryRepository>,
    pub(super) message: Arc<RecordingMessageChannel>,
    pub(super) text: Arc<RecordingTextChannel>,
}

pub(super) fn build_service() -> Harness {
    let repository = Arc::new(MemoryRepository::default());
    let message = Arc::new(RecordingMessageChannel::default());
    let text = Arc::new(RecordingTextChannel::default());
    let dispatcher = Arc::new(NotificationDispatcher::new(
        &enabled_notifications(),
        message.clone(),
        text.clone(),
    ));
    let service = Arc::new(RegistrationService::new(
        repository.clone(),
        Arc::new(MemoryCounter::default()),
        dispatcher,
    ));
    Harness {
        service,
        repository,
        message,
        text,
    }
}

pub(super) fn router_state(harness: &Harness) -> RegistrationRouterState<MemoryRepository> {
    RegistrationRouterState {
        service: harness.service.clone(),
        documents: Arc::new(MemoryDocuments),
        uploads: UploadConfig::default(),
    }
}

pub(super) fn new_registration(email: &str) -> NewRegistration {
    NewRegistration {
        personal: personal_data(email),
    }
}

/// Record all four required documents so `submit` passes the checklist.
pub(super) fn complete_required_documents(
    harness: &Harness,
    number: &RegistrationNumber,
) -> ApplicationRecord {
    let mut latest = None;
    for document in crate::workflows::registration::checklist::REQUIRED_FOR_SUBMISSION {
        latest = Some(
            harness
                .service
                .record_document(number, document, descriptor(document))
                .expect("document recorded"),
        );
    }
    latest.expect("at least one document recorded")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
