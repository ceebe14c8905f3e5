use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::workflows::admin::authorization;
use crate::workflows::admin::domain::{Admin, Capability};

use super::allocator::{AllocatorError, RegistrationNumberAllocator};
use super::checklist;
use super::domain::{
    AcademicData, ApplicationId, ApplicationRecord, DecisionStatus, DocumentDescriptor,
    DocumentType, NotificationLog, ParentData, PersonalData, RegistrationNumber,
    RegistrationStatus, RegistrationSummary, Tracking,
};
use super::notify::{DispatchOutcome, Notice, NoticeKind, NotificationDispatcher};
use super::repository::{
    ApplicationRepository, RegistrationFilter, RegistrationPage, RepositoryError,
};
use super::validate::{self, ValidationReport};

/// Drafts older than this are considered stale for the reminder sweep.
pub const REMINDER_STALE_AFTER_DAYS: i64 = 3;

const RECENT_REGISTRATIONS: usize = 5;

/// Explicit decision-transition graph.
///
/// The default permits a decision from any non-Draft status, including
/// revising a prior Approved/Rejected outcome. `final_decisions()` freezes
/// those two terminal outcomes instead. Draft is never a legal decision
/// source; it is left through `submit` only.
#[derive(Debug, Clone, Copy)]
pub struct TransitionPolicy {
    allow_reversal: bool,
}

impl Default for TransitionPolicy {
    fn default() -> Self {
        Self {
            allow_reversal: true,
        }
    }
}

impl TransitionPolicy {
    pub fn final_decisions() -> Self {
        Self {
            allow_reversal: false,
        }
    }

    pub fn permits(&self, from: RegistrationStatus, _to: DecisionStatus) -> bool {
        match from {
            RegistrationStatus::Draft => false,
            RegistrationStatus::Approved | RegistrationStatus::Rejected => self.allow_reversal,
            _ => true,
        }
    }
}

/// Intake payload for a new draft registration.
#[derive(Debug, Clone, Deserialize)]
pub struct NewRegistration {
    pub personal: PersonalData,
}

/// One editable section of an application.
#[derive(Debug, Clone)]
pub enum SectionUpdate {
    Personal(PersonalData),
    Parent(ParentData),
    Academic(AcademicData),
}

/// Bulk edit across any of the three data sections.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkSectionUpdate {
    #[serde(default)]
    pub personal: Option<PersonalData>,
    #[serde(default)]
    pub parent: Option<ParentData>,
    #[serde(default)]
    pub academic: Option<AcademicData>,
}

/// Aggregate counts plus the latest arrivals, for the admin dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub total: u64,
    pub by_status: BTreeMap<RegistrationStatus, u64>,
    pub recent: Vec<RegistrationSummary>,
}

/// Outcome of one reminder sweep over stale drafts.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ReminderReport {
    pub attempted: usize,
    pub sent: usize,
    pub failed: usize,
}

/// Error raised by registration workflow operations.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationReport),
    #[error("email is already registered")]
    EmailTaken,
    #[error("required documents are missing")]
    IncompleteDocuments(Vec<DocumentType>),
    #[error("registration data is frozen once status is {status}")]
    NotEditable { status: RegistrationStatus },
    #[error("cannot move registration from {from} to {to}")]
    InvalidTransition {
        from: RegistrationStatus,
        to: RegistrationStatus,
    },
    #[error("acting admin may not update registration status")]
    Forbidden,
    #[error(transparent)]
    Allocator(#[from] AllocatorError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// The registration lifecycle engine.
///
/// Owns every legal status transition: applicants move Draft → Submitted
/// through the document-checklist gate, and admins move submissions
/// through review outcomes under the transition policy. All writes go
/// through the repository's conditional update, so racing writers lose
/// with a stale-revision conflict instead of silently clobbering each
/// other. Notification dispatch happens after the state change is
/// persisted and never affects the result.
pub struct RegistrationService<R> {
    repository: Arc<R>,
    allocator: Arc<dyn RegistrationNumberAllocator>,
    dispatcher: Arc<NotificationDispatcher>,
    policy: TransitionPolicy,
}

impl<R> RegistrationService<R>
where
    R: ApplicationRepository + 'static,
{
    pub fn new(
        repository: Arc<R>,
        allocator: Arc<dyn RegistrationNumberAllocator>,
        dispatcher: Arc<NotificationDispatcher>,
    ) -> Self {
        Self::with_policy(repository, allocator, dispatcher, TransitionPolicy::default())
    }

    pub fn with_policy(
        repository: Arc<R>,
        allocator: Arc<dyn RegistrationNumberAllocator>,
        dispatcher: Arc<NotificationDispatcher>,
        policy: TransitionPolicy,
    ) -> Self {
        Self {
            repository,
            allocator,
            dispatcher,
            policy,
        }
    }

    /// Create a Draft application: allocate the registration number first,
    /// then construct and insert the immutable record.
    pub fn create(&self, new: NewRegistration) -> Result<ApplicationRecord, WorkflowError> {
        let mut personal = new.personal;
        personal.email = personal.email.trim().to_ascii_lowercase();
        validate::validate_personal(&personal)?;

        if self.repository.find_by_email(&personal.email)?.is_some() {
            return Err(WorkflowError::EmailTaken);
        }

        let now = Utc::now();
        let number = self.allocator.next(now.year())?;

        let record = ApplicationRecord {
            id: ApplicationId::unassigned(),
            registration_number: number,
            personal,
            parent: None,
            academic: None,
            documents: BTreeMap::new(),
            status: RegistrationStatus::Draft,
            tracking: Tracking {
                last_updated: Some(now),
                ..Tracking::default()
            },
            notifications: NotificationLog::default(),
            created_at: now,
            revision: 0,
        };

        let stored = self.repository.insert(record)?;

        let notice = Notice::for_record(NoticeKind::RegistrationReceived, &stored);
        let outcome = self.dispatcher.dispatch(&notice);
        self.note_dispatch(stored.clone(), outcome);

        Ok(stored)
    }

    /// Replace one data section. Legal only while the record is a Draft;
    /// the same gate covers all three sections.
    pub fn update_section(
        &self,
        number: &RegistrationNumber,
        update: SectionUpdate,
    ) -> Result<ApplicationRecord, WorkflowError> {
        let mut record = self.load(number)?;
        if !record.is_draft() {
            return Err(WorkflowError::NotEditable {
                status: record.status,
            });
        }

        self.apply_section(&mut record, update)?;
        record.tracking.last_updated = Some(Utc::now());
        Ok(self.repository.update(record)?)
    }

    /// Bulk edit across the three sections in one conditional write.
    pub fn update_sections(
        &self,
        number: &RegistrationNumber,
        bulk: BulkSectionUpdate,
    ) -> Result<ApplicationRecord, WorkflowError> {
        let mut record = self.load(number)?;
        if !record.is_draft() {
            return Err(WorkflowError::NotEditable {
                status: record.status,
            });
        }

        if let Some(personal) = bulk.personal {
            self.apply_section(&mut record, SectionUpdate::Personal(personal))?;
        }
        if let Some(parent) = bulk.parent {
            self.apply_section(&mut record, SectionUpdate::Parent(parent))?;
        }
        if let Some(academic) = bulk.academic {
            self.apply_section(&mut record, SectionUpdate::Academic(academic))?;
        }

        record.tracking.last_updated = Some(Utc::now());
        Ok(self.repository.update(record)?)
    }

    /// Record an uploaded document descriptor, overwriting any prior upload
    /// in the same slot. Uploads carry no status gate; only `submit` reads
    /// the checklist.
    pub fn record_document(
        &self,
        number: &RegistrationNumber,
        document: DocumentType,
        descriptor: DocumentDescriptor,
    ) -> Result<ApplicationRecord, WorkflowError> {
        let mut record = self.load(number)?;
        record.documents.insert(document, descriptor);
        record.tracking.last_updated = Some(Utc::now());
        Ok(self.repository.update(record)?)
    }

    /// Draft → Submitted, gated on the required-document checklist.
    pub fn submit(&self, number: &RegistrationNumber) -> Result<ApplicationRecord, WorkflowError> {
        let mut record = self.load(number)?;
        if record.status != RegistrationStatus::Draft {
            return Err(WorkflowError::InvalidTransition {
                from: record.status,
                to: RegistrationStatus::Submitted,
            });
        }

        let missing = checklist::missing_documents(&record.documents);
        if !missing.is_empty() {
            return Err(WorkflowError::IncompleteDocuments(missing));
        }

        let now = Utc::now();
        record.status = RegistrationStatus::Submitted;
        record.tracking.submitted_at = Some(now);
        record.tracking.last_updated = Some(now);

        let stored = self.repository.update(record)?;

        let notice = Notice::for_record(
            NoticeKind::StatusChanged {
                status: RegistrationStatus::Submitted,
                notes: None,
            },
            &stored,
        );
        let outcome = self.dispatcher.dispatch(&notice);
        self.note_dispatch(stored.clone(), outcome);

        Ok(stored)
    }

    /// Admin decision over a reviewed application. Requires the
    /// `approve_registrations` capability on an active admin and a source
    /// status the transition policy permits.
    pub fn decide(
        &self,
        id: &ApplicationId,
        acting: &Admin,
        target: DecisionStatus,
        notes: Option<String>,
    ) -> Result<ApplicationRecord, WorkflowError> {
        if !authorization::authorize(acting, Capability::ApproveRegistrations) {
            return Err(WorkflowError::Forbidden);
        }

        let mut record = self
            .repository
            .fetch_by_id(id)?
            .ok_or(RepositoryError::NotFound)?;

        if !self.policy.permits(record.status, target) {
            return Err(WorkflowError::InvalidTransition {
                from: record.status,
                to: target.as_status(),
            });
        }

        let now = Utc::now();
        record.status = target.as_status();
        record.tracking.reviewed_at = Some(now);
        record.tracking.reviewed_by = Some(acting.id.clone());
        if notes.is_some() {
            record.tracking.notes = notes.clone();
        }
        record.tracking.last_updated = Some(now);

        let stored = self.repository.update(record)?;

        let notice = Notice::for_record(
            NoticeKind::StatusChanged {
                status: stored.status,
                notes,
            },
            &stored,
        );
        let outcome = self.dispatcher.dispatch(&notice);
        self.note_dispatch(stored.clone(), outcome);

        Ok(stored)
    }

    pub fn get(&self, number: &RegistrationNumber) -> Result<ApplicationRecord, WorkflowError> {
        self.load(number)
    }

    pub fn get_by_id(&self, id: &ApplicationId) -> Result<ApplicationRecord, WorkflowError> {
        let record = self
            .repository
            .fetch_by_id(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    pub fn list(&self, filter: &RegistrationFilter) -> Result<RegistrationPage, WorkflowError> {
        Ok(self.repository.list(filter)?)
    }

    pub fn dashboard(&self) -> Result<DashboardSummary, WorkflowError> {
        let mut by_status: BTreeMap<RegistrationStatus, u64> = RegistrationStatus::ALL
            .into_iter()
            .map(|status| (status, 0))
            .collect();
        for (status, count) in self.repository.status_counts()? {
            by_status.insert(status, count);
        }
        let total = by_status.values().sum();

        let recent = self
            .repository
            .list(&RegistrationFilter {
                limit: RECENT_REGISTRATIONS,
                ..RegistrationFilter::default()
            })?
            .records
            .iter()
            .map(ApplicationRecord::summary)
            .collect();

        Ok(DashboardSummary {
            total,
            by_status,
            recent,
        })
    }

    /// Every record, optionally narrowed by status, for the export dump.
    pub fn export(
        &self,
        status: Option<RegistrationStatus>,
    ) -> Result<Vec<ApplicationRecord>, WorkflowError> {
        Ok(self.repository.all(status)?)
    }

    /// Send a text reminder to every Draft older than the stale cutoff.
    /// Delivery failures are counted, never raised.
    pub fn send_reminders(&self, now: DateTime<Utc>) -> Result<ReminderReport, WorkflowError> {
        let cutoff = now - Duration::days(REMINDER_STALE_AFTER_DAYS);
        let stale = self.repository.stale_drafts(cutoff)?;

        let mut report = ReminderReport {
            attempted: stale.len(),
            ..ReminderReport::default()
        };

        if !self.dispatcher.text_enabled() {
            return Ok(report);
        }

        for record in stale {
            let notice = Notice::for_record(NoticeKind::Reminder, &record);
            let outcome = self.dispatcher.dispatch_text(&notice);
            if outcome.text_sent {
                report.sent += 1;
                self.note_dispatch(record, outcome);
            } else {
                report.failed += 1;
            }
        }

        Ok(report)
    }

    fn load(&self, number: &RegistrationNumber) -> Result<ApplicationRecord, WorkflowError> {
        let record = self
            .repository
            .fetch(number)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(record)
    }

    fn apply_section(
        &self,
        record: &mut ApplicationRecord,
        update: SectionUpdate,
    ) -> Result<(), WorkflowError> {
        match update {
            SectionUpdate::Personal(mut data) => {
                data.email = data.email.trim().to_ascii_lowercase();
                validate::validate_personal(&data)?;
                if data.email != record.personal.email {
                    if let Some(existing) = self.repository.find_by_email(&data.email)? {
                        if existing.id != record.id {
                            return Err(WorkflowError::EmailTaken);
                        }
                    }
                }
                record.personal = data;
            }
            SectionUpdate::Parent(data) => {
                validate::validate_parent(&data)?;
                record.parent = Some(data);
            }
            SectionUpdate::Academic(data) => {
                validate::validate_academic(&data)?;
                record.academic = Some(data);
            }
        }
        Ok(())
    }

    /// Best-effort bookkeeping write after a dispatch. The transition is
    /// already durable; losing this write only loses delivery flags.
    fn note_dispatch(&self, record: ApplicationRecord, outcome: DispatchOutcome) {
        if !outcome.any_sent() {
            return;
        }

        let mut record = record;
        record.notifications.message_sent |= outcome.message_sent;
        record.notifications.text_sent |= outcome.text_sent;
        record.notifications.last_dispatched_at = Some(Utc::now());

        if let Err(err) = self.repository.update(record) {
            debug!(error = %err, "notification bookkeeping write skipped");
        }
    }
}
