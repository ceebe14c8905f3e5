//! Registration lifecycle engine: intake, document checklist, submission,
//! and administrative decisions over a status state machine.

pub mod allocator;
pub mod checklist;
pub mod domain;
pub mod notify;
pub mod repository;
pub mod router;
pub mod service;
pub mod validate;

#[cfg(test)]
mod tests;

pub use allocator::{AllocatorError, RegistrationNumberAllocator};
pub use checklist::{missing_documents, REQUIRED_FOR_SUBMISSION};
pub use domain::{
    AcademicData, Achievement, Address, ApplicationId, ApplicationRecord, DecisionStatus,
    DocumentDescriptor, DocumentType, Gender, Guardian, NotificationLog, Parent, ParentData,
    PersonalData, PreviousSchool, RegistrationNumber, RegistrationStatus, RegistrationSummary,
    Tracking,
};
pub use notify::{
    MessageChannel, Notice, NoticeKind, NotificationDispatcher, NotificationError, TextChannel,
};
pub use repository::{
    ApplicationRepository, BlobError, DocumentStore, RegistrationFilter, RegistrationPage,
    RepositoryError, StoredBlob,
};
pub use router::{registration_router, RegistrationRouterState};
pub use service::{
    BulkSectionUpdate, DashboardSummary, NewRegistration, RegistrationService, ReminderReport,
    SectionUpdate, TransitionPolicy, WorkflowError,
};
pub use validate::{FieldError, ValidationReport};
