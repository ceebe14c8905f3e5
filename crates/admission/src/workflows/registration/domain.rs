use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::workflows::admin::domain::AdminId;

/// Prefix shared by every registration number.
pub const REGISTRATION_PREFIX: &str = "MTS";

/// Identifier wrapper for application records, assigned by the record store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

impl ApplicationId {
    /// Placeholder identity used on records that have not been inserted yet.
    pub fn unassigned() -> Self {
        Self(String::new())
    }

    pub fn is_unassigned(&self) -> bool {
        self.0.is_empty()
    }
}

/// Human-readable registration number, `MTS-{year}-{seq:04}`.
///
/// Allocated exactly once per application and never reassigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegistrationNumber(pub String);

impl RegistrationNumber {
    pub fn compose(year: i32, sequence: u32) -> Self {
        Self(format!("{REGISTRATION_PREFIX}-{year}-{sequence:04}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegistrationNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

/// Applicant street address captured during intake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    #[serde(default)]
    pub village: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    pub city: String,
    #[serde(default)]
    pub postal_code: Option<String>,
}

/// Step-one data, collected when the draft is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalData {
    pub full_name: String,
    #[serde(default)]
    pub nick_name: Option<String>,
    pub gender: Gender,
    pub birth_place: String,
    pub birth_date: NaiveDate,
    #[serde(default)]
    pub religion: Option<String>,
    pub address: Address,
    pub phone_number: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parent {
    pub name: String,
    #[serde(default)]
    pub occupation: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub education: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guardian {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub relationship: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
}

/// Step-two data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentData {
    pub father: Parent,
    pub mother: Parent,
    #[serde(default)]
    pub guardian: Option<Guardian>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviousSchool {
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub graduation_year: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    pub title: String,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub year: Option<u16>,
}

/// Step-three data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcademicData {
    pub previous_school: PreviousSchool,
    pub last_grade: String,
    #[serde(default)]
    pub achievements: Vec<Achievement>,
}

/// The fixed set of document slots an application can carry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    BirthCertificate,
    FamilyCard,
    PreviousDiploma,
    Photo,
    HealthCertificate,
}

impl DocumentType {
    pub const ALL: [DocumentType; 5] = [
        DocumentType::BirthCertificate,
        DocumentType::FamilyCard,
        DocumentType::PreviousDiploma,
        DocumentType::Photo,
        DocumentType::HealthCertificate,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            DocumentType::BirthCertificate => "birth_certificate",
            DocumentType::FamilyCard => "family_card",
            DocumentType::PreviousDiploma => "previous_diploma",
            DocumentType::Photo => "photo",
            DocumentType::HealthCertificate => "health_certificate",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|document| document.as_str() == value)
    }

    /// Content types accepted for this slot. The photo slot takes images
    /// only; every other slot also accepts PDF scans.
    pub fn allowed_content_types(self) -> &'static [&'static str] {
        const IMAGE_ONLY: &[&str] = &["image/jpeg", "image/png"];
        const SCAN_OR_IMAGE: &[&str] = &["application/pdf", "image/jpeg", "image/png"];
        match self {
            DocumentType::Photo => IMAGE_ONLY,
            _ => SCAN_OR_IMAGE,
        }
    }

    pub fn accepts(self, content_type: &str) -> bool {
        content_type
            .parse::<mime::Mime>()
            .map(|parsed| {
                self.allowed_content_types()
                    .iter()
                    .any(|allowed| parsed.essence_str() == *allowed)
            })
            .unwrap_or(false)
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata for an uploaded document; the binary lives in the blob store
/// under `storage_key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentDescriptor {
    pub filename: String,
    pub original_name: String,
    pub storage_key: String,
    pub content_type: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Lifecycle status of an application.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Draft,
    Submitted,
    UnderReview,
    Approved,
    Rejected,
    Waitlisted,
}

impl RegistrationStatus {
    pub const ALL: [RegistrationStatus; 6] = [
        RegistrationStatus::Draft,
        RegistrationStatus::Submitted,
        RegistrationStatus::UnderReview,
        RegistrationStatus::Approved,
        RegistrationStatus::Rejected,
        RegistrationStatus::Waitlisted,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            RegistrationStatus::Draft => "draft",
            RegistrationStatus::Submitted => "submitted",
            RegistrationStatus::UnderReview => "under_review",
            RegistrationStatus::Approved => "approved",
            RegistrationStatus::Rejected => "rejected",
            RegistrationStatus::Waitlisted => "waitlisted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.label() == value)
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The statuses an admin decision may target. `Draft` and `Submitted` are
/// never decision targets; they are reached by the applicant's own actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStatus {
    UnderReview,
    Approved,
    Rejected,
    Waitlisted,
}

impl DecisionStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "under_review" => Some(Self::UnderReview),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            "waitlisted" => Some(Self::Waitlisted),
            _ => None,
        }
    }

    pub const fn as_status(self) -> RegistrationStatus {
        match self {
            DecisionStatus::UnderReview => RegistrationStatus::UnderReview,
            DecisionStatus::Approved => RegistrationStatus::Approved,
            DecisionStatus::Rejected => RegistrationStatus::Rejected,
            DecisionStatus::Waitlisted => RegistrationStatus::Waitlisted,
        }
    }
}

/// Review and submission timeline for an application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tracking {
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reviewed_by: Option<AdminId>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

/// Best-effort delivery bookkeeping. Never gates behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationLog {
    #[serde(default)]
    pub message_sent: bool,
    #[serde(default)]
    pub text_sent: bool,
    #[serde(default)]
    pub last_dispatched_at: Option<DateTime<Utc>>,
}

/// One applicant's registration record and its lifecycle state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub id: ApplicationId,
    pub registration_number: RegistrationNumber,
    pub personal: PersonalData,
    #[serde(default)]
    pub parent: Option<ParentData>,
    #[serde(default)]
    pub academic: Option<AcademicData>,
    #[serde(default)]
    pub documents: BTreeMap<DocumentType, DocumentDescriptor>,
    pub status: RegistrationStatus,
    #[serde(default)]
    pub tracking: Tracking,
    #[serde(default)]
    pub notifications: NotificationLog,
    pub created_at: DateTime<Utc>,
    pub revision: u64,
}

impl ApplicationRecord {
    pub fn is_draft(&self) -> bool {
        self.status == RegistrationStatus::Draft
    }

    /// Condensed listing entry for dashboards and admin indexes.
    pub fn summary(&self) -> RegistrationSummary {
        RegistrationSummary {
            id: self.id.clone(),
            registration_number: self.registration_number.clone(),
            full_name: self.personal.full_name.clone(),
            email: self.personal.email.clone(),
            status: self.status,
            created_at: self.created_at,
        }
    }
}

/// Sanitized listing row exposed on the admin surface.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationSummary {
    pub id: ApplicationId,
    pub registration_number: RegistrationNumber,
    pub full_name: String,
    pub email: String,
    pub status: RegistrationStatus,
    pub created_at: DateTime<Utc>,
}
