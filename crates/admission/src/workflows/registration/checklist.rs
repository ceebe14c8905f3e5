use std::collections::BTreeMap;

use super::domain::{DocumentDescriptor, DocumentType};

/// Documents that must be on file before an application can be submitted.
///
/// `HealthCertificate` is an accepted upload slot but is deliberately not
/// part of the submission gate.
pub const REQUIRED_FOR_SUBMISSION: [DocumentType; 4] = [
    DocumentType::BirthCertificate,
    DocumentType::FamilyCard,
    DocumentType::PreviousDiploma,
    DocumentType::Photo,
];

/// Returns the required document types that have no stored descriptor, in
/// checklist order. Empty means the checklist passes. Pure function.
pub fn missing_documents(
    documents: &BTreeMap<DocumentType, DocumentDescriptor>,
) -> Vec<DocumentType> {
    REQUIRED_FOR_SUBMISSION
        .into_iter()
        .filter(|required| !documents.contains_key(required))
        .collect()
}
