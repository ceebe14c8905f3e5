use std::sync::Arc;

use chrono::{Datelike, Duration, Utc};

use super::common::*;
use crate::workflows::admin::domain::Capability;
use crate::workflows::registration::checklist::REQUIRED_FOR_SUBMISSION;
use crate::workflows::registration::domain::{
    DecisionStatus, DocumentType, RegistrationStatus,
};
use crate::workflows::registration::notify::{NoticeKind, NotificationDispatcher};
use crate::workflows::registration::repository::{ApplicationRepository, RepositoryError};
use crate::workflows::registration::service::{
    RegistrationService, SectionUpdate, TransitionPolicy, WorkflowError,
};

#[test]
fn create_assigns_number_and_notifies() {
    let harness = build_service();

    let record = harness
        .service
        .create(new_registration("a@x.com"))
        .expect("registration created");

    let year = Utc::now().year();
    assert_eq!(
        record.registration_number.as_str(),
        format!("MTS-{year}-0001")
    );
    assert_eq!(record.status, RegistrationStatus::Draft);
    assert!(!record.id.is_unassigned());
    assert_eq!(record.revision, 1);

    let messages = harness.message.notices();
    assert_eq!(messages.len(), 1);
    assert!(matches!(messages[0].kind, NoticeKind::RegistrationReceived));
    assert_eq!(harness.text.notices().len(), 1);

    // Delivery flags are recorded best-effort after the insert.
    let stored = harness
        .repository
        .fetch(&record.registration_number)
        .expect("fetch succeeds")
        .expect("record present");
    assert!(stored.notifications.message_sent);
    assert!(stored.notifications.text_sent);
}

#[test]
fn create_rejects_duplicate_email() {
    let harness = build_service();
    harness
        .service
        .create(new_registration("a@x.com"))
        .expect("first registration");

    match harness.service.create(new_registration("A@X.com")) {
        Err(WorkflowError::EmailTaken) => {}
        other => panic!("expected duplicate email rejection, got {other:?}"),
    }
}

#[test]
fn create_rejects_malformed_personal_data() {
    let harness = build_service();
    let mut new = new_registration("not-an-email");
    new.personal.full_name = "  ".to_string();

    match harness.service.create(new) {
        Err(WorkflowError::Validation(report)) => {
            let fields: Vec<&str> = report
                .errors()
                .iter()
                .map(|error| error.field.as_str())
                .collect();
            assert!(fields.contains(&"personal.full_name"));
            assert!(fields.contains(&"personal.email"));
        }
        other => panic!("expected validation failure, got {other:?}"),
    }
}

#[test]
fn sections_update_while_draft() {
    let harness = build_service();
    let record = harness
        .service
        .create(new_registration("a@x.com"))
        .expect("created");

    let updated = harness
        .service
        .update_section(
            &record.registration_number,
            SectionUpdate::Parent(parent_data()),
        )
        .expect("parent data stored");
    assert_eq!(
        updated.parent.as_ref().map(|p| p.father.name.as_str()),
        Some("Budi Fauzi")
    );

    let updated = harness
        .service
        .update_section(
            &record.registration_number,
            SectionUpdate::Academic(academic_data()),
        )
        .expect("academic data stored");
    assert_eq!(updated.academic.as_ref().map(|a| a.last_grade.as_str()), Some("88.5"));
}

#[test]
fn sections_freeze_after_submission() {
    let harness = build_service();
    let record = harness
        .service
        .create(new_registration("a@x.com"))
        .expect("created");
    complete_required_documents(&harness, &record.registration_number);
    harness
        .service
        .submit(&record.registration_number)
        .expect("submitted");

    let mut renamed = personal_data("a@x.com");
    renamed.full_name = "Someone Else".to_string();
    match harness.service.update_section(
        &record.registration_number,
        SectionUpdate::Personal(renamed),
    ) {
        Err(WorkflowError::NotEditable {
            status: RegistrationStatus::Submitted,
        }) => {}
        other => panic!("expected frozen sections, got {other:?}"),
    }

    let stored = harness
        .repository
        .fetch(&record.registration_number)
        .expect("fetch succeeds")
        .expect("record present");
    assert_eq!(stored.personal.full_name, "Ahmad Fauzi");
}

#[test]
fn submit_lists_exactly_the_missing_documents() {
    let harness = build_service();
    let record = harness
        .service
        .create(new_registration("a@x.com"))
        .expect("created");
    harness
        .service
        .record_document(
            &record.registration_number,
            DocumentType::BirthCertificate,
            descriptor(DocumentType::BirthCertificate),
        )
        .expect("document recorded");

    match harness.service.submit(&record.registration_number) {
        Err(WorkflowError::IncompleteDocuments(missing)) => {
            assert_eq!(
                missing,
                vec![
                    DocumentType::FamilyCard,
                    DocumentType::PreviousDiploma,
                    DocumentType::Photo,
                ]
            );
        }
        other => panic!("expected incomplete documents, got {other:?}"),
    }

    let stored = harness
        .repository
        .fetch(&record.registration_number)
        .expect("fetch succeeds")
        .expect("record present");
    assert_eq!(stored.status, RegistrationStatus::Draft);
    assert!(stored.tracking.submitted_at.is_none());
}

#[test]
fn submit_succeeds_without_health_certificate() {
    let harness = build_service();
    let record = harness
        .service
        .create(new_registration("a@x.com"))
        .expect("created");
    complete_required_documents(&harness, &record.registration_number);

    let submitted = harness
        .service
        .submit(&record.registration_number)
        .expect("submission passes");

    assert_eq!(submitted.status, RegistrationStatus::Submitted);
    let submitted_at = submitted.tracking.submitted_at.expect("submission stamped");
    assert!(submitted_at >= submitted.created_at);

    let status_notices: Vec<_> = harness
        .text
        .notices()
        .into_iter()
        .filter(|notice| {
            matches!(
                notice.kind,
                NoticeKind::StatusChanged {
                    status: RegistrationStatus::Submitted,
                    ..
                }
            )
        })
        .collect();
    assert_eq!(status_notices.len(), 1);
}

#[test]
fn submit_is_draft_only() {
    let harness = build_service();
    let record = harness
        .service
        .create(new_registration("a@x.com"))
        .expect("created");
    complete_required_documents(&harness, &record.registration_number);
    harness
        .service
        .submit(&record.registration_number)
        .expect("first submission");

    match harness.service.submit(&record.registration_number) {
        Err(WorkflowError::InvalidTransition {
            from: RegistrationStatus::Submitted,
            to: RegistrationStatus::Submitted,
        }) => {}
        other => panic!("expected invalid transition, got {other:?}"),
    }
}

#[test]
fn decide_requires_the_approve_capability() {
    let harness = build_service();
    let record = harness
        .service
        .create(new_registration("a@x.com"))
        .expect("created");
    complete_required_documents(&harness, &record.registration_number);
    harness
        .service
        .submit(&record.registration_number)
        .expect("submitted");

    // Role `admin` without the capability is still refused.
    let mut actor = reviewer(&[Capability::ViewRegistrations]);
    actor.role = crate::workflows::admin::domain::Role::Admin;

    match harness
        .service
        .decide(&record.id, &actor, DecisionStatus::Approved, None)
    {
        Err(WorkflowError::Forbidden) => {}
        other => panic!("expected forbidden, got {other:?}"),
    }

    let stored = harness
        .repository
        .fetch(&record.registration_number)
        .expect("fetch succeeds")
        .expect("record present");
    assert_eq!(stored.status, RegistrationStatus::Submitted);
    assert!(stored.tracking.reviewed_by.is_none());
}

#[test]
fn decide_stamps_reviewer_and_notes() {
    let harness = build_service();
    let record = harness
        .service
        .create(new_registration("a@x.com"))
        .expect("created");
    complete_required_documents(&harness, &record.registration_number);
    harness
        .service
        .submit(&record.registration_number)
        .expect("submitted");

    let actor = reviewer(&[Capability::ApproveRegistrations]);
    let decided = harness
        .service
        .decide(
            &record.id,
            &actor,
            DecisionStatus::Approved,
            Some("strong academic record".to_string()),
        )
        .expect("decision applies");

    assert_eq!(decided.status, RegistrationStatus::Approved);
    assert_eq!(decided.tracking.reviewed_by, Some(actor.id.clone()));
    assert!(decided.tracking.reviewed_at.is_some());
    assert_eq!(
        decided.tracking.notes.as_deref(),
        Some("strong academic record")
    );

    let carried_notes = harness.message.notices().into_iter().any(|notice| {
        matches!(
            notice.kind,
            NoticeKind::StatusChanged {
                status: RegistrationStatus::Approved,
                notes: Some(ref notes),
            } if notes == "strong academic record"
        )
    });
    assert!(carried_notes, "status notice should carry the notes");
}

#[test]
fn decide_never_applies_to_drafts() {
    let harness = build_service();
    let record = harness
        .service
        .create(new_registration("a@x.com"))
        .expect("created");

    let actor = reviewer(&[Capability::ApproveRegistrations]);
    match harness
        .service
        .decide(&record.id, &actor, DecisionStatus::UnderReview, None)
    {
        Err(WorkflowError::InvalidTransition {
            from: RegistrationStatus::Draft,
            ..
        }) => {}
        other => panic!("expected invalid transition, got {other:?}"),
    }
}

#[test]
fn default_policy_allows_revising_a_decision() {
    let harness = build_service();
    let record = harness
        .service
        .create(new_registration("a@x.com"))
        .expect("created");
    complete_required_documents(&harness, &record.registration_number);
    harness
        .service
        .submit(&record.registration_number)
        .expect("submitted");

    let actor = reviewer(&[Capability::ApproveRegistrations]);
    harness
        .service
        .decide(&record.id, &actor, DecisionStatus::Approved, None)
        .expect("approval applies");
    let revised = harness
        .service
        .decide(&record.id, &actor, DecisionStatus::Rejected, None)
        .expect("revision applies");
    assert_eq!(revised.status, RegistrationStatus::Rejected);
}

#[test]
fn final_decision_policy_freezes_outcomes() {
    let repository = Arc::new(MemoryRepository::default());
    let service = RegistrationService::with_policy(
        repository.clone(),
        Arc::new(MemoryCounter::default()),
        Arc::new(NotificationDispatcher::disabled()),
        TransitionPolicy::final_decisions(),
    );

    let record = service
        .create(new_registration("a@x.com"))
        .expect("created");
    for document in REQUIRED_FOR_SUBMISSION {
        service
            .record_document(&record.registration_number, document, descriptor(document))
            .expect("document recorded");
    }
    service
        .submit(&record.registration_number)
        .expect("submitted");

    let actor = reviewer(&[Capability::ApproveRegistrations]);
    service
        .decide(&record.id, &actor, DecisionStatus::Approved, None)
        .expect("approval applies");

    match service.decide(&record.id, &actor, DecisionStatus::Rejected, None) {
        Err(WorkflowError::InvalidTransition {
            from: RegistrationStatus::Approved,
            ..
        }) => {}
        other => panic!("expected frozen decision, got {other:?}"),
    }
}

#[test]
fn stale_writers_lose_on_revision_conflicts() {
    let harness = build_service();
    let record = harness
        .service
        .create(new_registration("a@x.com"))
        .expect("created");
    complete_required_documents(&harness, &record.registration_number);
    harness
        .service
        .submit(&record.registration_number)
        .expect("submitted");

    // Two reviewers load the same revision; the first decision lands.
    let stale_copy = harness
        .repository
        .fetch(&record.registration_number)
        .expect("fetch succeeds")
        .expect("record present");

    let actor = reviewer(&[Capability::ApproveRegistrations]);
    harness
        .service
        .decide(&record.id, &actor, DecisionStatus::Approved, None)
        .expect("first decision applies");

    let mut second = stale_copy;
    second.status = RegistrationStatus::Rejected;
    match harness.repository.update(second) {
        Err(RepositoryError::StaleRevision) => {}
        other => panic!("expected stale revision conflict, got {other:?}"),
    }

    let stored = harness
        .repository
        .fetch(&record.registration_number)
        .expect("fetch succeeds")
        .expect("record present");
    assert_eq!(stored.status, RegistrationStatus::Approved);
    assert_eq!(stored.tracking.reviewed_by, Some(actor.id));
}

#[test]
fn document_uploads_overwrite_prior_descriptors() {
    let harness = build_service();
    let record = harness
        .service
        .create(new_registration("a@x.com"))
        .expect("created");

    harness
        .service
        .record_document(
            &record.registration_number,
            DocumentType::Photo,
            descriptor(DocumentType::Photo),
        )
        .expect("first upload");

    let mut replacement = descriptor(DocumentType::Photo);
    replacement.filename = "photo-retake.png".to_string();
    let updated = harness
        .service
        .record_document(&record.registration_number, DocumentType::Photo, replacement)
        .expect("second upload");

    assert_eq!(
        updated
            .documents
            .get(&DocumentType::Photo)
            .map(|descriptor| descriptor.filename.as_str()),
        Some("photo-retake.png")
    );
}

#[test]
fn reminders_target_stale_drafts_only() {
    let harness = build_service();
    let stale = harness
        .service
        .create(new_registration("stale@x.com"))
        .expect("created");
    let fresh = harness
        .service
        .create(new_registration("fresh@x.com"))
        .expect("created");

    // Age the first draft past the cutoff.
    let mut aged = harness
        .repository
        .fetch(&stale.registration_number)
        .expect("fetch succeeds")
        .expect("record present");
    aged.created_at = Utc::now() - Duration::days(4);
    harness.repository.update(aged).expect("aging write");

    let report = harness
        .service
        .send_reminders(Utc::now())
        .expect("sweep runs");
    assert_eq!(report.attempted, 1);
    assert_eq!(report.sent, 1);
    assert_eq!(report.failed, 0);

    let reminded: Vec<_> = harness
        .text
        .notices()
        .into_iter()
        .filter(|notice| matches!(notice.kind, NoticeKind::Reminder))
        .collect();
    assert_eq!(reminded.len(), 1);
    assert_eq!(reminded[0].registration_number, stale.registration_number);
    assert_ne!(reminded[0].registration_number, fresh.registration_number);
}

#[test]
fn reminder_failures_are_counted_not_raised() {
    let repository = Arc::new(MemoryRepository::default());
    let dispatcher = Arc::new(NotificationDispatcher::new(
        &enabled_notifications(),
        Arc::new(RecordingMessageChannel::default()),
        Arc::new(FailingTextChannel),
    ));
    let service = RegistrationService::new(
        repository.clone(),
        Arc::new(MemoryCounter::default()),
        dispatcher,
    );

    let record = service
        .create(new_registration("a@x.com"))
        .expect("created despite failing text channel");
    let mut aged = repository
        .fetch(&record.registration_number)
        .expect("fetch succeeds")
        .expect("record present");
    aged.created_at = Utc::now() - Duration::days(4);
    repository.update(aged).expect("aging write");

    let report = service.send_reminders(Utc::now()).expect("sweep runs");
    assert_eq!(report.attempted, 1);
    assert_eq!(report.sent, 0);
    assert_eq!(report.failed, 1);
}

#[test]
fn dashboard_aggregates_counts_and_recent_arrivals() {
    let harness = build_service();
    for email in ["a@x.com", "b@x.com", "c@x.com"] {
        harness
            .service
            .create(new_registration(email))
            .expect("created");
    }
    let third = harness
        .repository
        .find_by_email("c@x.com")
        .expect("lookup succeeds")
        .expect("record present");
    complete_required_documents(&harness, &third.registration_number);
    harness
        .service
        .submit(&third.registration_number)
        .expect("submitted");

    let summary = harness.service.dashboard().expect("dashboard builds");
    assert_eq!(summary.total, 3);
    assert_eq!(summary.by_status[&RegistrationStatus::Draft], 2);
    assert_eq!(summary.by_status[&RegistrationStatus::Submitted], 1);
    assert_eq!(summary.by_status[&RegistrationStatus::Approved], 0);
    assert_eq!(summary.recent.len(), 3);
}

#[test]
fn export_narrows_by_status() {
    let harness = build_service();
    harness
        .service
        .create(new_registration("a@x.com"))
        .expect("created");
    let second = harness
        .service
        .create(new_registration("b@x.com"))
        .expect("created");
    complete_required_documents(&harness, &second.registration_number);
    harness
        .service
        .submit(&second.registration_number)
        .expect("submitted");

    let submitted = harness
        .service
        .export(Some(RegistrationStatus::Submitted))
        .expect("export runs");
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].registration_number, second.registration_number);

    let everything = harness.service.export(None).expect("export runs");
    assert_eq!(everything.len(), 2);
}

#[test]
fn personal_update_cannot_steal_an_email() {
    let harness = build_service();
    harness
        .service
        .create(new_registration("first@x.com"))
        .expect("created");
    let second = harness
        .service
        .create(new_registration("second@x.com"))
        .expect("created");

    match harness.service.update_section(
        &second.registration_number,
        SectionUpdate::Personal(personal_data("first@x.com")),
    ) {
        Err(WorkflowError::EmailTaken) => {}
        other => panic!("expected email conflict, got {other:?}"),
    }
}
