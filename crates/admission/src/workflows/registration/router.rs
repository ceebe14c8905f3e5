use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use chrono::Utc;
use serde_json::json;
use tracing::error;

use crate::config::UploadConfig;

use super::domain::{
    AcademicData, DocumentDescriptor, DocumentType, ParentData, RegistrationNumber,
};
use super::repository::{ApplicationRepository, DocumentStore, RepositoryError};
use super::service::{
    BulkSectionUpdate, NewRegistration, RegistrationService, SectionUpdate, WorkflowError,
};

/// Shared state for the public registration surface.
pub struct RegistrationRouterState<R> {
    pub service: Arc<RegistrationService<R>>,
    pub documents: Arc<dyn DocumentStore>,
    pub uploads: UploadConfig,
}

impl<R> Clone for RegistrationRouterState<R> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            documents: self.documents.clone(),
            uploads: self.uploads,
        }
    }
}

/// Router builder exposing the applicant-facing intake endpoints.
pub fn registration_router<R>(state: RegistrationRouterState<R>) -> Router
where
    R: ApplicationRepository + 'static,
{
    Router::new()
        .route(
            "/api/registration/personal-data",
            post(create_handler::<R>),
        )
        .route(
            "/api/registration/:registration_number/parent-data",
            put(parent_data_handler::<R>),
        )
        .route(
            "/api/registration/:registration_number/academic-data",
            put(academic_data_handler::<R>),
        )
        .route(
            "/api/registration/:registration_number/documents",
            post(upload_documents_handler::<R>),
        )
        .route(
            "/api/registration/:registration_number/submit",
            post(submit_handler::<R>),
        )
        .route(
            "/api/registration/:registration_number",
            get(get_handler::<R>).put(bulk_update_handler::<R>),
        )
        .with_state(state)
}

/// Map a workflow failure onto the wire. Shared by the admin surface.
pub(crate) fn workflow_error_response(err: WorkflowError) -> Response {
    match err {
        WorkflowError::Validation(report) => {
            let payload = json!({
                "error": "validation failed",
                "errors": report.errors(),
            });
            (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
        }
        WorkflowError::EmailTaken => {
            let payload = json!({ "error": "email is already registered" });
            (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
        }
        WorkflowError::IncompleteDocuments(missing) => {
            let payload = json!({
                "error": "required documents are missing",
                "missing_documents": missing,
            });
            (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
        }
        err @ (WorkflowError::NotEditable { .. } | WorkflowError::InvalidTransition { .. }) => {
            let payload = json!({ "error": err.to_string() });
            (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
        }
        WorkflowError::Forbidden => {
            let payload = json!({ "error": "insufficient permissions" });
            (StatusCode::FORBIDDEN, axum::Json(payload)).into_response()
        }
        WorkflowError::Repository(RepositoryError::NotFound) => {
            let payload = json!({ "error": "registration not found" });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        WorkflowError::Repository(RepositoryError::StaleRevision) => {
            let payload = json!({ "error": "registration was modified concurrently" });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        WorkflowError::Repository(RepositoryError::Conflict) => {
            let payload = json!({ "error": "record already exists" });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        other => {
            error!(error = %other, "registration operation failed");
            let payload = json!({ "error": "internal error" });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn create_handler<R>(
    State(state): State<RegistrationRouterState<R>>,
    axum::Json(new): axum::Json<NewRegistration>,
) -> Response
where
    R: ApplicationRepository + 'static,
{
    match state.service.create(new) {
        Ok(record) => {
            let payload = json!({
                "registration_number": record.registration_number,
                "status": record.status,
            });
            (StatusCode::CREATED, axum::Json(payload)).into_response()
        }
        Err(err) => workflow_error_response(err),
    }
}

pub(crate) async fn parent_data_handler<R>(
    State(state): State<RegistrationRouterState<R>>,
    Path(registration_number): Path<String>,
    axum::Json(parent): axum::Json<ParentData>,
) -> Response
where
    R: ApplicationRepository + 'static,
{
    let number = RegistrationNumber(registration_number);
    match state
        .service
        .update_section(&number, SectionUpdate::Parent(parent))
    {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(err) => workflow_error_response(err),
    }
}

pub(crate) async fn academic_data_handler<R>(
    State(state): State<RegistrationRouterState<R>>,
    Path(registration_number): Path<String>,
    axum::Json(academic): axum::Json<AcademicData>,
) -> Response
where
    R: ApplicationRepository + 'static,
{
    let number = RegistrationNumber(registration_number);
    match state
        .service
        .update_section(&number, SectionUpdate::Academic(academic))
    {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(err) => workflow_error_response(err),
    }
}

pub(crate) async fn upload_documents_handler<R>(
    State(state): State<RegistrationRouterState<R>>,
    Path(registration_number): Path<String>,
    mut multipart: Multipart,
) -> Response
where
    R: ApplicationRepository + 'static,
{
    let number = RegistrationNumber(registration_number);
    if let Err(err) = state.service.get(&number) {
        return workflow_error_response(err);
    }

    let mut uploaded: Vec<DocumentType> = Vec::new();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                let payload = json!({ "error": format!("malformed multipart payload: {err}") });
                return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
            }
        };

        if uploaded.len() >= state.uploads.max_files_per_request {
            let payload = json!({
                "error": format!(
                    "at most {} files per request",
                    state.uploads.max_files_per_request
                ),
            });
            return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
        }

        let name = field.name().unwrap_or_default().to_string();
        let Some(document) = DocumentType::parse(&name) else {
            let payload = json!({ "error": format!("unknown document field '{name}'") });
            return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
        };

        let content_type = field.content_type().unwrap_or_default().to_string();
        if !document.accepts(&content_type) {
            let payload = json!({
                "error": format!("content type not allowed for {document}"),
                "allowed": document.allowed_content_types(),
            });
            return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
        }

        let original_name = field.file_name().unwrap_or("upload").to_string();
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(err) => {
                let payload = json!({ "error": format!("failed to read upload: {err}") });
                return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
            }
        };

        if bytes.len() > state.uploads.max_file_size {
            let payload = json!({
                "error": format!(
                    "file for {document} exceeds the {} byte limit",
                    state.uploads.max_file_size
                ),
            });
            return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
        }

        let blob = match state
            .documents
            .store(&number, document, &bytes, &original_name, &content_type)
        {
            Ok(blob) => blob,
            Err(err) => {
                error!(error = %err, %number, "blob store rejected upload");
                let payload = json!({ "error": "internal error" });
                return (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response();
            }
        };

        let descriptor = DocumentDescriptor {
            filename: blob.filename,
            original_name,
            storage_key: blob.storage_key,
            content_type,
            uploaded_at: Utc::now(),
        };

        if let Err(err) = state.service.record_document(&number, document, descriptor) {
            return workflow_error_response(err);
        }
        uploaded.push(document);
    }

    let payload = json!({
        "uploaded_documents": uploaded,
        "total_documents": DocumentType::ALL.len(),
    });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn submit_handler<R>(
    State(state): State<RegistrationRouterState<R>>,
    Path(registration_number): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
{
    let number = RegistrationNumber(registration_number);
    match state.service.submit(&number) {
        Ok(record) => {
            let payload = json!({
                "registration_number": record.registration_number,
                "status": record.status,
                "submitted_at": record.tracking.submitted_at,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => workflow_error_response(err),
    }
}

pub(crate) async fn get_handler<R>(
    State(state): State<RegistrationRouterState<R>>,
    Path(registration_number): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
{
    let number = RegistrationNumber(registration_number);
    match state.service.get(&number) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(err) => workflow_error_response(err),
    }
}

pub(crate) async fn bulk_update_handler<R>(
    State(state): State<RegistrationRouterState<R>>,
    Path(registration_number): Path<String>,
    axum::Json(bulk): axum::Json<BulkSectionUpdate>,
) -> Response
where
    R: ApplicationRepository + 'static,
{
    let number = RegistrationNumber(registration_number);
    match state.service.update_sections(&number, bulk) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(err) => workflow_error_response(err),
    }
}
