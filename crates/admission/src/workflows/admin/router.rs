use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use crate::workflows::registration::domain::{
    ApplicationId, ApplicationRecord, DecisionStatus, Gender, RegistrationStatus,
};
use crate::workflows::registration::repository::{ApplicationRepository, RegistrationFilter};
use crate::workflows::registration::router::workflow_error_response;
use crate::workflows::registration::service::RegistrationService;
use crate::workflows::registration::validate::ValidationReport;

use super::domain::{Admin, Capability, NewAdmin, Role};
use super::repository::AdminRepository;
use super::service::{AdminService, AdminServiceError, ProfileUpdate};
use super::{authorize, authorize_role};

/// Shared state for the authenticated admin and auth surfaces.
pub struct AdminRouterState<R, A> {
    pub registrations: Arc<RegistrationService<R>>,
    pub admins: Arc<AdminService<A>>,
}

impl<R, A> Clone for AdminRouterState<R, A> {
    fn clone(&self) -> Self {
        Self {
            registrations: self.registrations.clone(),
            admins: self.admins.clone(),
        }
    }
}

/// Router builder for `/api/auth/*` and `/api/admin/*`.
pub fn admin_router<R, A>(state: AdminRouterState<R, A>) -> Router
where
    R: ApplicationRepository + 'static,
    A: AdminRepository + 'static,
{
    Router::new()
        .route("/api/auth/login", post(login_handler::<R, A>))
        .route(
            "/api/auth/profile",
            get(profile_handler::<R, A>).put(profile_update_handler::<R, A>),
        )
        .route(
            "/api/auth/change-password",
            put(change_password_handler::<R, A>),
        )
        .route("/api/auth/logout", post(logout_handler::<R, A>))
        .route("/api/auth/verify", get(verify_handler::<R, A>))
        .route(
            "/api/admin/registrations",
            get(registrations_list_handler::<R, A>),
        )
        .route(
            "/api/admin/registrations/:id",
            get(registration_detail_handler::<R, A>),
        )
        .route(
            "/api/admin/registrations/:id/status",
            put(registration_status_handler::<R, A>),
        )
        .route("/api/admin/dashboard", get(dashboard_handler::<R, A>))
        .route(
            "/api/admin/export/registrations",
            get(export_handler::<R, A>),
        )
        .route(
            "/api/admin/send-reminders",
            post(send_reminders_handler::<R, A>),
        )
        .route(
            "/api/admin/admins",
            get(admins_list_handler::<R, A>).post(admins_create_handler::<R, A>),
        )
        .with_state(state)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn admin_error_response(err: AdminServiceError) -> Response {
    use crate::workflows::registration::repository::RepositoryError;

    match err {
        AdminServiceError::InvalidCredentials => {
            let payload = json!({ "error": "invalid username or password" });
            (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
        }
        AdminServiceError::Unauthorized => {
            let payload = json!({ "error": "missing or invalid bearer token" });
            (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
        }
        AdminServiceError::Forbidden => forbidden_response(),
        AdminServiceError::Validation(report) => {
            let payload = json!({
                "error": "validation failed",
                "errors": report.errors(),
            });
            (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
        }
        AdminServiceError::Conflict => {
            let payload = json!({ "error": "username or email is already in use" });
            (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
        }
        AdminServiceError::PasswordMismatch => {
            let payload = json!({ "error": "current password does not match" });
            (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
        }
        AdminServiceError::Repository(RepositoryError::NotFound) => {
            let payload = json!({ "error": "admin not found" });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        other => {
            error!(error = %other, "admin operation failed");
            let payload = json!({ "error": "internal error" });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

fn forbidden_response() -> Response {
    let payload = json!({ "error": "insufficient role or permissions" });
    (StatusCode::FORBIDDEN, axum::Json(payload)).into_response()
}

fn authenticated<R, A>(
    state: &AdminRouterState<R, A>,
    headers: &HeaderMap,
) -> Result<Admin, Response>
where
    R: ApplicationRepository + 'static,
    A: AdminRepository + 'static,
{
    let Some(token) = bearer_token(headers) else {
        let payload = json!({ "error": "missing bearer token" });
        return Err((StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response());
    };
    state
        .admins
        .authenticate(token)
        .map_err(admin_error_response)
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginRequest {
    username: String,
    password: String,
}

pub(crate) async fn login_handler<R, A>(
    State(state): State<AdminRouterState<R, A>>,
    axum::Json(request): axum::Json<LoginRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    A: AdminRepository + 'static,
{
    let mut report = ValidationReport::new();
    if request.username.trim().is_empty() {
        report.push("username", "username is required");
    }
    if request.password.is_empty() {
        report.push("password", "password is required");
    }
    if let Err(report) = report.into_result() {
        return admin_error_response(AdminServiceError::Validation(report));
    }

    match state.admins.login(&request.username, &request.password) {
        Ok(session) => (StatusCode::OK, axum::Json(session)).into_response(),
        Err(err) => admin_error_response(err),
    }
}

pub(crate) async fn profile_handler<R, A>(
    State(state): State<AdminRouterState<R, A>>,
    headers: HeaderMap,
) -> Response
where
    R: ApplicationRepository + 'static,
    A: AdminRepository + 'static,
{
    match authenticated(&state, &headers) {
        Ok(admin) => (StatusCode::OK, axum::Json(admin.profile())).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn profile_update_handler<R, A>(
    State(state): State<AdminRouterState<R, A>>,
    headers: HeaderMap,
    axum::Json(update): axum::Json<ProfileUpdate>,
) -> Response
where
    R: ApplicationRepository + 'static,
    A: AdminRepository + 'static,
{
    let admin = match authenticated(&state, &headers) {
        Ok(admin) => admin,
        Err(response) => return response,
    };
    match state.admins.update_profile(&admin.id, update) {
        Ok(profile) => (StatusCode::OK, axum::Json(profile)).into_response(),
        Err(err) => admin_error_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChangePasswordRequest {
    current_password: String,
    new_password: String,
}

pub(crate) async fn change_password_handler<R, A>(
    State(state): State<AdminRouterState<R, A>>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<ChangePasswordRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    A: AdminRepository + 'static,
{
    let admin = match authenticated(&state, &headers) {
        Ok(admin) => admin,
        Err(response) => return response,
    };
    match state.admins.change_password(
        &admin.id,
        &request.current_password,
        &request.new_password,
    ) {
        Ok(()) => {
            let payload = json!({ "message": "password updated" });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => admin_error_response(err),
    }
}

pub(crate) async fn logout_handler<R, A>(
    State(state): State<AdminRouterState<R, A>>,
    headers: HeaderMap,
) -> Response
where
    R: ApplicationRepository + 'static,
    A: AdminRepository + 'static,
{
    if let Err(response) = authenticated(&state, &headers) {
        return response;
    }
    if let Some(token) = bearer_token(&headers) {
        state.admins.logout(token);
    }
    let payload = json!({ "message": "logged out" });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

pub(crate) async fn verify_handler<R, A>(
    State(state): State<AdminRouterState<R, A>>,
    headers: HeaderMap,
) -> Response
where
    R: ApplicationRepository + 'static,
    A: AdminRepository + 'static,
{
    match authenticated(&state, &headers) {
        Ok(admin) => {
            let payload = json!({ "admin": admin.profile() });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(response) => response,
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListQuery {
    #[serde(default)]
    page: Option<usize>,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    search: Option<String>,
}

pub(crate) async fn registrations_list_handler<R, A>(
    State(state): State<AdminRouterState<R, A>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Response
where
    R: ApplicationRepository + 'static,
    A: AdminRepository + 'static,
{
    let admin = match authenticated(&state, &headers) {
        Ok(admin) => admin,
        Err(response) => return response,
    };
    if !authorize(&admin, Capability::ViewRegistrations) {
        return forbidden_response();
    }

    let status = match parse_status_filter(query.status.as_deref()) {
        Ok(status) => status,
        Err(response) => return response,
    };
    let filter = RegistrationFilter {
        status,
        search: query.search,
        page: query.page.unwrap_or(1).max(1),
        limit: query.limit.unwrap_or(10).clamp(1, 100),
    };

    match state.registrations.list(&filter) {
        Ok(page) => {
            let payload = json!({
                "registrations": page.records,
                "pagination": {
                    "page": page.page,
                    "limit": page.limit,
                    "total": page.total,
                    "pages": page.pages(),
                },
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => workflow_error_response(err),
    }
}

pub(crate) async fn registration_detail_handler<R, A>(
    State(state): State<AdminRouterState<R, A>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    A: AdminRepository + 'static,
{
    let admin = match authenticated(&state, &headers) {
        Ok(admin) => admin,
        Err(response) => return response,
    };
    if !authorize(&admin, Capability::ViewRegistrations) {
        return forbidden_response();
    }

    match state.registrations.get_by_id(&ApplicationId(id)) {
        Ok(record) => (StatusCode::OK, axum::Json(record)).into_response(),
        Err(err) => workflow_error_response(err),
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DecisionRequest {
    status: String,
    #[serde(default)]
    notes: Option<String>,
}

pub(crate) async fn registration_status_handler<R, A>(
    State(state): State<AdminRouterState<R, A>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    axum::Json(request): axum::Json<DecisionRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    A: AdminRepository + 'static,
{
    let admin = match authenticated(&state, &headers) {
        Ok(admin) => admin,
        Err(response) => return response,
    };

    let Some(target) = DecisionStatus::parse(&request.status) else {
        let payload = json!({ "error": format!("invalid status value '{}'", request.status) });
        return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
    };

    match state
        .registrations
        .decide(&ApplicationId(id), &admin, target, request.notes)
    {
        Ok(record) => {
            let payload = json!({
                "registration_number": record.registration_number,
                "status": record.status,
                "reviewed_at": record.tracking.reviewed_at,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => workflow_error_response(err),
    }
}

pub(crate) async fn dashboard_handler<R, A>(
    State(state): State<AdminRouterState<R, A>>,
    headers: HeaderMap,
) -> Response
where
    R: ApplicationRepository + 'static,
    A: AdminRepository + 'static,
{
    let admin = match authenticated(&state, &headers) {
        Ok(admin) => admin,
        Err(response) => return response,
    };
    if !authorize(&admin, Capability::ViewRegistrations) {
        return forbidden_response();
    }

    match state.registrations.dashboard() {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(err) => workflow_error_response(err),
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ExportQuery {
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

pub(crate) async fn export_handler<R, A>(
    State(state): State<AdminRouterState<R, A>>,
    headers: HeaderMap,
    Query(query): Query<ExportQuery>,
) -> Response
where
    R: ApplicationRepository + 'static,
    A: AdminRepository + 'static,
{
    let admin = match authenticated(&state, &headers) {
        Ok(admin) => admin,
        Err(response) => return response,
    };
    if !authorize(&admin, Capability::ViewRegistrations) {
        return forbidden_response();
    }

    let status = match parse_status_filter(query.status.as_deref()) {
        Ok(status) => status,
        Err(response) => return response,
    };

    let records = match state.registrations.export(status) {
        Ok(records) => records,
        Err(err) => return workflow_error_response(err),
    };

    match query.format.as_deref().unwrap_or("csv") {
        "json" => {
            let payload = json!({ "registrations": records });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        "csv" => match render_csv(&records) {
            Ok(csv) => {
                let filename = format!("registrations-{}.csv", Utc::now().date_naive());
                (
                    StatusCode::OK,
                    [
                        (header::CONTENT_TYPE, "text/csv".to_string()),
                        (
                            header::CONTENT_DISPOSITION,
                            format!("attachment; filename={filename}"),
                        ),
                    ],
                    csv,
                )
                    .into_response()
            }
            Err(err) => {
                error!(error = %err, "csv export failed");
                let payload = json!({ "error": "internal error" });
                (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
            }
        },
        other => {
            let payload = json!({ "error": format!("unknown export format '{other}'") });
            (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn send_reminders_handler<R, A>(
    State(state): State<AdminRouterState<R, A>>,
    headers: HeaderMap,
) -> Response
where
    R: ApplicationRepository + 'static,
    A: AdminRepository + 'static,
{
    let admin = match authenticated(&state, &headers) {
        Ok(admin) => admin,
        Err(response) => return response,
    };
    if !authorize_role(&admin, &[Role::Admin, Role::SuperAdmin]) {
        return forbidden_response();
    }

    match state.registrations.send_reminders(Utc::now()) {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(err) => workflow_error_response(err),
    }
}

pub(crate) async fn admins_list_handler<R, A>(
    State(state): State<AdminRouterState<R, A>>,
    headers: HeaderMap,
) -> Response
where
    R: ApplicationRepository + 'static,
    A: AdminRepository + 'static,
{
    let admin = match authenticated(&state, &headers) {
        Ok(admin) => admin,
        Err(response) => return response,
    };
    match state.admins.list_admins(&admin) {
        Ok(admins) => {
            let payload = json!({ "admins": admins });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => admin_error_response(err),
    }
}

pub(crate) async fn admins_create_handler<R, A>(
    State(state): State<AdminRouterState<R, A>>,
    headers: HeaderMap,
    axum::Json(new): axum::Json<NewAdmin>,
) -> Response
where
    R: ApplicationRepository + 'static,
    A: AdminRepository + 'static,
{
    let admin = match authenticated(&state, &headers) {
        Ok(admin) => admin,
        Err(response) => return response,
    };
    match state.admins.create_admin(&admin, new) {
        Ok(profile) => (StatusCode::CREATED, axum::Json(profile)).into_response(),
        Err(err) => admin_error_response(err),
    }
}

fn parse_status_filter(raw: Option<&str>) -> Result<Option<RegistrationStatus>, Response> {
    match raw {
        None => Ok(None),
        Some(value) => match RegistrationStatus::parse(value) {
            Some(status) => Ok(Some(status)),
            None => {
                let payload = json!({ "error": format!("unknown status '{value}'") });
                Err((StatusCode::BAD_REQUEST, axum::Json(payload)).into_response())
            }
        },
    }
}

fn render_csv(records: &[ApplicationRecord]) -> Result<String, Box<dyn std::error::Error>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "registration_number",
        "full_name",
        "email",
        "phone_number",
        "gender",
        "birth_date",
        "father_name",
        "mother_name",
        "previous_school",
        "status",
        "created_at",
    ])?;

    for record in records {
        let gender = match record.personal.gender {
            Gender::Male => "male",
            Gender::Female => "female",
        };
        writer.write_record([
            record.registration_number.as_str(),
            record.personal.full_name.as_str(),
            record.personal.email.as_str(),
            record.personal.phone_number.as_str(),
            gender,
            &record.personal.birth_date.to_string(),
            record
                .parent
                .as_ref()
                .map(|parent| parent.father.name.as_str())
                .unwrap_or(""),
            record
                .parent
                .as_ref()
                .map(|parent| parent.mother.name.as_str())
                .unwrap_or(""),
            record
                .academic
                .as_ref()
                .map(|academic| academic.previous_school.name.as_str())
                .unwrap_or(""),
            record.status.label(),
            &record.created_at.date_naive().to_string(),
        ])?;
    }

    let bytes = writer.into_inner()?;
    Ok(String::from_utf8(bytes)?)
}
