use crate::cli::ServeArgs;
use crate::infra::{
    AppState, InMemoryAdminRepository, InMemoryApplicationRepository, InMemoryDocumentStore,
    InMemoryRegistrationCounter, LogMessageChannel, LogTextChannel,
};
use crate::routes::api_router;
use admission::config::AppConfig;
use admission::error::AppError;
use admission::telemetry;
use admission::workflows::admin::{AdminRouterState, AdminService};
use admission::workflows::registration::{
    NotificationDispatcher, RegistrationRouterState, RegistrationService,
};
use axum::extract::DefaultBodyLimit;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = Arc::new(InMemoryApplicationRepository::default());
    let dispatcher = Arc::new(NotificationDispatcher::new(
        &config.notifications,
        Arc::new(LogMessageChannel),
        Arc::new(LogTextChannel),
    ));
    let registration_service = Arc::new(RegistrationService::new(
        repository,
        Arc::new(InMemoryRegistrationCounter::default()),
        dispatcher,
    ));
    let admin_service = Arc::new(AdminService::new(
        Arc::new(InMemoryAdminRepository::default()),
        config.auth,
    ));

    match admin_service.bootstrap_super_admin(&config.bootstrap) {
        Ok(Some(profile)) => info!(username = %profile.username, "bootstrap super admin created"),
        Ok(None) => {}
        Err(err) => warn!(error = %err, "bootstrap super admin skipped"),
    }

    // Multipart bodies can carry several files; leave headroom over the
    // per-file cap.
    let body_limit = config.uploads.max_file_size * config.uploads.max_files_per_request
        + 1024 * 1024;

    let app = api_router(
        RegistrationRouterState {
            service: registration_service.clone(),
            documents: Arc::new(InMemoryDocumentStore::default()),
            uploads: config.uploads,
        },
        AdminRouterState {
            registrations: registration_service,
            admins: admin_service,
        },
    )
    .layer(DefaultBodyLimit::max(body_limit))
    .layer(Extension(app_state))
    .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "admission intake service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
