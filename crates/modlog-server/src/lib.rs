pub mod auth;
pub mod routes;
pub mod state;

use axum::extract::{Request, State};
use axum::http::{header, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Json, Response};
use axum::Router;
use modlog_core::config::{AppConfig, REPORT_JOB};
use modlog_core::scheduler::Scheduler;
use modlog_core::store::ActionStore;
use modlog_report::ReportJob;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use auth::CredentialStore;
pub use state::AppState;

/// Middleware enforcing HTTP Basic Auth on every route not listed in
/// [`auth::PUBLIC_ROUTES`].
///
/// The `WWW-Authenticate` challenge is attached to every response, public or not.
async fn basic_auth_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let allowed = auth::is_public(req.method(), req.uri().path())
        || req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| state.credentials.verify_header(v));

    let mut response = if allowed {
        next.run(req).await
    } else {
        tracing::debug!("Rejected unauthenticated {} {}", req.method(), req.uri().path());
        (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "statusCode": 401, "message": "Unauthorized" })),
        )
            .into_response()
    };

    response
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, state.challenge.clone());
    response
}

/// Build the axum Router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let config = state.config.clone();

    let mut app = Router::new()
        .merge(routes::index_routes())
        .merge(routes::health_routes())
        .merge(routes::action_routes())
        .merge(routes::report_routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            basic_auth_middleware,
        ))
        .with_state(state);

    app = app.layer(TraceLayer::new_for_http());

    if config.server.cors {
        let cors = CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            .allow_origin(Any);
        app = app.layer(cors);
    }

    app
}

/// Start the HTTP server and the report scheduler.
pub async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let store = Arc::new(ActionStore::new(config.storage.action_file.clone()));
    store.ensure_exists().await?;

    let credentials = CredentialStore::load_or_init(&config.auth.user_file);
    if credentials.is_empty() {
        tracing::warn!(
            "No users in {}; every protected route will be rejected",
            config.auth.user_file.display()
        );
    }

    let state = AppState::new(config.clone(), store, credentials)?;

    let mut scheduler = Scheduler::new(
        config.scheduler.schedules.clone(),
        config.scheduler.state_file.clone(),
    );
    scheduler.register(REPORT_JOB, Arc::new(ReportJob::new(state.reports.clone())));
    let scheduler_handle = tokio::spawn(scheduler.run());

    let router = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let result = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    scheduler_handle.abort();
    result?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
