use crate::state::AppState;
use askama::Template;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use modlog_core::validate::{validate_action, ActionInput};
use serde::Deserialize;
use serde_json::json;

type ApiError = (StatusCode, Json<serde_json::Value>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": message.into() })))
}

// ── Index ───────────────────────────────────────────────────────────────

/// The report markup is escaped by `render_html`, so it is embedded as-is.
#[derive(Template)]
#[template(path = "index.html", escape = "html")]
struct IndexTemplate<'a> {
    message: &'a str,
}

pub fn index_routes() -> Router<AppState> {
    Router::new().route("/", get(index))
}

async fn index(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    let report = state.reports.render().await;
    IndexTemplate { message: &report }
        .render()
        .map(Html)
        .map_err(|e| {
            tracing::warn!("Failed to render index template: {}", e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "failed to render page")
        })
}

// ── Health ──────────────────────────────────────────────────────────────

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

// ── Actions ─────────────────────────────────────────────────────────────

pub fn action_routes() -> Router<AppState> {
    Router::new().route(
        "/actions",
        get(list_actions).post(create_action).delete(delete_actions),
    )
}

async fn list_actions(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.store.list().await)
}

async fn create_action(
    State(state): State<AppState>,
    body: Result<Json<ActionInput>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(input) = body.map_err(|e| api_error(StatusCode::BAD_REQUEST, e.body_text()))?;

    let action = validate_action(&input).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": e.to_string(), "field": e.field() })),
        )
    })?;

    state.store.append(action).await.map_err(|e| {
        tracing::error!("Failed to record action: {}", e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "failed to record action")
    })?;

    Ok((StatusCode::CREATED, Json(state.store.list().await)))
}

async fn delete_actions(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.store.clear().await.map_err(|e| {
        tracing::error!("Failed to clear actions: {}", e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "failed to clear actions")
    })?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Report ──────────────────────────────────────────────────────────────

pub fn report_routes() -> Router<AppState> {
    Router::new().route("/report", get(report))
}

#[derive(Debug, Deserialize)]
struct ReportQuery {
    json: Option<String>,
}

impl ReportQuery {
    /// A bare `?json` counts as set.
    fn wants_json(&self) -> bool {
        match self.json.as_deref() {
            Some(v) => matches!(v.to_ascii_lowercase().as_str(), "" | "true" | "1" | "yes"),
            None => false,
        }
    }
}

async fn report(State(state): State<AppState>, Query(query): Query<ReportQuery>) -> Response {
    if query.wants_json() {
        Json(state.reports.summary().await).into_response()
    } else {
        Html(state.reports.render().await).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(json: Option<&str>) -> ReportQuery {
        ReportQuery {
            json: json.map(str::to_string),
        }
    }

    #[test]
    fn test_json_flag_values() {
        assert!(query(Some("")).wants_json());
        assert!(query(Some("true")).wants_json());
        assert!(query(Some("TRUE")).wants_json());
        assert!(query(Some("1")).wants_json());
        assert!(query(Some("yes")).wants_json());
        assert!(!query(Some("false")).wants_json());
        assert!(!query(Some("0")).wants_json());
        assert!(!query(None).wants_json());
    }
}
