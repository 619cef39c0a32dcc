use crate::auth::CredentialStore;
use axum::http::HeaderValue;
use modlog_core::config::AppConfig;
use modlog_core::store::ActionStore;
use modlog_report::ReportService;
use std::sync::Arc;

/// Shared application state for the server.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<ActionStore>,
    pub reports: ReportService,
    pub credentials: Arc<CredentialStore>,
    /// Pre-built `WWW-Authenticate` value sent with every response.
    pub challenge: HeaderValue,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<ActionStore>,
        credentials: CredentialStore,
    ) -> anyhow::Result<Self> {
        let challenge = HeaderValue::from_str(&format!("Basic realm=\"{}\"", config.auth.realm))
            .map_err(|e| anyhow::anyhow!("invalid auth realm {:?}: {e}", config.auth.realm))?;

        Ok(Self {
            config: Arc::new(config),
            reports: ReportService::new(store.clone()),
            store,
            credentials: Arc::new(credentials),
            challenge,
        })
    }
}
