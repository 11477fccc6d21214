//! HTTP surface: change-notification webhooks and the response tagger.

pub mod notify;
pub mod tagging;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::purge::{ChangeHub, SiteMetadata};

/// Shared state for the notification routes.
#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<ChangeHub>,
    pub site: Arc<dyn SiteMetadata>,
    /// Shared secret required on the notify routes; `None` leaves them
    /// open.
    pub notify_token: Option<String>,
}

/// Build the service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/notify/content", post(notify::content))
        .route("/notify/package", post(notify::package))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
