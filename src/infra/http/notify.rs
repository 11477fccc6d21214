//! Change-notification webhooks.
//!
//! The content host posts one notification per mutation; the handler
//! materializes a [`ChangeEvent`] and dispatches it through the hub on this
//! request's task, so purge I/O triggered by the event stays on the
//! notifying unit of work. Unresolvable content is logged and skipped — the
//! host is never failed for it.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
};
use tracing::{debug, warn};

use autopurge_api_types::{ContentNotification, PackageNotification};

use crate::domain::change::{ChangeEvent, ContentItem};

use super::AppState;

const SOURCE: &str = "infra::http::notify";

fn authorized(state: &AppState, headers: &HeaderMap) -> bool {
    let Some(expected) = state.notify_token.as_deref() else {
        return true;
    };
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|token| token == expected)
}

/// `POST /notify/content`
pub async fn content(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(notification): Json<ContentNotification>,
) -> StatusCode {
    if !authorized(&state, &headers) {
        return StatusCode::UNAUTHORIZED;
    }

    let item = match notification.content {
        Some(payload) => Some(ContentItem::from(payload)),
        None => match state.site.load_content(notification.content_id).await {
            Ok(item) => item,
            Err(error) => {
                warn!(
                    target_module = SOURCE,
                    content_id = notification.content_id,
                    %error,
                    "content lookup failed"
                );
                None
            }
        },
    };

    let Some(item) = item else {
        warn!(
            target_module = SOURCE,
            content_id = notification.content_id,
            "content item unavailable, change skipped"
        );
        return StatusCode::ACCEPTED;
    };

    debug!(
        target_module = SOURCE,
        content_id = item.id,
        change = ?notification.change,
        "content notification received"
    );

    state
        .hub
        .dispatch_change(ChangeEvent::new(notification.change, item))
        .await;
    StatusCode::ACCEPTED
}

/// `POST /notify/package`
pub async fn package(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(notification): Json<PackageNotification>,
) -> StatusCode {
    if !authorized(&state, &headers) {
        return StatusCode::UNAUTHORIZED;
    }

    debug!(
        target_module = SOURCE,
        package = ?notification.kind,
        "package notification received"
    );

    state.hub.dispatch_package_update(notification.kind).await;
    StatusCode::ACCEPTED
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use crate::config::SiteSettings;
    use crate::domain::change::{ChangeEvent, PackageKind};
    use crate::infra::site::ConfiguredSiteMetadata;
    use crate::purge::ChangeHub;

    use super::super::{AppState, router};

    fn state_with_recorder(
        token: Option<&str>,
    ) -> (AppState, Arc<Mutex<Vec<ChangeEvent>>>, Arc<Mutex<Vec<PackageKind>>>) {
        let hub = Arc::new(ChangeHub::new());
        let events = Arc::new(Mutex::new(Vec::new()));
        let packages = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&events);
        hub.on_change(move |event| {
            let sink = Arc::clone(&sink);
            Box::pin(async move {
                sink.lock().unwrap().push(event);
            })
        });
        let sink = Arc::clone(&packages);
        hub.on_package_update(move |kind| {
            let sink = Arc::clone(&sink);
            Box::pin(async move {
                sink.lock().unwrap().push(kind);
            })
        });

        let state = AppState {
            hub,
            site: Arc::new(ConfiguredSiteMetadata::new(SiteSettings::default())),
            notify_token: token.map(str::to_string),
        };
        (state, events, packages)
    }

    fn content_request(auth: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/notify/content")
            .header("content-type", "application/json");
        if let Some(token) = auth {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        builder
            .body(Body::from(
                r#"{
                    "content_id": 42,
                    "change": "updated",
                    "update": true,
                    "content": {
                        "id": 42,
                        "content_type": "post",
                        "slug": "hello",
                        "author": {"id": 1, "slug": "jo"},
                        "terms": []
                    }
                }"#,
            ))
            .unwrap()
    }

    #[tokio::test]
    async fn inlined_content_is_dispatched() {
        let (state, events, _) = state_with_recorder(None);
        let response = router(state).oneshot(content_request(None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let events = events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].content_id(), 42);
    }

    #[tokio::test]
    async fn unresolvable_content_is_accepted_but_skipped() {
        let (state, events, _) = state_with_recorder(None);
        let request = Request::builder()
            .method("POST")
            .uri("/notify/content")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"content_id": 7, "change": "deleted"}"#))
            .unwrap();

        let response = router(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert!(events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn package_notification_is_dispatched() {
        let (state, _, packages) = state_with_recorder(None);
        let request = Request::builder()
            .method("POST")
            .uri("/notify/package")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"kind": "plugin"}"#))
            .unwrap();

        let response = router(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(packages.lock().unwrap().as_slice(), &[PackageKind::Plugin]);
    }

    #[tokio::test]
    async fn configured_token_gates_the_routes() {
        let (state, events, _) = state_with_recorder(Some("secret"));
        let response = router(state.clone())
            .oneshot(content_request(None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(events.lock().unwrap().is_empty());

        let response = router(state)
            .oneshot(content_request(Some("secret")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(events.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn health_route_responds() {
        let (state, _, _) = state_with_recorder(None);
        let request = Request::builder()
            .method("GET")
            .uri("/healthz")
            .body(Body::empty())
            .unwrap();
        let response = router(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
