//! End-to-end purge flow: webhook notification → dispatch → derivation →
//! coalesced flush → batched submission.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use tower::ServiceExt;

use autopurge::config::SiteSettings;
use autopurge::infra::http::{AppState, router};
use autopurge::infra::site::ConfiguredSiteMetadata;
use autopurge::purge::{
    AutoPurger, Batcher, ChangeHub, PurgeClient, PurgeConfig, PurgeError, PurgeSink,
    SiteMetadata,
};
use autopurge_api_types::PurgePayload;

#[derive(Default)]
struct RecordingSink {
    payloads: Mutex<Vec<PurgePayload>>,
}

#[async_trait]
impl PurgeSink for RecordingSink {
    async fn submit(&self, payload: &PurgePayload) -> Result<(), PurgeError> {
        self.payloads.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

fn site_settings() -> SiteSettings {
    SiteSettings {
        base_url: "https://example.com".to_string(),
        viewable_types: vec!["post".to_string(), "page".to_string()],
        taxonomies: HashMap::from([("category".to_string(), "category".to_string())]),
        archives: HashMap::from([("post".to_string(), "blog".to_string())]),
    }
}

fn wired_app(sink: &Arc<RecordingSink>) -> axum::Router {
    let config = PurgeConfig {
        zone_id: Some("zone-1".to_string()),
        api_token: Some("token-1".to_string()),
        ..Default::default()
    };

    let site: Arc<dyn SiteMetadata> = Arc::new(ConfiguredSiteMetadata::new(site_settings()));
    let batcher = Arc::new(Batcher::new(Arc::clone(sink), config.batch_cap));
    let purger = Arc::new(AutoPurger::new(Arc::clone(&site), batcher, &config));
    let hub = Arc::new(ChangeHub::new());
    purger.register(&hub);

    router(AppState {
        hub,
        site,
        notify_token: None,
    })
}

fn content_notification() -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/notify/content")
        .header("content-type", "application/json")
        .body(Body::from(
            r#"{
                "content_id": 42,
                "change": "updated",
                "update": true,
                "content": {
                    "id": 42,
                    "content_type": "post",
                    "slug": "hello-world",
                    "author": {"id": 7, "slug": "jo"},
                    "published_at": "2024-03-09T12:00:00Z",
                    "terms": [
                        {"taxonomy": "category", "term_id": 3, "slug": "news"}
                    ]
                }
            }"#,
        ))
        .unwrap()
}

#[tokio::test]
async fn content_change_submits_one_coalesced_batch() {
    let sink = Arc::new(RecordingSink::default());
    let app = wired_app(&sink);

    let response = app.oneshot(content_notification()).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let payloads = sink.payloads.lock().unwrap();
    assert_eq!(payloads.len(), 1, "one burst, one submission");

    let PurgePayload::Files { files } = &payloads[0] else {
        panic!("expected a files payload, got {:?}", payloads[0]);
    };

    // Spot-check every derivation family.
    for expected in [
        "https://example.com/hello-world/",
        "https://example.com/",
        "https://example.com/feed/",
        "https://example.com/blog/",
        "https://example.com/blog/page/5/",
        "https://example.com/category/news/",
        "https://example.com/category/news/page/2/",
        "https://example.com/category/news/feed/",
        "https://example.com/author/jo/",
        "https://example.com/author/jo/feed/",
        "https://example.com/2024/",
        "https://example.com/2024/03/",
        "https://example.com/2024/03/page/4/",
        "https://example.com/2024/03/09/",
    ] {
        assert!(
            files.contains(&expected.to_string()),
            "missing {expected} in {files:?}"
        );
    }

    // Day archives are never paginated, and the whole set fits the cap.
    assert!(!files.contains(&"https://example.com/2024/03/09/page/2/".to_string()));
    assert!(files.len() <= 30);
}

#[tokio::test]
async fn revision_notification_purges_nothing() {
    let sink = Arc::new(RecordingSink::default());
    let app = wired_app(&sink);

    let request = Request::builder()
        .method("POST")
        .uri("/notify/content")
        .header("content-type", "application/json")
        .body(Body::from(
            r#"{
                "content_id": 43,
                "change": "updated",
                "content": {
                    "id": 43,
                    "content_type": "post",
                    "slug": "hello-world",
                    "revision_of": 42,
                    "author": {"id": 7, "slug": "jo"},
                    "terms": []
                }
            }"#,
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert!(sink.payloads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn non_viewable_type_purges_nothing() {
    let sink = Arc::new(RecordingSink::default());
    let app = wired_app(&sink);

    let request = Request::builder()
        .method("POST")
        .uri("/notify/content")
        .header("content-type", "application/json")
        .body(Body::from(
            r#"{
                "content_id": 44,
                "change": "created",
                "content": {
                    "id": 44,
                    "content_type": "attachment",
                    "slug": "picture",
                    "author": {"id": 7, "slug": "jo"},
                    "terms": []
                }
            }"#,
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert!(sink.payloads.lock().unwrap().is_empty());
}

#[tokio::test]
async fn package_update_purges_the_html_tag() {
    let sink = Arc::new(RecordingSink::default());
    let app = wired_app(&sink);

    let request = Request::builder()
        .method("POST")
        .uri("/notify/package")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"kind": "theme"}"#))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let payloads = sink.payloads.lock().unwrap();
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0], PurgePayload::tags(vec!["html".to_string()]));
}

#[tokio::test]
async fn unconfigured_client_performs_no_network_io() {
    // A real client without credentials must fail fast; wiring it through
    // the pipeline therefore produces failed batches but no panics and no
    // sockets.
    let config = PurgeConfig::default();
    let client = Arc::new(PurgeClient::from_config(&config).unwrap());
    assert!(!client.is_configured());

    let batcher = Batcher::new(client, config.batch_cap);
    let report = batcher
        .purge_urls(vec!["https://example.com/".to_string()])
        .await;
    assert!(!report.all_succeeded());
    assert!(matches!(
        report.outcomes[0].result,
        Err(PurgeError::Misconfigured)
    ));
}
