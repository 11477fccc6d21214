//! Manual purge entry points.
//!
//! Operator-driven invalidation: everything, an explicit URL list, or an
//! explicit tag list. Results are always human-readable notices — a failed
//! purge is a warning to the operator, never a fault raised through the
//! hosting surface.

use tracing::warn;

use super::batch::{Batcher, PurgeSink, is_absolute_url};

const SOURCE: &str = "purge::manual";

/// Severity of a [`PurgeNotice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeStatus {
    Success,
    Warning,
}

/// Human-readable summary of a manual purge operation.
#[derive(Debug, Clone)]
pub struct PurgeNotice {
    pub status: NoticeStatus,
    pub message: String,
}

impl PurgeNotice {
    fn success(message: impl Into<String>) -> Self {
        Self {
            status: NoticeStatus::Success,
            message: message.into(),
        }
    }

    fn warning(message: impl Into<String>) -> Self {
        Self {
            status: NoticeStatus::Warning,
            message: message.into(),
        }
    }
}

/// Purge the entire cache.
///
/// Deliberately bypasses the coalescer: an operator pressing the big button
/// expects the call to go out now, and an "everything" purge has nothing to
/// gain from being merged with targeted ones.
pub async fn purge_everything<S: PurgeSink>(batcher: &Batcher<S>) -> PurgeNotice {
    let report = batcher.purge_everything().await;
    if report.all_succeeded() {
        PurgeNotice::success("Purge-everything request sent.")
    } else {
        PurgeNotice::warning("Purge-everything request failed; see logs for details.")
    }
}

/// Purge a newline-delimited URL list.
///
/// Entries are trimmed and deduplicated; anything that does not parse as an
/// absolute `http(s)` URL is dropped before batching. An input with no
/// valid entries is reported, not submitted.
pub async fn purge_url_list<S: PurgeSink>(batcher: &Batcher<S>, raw: &str) -> PurgeNotice {
    let (urls, dropped) = collect_url_lines(raw);

    if urls.is_empty() {
        return PurgeNotice::warning("No valid URLs found.");
    }
    if dropped > 0 {
        warn!(
            target_module = SOURCE,
            dropped, "invalid URL entries dropped from manual purge input"
        );
    }

    let report = batcher.purge_urls(urls).await;
    let mut message = format!("{} URL(s) sent for purge.", report.submitted);
    if dropped > 0 {
        message.push_str(&format!(" {dropped} invalid entr(y/ies) dropped."));
    }

    if report.all_succeeded() {
        PurgeNotice::success(message)
    } else {
        PurgeNotice::warning(format!(
            "{message} {} of {} batch(es) failed.",
            report.failed_batches(),
            report.outcomes.len()
        ))
    }
}

/// Purge a newline-delimited tag list.
///
/// Tags are free-form lowercase tokens; beyond trim, lowercase and dedupe
/// there is nothing to validate.
pub async fn purge_tag_list<S: PurgeSink>(batcher: &Batcher<S>, raw: &str) -> PurgeNotice {
    let tags = collect_tag_lines(raw);

    if tags.is_empty() {
        return PurgeNotice::warning("No valid cache tags found.");
    }

    let report = batcher.purge_tags(tags).await;
    let message = format!("{} cache tag(s) sent for purge.", report.submitted);

    if report.all_succeeded() {
        PurgeNotice::success(message)
    } else {
        PurgeNotice::warning(format!(
            "{message} {} of {} batch(es) failed.",
            report.failed_batches(),
            report.outcomes.len()
        ))
    }
}

/// Trim, dedupe and validate URL lines. Returns the survivors in input
/// order plus the count of dropped entries.
fn collect_url_lines(raw: &str) -> (Vec<String>, usize) {
    let mut seen = std::collections::HashSet::new();
    let mut urls = Vec::new();
    let mut dropped = 0;

    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if !is_absolute_url(line) {
            dropped += 1;
            continue;
        }
        if seen.insert(line.to_string()) {
            urls.push(line.to_string());
        }
    }
    (urls, dropped)
}

/// Trim, lowercase and dedupe tag lines, preserving input order.
fn collect_tag_lines(raw: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut tags = Vec::new();

    for line in raw.lines() {
        let tag = line.trim().to_ascii_lowercase();
        if tag.is_empty() {
            continue;
        }
        if seen.insert(tag.clone()) {
            tags.push(tag);
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use autopurge_api_types::PurgePayload;

    use super::super::client::PurgeError;
    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        payloads: Mutex<Vec<PurgePayload>>,
        fail: bool,
    }

    #[async_trait]
    impl PurgeSink for RecordingSink {
        async fn submit(&self, payload: &PurgePayload) -> Result<(), PurgeError> {
            self.payloads.lock().unwrap().push(payload.clone());
            if self.fail {
                Err(PurgeError::Api {
                    status: 503,
                    body: "unavailable".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    fn batcher(sink: &Arc<RecordingSink>) -> Batcher<RecordingSink> {
        Batcher::new(Arc::clone(sink), 30)
    }

    #[tokio::test]
    async fn url_list_filters_invalid_entries() {
        let sink = Arc::new(RecordingSink::default());
        let notice =
            purge_url_list(&batcher(&sink), "https://ok.example/x\nnot a url\n").await;

        assert_eq!(notice.status, NoticeStatus::Success);
        assert!(notice.message.starts_with("1 URL(s) sent"));

        let payloads = sink.payloads.lock().unwrap();
        assert_eq!(payloads.len(), 1);
        assert_eq!(
            payloads[0],
            PurgePayload::files(vec!["https://ok.example/x".to_string()])
        );
    }

    #[tokio::test]
    async fn all_invalid_input_submits_nothing() {
        let sink = Arc::new(RecordingSink::default());
        let notice = purge_url_list(&batcher(&sink), "not a url\n/relative\n\n").await;

        assert_eq!(notice.status, NoticeStatus::Warning);
        assert_eq!(notice.message, "No valid URLs found.");
        assert!(sink.payloads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn url_list_is_deduplicated() {
        let sink = Arc::new(RecordingSink::default());
        let notice = purge_url_list(
            &batcher(&sink),
            "https://ok.example/x\nhttps://ok.example/x\nhttps://ok.example/y",
        )
        .await;

        assert!(notice.message.starts_with("2 URL(s) sent"));
    }

    #[tokio::test]
    async fn tag_list_is_trimmed_lowercased_deduplicated() {
        let sink = Arc::new(RecordingSink::default());
        let notice = purge_tag_list(&batcher(&sink), "  HTML \nhome\nhtml\n\n").await;

        assert_eq!(notice.status, NoticeStatus::Success);
        assert!(notice.message.starts_with("2 cache tag(s) sent"));

        let payloads = sink.payloads.lock().unwrap();
        assert_eq!(
            payloads[0],
            PurgePayload::tags(vec!["html".to_string(), "home".to_string()])
        );
    }

    #[tokio::test]
    async fn empty_tag_input_is_a_warning() {
        let sink = Arc::new(RecordingSink::default());
        let notice = purge_tag_list(&batcher(&sink), " \n\n").await;
        assert_eq!(notice.status, NoticeStatus::Warning);
        assert!(sink.payloads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_submission_is_a_warning_not_a_fault() {
        let sink = Arc::new(RecordingSink {
            fail: true,
            ..Default::default()
        });
        let notice = purge_url_list(&batcher(&sink), "https://ok.example/x").await;

        assert_eq!(notice.status, NoticeStatus::Warning);
        assert!(notice.message.contains("1 of 1 batch(es) failed"));
    }

    #[tokio::test]
    async fn purge_everything_reports_success() {
        let sink = Arc::new(RecordingSink::default());
        let notice = purge_everything(&batcher(&sink)).await;

        assert_eq!(notice.status, NoticeStatus::Success);
        let payloads = sink.payloads.lock().unwrap();
        assert_eq!(payloads[0], PurgePayload::everything());
    }
}
