//! Purge batching.
//!
//! Splits URL and tag sets into consecutive batches no larger than the
//! purge API's per-request cap and submits each batch independently: a
//! failed batch never blocks the ones after it, and the report carries
//! every per-batch outcome.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use metrics::{counter, histogram};
use tracing::{info, warn};

use autopurge_api_types::PurgePayload;

use super::client::PurgeError;

const SOURCE: &str = "purge::batch";

const METRIC_PURGE_REQUESTS_TOTAL: &str = "autopurge_purge_requests_total";
const METRIC_PURGE_FAILURES_TOTAL: &str = "autopurge_purge_failures_total";
const METRIC_PURGE_BATCH_MS: &str = "autopurge_purge_batch_ms";

/// Transport seam between the batcher and whatever actually performs the
/// purge call. Production uses [`super::client::PurgeClient`]; tests record
/// payloads.
#[async_trait]
pub trait PurgeSink: Send + Sync {
    async fn submit(&self, payload: &PurgePayload) -> Result<(), PurgeError>;
}

/// Result of one submitted batch.
#[derive(Debug)]
pub struct BatchOutcome {
    pub index: usize,
    pub size: usize,
    pub result: Result<(), PurgeError>,
}

/// Aggregate result of a purge operation.
#[derive(Debug, Default)]
pub struct PurgeReport {
    /// Items that went out the door across every batch.
    pub submitted: usize,
    pub outcomes: Vec<BatchOutcome>,
}

impl PurgeReport {
    /// True iff every batch call succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|outcome| outcome.result.is_ok())
    }

    pub fn failed_batches(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.result.is_err())
            .count()
    }
}

/// Validate a user-supplied purge target as an absolute `http(s)` URL.
pub fn is_absolute_url(candidate: &str) -> bool {
    match url::Url::parse(candidate) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https") && parsed.has_host()
        }
        Err(_) => false,
    }
}

/// Splits purge inputs into ≤-cap batches and submits them best-effort.
pub struct Batcher<S: PurgeSink> {
    sink: Arc<S>,
    cap: usize,
}

impl<S: PurgeSink> Batcher<S> {
    pub fn new(sink: Arc<S>, cap: usize) -> Self {
        Self {
            sink,
            cap: cap.max(1),
        }
    }

    /// Issue the "purge everything" directive. Never batched.
    pub async fn purge_everything(&self) -> PurgeReport {
        let payload = PurgePayload::everything();
        let result = self.submit_one(0, &payload).await;
        PurgeReport {
            submitted: 1,
            outcomes: vec![BatchOutcome {
                index: 0,
                size: 1,
                result,
            }],
        }
    }

    /// Purge a URL list, preserving input order within and across batches.
    pub async fn purge_urls(&self, urls: Vec<String>) -> PurgeReport {
        self.submit_chunked(urls, PurgePayload::files, "files").await
    }

    /// Purge a tag list, preserving input order within and across batches.
    pub async fn purge_tags(&self, tags: Vec<String>) -> PurgeReport {
        self.submit_chunked(tags, PurgePayload::tags, "tags").await
    }

    async fn submit_chunked(
        &self,
        items: Vec<String>,
        make_payload: fn(Vec<String>) -> PurgePayload,
        what: &'static str,
    ) -> PurgeReport {
        let mut report = PurgeReport::default();
        if items.is_empty() {
            return report;
        }

        for (index, chunk) in items.chunks(self.cap).enumerate() {
            let payload = make_payload(chunk.to_vec());
            let result = self.submit_one(index, &payload).await;
            report.submitted += chunk.len();
            report.outcomes.push(BatchOutcome {
                index,
                size: chunk.len(),
                result,
            });
        }

        info!(
            target_module = SOURCE,
            what,
            submitted = report.submitted,
            batches = report.outcomes.len(),
            failed = report.failed_batches(),
            "purge submission complete"
        );
        report
    }

    async fn submit_one(&self, index: usize, payload: &PurgePayload) -> Result<(), PurgeError> {
        let started_at = Instant::now();
        counter!(METRIC_PURGE_REQUESTS_TOTAL).increment(1);

        let result = self.sink.submit(payload).await;
        histogram!(METRIC_PURGE_BATCH_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);

        if let Err(error) = &result {
            counter!(METRIC_PURGE_FAILURES_TOTAL).increment(1);
            warn!(
                target_module = SOURCE,
                batch_index = index,
                batch_size = payload.len(),
                %error,
                "purge batch failed; continuing with remaining batches"
            );
        }
        result
    }
}
