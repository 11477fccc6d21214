//! Automatic purge pipeline.
//!
//! Wires derivation, coalescing and batching behind the subscription hub:
//! change events become coalesced URL purges, package updates become an
//! unconditional `html` tag purge.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::domain::change::{ChangeEvent, PackageKind};

use super::batch::{Batcher, PurgeSink};
use super::coalesce::{Coalescer, FlushTicket};
use super::config::PurgeConfig;
use super::derive::{SiteMetadata, UrlDeriver};
use super::hooks::ChangeHub;

const SOURCE: &str = "purge::pipeline";

/// The automatic invalidation pipeline.
///
/// One instance per purge scope; the coalescing key is the configured zone
/// so racing events for the same zone share one pending buffer.
pub struct AutoPurger<S: PurgeSink + 'static> {
    deriver: UrlDeriver,
    coalescer: Coalescer,
    batcher: Arc<Batcher<S>>,
    site: Arc<dyn SiteMetadata>,
    key: String,
}

impl<S: PurgeSink + 'static> AutoPurger<S> {
    pub fn new(
        site: Arc<dyn SiteMetadata>,
        batcher: Arc<Batcher<S>>,
        config: &PurgeConfig,
    ) -> Self {
        Self {
            deriver: UrlDeriver::new(config.pagination_depth),
            coalescer: Coalescer::new(Duration::from_secs(config.debounce_window_secs)),
            batcher,
            site,
            key: config
                .zone_id
                .clone()
                .unwrap_or_else(|| "default".to_string()),
        }
    }

    /// Derive and record the URLs a change event touched.
    ///
    /// The returned ticket is owned when this event opened the burst; the
    /// owner must call [`flush`](Self::flush) once its unit of work is
    /// done.
    pub async fn handle_change(&self, event: &ChangeEvent) -> FlushTicket {
        let urls = self.deriver.derive(event, self.site.as_ref()).await;
        if urls.is_empty() {
            debug!(
                target_module = SOURCE,
                content_id = event.content_id(),
                "change event produced no purgeable URLs"
            );
        }
        self.coalescer.record(&self.key, &urls)
    }

    /// Submit whatever the current burst accumulated.
    pub async fn flush(&self) {
        let urls = self.coalescer.flush(&self.key);
        if urls.is_empty() {
            return;
        }

        let count = urls.len();
        let report = self.batcher.purge_urls(urls.into_iter().collect()).await;
        if report.all_succeeded() {
            info!(
                target_module = SOURCE,
                urls = count,
                batches = report.outcomes.len(),
                "coalesced purge submitted"
            );
        } else {
            warn!(
                target_module = SOURCE,
                urls = count,
                failed_batches = report.failed_batches(),
                "coalesced purge partially failed"
            );
        }
    }

    /// Package updates can restyle every page; purge all HTML in one go.
    pub async fn handle_package_update(&self, kind: PackageKind) {
        info!(
            target_module = SOURCE,
            package = ?kind,
            "package updated, purging html tag"
        );
        let report = self.batcher.purge_tags(vec!["html".to_string()]).await;
        if !report.all_succeeded() {
            warn!(
                target_module = SOURCE,
                package = ?kind,
                "html tag purge failed"
            );
        }
    }

    /// Subscribe the pipeline to a hub.
    ///
    /// The change subscriber flushes at the end of its dispatch when it owns
    /// the burst, keeping purge I/O on the triggering unit of work.
    pub fn register(self: Arc<Self>, hub: &ChangeHub) {
        let purger = Arc::clone(&self);
        hub.on_change(move |event| {
            let purger = Arc::clone(&purger);
            Box::pin(async move {
                let ticket = purger.handle_change(&event).await;
                if ticket.owned() {
                    purger.flush().await;
                }
            })
        });

        let purger = self;
        hub.on_package_update(move |kind| {
            let purger = Arc::clone(&purger);
            Box::pin(async move {
                purger.handle_package_update(kind).await;
            })
        });
    }
}
