//! Change subscription hub.
//!
//! Explicit registration points between the content-host collaborator and
//! the purge pipeline: the host (or its webhook adapter) owns dispatch, the
//! core owns what happens on each event.

use std::sync::{Arc, RwLock};

use futures::future::BoxFuture;
use metrics::counter;
use tracing::debug;

use crate::domain::change::{ChangeEvent, PackageKind};

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "purge::hooks";

const METRIC_EVENTS_TOTAL: &str = "autopurge_events_total";

type ChangeHandler = Arc<dyn Fn(ChangeEvent) -> BoxFuture<'static, ()> + Send + Sync>;
type PackageHandler = Arc<dyn Fn(PackageKind) -> BoxFuture<'static, ()> + Send + Sync>;

/// Registration hub for change and package-update subscribers.
///
/// Handlers run in registration order, sequentially, on the dispatching
/// task — dispatch is the collaborator's unit of work and purge I/O
/// triggered by a handler stays on that unit's critical path.
#[derive(Default)]
pub struct ChangeHub {
    change_handlers: RwLock<Vec<ChangeHandler>>,
    package_handlers: RwLock<Vec<PackageHandler>>,
}

impl ChangeHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a content-change subscriber.
    pub fn on_change<F>(&self, handler: F)
    where
        F: Fn(ChangeEvent) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        rw_write(&self.change_handlers, SOURCE, "on_change").push(Arc::new(handler));
    }

    /// Register a package-update subscriber.
    pub fn on_package_update<F>(&self, handler: F)
    where
        F: Fn(PackageKind) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        rw_write(&self.package_handlers, SOURCE, "on_package_update").push(Arc::new(handler));
    }

    /// Dispatch one content-change event to every subscriber.
    pub async fn dispatch_change(&self, event: ChangeEvent) {
        counter!(METRIC_EVENTS_TOTAL, "kind" => "content").increment(1);
        debug!(
            target_module = SOURCE,
            content_id = event.content_id(),
            change = ?event.kind,
            "dispatching change event"
        );

        let handlers: Vec<ChangeHandler> =
            rw_read(&self.change_handlers, SOURCE, "dispatch_change").clone();
        for handler in handlers {
            handler(event.clone()).await;
        }
    }

    /// Dispatch a package-update notification to every subscriber.
    pub async fn dispatch_package_update(&self, kind: PackageKind) {
        counter!(METRIC_EVENTS_TOTAL, "kind" => "package").increment(1);
        debug!(
            target_module = SOURCE,
            package = ?kind,
            "dispatching package update"
        );

        let handlers: Vec<PackageHandler> =
            rw_read(&self.package_handlers, SOURCE, "dispatch_package_update").clone();
        for handler in handlers {
            handler(kind).await;
        }
    }
}
