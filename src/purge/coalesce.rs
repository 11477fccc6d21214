//! Change coalescing.
//!
//! Burst protection for the purge pipeline: URLs derived from
//! near-simultaneous change events are unioned into a keyed pending buffer,
//! and exactly one caller per burst is handed the flush. The buffer is a
//! debounce, not a delay queue — there is no latency floor, only the
//! single-flush guarantee.

use std::time::Duration;

use dashmap::DashMap;
use metrics::counter;
use time::OffsetDateTime;
use tracing::debug;

use super::derive::UrlSet;

const SOURCE: &str = "purge::coalesce";

const METRIC_FLUSH_TOTAL: &str = "autopurge_flush_total";
const METRIC_RECORD_TOTAL: &str = "autopurge_record_total";

/// Keyed ephemeral buffer of pending URLs.
///
/// Implementations must make both operations atomic per key: two racing
/// `union` calls may interleave in any order but must lose no URLs, and at
/// most one of them may acquire the flush claim.
pub trait PendingStore: Send + Sync {
    /// Union `urls` into the buffer for `key`, reset its expiry to
    /// `now + ttl`, and claim the flush when unclaimed (or when a previous
    /// claim expired without flushing). Returns true when this call
    /// acquired the claim.
    fn union(&self, key: &str, urls: &UrlSet, ttl: Duration) -> bool;

    /// Atomically take and clear the buffer for `key`, releasing any claim.
    fn take(&self, key: &str) -> UrlSet;
}

#[derive(Debug)]
struct PendingBuffer {
    urls: UrlSet,
    expires_at: OffsetDateTime,
    flush_claimed: bool,
}

/// In-process [`PendingStore`] on a concurrent map with per-entry expiry.
///
/// Entry guards give the per-key atomic read-modify-write the store
/// contract requires; different keys never contend.
#[derive(Debug, Default)]
pub struct MemoryPendingStore {
    entries: DashMap<String, PendingBuffer>,
}

impl MemoryPendingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PendingStore for MemoryPendingStore {
    fn union(&self, key: &str, urls: &UrlSet, ttl: Duration) -> bool {
        let now = OffsetDateTime::now_utc();

        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| PendingBuffer {
                urls: UrlSet::new(),
                expires_at: now + ttl,
                flush_claimed: false,
            });
        let buffer = entry.value_mut();

        // A claim whose window lapsed belongs to a flush that never came;
        // the buffer contents stay, the claim is up for grabs again.
        if buffer.flush_claimed && buffer.expires_at <= now {
            buffer.flush_claimed = false;
        }

        buffer.urls.extend(urls.iter().cloned());
        buffer.expires_at = now + ttl;

        let acquired = !buffer.flush_claimed;
        buffer.flush_claimed = true;
        acquired
    }

    fn take(&self, key: &str) -> UrlSet {
        self.entries
            .remove(key)
            .map(|(_, buffer)| buffer.urls)
            .unwrap_or_default()
    }
}

/// Flush ownership handed to the caller whose `record` opened the burst.
///
/// Exactly one ticket per burst is owned; the owner must call
/// [`Coalescer::flush`] once its unit of work completes.
#[must_use = "the owning caller must flush at the end of its unit of work"]
#[derive(Debug)]
pub struct FlushTicket {
    owned: bool,
}

impl FlushTicket {
    pub fn owned(&self) -> bool {
        self.owned
    }
}

/// Coalesces URL sets across change events, one buffer per key.
pub struct Coalescer<S: PendingStore = MemoryPendingStore> {
    store: S,
    window: Duration,
}

impl Coalescer<MemoryPendingStore> {
    pub fn new(window: Duration) -> Self {
        Self::with_store(MemoryPendingStore::new(), window)
    }
}

impl<S: PendingStore> Coalescer<S> {
    pub fn with_store(store: S, window: Duration) -> Self {
        Self { store, window }
    }

    /// Union `urls` into the pending buffer for `key`.
    ///
    /// The returned ticket is owned when this call opened the burst; the
    /// owner runs the single flush for every record landing in the window.
    pub fn record(&self, key: &str, urls: &UrlSet) -> FlushTicket {
        if urls.is_empty() {
            return FlushTicket { owned: false };
        }

        let owned = self.store.union(key, urls, self.window);
        counter!(METRIC_RECORD_TOTAL).increment(1);

        debug!(
            target_module = SOURCE,
            key,
            recorded = urls.len(),
            flush_owner = owned,
            "urls recorded for coalesced purge"
        );
        FlushTicket { owned }
    }

    /// Take and clear the pending buffer for `key`.
    ///
    /// Empty result means another flush already drained the burst (or
    /// nothing was recorded) and the caller must not submit anything.
    pub fn flush(&self, key: &str) -> UrlSet {
        let urls = self.store.take(key);
        if !urls.is_empty() {
            counter!(METRIC_FLUSH_TOTAL).increment(1);
            debug!(
                target_module = SOURCE,
                key,
                pending = urls.len(),
                "coalesced buffer flushed"
            );
        }
        urls
    }
}
