//! Autopurge invalidation core.
//!
//! Keeps a CDN edge cache consistent with the origin content host:
//!
//! - **Derivation**: a content change is expanded into every URL whose
//!   cached representation may now be stale.
//! - **Coalescing**: rapid repeated changes collapse into one flush per
//!   burst through a TTL'd keyed buffer.
//! - **Batching**: flushed URL/tag sets are split under the purge API's
//!   per-request cap and submitted best-effort.
//! - **Tagging**: a pure classifier maps request paths to cache tags so the
//!   purge side can invalidate whole groups without enumerating URLs.
//!
//! ## Configuration
//!
//! Runtime behavior is controlled via `autopurge.toml`:
//!
//! ```toml
//! [purge]
//! zone_id = "..."
//! api_token = "..."
//! batch_cap = 30
//! debounce_window_secs = 60
//! ```

mod batch;
mod client;
mod coalesce;
mod config;
mod derive;
mod hooks;
mod lock;
mod manual;
mod pipeline;
mod tags;

pub use batch::{BatchOutcome, Batcher, PurgeReport, PurgeSink, is_absolute_url};
pub use client::{PurgeClient, PurgeError};
pub use coalesce::{Coalescer, FlushTicket, MemoryPendingStore, PendingStore};
pub use config::PurgeConfig;
pub use derive::{LookupError, SiteMetadata, UrlDeriver, UrlSet};
pub use hooks::ChangeHub;
pub use manual::{NoticeStatus, PurgeNotice, purge_everything, purge_tag_list, purge_url_list};
pub use pipeline::AutoPurger;
pub use tags::classify;
