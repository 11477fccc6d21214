//! Autopurge: CDN edge-cache invalidation for a content-managed origin.
//!
//! Two cooperating halves keep the edge consistent:
//!
//! - the **change detector** turns content-change notifications into
//!   coalesced, batched purge submissions ([`purge`]);
//! - the **response tagger** stamps deterministic cache tags onto outbound
//!   responses so the purge side can invalidate by tag
//!   ([`infra::http::tagging`]).
//!
//! The [`infra`] layer supplies the webhook surface, telemetry and the
//! pattern-based site-metadata adapter; [`config`] loads the layered
//! settings the binary runs with.

pub mod config;
pub mod domain;
pub mod infra;
pub mod purge;
