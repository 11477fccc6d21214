//! Shared wire types for the autopurge service.
//!
//! Everything the service exchanges over HTTP lives here so that the server,
//! the CLI subcommands, and external notifiers agree on one serde surface:
//!
//! - [`PurgePayload`] — the three request bodies accepted by the CDN's
//!   `purge_cache` endpoint;
//! - [`ApiEnvelope`] — the CDN API's response envelope;
//! - [`ContentNotification`] / [`PackageNotification`] — the bodies the
//!   content host posts to the notify routes.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Body of a cache-purge API call.
///
/// Serializes to exactly one of `{"purge_everything": true}`,
/// `{"files": [...]}` or `{"tags": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PurgePayload {
    Everything { purge_everything: bool },
    Files { files: Vec<String> },
    Tags { tags: Vec<String> },
}

impl PurgePayload {
    /// The "purge everything" directive.
    pub fn everything() -> Self {
        Self::Everything {
            purge_everything: true,
        }
    }

    /// Purge the given URLs.
    pub fn files(files: Vec<String>) -> Self {
        Self::Files { files }
    }

    /// Purge the given cache tags.
    pub fn tags(tags: Vec<String>) -> Self {
        Self::Tags { tags }
    }

    /// Number of items carried by this payload (1 for the everything
    /// directive).
    pub fn len(&self) -> usize {
        match self {
            Self::Everything { .. } => 1,
            Self::Files { files } => files.len(),
            Self::Tags { tags } => tags.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Everything { .. } => false,
            Self::Files { files } => files.is_empty(),
            Self::Tags { tags } => tags.is_empty(),
        }
    }
}

/// One diagnostic message inside an [`ApiEnvelope`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiMessage {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// Response envelope returned by the purge API.
///
/// A `200 OK` with `success: false` is still a rejection; callers must check
/// the flag, not just the status code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<ApiMessage>,
    #[serde(default)]
    pub messages: Vec<ApiMessage>,
}

/// The kind of mutation the content host observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    Updated,
    Trashed,
    Deleted,
}

/// A taxonomy term attached to a content item.
///
/// The slug is carried so URL resolution needs no second round-trip to the
/// host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermPayload {
    pub taxonomy: String,
    pub term_id: u64,
    pub slug: String,
}

/// The author of a content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorPayload {
    pub id: u64,
    pub slug: String,
}

/// Content-item snapshot inlined into a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentPayload {
    pub id: u64,
    pub content_type: String,
    pub slug: String,
    /// Set when this record is a working copy (revision or autosave) of
    /// another item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_of: Option<u64>,
    /// Canonical URL, when the host already resolved it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permalink: Option<String>,
    pub author: AuthorPayload,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub terms: Vec<TermPayload>,
}

/// Body of `POST /notify/content`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentNotification {
    pub content_id: u64,
    pub change: ChangeKind,
    /// Inlined snapshot; when absent the service loads the item itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<ContentPayload>,
    /// True for updates to an existing item, false for first publishes.
    #[serde(default)]
    pub update: bool,
}

/// Package kinds whose updates invalidate every HTML response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageKind {
    Plugin,
    Theme,
    Core,
}

/// Body of `POST /notify/package`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageNotification {
    pub kind: PackageKind,
}
