//! Content-change events.
//!
//! A [`ChangeEvent`] is the unit handed to the purge pipeline: one observed
//! mutation of one content item on the origin host, together with the
//! metadata needed to derive affected URLs. Events are immutable and
//! consumed once.

use time::OffsetDateTime;

pub use autopurge_api_types::{ChangeKind, PackageKind};
use autopurge_api_types::{AuthorPayload, ContentPayload, TermPayload};

/// A taxonomy term attached to a content item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermRef {
    pub taxonomy: String,
    pub term_id: u64,
    pub slug: String,
}

impl From<TermPayload> for TermRef {
    fn from(payload: TermPayload) -> Self {
        Self {
            taxonomy: payload.taxonomy,
            term_id: payload.term_id,
            slug: payload.slug,
        }
    }
}

/// The author of a content item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorRef {
    pub id: u64,
    pub slug: String,
}

impl From<AuthorPayload> for AuthorRef {
    fn from(payload: AuthorPayload) -> Self {
        Self {
            id: payload.id,
            slug: payload.slug,
        }
    }
}

/// Snapshot of the content item a change refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentItem {
    pub id: u64,
    pub content_type: String,
    pub slug: String,
    /// Set when this record is a working copy (revision or autosave) of
    /// another item.
    pub revision_of: Option<u64>,
    /// Canonical URL when the host already resolved it.
    pub permalink: Option<String>,
    pub author: AuthorRef,
    pub published_at: Option<OffsetDateTime>,
    pub terms: Vec<TermRef>,
}

impl From<ContentPayload> for ContentItem {
    fn from(payload: ContentPayload) -> Self {
        Self {
            id: payload.id,
            content_type: payload.content_type,
            slug: payload.slug,
            revision_of: payload.revision_of,
            permalink: payload.permalink,
            author: payload.author.into(),
            published_at: payload.published_at,
            terms: payload.terms.into_iter().map(TermRef::from).collect(),
        }
    }
}

/// One observed mutation of one content item.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    /// When the mutation was observed, UTC.
    pub occurred_at: OffsetDateTime,
    pub item: ContentItem,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, item: ContentItem) -> Self {
        Self {
            kind,
            occurred_at: OffsetDateTime::now_utc(),
            item,
        }
    }

    pub fn content_id(&self) -> u64 {
        self.item.id
    }

    pub fn content_type(&self) -> &str {
        &self.item.content_type
    }
}
