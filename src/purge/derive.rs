//! Affected-URL derivation.
//!
//! Expands one content change into the set of URLs whose cached
//! representation may now be stale. URL resolution is delegated to the
//! [`SiteMetadata`] collaborator; a failed lookup for one contribution is
//! logged and skipped so the rest of the set still gets purged.

use std::collections::BTreeSet;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use crate::domain::change::{AuthorRef, ChangeEvent, ContentItem, TermRef};

const SOURCE: &str = "purge::derive";

/// Deduplicated set of absolute URLs, iterated in a stable order.
pub type UrlSet = BTreeSet<String>;

/// A metadata lookup against the content host failed.
#[derive(Debug, Error)]
#[error("metadata lookup failed: {0}")]
pub struct LookupError(String);

impl LookupError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Metadata collaborator resolving content and URL structure on the origin
/// host. Implementations must be cheap to call repeatedly; the deriver asks
/// one question per contribution.
#[async_trait]
pub trait SiteMetadata: Send + Sync {
    /// Load a content item by id. `Ok(None)` means the item cannot be
    /// resolved and the change must be skipped.
    async fn load_content(&self, id: u64) -> Result<Option<ContentItem>, LookupError>;

    /// Whether the item is a working copy (revision/autosave) of another
    /// item rather than publishable content.
    async fn is_auxiliary(&self, item: &ContentItem) -> Result<bool, LookupError>;

    /// Whether the content type is publicly viewable at all.
    async fn is_viewable(&self, content_type: &str) -> Result<bool, LookupError>;

    /// Canonical URL of the item.
    async fn permalink(&self, item: &ContentItem) -> Result<String, LookupError>;

    /// Site root URL.
    async fn site_root(&self) -> Result<String, LookupError>;

    /// Primary syndication feed URL.
    async fn site_feed(&self) -> Result<String, LookupError>;

    /// Archive URL for a content type, when the type has one.
    async fn type_archive(&self, content_type: &str) -> Result<Option<String>, LookupError>;

    /// Names of the taxonomies applicable to a content type.
    async fn taxonomies(&self, content_type: &str) -> Result<Vec<String>, LookupError>;

    /// Archive URL for one taxonomy term.
    async fn term_archive(&self, term: &TermRef) -> Result<String, LookupError>;

    /// Feed URL for one taxonomy term.
    async fn term_feed(&self, term: &TermRef) -> Result<String, LookupError>;

    /// Archive URL for an author.
    async fn author_archive(&self, author: &AuthorRef) -> Result<String, LookupError>;

    /// Feed URL for an author.
    async fn author_feed(&self, author: &AuthorRef) -> Result<String, LookupError>;

    /// Yearly date archive URL.
    async fn year_archive(&self, year: i32) -> Result<String, LookupError>;

    /// Monthly date archive URL.
    async fn month_archive(&self, year: i32, month: u8) -> Result<String, LookupError>;

    /// Daily date archive URL.
    async fn day_archive(&self, year: i32, month: u8, day: u8) -> Result<String, LookupError>;
}

/// Expands change events into affected-URL sets.
///
/// Pagination variants are speculative: the deriver does not know real page
/// counts, and purging a page that does not exist is a no-op at the CDN.
pub struct UrlDeriver {
    pagination_depth: u32,
}

impl UrlDeriver {
    pub fn new(pagination_depth: u32) -> Self {
        Self { pagination_depth }
    }

    /// Derive every URL whose cached representation the event may have
    /// invalidated.
    ///
    /// Returns an empty set when the item is an auxiliary working copy or
    /// its type is not publicly viewable. Individual lookup failures only
    /// drop their own contribution.
    pub async fn derive(&self, event: &ChangeEvent, site: &dyn SiteMetadata) -> UrlSet {
        let mut urls = UrlSet::new();
        let item = &event.item;

        match site.is_auxiliary(item).await {
            Ok(true) => return urls,
            Ok(false) => {}
            Err(error) => {
                warn!(
                    target_module = SOURCE,
                    content_id = item.id,
                    %error,
                    "cannot establish whether item is auxiliary, skipping event"
                );
                return urls;
            }
        }

        match site.is_viewable(&item.content_type).await {
            Ok(true) => {}
            Ok(false) => return urls,
            Err(error) => {
                warn!(
                    target_module = SOURCE,
                    content_type = %item.content_type,
                    %error,
                    "cannot establish content-type visibility, skipping event"
                );
                return urls;
            }
        }

        self.push(&mut urls, site.permalink(item).await, "permalink");
        self.push(&mut urls, site.site_root().await, "site root");
        self.push(&mut urls, site.site_feed().await, "site feed");

        match site.type_archive(&item.content_type).await {
            Ok(Some(archive)) => self.push_paginated(&mut urls, &archive),
            Ok(None) => {}
            Err(error) => {
                warn!(target_module = SOURCE, %error, "type archive lookup failed, skipped");
            }
        }

        self.derive_terms(&mut urls, item, site).await;

        self.push(&mut urls, site.author_archive(&item.author).await, "author archive");
        self.push(&mut urls, site.author_feed(&item.author).await, "author feed");

        if let Some(published) = item.published_at {
            let published = published.to_offset(time::UtcOffset::UTC);
            let (year, month, day) = (
                published.year(),
                u8::from(published.month()),
                published.day(),
            );

            match site.year_archive(year).await {
                Ok(archive) => self.push_paginated(&mut urls, &archive),
                Err(error) => {
                    warn!(target_module = SOURCE, %error, "year archive lookup failed, skipped");
                }
            }
            match site.month_archive(year, month).await {
                Ok(archive) => self.push_paginated(&mut urls, &archive),
                Err(error) => {
                    warn!(target_module = SOURCE, %error, "month archive lookup failed, skipped");
                }
            }
            // Day archives are a single page; no pagination variants.
            self.push(&mut urls, site.day_archive(year, month, day).await, "day archive");
        }

        urls
    }

    async fn derive_terms(&self, urls: &mut UrlSet, item: &ContentItem, site: &dyn SiteMetadata) {
        let applicable = match site.taxonomies(&item.content_type).await {
            Ok(taxonomies) => taxonomies,
            Err(error) => {
                warn!(
                    target_module = SOURCE,
                    content_type = %item.content_type,
                    %error,
                    "taxonomy listing failed, skipping term archives"
                );
                return;
            }
        };

        for term in item
            .terms
            .iter()
            .filter(|term| applicable.contains(&term.taxonomy))
        {
            match site.term_archive(term).await {
                Ok(archive) => self.push_paginated(urls, &archive),
                Err(error) => {
                    warn!(
                        target_module = SOURCE,
                        taxonomy = %term.taxonomy,
                        term_id = term.term_id,
                        %error,
                        "term archive lookup failed, term skipped"
                    );
                    continue;
                }
            }
            self.push(urls, site.term_feed(term).await, "term feed");
        }
    }

    fn push(&self, urls: &mut UrlSet, resolved: Result<String, LookupError>, what: &'static str) {
        match resolved {
            Ok(url) if !url.is_empty() => {
                urls.insert(url);
            }
            Ok(_) => {}
            Err(error) => {
                warn!(target_module = SOURCE, contribution = what, %error, "lookup failed, skipped");
            }
        }
    }

    /// Insert `base` plus `base…page/2/` through `base…page/K/`.
    fn push_paginated(&self, urls: &mut UrlSet, base: &str) {
        if base.is_empty() {
            return;
        }
        urls.insert(base.to_string());
        for page in 2..=self.pagination_depth {
            if base.ends_with('/') {
                urls.insert(format!("{base}page/{page}/"));
            } else {
                urls.insert(format!("{base}/page/{page}/"));
            }
        }
    }
}
