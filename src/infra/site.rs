//! Pattern-based site metadata.
//!
//! Resolves origin URLs from the `[site]` configuration instead of asking
//! the content host: permalinks, archives, term and author URLs all follow
//! the site's configured route structure. The notification payload carries
//! the slugs this adapter needs, so no content store is required.

use async_trait::async_trait;

use crate::config::SiteSettings;
use crate::domain::change::{AuthorRef, ContentItem, TermRef};
use crate::purge::{LookupError, SiteMetadata};

/// [`SiteMetadata`] backed entirely by configured route patterns.
pub struct ConfiguredSiteMetadata {
    base: String,
    settings: SiteSettings,
}

impl ConfiguredSiteMetadata {
    pub fn new(settings: SiteSettings) -> Self {
        Self {
            base: settings.base_url.trim_end_matches('/').to_string(),
            settings,
        }
    }

    fn absolute(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl SiteMetadata for ConfiguredSiteMetadata {
    async fn load_content(&self, id: u64) -> Result<Option<ContentItem>, LookupError> {
        // Pattern-based resolution has no content store; notifications must
        // inline the item snapshot.
        let _ = id;
        Ok(None)
    }

    async fn is_auxiliary(&self, item: &ContentItem) -> Result<bool, LookupError> {
        Ok(item.revision_of.is_some())
    }

    async fn is_viewable(&self, content_type: &str) -> Result<bool, LookupError> {
        Ok(self
            .settings
            .viewable_types
            .iter()
            .any(|t| t == content_type))
    }

    async fn permalink(&self, item: &ContentItem) -> Result<String, LookupError> {
        if let Some(permalink) = &item.permalink {
            return Ok(permalink.clone());
        }
        if item.slug.is_empty() {
            return Err(LookupError::new(format!(
                "content {} has neither permalink nor slug",
                item.id
            )));
        }
        Ok(self.absolute(&format!("{}/", item.slug)))
    }

    async fn site_root(&self) -> Result<String, LookupError> {
        Ok(format!("{}/", self.base))
    }

    async fn site_feed(&self) -> Result<String, LookupError> {
        Ok(self.absolute("feed/"))
    }

    async fn type_archive(&self, content_type: &str) -> Result<Option<String>, LookupError> {
        Ok(self
            .settings
            .archives
            .get(content_type)
            .map(|path| self.absolute(&format!("{}/", path.trim_matches('/')))))
    }

    async fn taxonomies(&self, _content_type: &str) -> Result<Vec<String>, LookupError> {
        Ok(self.settings.taxonomies.keys().cloned().collect())
    }

    async fn term_archive(&self, term: &TermRef) -> Result<String, LookupError> {
        let path = self
            .settings
            .taxonomies
            .get(&term.taxonomy)
            .ok_or_else(|| {
                LookupError::new(format!("taxonomy `{}` has no route", term.taxonomy))
            })?;
        Ok(self.absolute(&format!("{}/{}/", path.trim_matches('/'), term.slug)))
    }

    async fn term_feed(&self, term: &TermRef) -> Result<String, LookupError> {
        Ok(format!("{}feed/", self.term_archive(term).await?))
    }

    async fn author_archive(&self, author: &AuthorRef) -> Result<String, LookupError> {
        if author.slug.is_empty() {
            return Err(LookupError::new(format!(
                "author {} has no slug",
                author.id
            )));
        }
        Ok(self.absolute(&format!("author/{}/", author.slug)))
    }

    async fn author_feed(&self, author: &AuthorRef) -> Result<String, LookupError> {
        Ok(format!("{}feed/", self.author_archive(author).await?))
    }

    async fn year_archive(&self, year: i32) -> Result<String, LookupError> {
        Ok(self.absolute(&format!("{year}/")))
    }

    async fn month_archive(&self, year: i32, month: u8) -> Result<String, LookupError> {
        Ok(self.absolute(&format!("{year}/{month:02}/")))
    }

    async fn day_archive(&self, year: i32, month: u8, day: u8) -> Result<String, LookupError> {
        Ok(self.absolute(&format!("{year}/{month:02}/{day:02}/")))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn site() -> ConfiguredSiteMetadata {
        ConfiguredSiteMetadata::new(SiteSettings {
            base_url: "https://example.com/".to_string(),
            viewable_types: vec!["post".to_string()],
            taxonomies: HashMap::from([("category".to_string(), "category".to_string())]),
            archives: HashMap::from([("post".to_string(), "blog".to_string())]),
        })
    }

    fn item() -> ContentItem {
        ContentItem {
            id: 1,
            content_type: "post".to_string(),
            slug: "hello".to_string(),
            revision_of: None,
            permalink: None,
            author: AuthorRef {
                id: 2,
                slug: "jo".to_string(),
            },
            published_at: None,
            terms: vec![],
        }
    }

    #[tokio::test]
    async fn base_url_trailing_slash_is_normalized() {
        let site = site();
        assert_eq!(site.site_root().await.unwrap(), "https://example.com/");
        assert_eq!(site.site_feed().await.unwrap(), "https://example.com/feed/");
    }

    #[tokio::test]
    async fn permalink_prefers_the_host_resolved_url() {
        let site = site();
        let mut item = item();
        assert_eq!(
            site.permalink(&item).await.unwrap(),
            "https://example.com/hello/"
        );

        item.permalink = Some("https://example.com/2024/03/hello/".to_string());
        assert_eq!(
            site.permalink(&item).await.unwrap(),
            "https://example.com/2024/03/hello/"
        );
    }

    #[tokio::test]
    async fn archive_comes_from_configuration() {
        let site = site();
        assert_eq!(
            site.type_archive("post").await.unwrap(),
            Some("https://example.com/blog/".to_string())
        );
        assert_eq!(site.type_archive("page").await.unwrap(), None);
    }

    #[tokio::test]
    async fn term_urls_use_the_taxonomy_route() {
        let site = site();
        let term = TermRef {
            taxonomy: "category".to_string(),
            term_id: 3,
            slug: "news".to_string(),
        };
        assert_eq!(
            site.term_archive(&term).await.unwrap(),
            "https://example.com/category/news/"
        );
        assert_eq!(
            site.term_feed(&term).await.unwrap(),
            "https://example.com/category/news/feed/"
        );
    }

    #[tokio::test]
    async fn unrouted_taxonomy_is_a_lookup_error() {
        let site = site();
        let term = TermRef {
            taxonomy: "series".to_string(),
            term_id: 9,
            slug: "intro".to_string(),
        };
        assert!(site.term_archive(&term).await.is_err());
    }

    #[tokio::test]
    async fn date_archives_are_zero_padded() {
        let site = site();
        assert_eq!(
            site.month_archive(2024, 3).await.unwrap(),
            "https://example.com/2024/03/"
        );
        assert_eq!(
            site.day_archive(2024, 3, 9).await.unwrap(),
            "https://example.com/2024/03/09/"
        );
    }

    #[tokio::test]
    async fn revision_items_are_auxiliary() {
        let site = site();
        let mut item = item();
        assert!(!site.is_auxiliary(&item).await.unwrap());
        item.revision_of = Some(7);
        assert!(site.is_auxiliary(&item).await.unwrap());
    }
}
