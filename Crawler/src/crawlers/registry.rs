// src/crawlers/registry.rs

//! Lookup of site crawlers by identifier.

use std::sync::Arc;

use super::{JjwxcCrawler, QidianCrawler, SiteCrawler, ZonghengCrawler};
use crate::error::{AppError, Result};

/// Crawlers known to the process, in registration order.
#[derive(Clone)]
pub struct CrawlerRegistry {
    crawlers: Vec<Arc<dyn SiteCrawler>>,
}

impl CrawlerRegistry {
    /// Build a registry, rejecting duplicate site identifiers.
    pub fn new(crawlers: Vec<Arc<dyn SiteCrawler>>) -> Result<Self> {
        for (i, crawler) in crawlers.iter().enumerate() {
            if crawlers[..i].iter().any(|c| c.site_id() == crawler.site_id()) {
                return Err(AppError::config(format!(
                    "duplicate crawler for site '{}'",
                    crawler.site_id()
                )));
            }
        }
        Ok(Self { crawlers })
    }

    /// Registry with every built-in site.
    pub fn with_default_crawlers() -> Self {
        Self {
            crawlers: vec![
                Arc::new(QidianCrawler::new()),
                Arc::new(ZonghengCrawler::new()),
                Arc::new(JjwxcCrawler::new()),
            ],
        }
    }

    /// Crawler for `site`, or [`AppError::UnsupportedSite`] listing what is known.
    pub fn get(&self, site: &str) -> Result<Arc<dyn SiteCrawler>> {
        self.crawlers
            .iter()
            .find(|c| c.site_id() == site)
            .cloned()
            .ok_or_else(|| AppError::UnsupportedSite {
                site: site.to_string(),
                supported: self.supported_sites(),
            })
    }

    pub fn supported_sites(&self) -> Vec<String> {
        self.crawlers.iter().map(|c| c.site_id().to_string()).collect()
    }

    pub fn is_supported(&self, site: &str) -> bool {
        self.crawlers.iter().any(|c| c.site_id() == site)
    }

    pub fn crawlers(&self) -> &[Arc<dyn SiteCrawler>] {
        &self.crawlers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_knows_three_sites() {
        let registry = CrawlerRegistry::with_default_crawlers();
        assert_eq!(registry.supported_sites(), vec!["qidian", "zongheng", "jjwxc"]);
        assert!(registry.is_supported("jjwxc"));
        assert!(!registry.is_supported("17k"));
    }

    #[test]
    fn unknown_site_lists_supported_ones() {
        let registry = CrawlerRegistry::new(vec![Arc::new(JjwxcCrawler::new())]).unwrap();
        match registry.get("fanqie") {
            Err(AppError::UnsupportedSite { site, supported }) => {
                assert_eq!(site, "fanqie");
                assert_eq!(supported, vec!["jjwxc"]);
            }
            other => panic!(
                "expected UnsupportedSite, got {:?}",
                other.map(|c| c.site_id().to_string())
            ),
        }
    }

    #[test]
    fn duplicate_sites_are_rejected() {
        let result = CrawlerRegistry::new(vec![
            Arc::new(QidianCrawler::new()),
            Arc::new(QidianCrawler::new()),
        ]);
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
