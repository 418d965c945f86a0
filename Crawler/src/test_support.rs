// src/test_support.rs

//! Canned fetchers and crawlers shared by unit tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use scraper::Html;

use crate::crawlers::{SiteCrawler, extract_links};
use crate::error::{AppError, Result};
use crate::models::{NovelRecord, RankingType};
use crate::utils::http::PageFetcher;

enum Canned {
    Page(String),
    Status(u16),
}

/// [`PageFetcher`] serving fixed bodies per URL.
///
/// Unknown URLs and configured failures come back the way an exhausted
/// retry loop reports them.
#[derive(Default)]
pub(crate) struct StaticFetcher {
    responses: HashMap<String, Canned>,
    calls: AtomicUsize,
    requested: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, html: &str) -> Self {
        self.responses
            .insert(url.to_string(), Canned::Page(html.to_string()));
        self
    }

    pub fn failing(mut self, url: &str, status: u16) -> Self {
        self.responses.insert(url.to_string(), Canned::Status(status));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push(url.to_string());

        let status = match self.responses.get(url) {
            Some(Canned::Page(html)) => return Ok(html.clone()),
            Some(Canned::Status(status)) => *status,
            None => 404,
        };
        Err(AppError::FetchRetryExhausted {
            url: url.to_string(),
            attempts: 3,
            source: Box::new(AppError::HttpStatus {
                url: url.to_string(),
                status,
            }),
        })
    }
}

/// Minimal site: every link on `https://{id}.test/{type}` is a record.
pub(crate) struct StubCrawler {
    id: String,
    base_url: String,
    mock: Vec<NovelRecord>,
}

impl StubCrawler {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            base_url: format!("https://{id}.test"),
            mock: Vec::new(),
        }
    }

    pub fn with_mock(mut self, mock: Vec<NovelRecord>) -> Self {
        self.mock = mock;
        self
    }

    pub fn url(id: &str, ranking_type: RankingType) -> String {
        format!("https://{id}.test/{}", ranking_type.as_str())
    }
}

impl SiteCrawler for StubCrawler {
    fn site_id(&self) -> &str {
        &self.id
    }

    fn supported_types(&self) -> &[RankingType] {
        &RankingType::STANDARD
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn ranking_path(&self, ranking_type: RankingType) -> Option<&str> {
        Some(match ranking_type {
            RankingType::Monthly => "/monthly",
            RankingType::Click => "/click",
            RankingType::Recommend => "/recommend",
            RankingType::New => "/new",
        })
    }

    fn parse(&self, document: &Html) -> Result<Vec<NovelRecord>> {
        extract_links(document, "a", &self.base_url)
    }

    fn mock_data(&self) -> Vec<NovelRecord> {
        self.mock.clone()
    }
}

/// A ranking page with one link per title.
pub(crate) fn listing_page(titles: &[&str]) -> String {
    let links: String = titles
        .iter()
        .enumerate()
        .map(|(i, t)| format!(r#"<li><a href="/book/{i}">{t}</a></li>"#))
        .collect();
    format!("<html><body><ul>{links}</ul></body></html>")
}
