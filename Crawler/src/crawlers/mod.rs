// src/crawlers/mod.rs

//! Site crawlers.
//!
//! Each supported site implements [`SiteCrawler`]: it knows its ranking URLs,
//! how to read records out of a ranking page, and which fallback dataset to
//! serve when the page cannot be read. The crawl itself is the single
//! [`crawl`] function shared by every site.

mod jjwxc;
mod qidian;
mod registry;
mod zongheng;

use std::collections::HashSet;

use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{NovelRecord, NovelStatus, RankingType, clean_author, truncate_description};
use crate::utils::absolutize;
use crate::utils::http::PageFetcher;

pub use jjwxc::JjwxcCrawler;
pub use qidian::QidianCrawler;
pub use registry::CrawlerRegistry;
pub use zongheng::ZonghengCrawler;

/// Ranking pages show a single page of about this many entries.
pub const MAX_RECORDS: usize = 50;

/// Per-site scraping hooks.
pub trait SiteCrawler: Send + Sync {
    /// Stable site identifier, e.g. `"qidian"`.
    fn site_id(&self) -> &str;

    /// Ranking types this site publishes.
    fn supported_types(&self) -> &[RankingType];

    /// Scheme and host used to resolve relative links.
    fn base_url(&self) -> &str;

    /// Path of a ranking page below [`SiteCrawler::base_url`].
    fn ranking_path(&self, ranking_type: RankingType) -> Option<&str>;

    /// Read ranked records out of a fetched page.
    ///
    /// Implementations try their primary layout first and may fall back to a
    /// looser strategy before returning an empty list.
    fn parse(&self, document: &Html) -> Result<Vec<NovelRecord>>;

    /// Marker found in `html` if the page is a bot-challenge interstitial.
    fn interstitial_marker(&self, _html: &str) -> Option<&'static str> {
        None
    }

    /// Hand-curated records served when live extraction is impossible.
    fn mock_data(&self) -> Vec<NovelRecord> {
        Vec::new()
    }

    fn supports(&self, ranking_type: RankingType) -> bool {
        self.supported_types().contains(&ranking_type)
    }

    /// Absolute URL of a ranking page.
    fn build_ranking_url(&self, ranking_type: RankingType) -> Result<String> {
        if !self.supports(ranking_type) {
            return Err(AppError::unsupported_type(
                self.site_id(),
                ranking_type.as_str(),
            ));
        }
        let path = self.ranking_path(ranking_type).ok_or_else(|| {
            AppError::unsupported_type(self.site_id(), ranking_type.as_str())
        })?;
        Ok(format!("{}{}", self.base_url().trim_end_matches('/'), path))
    }
}

/// Crawl one ranking of one site.
///
/// Network exhaustion, a detected interstitial or a parse error fall back to
/// the site's mock dataset; only when that is empty does [`AppError::CrawlFailed`]
/// reach the caller. A page that parses to zero records also falls back to the
/// mock dataset, and otherwise yields an empty list.
pub async fn crawl(
    crawler: &dyn SiteCrawler,
    fetcher: &dyn PageFetcher,
    ranking_type: RankingType,
) -> Result<Vec<NovelRecord>> {
    let site = crawler.site_id();
    let url = crawler.build_ranking_url(ranking_type)?;
    log::info!("Crawling {} - {}: {}", site, ranking_type, url);

    let html = match fetcher.fetch(&url).await {
        Ok(html) => html,
        Err(AppError::Cancelled) => return Err(AppError::Cancelled),
        Err(error) => return fall_back(crawler, ranking_type, error),
    };

    if let Some(marker) = crawler.interstitial_marker(&html) {
        let error = AppError::AntiBotInterstitial {
            url,
            marker: marker.to_string(),
        };
        return fall_back(crawler, ranking_type, error);
    }

    let document = Html::parse_document(&html);
    match crawler.parse(&document) {
        Ok(records) if !records.is_empty() => {
            log::info!(
                "Crawled {} - {}: {} records",
                site,
                ranking_type,
                records.len()
            );
            Ok(records)
        }
        Ok(_) => {
            let mock = crawler.mock_data();
            if mock.is_empty() {
                log::warn!("No records found on {} - {}", site, ranking_type);
            } else {
                log::warn!(
                    "No records found on {} - {}, serving {} fallback records",
                    site,
                    ranking_type,
                    mock.len()
                );
            }
            Ok(mock)
        }
        Err(error) => fall_back(crawler, ranking_type, error),
    }
}

fn fall_back(
    crawler: &dyn SiteCrawler,
    ranking_type: RankingType,
    cause: AppError,
) -> Result<Vec<NovelRecord>> {
    let mock = crawler.mock_data();
    if mock.is_empty() {
        log::error!(
            "Crawl failed for {} - {}: {}",
            crawler.site_id(),
            ranking_type,
            cause
        );
        return Err(AppError::CrawlFailed {
            site: crawler.site_id().to_string(),
            ranking_type: ranking_type.as_str().to_string(),
            source: Box::new(cause),
        });
    }
    log::warn!(
        "Crawl degraded for {} - {} ({}); serving {} fallback records",
        crawler.site_id(),
        ranking_type,
        cause,
        mock.len()
    );
    Ok(mock)
}

// --- Extraction helpers shared by the site crawlers ---

/// CSS selectors describing one site's ranking list.
///
/// Every field lists a primary selector and optionally a fallback, tried in
/// order until one yields a non-empty value.
#[derive(Debug, Clone, Copy)]
pub struct ListingLayout {
    pub item: &'static str,
    pub title: &'static [&'static str],
    pub author: &'static [&'static str],
    pub cover: &'static [&'static str],
    pub link: &'static [&'static str],
    pub description: &'static [&'static str],
}

struct CompiledLayout {
    item: Selector,
    title: Vec<Selector>,
    author: Vec<Selector>,
    cover: Vec<Selector>,
    link: Vec<Selector>,
    description: Vec<Selector>,
}

impl CompiledLayout {
    fn compile(layout: &ListingLayout) -> Result<Self> {
        Ok(Self {
            item: parse_selector(layout.item)?,
            title: parse_selectors(layout.title)?,
            author: parse_selectors(layout.author)?,
            cover: parse_selectors(layout.cover)?,
            link: parse_selectors(layout.link)?,
            description: parse_selectors(layout.description)?,
        })
    }
}

/// Extract records using a site's primary layout.
///
/// Items without a title are skipped and do not consume a rank.
pub fn extract_listing(
    document: &Html,
    layout: &ListingLayout,
    base_url: &str,
) -> Result<Vec<NovelRecord>> {
    let layout = CompiledLayout::compile(layout)?;
    let mut records = Vec::new();

    for item in document.select(&layout.item) {
        let title = first_text(&item, &layout.title);
        if title.is_empty() {
            continue;
        }

        records.push(NovelRecord {
            rank: records.len() as u32 + 1,
            title,
            author: clean_author(&first_text(&item, &layout.author)),
            cover_url: absolutize(
                base_url,
                &first_attr(&item, &layout.cover, &["src", "data-src"]),
            ),
            source_url: absolutize(base_url, &first_attr(&item, &layout.link, &["href"])),
            description: truncate_description(&first_text(&item, &layout.description)),
            status: NovelStatus::Serialized,
            total_chapters: None,
        });

        if records.len() >= MAX_RECORDS {
            break;
        }
    }

    Ok(records)
}

/// Looser strategy: every link matching `link_css` becomes a record.
///
/// Links without text or `href` are skipped, as are repeated targets.
pub fn extract_links(document: &Html, link_css: &str, base_url: &str) -> Result<Vec<NovelRecord>> {
    let link_sel = parse_selector(link_css)?;
    let mut seen = HashSet::new();
    let mut records = Vec::new();

    for link in document.select(&link_sel) {
        let title = element_text(&link);
        let source_url = absolutize(base_url, link.value().attr("href").unwrap_or(""));
        if title.is_empty() || source_url.is_empty() || !seen.insert(source_url.clone()) {
            continue;
        }

        let mut record = NovelRecord::new(records.len() as u32 + 1, title);
        record.source_url = source_url;
        records.push(record);

        if records.len() >= MAX_RECORDS {
            break;
        }
    }

    Ok(records)
}

/// One hand-curated fallback record.
pub(crate) fn sample_record(
    rank: u32,
    title: &str,
    author: &str,
    description: &str,
    source_url: &str,
    status: NovelStatus,
    total_chapters: u32,
) -> NovelRecord {
    NovelRecord {
        author: author.trim().to_string(),
        description: description.to_string(),
        source_url: source_url.to_string(),
        status,
        total_chapters: Some(total_chapters),
        ..NovelRecord::new(rank, title)
    }
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

fn parse_selectors(list: &[&str]) -> Result<Vec<Selector>> {
    list.iter().map(|s| parse_selector(s)).collect()
}

fn element_text(element: &ElementRef) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of the first element matched by the first selector that yields any.
fn first_text(item: &ElementRef, selectors: &[Selector]) -> String {
    selectors
        .iter()
        .filter_map(|sel| item.select(sel).next())
        .map(|el| element_text(&el))
        .find(|text| !text.is_empty())
        .unwrap_or_default()
}

/// First non-empty attribute among `attrs` on the first matching element.
fn first_attr(item: &ElementRef, selectors: &[Selector], attrs: &[&str]) -> String {
    selectors
        .iter()
        .filter_map(|sel| item.select(sel).next())
        .find_map(|el| {
            attrs
                .iter()
                .filter_map(|attr| el.value().attr(attr))
                .map(str::trim)
                .find(|value| !value.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_default()
}
