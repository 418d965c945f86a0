// src/crawlers/jjwxc.rs

//! 晋江文学城 (jjwxc.net).

use scraper::Html;

use super::{ListingLayout, SiteCrawler, extract_links, extract_listing};
use crate::error::Result;
use crate::models::{NovelRecord, RankingType};

const BASE_URL: &str = "https://www.jjwxc.net";

const BOOK_LINK: &str = r#"a[href*="onebook"]"#;

const LAYOUT: ListingLayout = ListingLayout {
    item: ".rank-list li, .rank-item, .novel-item",
    title: &[".novel-name a, h3 a, h4 a", ".title"],
    author: &[".author, .writer, span.author"],
    cover: &["img"],
    link: &[BOOK_LINK],
    description: &[".intro, .description, p.intro"],
};

#[derive(Debug, Default, Clone, Copy)]
pub struct JjwxcCrawler;

impl JjwxcCrawler {
    pub fn new() -> Self {
        Self
    }
}

impl SiteCrawler for JjwxcCrawler {
    fn site_id(&self) -> &str {
        "jjwxc"
    }

    fn supported_types(&self) -> &[RankingType] {
        &RankingType::STANDARD
    }

    fn base_url(&self) -> &str {
        BASE_URL
    }

    fn ranking_path(&self, ranking_type: RankingType) -> Option<&str> {
        match ranking_type {
            RankingType::Monthly => Some("/rank/month"),
            RankingType::Click => Some("/rank/click"),
            RankingType::Recommend => Some("/rank/recommend"),
            RankingType::New => None,
        }
    }

    fn parse(&self, document: &Html) -> Result<Vec<NovelRecord>> {
        let records = extract_listing(document, &LAYOUT, BASE_URL)?;
        if !records.is_empty() {
            return Ok(records);
        }
        log::info!("jjwxc: primary layout matched nothing, trying book links");
        extract_links(document, BOOK_LINK, BASE_URL)
    }
}
