// src/crawlers/zongheng.rs

//! 纵横中文网 (zongheng.com).

use scraper::Html;

use super::{ListingLayout, SiteCrawler, extract_links, extract_listing, sample_record};
use crate::error::Result;
use crate::models::{NovelRecord, NovelStatus, RankingType};

const BASE_URL: &str = "https://www.zongheng.com";

const BOOK_LINK: &str = r#"a[href*="/book/"]"#;

const INTERSTITIAL_MARKERS: &[&str] = &["cloudflare", "probe.js"];

/// A real ranking page has far more markup than this in its body.
const MIN_BODY_HTML_LEN: usize = 100;

const LAYOUT: ListingLayout = ListingLayout {
    item: ".rank-list li, .rank-item, .book-item",
    title: &[".book-name a, h3 a, h4 a, .title a"],
    author: &[".author, .writer, span.author"],
    cover: &["img"],
    link: &[BOOK_LINK],
    description: &[".intro, .description, p.intro"],
};

/// Byte length of the markup between `<body ...>` and `</body>`.
///
/// Without a body tag the whole document counts as body, the way an HTML
/// parser would place it.
fn body_markup_len(html: &str) -> usize {
    let lower = html.to_ascii_lowercase();
    let Some(open) = lower.find("<body") else {
        return html.len();
    };
    let Some(start) = lower[open..].find('>').map(|i| open + i + 1) else {
        return 0;
    };
    let end = lower
        .rfind("</body>")
        .filter(|&end| end >= start)
        .unwrap_or(lower.len());
    end - start
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ZonghengCrawler;

impl ZonghengCrawler {
    pub fn new() -> Self {
        Self
    }
}

impl SiteCrawler for ZonghengCrawler {
    fn site_id(&self) -> &str {
        "zongheng"
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
        log::info!("zongheng: primary layout matched nothing, trying book links");
        extract_links(document, BOOK_LINK, BASE_URL)
    }

    fn interstitial_marker(&self, html: &str) -> Option<&'static str> {
        if let Some(marker) = INTERSTITIAL_MARKERS
            .iter()
            .copied()
            .find(|marker| html.contains(marker))
        {
            return Some(marker);
        }

        (body_markup_len(html) < MIN_BODY_HTML_LEN).then_some("near-empty body")
    }

    fn mock_data(&self) -> Vec<NovelRecord> {
        use NovelStatus::Serialized;
        vec![
            sample_record(
                1,
                "重生之都市仙尊",
                "洛书",
                "渡劫期大能洛尘，重回少年时代。",
                "https://www.zongheng.com/book/123456",
                Serialized,
                3000,
            ),
            sample_record(
                2,
                "逆天邪神",
                "火星引力",
                "掌天地之权，踏万界之穹。",
                "https://www.zongheng.com/book/234567",
                Serialized,
                2000,
            ),
            sample_record(
                3,
                "万古神帝",
                "飞天鱼",
                "八百年前，明帝之子张若尘，被他的未婚妻池瑶公主杀死。",
                "https://www.zongheng.com/book/345678",
                Serialized,
                2500,
            ),
        ]
    }
}
