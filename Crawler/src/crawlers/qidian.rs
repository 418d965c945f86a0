// src/crawlers/qidian.rs

//! 起点中文网 (qidian.com).
//!
//! The ranking pages usually sit behind a bot challenge, so most crawls end up
//! on the fallback dataset.

use scraper::Html;

use super::{ListingLayout, SiteCrawler, extract_listing, sample_record};
use crate::error::Result;
use crate::models::{NovelRecord, NovelStatus, RankingType};

const BASE_URL: &str = "https://www.qidian.com";

const SUPPORTED: &[RankingType] = &[
    RankingType::Monthly,
    RankingType::Click,
    RankingType::Recommend,
    RankingType::New,
];

const INTERSTITIAL_MARKERS: &[&str] = &["cloudflare", "probe.js", "buid"];

const LAYOUT: ListingLayout = ListingLayout {
    item: ".rank-list li, .rank-body .book-img-text, .rank-item",
    title: &[
        ".book-mid-info h4, .book-info-title a, h3 a, .book-name",
        "h4 a, h3 a, a[title]",
    ],
    author: &[
        ".book-mid-info p span, .author, .writer-name",
        "p.author, span.author",
    ],
    cover: &["img"],
    link: &[r#"a[href*="/info/"]"#, r#"a[href*="/book/"]"#],
    description: &[".book-mid-info p, .intro, .description"],
};

#[derive(Debug, Default, Clone, Copy)]
pub struct QidianCrawler;

impl QidianCrawler {
    pub fn new() -> Self {
        Self
    }
}

impl SiteCrawler for QidianCrawler {
    fn site_id(&self) -> &str {
        "qidian"
    }

    fn supported_types(&self) -> &[RankingType] {
        SUPPORTED
    }

    fn base_url(&self) -> &str {
        BASE_URL
    }

    fn ranking_path(&self, ranking_type: RankingType) -> Option<&str> {
        Some(match ranking_type {
            RankingType::Monthly => "/rank/month",
            RankingType::Click => "/rank/click",
            RankingType::Recommend => "/rank/recommend",
            RankingType::New => "/rank/new",
        })
    }

    fn parse(&self, document: &Html) -> Result<Vec<NovelRecord>> {
        extract_listing(document, &LAYOUT, BASE_URL)
    }

    fn interstitial_marker(&self, html: &str) -> Option<&'static str> {
        INTERSTITIAL_MARKERS
            .iter()
            .copied()
            .find(|marker| html.contains(marker))
    }

    fn mock_data(&self) -> Vec<NovelRecord> {
        use NovelStatus::{Completed, Serialized};
        vec![
            sample_record(
                1,
                "完美世界",
                "辰东",
                "一粒尘可填海，一根草斩尽日月星辰，弹指间天翻地覆。",
                "https://www.qidian.com/info/1010734496",
                Completed,
                2000,
            ),
            sample_record(
                2,
                "诡秘之主",
                "爱潜水的乌贼",
                "蒸汽与机械的浪潮中，谁能触及非凡？",
                "https://www.qidian.com/info/1010868264",
                Completed,
                1400,
            ),
            sample_record(
                3,
                "大奉打更人",
                "卖报小郎君",
                "这个世界，有儒；有道；有佛；有妖；有术士。",
                "https://www.qidian.com/info/1019665447",
                Completed,
                2300,
            ),
            sample_record(
                4,
                "深空彼岸",
                "辰东",
                "浩瀚的宇宙中，一片死寂。只有永恒的葬地。",
                "https://www.qidian.com/info/1029743800",
                Serialized,
                800,
            ),
            sample_record(
                5,
                "我的治愈系游戏",
                "我会修空调",
                "你要玩游戏吗？",
                "https://www.qidian.com/info/1021616706",
                Serialized,
                600,
            ),
            sample_record(
                6,
                "星门",
                "老鹰吃小鸡",
                "传说，在那里可以获得一切。",
                "https://www.qidian.com/info/1034983746",
                Serialized,
                1200,
            ),
            sample_record(
                7,
                "赤心巡天",
                "情何以甚",
                "山河千里写伏尸，乾坤百年描饿虎。",
                "https://www.qidian.com/info/1035809082",
                Serialized,
                900,
            ),
            sample_record(
                8,
                "长夜余火",
                "肘子",
                "余火藏于长夜，当有燃灯之人。",
                "https://www.qidian.com/info/1035698006",
                Completed,
                700,
            ),
            sample_record(
                9,
                "灵境行者",
                "卖报小郎君",
                "灵境穿行，虚实交错，梦境与现实。",
                "https://www.qidian.com/info/1038489683",
                Serialized,
                500,
            ),
            sample_record(
                10,
                "明克街13号",
                "纯洁滴小龙",
                "这是一个关于超凡、诡秘和探案的故事。",
                "https://www.qidian.com/info/1021769540",
                Serialized,
                400,
            ),
        ]
    }
}
