// src/models/ranking.rs

//! Ranking identifiers and the views built from stored snapshots.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::NovelRecord;

/// A ranking list published by the sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankingType {
    /// 月票榜
    Monthly,
    /// 点击榜
    Click,
    /// 推荐榜
    Recommend,
    /// 新书榜, only on some sites
    New,
}

impl RankingType {
    /// Every known ranking type.
    pub const ALL: [RankingType; 4] = [
        RankingType::Monthly,
        RankingType::Click,
        RankingType::Recommend,
        RankingType::New,
    ];

    /// Types every site publishes; a full sweep walks these.
    pub const STANDARD: [RankingType; 3] = [
        RankingType::Monthly,
        RankingType::Click,
        RankingType::Recommend,
    ];

    /// Stable identifier used in storage and at the API boundary.
    pub fn as_str(&self) -> &'static str {
        match self {
            RankingType::Monthly => "monthly",
            RankingType::Click => "click",
            RankingType::Recommend => "recommend",
            RankingType::New => "new",
        }
    }

    /// Parse an identifier; `None` for anything unknown.
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == id)
    }

    /// Human-readable label.
    pub fn display_name(&self) -> &'static str {
        match self {
            RankingType::Monthly => "月票榜",
            RankingType::Click => "点击榜",
            RankingType::Recommend => "推荐榜",
            RankingType::New => "新书榜",
        }
    }
}

impl fmt::Display for RankingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Human-readable label for a site identifier.
///
/// Covers sites that are referenced but not crawled yet; unknown ids map to themselves.
pub fn site_display_name(site: &str) -> &str {
    match site {
        "qidian" => "起点中文网",
        "zongheng" => "纵横中文网",
        "jjwxc" => "晋江文学城",
        "17k" => "17K小说网",
        "fanqie" => "番茄小说",
        other => other,
    }
}

/// Human-readable label for a ranking type identifier; unknown ids map to themselves.
pub fn type_display_name(ranking_type: &str) -> &str {
    RankingType::from_id(ranking_type)
        .map(|t| t.display_name())
        .unwrap_or(ranking_type)
}

/// Title given to a snapshot when it is first created.
pub fn snapshot_title(site: &str, ranking_type: &str) -> String {
    format!(
        "{} - {}",
        site_display_name(site),
        type_display_name(ranking_type)
    )
}

/// Full contents of one stored ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingData {
    pub site_name: String,
    pub ranking_type: String,
    pub title: String,
    pub novels: Vec<NovelRecord>,
    pub updated_at: DateTime<Utc>,
}

/// Overview entry for listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingSummary {
    pub site_name: String,
    pub ranking_type: String,
    pub title: String,
    pub novel_count: usize,
    pub updated_at: DateTime<Utc>,
}
