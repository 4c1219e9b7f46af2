//! Per-user rank lookup across seasons.
//!
//! Historical seasons come from the snapshot store; season 5 is looked up
//! live in all three time windows at once.

mod suggestions;

pub use suggestions::*;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::fetch::{ApiEntry, LeaderboardClient};
use crate::models::{
    avatar_url, normalize_handle, normalize_search_term, LeaderboardEntry, Season, Timeframe,
};
use crate::storage::{LeaderboardStore, StorageError};

/// Shortest accepted search term, after normalization.
pub const MIN_TERM_LEN: usize = 2;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Username must be at least {MIN_TERM_LEN} characters")]
    TermTooShort,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// A user's standing in one historical season.
#[derive(Debug, Clone, Serialize)]
pub struct SeasonRank {
    pub season: Season,
    pub rank: Option<u32>,
    pub username: Option<String>,
    pub handle: Option<String>,
    pub found: bool,
}

impl SeasonRank {
    fn from_match(season: Season, entry: Option<&LeaderboardEntry>) -> Self {
        Self {
            season,
            rank: entry.map(|e| e.rank),
            username: entry.map(|e| e.username.clone()),
            handle: entry.map(|e| e.handle.clone()),
            found: entry.is_some(),
        }
    }
}

/// A user's standing in the live season, per time window.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LiveRanks {
    #[serde(rename = "rank24h")]
    pub rank_24h: Option<u32>,
    #[serde(rename = "rank7d")]
    pub rank_7d: Option<u32>,
    #[serde(rename = "rank30d")]
    pub rank_30d: Option<u32>,
    #[serde(rename = "mindshare24h")]
    pub mindshare_24h: Option<f64>,
    #[serde(rename = "mindshare7d")]
    pub mindshare_7d: Option<f64>,
    #[serde(rename = "mindshare30d")]
    pub mindshare_30d: Option<f64>,
    pub found: bool,
}

impl LiveRanks {
    fn from_windows(
        day: Option<&ApiEntry>,
        week: Option<&ApiEntry>,
        month: Option<&ApiEntry>,
    ) -> Self {
        Self {
            rank_24h: day.map(|e| e.rank),
            rank_7d: week.map(|e| e.rank),
            rank_30d: month.map(|e| e.rank),
            mindshare_24h: day.map(|e| e.mindshare),
            mindshare_7d: week.map(|e| e.mindshare),
            mindshare_30d: month.map(|e| e.mindshare),
            found: day.is_some() || week.is_some() || month.is_some(),
        }
    }
}

/// Unified rank report for one search.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchReport {
    pub searched_username: String,
    pub display_name: String,
    pub handle: String,
    pub profile_pic: String,
    pub results: Vec<SeasonRank>,
    pub s5: LiveRanks,
    pub timestamp: DateTime<Utc>,
}

/// Resolved display identity for a report.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Identity {
    handle: String,
    display_name: String,
}

/// Live 30d → 7d → 24h, then the first matching historical season, then
/// the term itself.
fn resolve_identity(
    term: &str,
    live: [Option<&ApiEntry>; 3],
    historical: Option<&LeaderboardEntry>,
) -> Identity {
    let [day, week, month] = live;
    if let Some(entry) = month.or(week).or(day) {
        return Identity {
            handle: entry.username.clone(),
            display_name: entry.name().to_string(),
        };
    }

    if let Some(entry) = historical {
        let handle = Some(entry.normalized_handle())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| term.to_string());
        let display_name = if entry.username.is_empty() {
            handle.clone()
        } else {
            entry.username.clone()
        };
        return Identity {
            handle,
            display_name,
        };
    }

    Identity {
        handle: term.to_string(),
        display_name: term.to_string(),
    }
}

/// Look a user up in every season and merge the results.
pub async fn search_user(
    store: &LeaderboardStore,
    client: &LeaderboardClient,
    raw_term: &str,
) -> Result<SearchReport, SearchError> {
    let term = normalize_search_term(raw_term);
    if term.chars().count() < MIN_TERM_LEN {
        return Err(SearchError::TermTooShort);
    }

    let mut results = Vec::with_capacity(Season::HISTORICAL.len());
    let mut first_historical: Option<LeaderboardEntry> = None;

    for season in Season::HISTORICAL {
        let rows = store.entries_for_lookup(season)?;
        let found = rows.into_iter().find(|e| e.matches_loosely(&term));
        debug!("{}: {} in {}", term, found.is_some(), season);

        results.push(SeasonRank::from_match(season, found.as_ref()));
        if first_historical.is_none() {
            first_historical = found;
        }
    }

    let (day, week, month) = tokio::join!(
        client.find_user_default(&term, Timeframe::Day),
        client.find_user_default(&term, Timeframe::Week),
        client.find_user_default(&term, Timeframe::Month),
    );

    let s5 = LiveRanks::from_windows(day.as_ref(), week.as_ref(), month.as_ref());
    let identity = resolve_identity(
        &term,
        [day.as_ref(), week.as_ref(), month.as_ref()],
        first_historical.as_ref(),
    );

    info!(
        "Search for {} resolved to @{} ({} historical seasons, live: {})",
        term,
        identity.handle,
        results.iter().filter(|r| r.found).count(),
        s5.found
    );

    Ok(SearchReport {
        profile_pic: avatar_url(&identity.handle),
        handle: format!("@{}", normalize_handle(&identity.handle)),
        searched_username: identity.handle,
        display_name: identity.display_name,
        results,
        s5,
        timestamp: Utc::now(),
    })
}
