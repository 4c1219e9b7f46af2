//! Stored leaderboard snapshot rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{normalize_handle, EntryId, EntityId, Season};

/// What the `mindshare` number means for a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MindshareUnit {
    /// Upstream mindshare score (percentage-like).
    #[default]
    Score,
    /// Dollar prize amount from seeded historical results.
    PrizeUsd,
}

impl std::str::FromStr for MindshareUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "score" => Ok(MindshareUnit::Score),
            "prize_usd" | "usd" => Ok(MindshareUnit::PrizeUsd),
            other => Err(format!("unknown mindshare unit: {}", other)),
        }
    }
}

/// A row about to be inserted; the store assigns ID and batch timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEntry {
    pub rank: u32,
    pub username: String,
    pub handle: String,
    pub mindshare: f64,
    #[serde(default)]
    pub mindshare_unit: MindshareUnit,
}

/// One immutable ranking snapshot row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    /// Derived from season + rank + handle + scrape time
    pub id: EntryId,

    pub season: Season,

    /// Rank within the scrape batch (1 = top)
    pub rank: u32,

    /// Display name
    pub username: String,

    /// Social handle as ingested (bare, `@name` or profile URL)
    pub handle: String,

    pub mindshare: f64,

    #[serde(default)]
    pub mindshare_unit: MindshareUnit,

    /// Shared by every row of one scrape batch
    pub scraped_at: DateTime<Utc>,
}

impl LeaderboardEntry {
    /// Materialise a row for a batch.
    pub fn from_new(season: Season, entry: NewEntry, scraped_at: DateTime<Utc>) -> Self {
        let rank = entry.rank.to_string();
        let stamp = scraped_at.to_rfc3339();
        let id = EntityId::generate(&[season.as_str(), &rank, &entry.handle, &stamp]);
        Self {
            id,
            season,
            rank: entry.rank,
            username: entry.username,
            handle: entry.handle,
            mindshare: entry.mindshare,
            mindshare_unit: entry.mindshare_unit,
            scraped_at,
        }
    }

    pub fn normalized_handle(&self) -> String {
        normalize_handle(&self.handle)
    }

    /// Loose match used by search: the stored handle contains the term or is
    /// contained by it, or the display name contains it. `term` must already
    /// be normalized.
    pub fn matches_loosely(&self, term: &str) -> bool {
        if term.is_empty() {
            return false;
        }
        let handle = self.normalized_handle();
        let name = self.username.to_lowercase();
        (!handle.is_empty() && (handle.contains(term) || term.contains(handle.as_str())))
            || name.contains(term)
    }

    /// Substring match used by suggestions. `term` must already be normalized.
    pub fn matches_substring(&self, term: &str) -> bool {
        !term.is_empty()
            && (self.normalized_handle().contains(term) || self.username.to_lowercase().contains(term))
    }
}
