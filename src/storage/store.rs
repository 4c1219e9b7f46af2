//! Season-partitioned leaderboard store.

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tracing::info;

use super::{JsonlReader, JsonlWriter, StorageConfig, StorageError};
use crate::models::{LeaderboardEntry, NewEntry, Season};

/// Append-only store of leaderboard snapshot rows.
pub struct LeaderboardStore {
    config: StorageConfig,
    // Serialises appends so two batches never interleave within a file.
    write_lock: Mutex<()>,
}

impl LeaderboardStore {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            write_lock: Mutex::new(()),
        }
    }

    /// Insert one scrape batch stamped with the current time.
    pub fn save_batch(
        &self,
        season: Season,
        entries: Vec<NewEntry>,
    ) -> Result<Vec<LeaderboardEntry>, StorageError> {
        self.save_batch_at(season, entries, Utc::now())
    }

    /// Insert one scrape batch; every row shares `scraped_at`.
    pub fn save_batch_at(
        &self,
        season: Season,
        entries: Vec<NewEntry>,
        scraped_at: DateTime<Utc>,
    ) -> Result<Vec<LeaderboardEntry>, StorageError> {
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<LeaderboardEntry> = entries
            .into_iter()
            .map(|e| LeaderboardEntry::from_new(season, e, scraped_at))
            .collect();

        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        JsonlWriter::for_season(&self.config, season).append_batch(&rows)?;

        info!("Saved batch of {} rows for {}", rows.len(), season);
        Ok(rows)
    }

    /// Every stored row for a season, in insertion order.
    pub fn entries(&self, season: Season) -> Result<Vec<LeaderboardEntry>, StorageError> {
        JsonlReader::for_season(&self.config, season).read_all()
    }

    /// The most recent scrape batch for a season, ordered by rank.
    pub fn latest(&self, season: Season) -> Result<Vec<LeaderboardEntry>, StorageError> {
        let rows = self.entries(season)?;
        let Some(latest) = rows.iter().map(|e| e.scraped_at).max() else {
            return Ok(Vec::new());
        };

        let mut batch: Vec<LeaderboardEntry> =
            rows.into_iter().filter(|e| e.scraped_at == latest).collect();
        batch.sort_by_key(|e| e.rank);
        Ok(batch)
    }

    /// All rows ordered for lookups: newest batch first, best rank first.
    pub fn entries_for_lookup(
        &self,
        season: Season,
    ) -> Result<Vec<LeaderboardEntry>, StorageError> {
        let mut rows = self.entries(season)?;
        rows.sort_by(|a, b| {
            b.scraped_at
                .cmp(&a.scraped_at)
                .then_with(|| a.rank.cmp(&b.rank))
        });
        Ok(rows)
    }
}
