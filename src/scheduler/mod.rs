//! Periodic snapshot scheduler.
//!
//! Each run pulls the current standings from the configured source and
//! appends them to the store as one batch. Runs never overlap: a run that
//! starts while another is in flight is skipped, not queued.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::fetch::{ApiEntry, LeaderboardClient};
use crate::models::{MindshareUnit, NewEntry, Season, Timeframe};
use crate::scrape::{HtmlScraper, ScrapeError};
use crate::storage::{LeaderboardStore, StorageError};

/// Errors that can end a scheduler run.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("Scrape error: {0}")]
    Scrape(#[from] ScrapeError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Where a run gets its rows from.
pub enum SnapshotSource {
    /// Full fetch of the live upstream leaderboard
    Api {
        client: LeaderboardClient,
        timeframe: Timeframe,
    },

    /// The public program page
    Html { scraper: HtmlScraper, url: String },
}

impl SnapshotSource {
    fn describe(&self) -> String {
        match self {
            SnapshotSource::Api { timeframe, .. } => format!("live API ({})", timeframe),
            SnapshotSource::Html { url, .. } => format!("page {}", url),
        }
    }

    async fn collect(&self) -> Result<Vec<NewEntry>, ScrapeError> {
        match self {
            SnapshotSource::Api { client, timeframe } => Ok(client
                .fetch_default(*timeframe)
                .await
                .into_iter()
                .map(api_row)
                .collect()),
            SnapshotSource::Html { scraper, url } => scraper.scrape(url).await,
        }
    }
}

fn api_row(entry: ApiEntry) -> NewEntry {
    NewEntry {
        rank: entry.rank,
        username: entry.name().to_string(),
        handle: format!("@{}", entry.username),
        mindshare: entry.mindshare,
        mindshare_unit: MindshareUnit::Score,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
}

/// Snapshot of scheduler activity, served by the status endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerState {
    pub status: RunStatus,
    pub season: Option<Season>,
    pub last_started: Option<DateTime<Utc>>,
    pub last_completed: Option<DateTime<Utc>>,
    /// Rows saved by the last completed run
    pub last_saved: usize,
    pub last_error: Option<String>,
    /// Runs skipped because another was in flight
    pub runs_skipped: u64,
}

/// Result of one `run_once` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Another run held the token
    Skipped,
    Completed { saved: usize },
    Failed(String),
}

/// Owns the re-entrancy token and the periodic loop.
pub struct Scheduler {
    store: Arc<LeaderboardStore>,
    source: SnapshotSource,
    season: Season,
    interval: Duration,
    run_token: Mutex<()>,
    state: RwLock<SchedulerState>,
}

impl Scheduler {
    pub fn new(
        store: Arc<LeaderboardStore>,
        source: SnapshotSource,
        season: Season,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            source,
            season,
            interval,
            run_token: Mutex::new(()),
            state: RwLock::new(SchedulerState {
                season: Some(season),
                ..Default::default()
            }),
        }
    }

    /// True while a run holds the token.
    pub fn is_busy(&self) -> bool {
        self.run_token.try_lock().is_err()
    }

    /// Occupy the run token as an in-flight run would.
    #[cfg(test)]
    pub(crate) fn hold_run_token(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.run_token
            .try_lock()
            .expect("run token free")
    }

    pub async fn state(&self) -> SchedulerState {
        self.state.read().await.clone()
    }

    /// Scrape once and append the batch, unless a run is already in flight.
    pub async fn run_once(&self) -> RunOutcome {
        let Ok(_token) = self.run_token.try_lock() else {
            info!("Scraper already running, skipping");
            self.state.write().await.runs_skipped += 1;
            return RunOutcome::Skipped;
        };

        {
            let mut state = self.state.write().await;
            state.status = RunStatus::Running;
            state.last_started = Some(Utc::now());
            state.last_error = None;
        }

        info!(
            "Starting scraper run for {} from {}",
            self.season,
            self.source.describe()
        );

        let outcome = match self.scrape_and_save().await {
            Ok(saved) => {
                if saved == 0 {
                    warn!("No entries scraped for {}", self.season);
                } else {
                    info!("Saved {} entries for {}", saved, self.season);
                }
                RunOutcome::Completed { saved }
            }
            Err(e) => {
                error!("Error during scraper run: {}", e);
                RunOutcome::Failed(e.to_string())
            }
        };

        let mut state = self.state.write().await;
        state.last_completed = Some(Utc::now());
        match &outcome {
            RunOutcome::Completed { saved } => {
                state.status = RunStatus::Completed;
                state.last_saved = *saved;
            }
            RunOutcome::Failed(msg) => {
                state.status = RunStatus::Failed;
                state.last_error = Some(msg.clone());
            }
            RunOutcome::Skipped => {}
        }

        outcome
    }

    async fn scrape_and_save(&self) -> Result<usize, ScheduleError> {
        let entries = self.source.collect().await?;
        let saved = self.store.save_batch(self.season, entries)?;
        Ok(saved.len())
    }

    /// Run immediately, then once per interval, forever.
    pub async fn run_periodic(self: Arc<Self>) {
        let mut ticker = interval(self.interval);

        info!("Starting scraper scheduler every {:?}", self.interval);

        loop {
            ticker.tick().await;
            self.run_once().await;
        }
    }
}
