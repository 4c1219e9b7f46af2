//! Live leaderboard retrieval.
//!
//! The upstream API only serves rank-ordered pages of at most 100 rows, so
//! both full fetches and user lookups walk pages linearly from page 1.
//! Every page failure ends the walk: callers get whatever was gathered so
//! far, never an error.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::models::{normalize_handle, normalize_search_term, Timeframe};

/// Upstream page size; a shorter page is the last one.
pub const PAGE_SIZE: usize = 100;

/// Default page cap for full leaderboard fetches.
pub const DEFAULT_MAX_PAGES: u32 = 15;

/// Default page cap for single-user lookups.
pub const DEFAULT_SEARCH_MAX_PAGES: u32 = 50;

/// Errors that can occur while fetching one upstream page.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Upstream reported failure")]
    Unsuccessful,
}

/// One row of the upstream leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEntry {
    pub rank: u32,
    /// Social handle without `@`
    pub username: String,
    #[serde(default)]
    pub twitter_id: String,
    #[serde(default)]
    pub display_name: String,
    pub mindshare: f64,
    #[serde(default)]
    pub mindshare_delta: f64,
    #[serde(default)]
    pub snaps: f64,
    #[serde(default)]
    pub snaps_delta: f64,
}

impl ApiEntry {
    /// Display name, falling back to the handle when upstream leaves it blank.
    pub fn name(&self) -> &str {
        if self.display_name.trim().is_empty() {
            &self.username
        } else {
            &self.display_name
        }
    }

    /// Exact handle match or display-name substring match. `term` must be normalized.
    fn is_match(&self, term: &str) -> bool {
        normalize_handle(&self.username) == term || self.display_name.to_lowercase().contains(term)
    }
}

/// Upstream response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope {
    pub success: bool,
    #[serde(default)]
    pub data: Option<Vec<ApiEntry>>,
}

/// Source of upstream pages.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Source name for logging.
    fn name(&self) -> &'static str;

    /// Fetch one 1-based page for a time window.
    async fn fetch_page(&self, timeframe: Timeframe, page: u32)
        -> Result<Vec<ApiEntry>, FetchError>;
}

/// Configuration for the HTTP page source.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Upstream leaderboard endpoint
    pub base_url: String,

    /// User agent string
    pub user_agent: String,

    /// Request timeout (None = wait indefinitely)
    pub timeout: Option<Duration>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            base_url: "https://leaderboard-bice-mu.vercel.app/api/zama".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
            timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// Page source backed by the real upstream API.
pub struct HttpPageSource {
    client: Client,
    base_url: Url,
}

impl HttpPageSource {
    pub fn new(config: &FetcherConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static("creator-leaderboard/0.1.0")),
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: Url::parse(&config.base_url)?,
        })
    }

    fn page_url(&self, timeframe: Timeframe, page: u32) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("timeframe", timeframe.as_str())
            .append_pair("sortBy", "mindshare")
            .append_pair("page", &page.to_string());
        url
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn fetch_page(
        &self,
        timeframe: Timeframe,
        page: u32,
    ) -> Result<Vec<ApiEntry>, FetchError> {
        let url = self.page_url(timeframe, page);
        debug!("Fetching {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let body = response.text().await?;
        let envelope: ApiEnvelope = serde_json::from_str(&body)?;
        if !envelope.success {
            return Err(FetchError::Unsuccessful);
        }
        Ok(envelope.data.unwrap_or_default())
    }
}

/// Paginated client over any [`PageSource`].
#[derive(Clone)]
pub struct LeaderboardClient {
    source: Arc<dyn PageSource>,
    max_pages: u32,
    search_max_pages: u32,
}

impl LeaderboardClient {
    pub fn new(source: Arc<dyn PageSource>) -> Self {
        Self {
            source,
            max_pages: DEFAULT_MAX_PAGES,
            search_max_pages: DEFAULT_SEARCH_MAX_PAGES,
        }
    }

    pub fn with_page_limits(mut self, max_pages: u32, search_max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self.search_max_pages = search_max_pages;
        self
    }

    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }

    pub fn search_max_pages(&self) -> u32 {
        self.search_max_pages
    }

    /// Fetch one page, mapping every failure to `None`.
    pub async fn fetch_page(&self, timeframe: Timeframe, page: u32) -> Option<Vec<ApiEntry>> {
        match self.source.fetch_page(timeframe, page).await {
            Ok(rows) => Some(rows),
            Err(e) => {
                warn!(
                    "Upstream {} page {} ({}) failed: {}",
                    self.source.name(),
                    page,
                    timeframe,
                    e
                );
                None
            }
        }
    }

    /// Walk pages from 1 until a failure, an empty page, a short page or
    /// `max_pages`. Returns everything gathered.
    pub async fn fetch_all(&self, timeframe: Timeframe, max_pages: u32) -> Vec<ApiEntry> {
        let mut all = Vec::new();

        for page in 1..=max_pages {
            let Some(rows) = self.fetch_page(timeframe, page).await else {
                break;
            };
            if rows.is_empty() {
                break;
            }

            let last = rows.len() < PAGE_SIZE;
            all.extend(rows);
            if last {
                break;
            }
        }

        info!("Fetched {} live entries for {}", all.len(), timeframe);
        all
    }

    /// [`fetch_all`](Self::fetch_all) with the configured page cap.
    pub async fn fetch_default(&self, timeframe: Timeframe) -> Vec<ApiEntry> {
        self.fetch_all(timeframe, self.max_pages).await
    }

    /// Walk pages until an entry matches `term`: its handle equals the
    /// normalized term or its display name contains it.
    pub async fn find_user(
        &self,
        term: &str,
        timeframe: Timeframe,
        max_pages: u32,
    ) -> Option<ApiEntry> {
        let term = normalize_search_term(term);
        if term.is_empty() {
            return None;
        }

        for page in 1..=max_pages {
            let rows = self.fetch_page(timeframe, page).await?;
            if rows.is_empty() {
                return None;
            }

            let last = rows.len() < PAGE_SIZE;
            if let Some(found) = rows.into_iter().find(|e| e.is_match(&term)) {
                debug!("Found {} on page {} ({})", term, page, timeframe);
                return Some(found);
            }
            if last {
                return None;
            }
        }

        None
    }

    /// [`find_user`](Self::find_user) with the configured search page cap.
    pub async fn find_user_default(&self, term: &str, timeframe: Timeframe) -> Option<ApiEntry> {
        self.find_user(term, timeframe, self.search_max_pages).await
    }
}

/// Scripted page sources for tests.
#[cfg(test)]
pub mod testing {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    /// Response for one scripted page.
    #[derive(Debug, Clone)]
    pub enum PageScript {
        Rows(Vec<ApiEntry>),
        Status(u16),
    }

    /// Serves pre-built pages per timeframe and counts requests.
    #[derive(Default)]
    pub struct ScriptedSource {
        pages: Mutex<HashMap<Timeframe, Vec<PageScript>>>,
        requests: AtomicUsize,
    }

    impl ScriptedSource {
        pub fn new() -> Self {
            Self::default()
        }

        /// Script the same pages for every timeframe.
        pub fn with_pages(pages: Vec<PageScript>) -> Self {
            let source = Self::new();
            for tf in Timeframe::ALL {
                source.set_pages(tf, pages.clone());
            }
            source
        }

        pub fn set_pages(&self, timeframe: Timeframe, pages: Vec<PageScript>) {
            self.pages.lock().unwrap().insert(timeframe, pages);
        }

        pub fn requests(&self) -> usize {
            self.requests.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PageSource for ScriptedSource {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn fetch_page(
            &self,
            timeframe: Timeframe,
            page: u32,
        ) -> Result<Vec<ApiEntry>, FetchError> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            let pages = self.pages.lock().unwrap();
            let script = pages
                .get(&timeframe)
                .and_then(|p| p.get(page as usize - 1))
                .cloned();
            match script {
                Some(PageScript::Rows(rows)) => Ok(rows),
                Some(PageScript::Status(status)) => Err(FetchError::HttpStatus {
                    status,
                    message: "scripted".to_string(),
                }),
                None => Ok(Vec::new()),
            }
        }
    }

    pub fn api_entry(rank: u32, username: &str, display_name: &str) -> ApiEntry {
        ApiEntry {
            rank,
            username: username.to_string(),
            twitter_id: String::new(),
            display_name: display_name.to_string(),
            mindshare: 10.0 / rank as f64,
            mindshare_delta: 0.0,
            snaps: 0.0,
            snaps_delta: 0.0,
        }
    }

    /// A page of `count` generic rows starting at `first_rank`.
    pub fn filler_page(first_rank: u32, count: usize) -> PageScript {
        PageScript::Rows(
            (0..count as u32)
                .map(|i| {
                    let rank = first_rank + i;
                    api_entry(rank, &format!("user{}", rank), &format!("User {}", rank))
                })
                .collect(),
        )
    }
}
