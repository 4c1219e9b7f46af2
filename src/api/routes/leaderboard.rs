use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::ApiError;
use crate::fetch::ApiEntry;
use crate::models::{avatar_url, LeaderboardEntry, Season, Timeframe};

#[derive(Debug, Deserialize)]
pub struct LeaderboardParams {
    pub range: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardRow {
    /// Null for live rows, which are never stored
    pub id: Option<String>,
    pub season: Season,
    pub rank: u32,
    pub username: String,
    pub handle: String,
    pub mindshare: f64,
    pub avatar_url: String,
}

impl From<LeaderboardEntry> for LeaderboardRow {
    fn from(entry: LeaderboardEntry) -> Self {
        Self {
            id: Some(entry.id.as_str().to_string()),
            avatar_url: avatar_url(&entry.handle),
            season: entry.season,
            rank: entry.rank,
            username: entry.username,
            handle: entry.handle,
            mindshare: entry.mindshare,
        }
    }
}

impl From<ApiEntry> for LeaderboardRow {
    fn from(entry: ApiEntry) -> Self {
        Self {
            id: None,
            season: Season::LIVE,
            rank: entry.rank,
            username: entry.name().to_string(),
            handle: format!("@{}", entry.username),
            mindshare: entry.mindshare,
            avatar_url: avatar_url(&entry.username),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardResponse {
    /// Echoes the requested tag, even when unknown
    pub season: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<Timeframe>,
    pub count: usize,
    pub last_updated: Option<DateTime<Utc>>,
    pub data: Vec<LeaderboardRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl LeaderboardResponse {
    fn new(season: String, data: Vec<LeaderboardRow>, last_updated: Option<DateTime<Utc>>) -> Self {
        Self {
            season,
            range: None,
            count: data.len(),
            last_updated,
            data,
            message: None,
        }
    }
}

pub async fn get_leaderboard(
    State(state): State<AppState>,
    Path(season_tag): Path<String>,
    Query(params): Query<LeaderboardParams>,
) -> Result<Json<LeaderboardResponse>, ApiError> {
    let Ok(season) = season_tag.parse::<Season>() else {
        debug!("Unknown season requested: {}", season_tag);
        let message = format!("Season {} not found.", season_tag);
        let mut response = LeaderboardResponse::new(season_tag, Vec::new(), None);
        response.message = Some(message);
        return Ok(Json(response));
    };

    if season.is_live() {
        let timeframe = Timeframe::from_range(params.range.as_deref());
        let live = state
            .client
            .fetch_all(timeframe, state.client.max_pages())
            .await;

        let data = live.into_iter().map(LeaderboardRow::from).collect();
        let mut response = LeaderboardResponse::new(season_tag, data, Some(Utc::now()));
        response.range = Some(timeframe);
        return Ok(Json(response));
    }

    let batch = state
        .store
        .latest(season)
        .map_err(|e| ApiError::internal("Failed to fetch leaderboard data", e))?;

    let last_updated = batch.first().map(|e| e.scraped_at);
    let data = batch.into_iter().map(LeaderboardRow::from).collect();

    Ok(Json(LeaderboardResponse::new(season_tag, data, last_updated)))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{get_json, setup_test_state};
    use crate::api::build_router;
    use crate::fetch::testing::{api_entry, filler_page, PageScript, ScriptedSource};
    use crate::models::{MindshareUnit, NewEntry, Season, Timeframe};
    use axum::http::StatusCode;
    use chrono::{Duration, TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn new_entry(rank: u32, handle: &str) -> NewEntry {
        NewEntry {
            rank,
            username: format!("Creator {}", rank),
            handle: handle.to_string(),
            mindshare: 1000.0 / rank as f64,
            mindshare_unit: MindshareUnit::PrizeUsd,
        }
    }

    #[tokio::test]
    async fn test_historical_season_latest_batch_by_rank() {
        let tmp = tempfile::tempdir().unwrap();
        let state = setup_test_state(tmp.path(), Arc::new(ScriptedSource::new()));
        let t0 = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();

        state
            .store
            .save_batch_at(
                Season::S1,
                vec![
                    new_entry(2, "@second"),
                    new_entry(1, "@first"),
                    new_entry(3, "@third"),
                ],
                t0,
            )
            .unwrap();
        state
            .store
            .save_batch_at(Season::S2, vec![new_entry(1, "@other")], t0 + Duration::hours(1))
            .unwrap();

        let app = build_router(state);
        let (status, json) = get_json(app, "/api/leaderboard/s1").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["season"], "s1");
        assert_eq!(json["count"], 3);
        let ranks: Vec<u64> = json["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|row| row["rank"].as_u64().unwrap())
            .collect();
        assert_eq!(ranks, vec![1, 2, 3]);
        assert_eq!(json["data"][0]["handle"], "@first");
        assert_eq!(
            json["data"][0]["avatarUrl"],
            "https://unavatar.io/twitter/first"
        );
        assert!(json["data"][0]["id"].is_string());
        assert!(json["lastUpdated"].is_string());
        assert!(json.get("range").is_none());
    }

    #[tokio::test]
    async fn test_older_batches_hidden() {
        let tmp = tempfile::tempdir().unwrap();
        let state = setup_test_state(tmp.path(), Arc::new(ScriptedSource::new()));
        let t0 = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();

        state
            .store
            .save_batch_at(Season::S3, vec![new_entry(1, "@old"), new_entry(2, "@older")], t0)
            .unwrap();
        state
            .store
            .save_batch_at(Season::S3, vec![new_entry(1, "@new")], t0 + Duration::days(1))
            .unwrap();

        let (_, json) = get_json(build_router(state), "/api/leaderboard/s3").await;

        assert_eq!(json["count"], 1);
        assert_eq!(json["data"][0]["handle"], "@new");
    }

    #[tokio::test]
    async fn test_empty_historical_season() {
        let tmp = tempfile::tempdir().unwrap();
        let state = setup_test_state(tmp.path(), Arc::new(ScriptedSource::new()));

        let (status, json) = get_json(build_router(state), "/api/leaderboard/S4").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["count"], 0);
        assert!(json["lastUpdated"].is_null());
    }

    #[tokio::test]
    async fn test_unknown_season_is_ok_with_message() {
        let tmp = tempfile::tempdir().unwrap();
        let source = Arc::new(ScriptedSource::new());
        let state = setup_test_state(tmp.path(), source.clone());

        let (status, json) = get_json(build_router(state), "/api/leaderboard/s9").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["season"], "s9");
        assert_eq!(json["count"], 0);
        assert_eq!(json["data"], serde_json::json!([]));
        assert!(json["message"].as_str().unwrap().contains("s9"));
        assert_eq!(source.requests(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_line_keeps_valid_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let state = setup_test_state(tmp.path(), Arc::new(ScriptedSource::new()));
        state
            .store
            .save_batch(Season::S1, vec![new_entry(1, "@kept")])
            .unwrap();

        let path = tmp.path().join("leaderboard/s1/entries.jsonl");
        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        std::io::Write::write_all(&mut file, b"\xff\xfe garbage\n").unwrap();

        let (status, json) = get_json(build_router(state), "/api/leaderboard/s1").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["count"], 1);
        assert_eq!(json["data"][0]["handle"], "@kept");
    }

    #[tokio::test]
    async fn test_store_failure_is_generic_500() {
        let tmp = tempfile::tempdir().unwrap();
        let state = setup_test_state(tmp.path(), Arc::new(ScriptedSource::new()));
        std::fs::create_dir_all(tmp.path().join("leaderboard/s2/entries.jsonl")).unwrap();

        let (status, json) = get_json(build_router(state), "/api/leaderboard/s2").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Failed to fetch leaderboard data");
    }

    #[tokio::test]
    async fn test_live_season_uses_range() {
        let tmp = tempfile::tempdir().unwrap();
        let source = ScriptedSource::new();
        source.set_pages(
            Timeframe::Week,
            vec![PageScript::Rows(vec![
                api_entry(1, "alice", "Alice A"),
                api_entry(2, "bob", ""),
            ])],
        );
        source.set_pages(Timeframe::Month, vec![filler_page(1, 5)]);
        let state = setup_test_state(tmp.path(), Arc::new(source));

        let (status, json) = get_json(build_router(state), "/api/leaderboard/s5?range=7d").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["range"], "7d");
        assert_eq!(json["count"], 2);
        assert_eq!(json["data"][0]["username"], "Alice A");
        assert_eq!(json["data"][0]["handle"], "@alice");
        assert!(json["data"][0]["id"].is_null());
        assert_eq!(json["data"][1]["username"], "bob");
        assert!(json["lastUpdated"].is_string());
    }

    #[tokio::test]
    async fn test_live_season_bad_range_defaults_to_30d() {
        let tmp = tempfile::tempdir().unwrap();
        let source = ScriptedSource::new();
        source.set_pages(Timeframe::Month, vec![filler_page(1, 5)]);
        let state = setup_test_state(tmp.path(), Arc::new(source));

        let (_, json) = get_json(build_router(state), "/api/leaderboard/s5?range=1y").await;

        assert_eq!(json["range"], "30d");
        assert_eq!(json["count"], 5);
    }
}
