pub mod health;
pub mod leaderboard;
pub mod scraper;
pub mod search;
pub mod suggestions;

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::util::ServiceExt;

    use crate::api::state::AppState;
    use crate::fetch::testing::ScriptedSource;
    use crate::fetch::LeaderboardClient;
    use crate::models::{Season, Timeframe};
    use crate::scheduler::{Scheduler, SnapshotSource};
    use crate::storage::{LeaderboardStore, StorageConfig};

    pub fn setup_test_state(dir: &std::path::Path, source: Arc<ScriptedSource>) -> AppState {
        let store = Arc::new(LeaderboardStore::new(StorageConfig::new(dir.to_path_buf())));
        let client = LeaderboardClient::new(source);
        let scheduler = Arc::new(Scheduler::new(
            store.clone(),
            SnapshotSource::Api {
                client: client.clone(),
                timeframe: Timeframe::Month,
            },
            Season::LIVE,
            Duration::from_secs(3600),
        ));

        AppState {
            store,
            client,
            scheduler,
            cors_origin: "*".to_string(),
        }
    }

    pub async fn get_json(app: axum::Router, uri: &str) -> (StatusCode, Value) {
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    pub async fn post_json(app: axum::Router, uri: &str) -> (StatusCode, Value) {
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }
}
