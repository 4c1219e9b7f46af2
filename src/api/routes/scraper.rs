use axum::extract::State;
use axum::Json;
use serde::Serialize;
use tracing::info;

use crate::api::state::AppState;
use crate::scheduler::SchedulerState;

#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScraperStatus {
    pub busy: bool,
    #[serde(flatten)]
    pub state: SchedulerState,
}

/// Start a scraper run in the background. Refused while one is in flight.
pub async fn trigger(State(state): State<AppState>) -> Json<TriggerResponse> {
    if state.scheduler.is_busy() {
        return Json(TriggerResponse {
            success: false,
            message: "Scraper is already running".to_string(),
        });
    }

    info!("Manual scraper run requested");
    let scheduler = state.scheduler.clone();
    tokio::spawn(async move {
        scheduler.run_once().await;
    });

    Json(TriggerResponse {
        success: true,
        message: "Scraper run started".to_string(),
    })
}

pub async fn status(State(state): State<AppState>) -> Json<ScraperStatus> {
    Json(ScraperStatus {
        busy: state.scheduler.is_busy(),
        state: state.scheduler.state().await,
    })
}
