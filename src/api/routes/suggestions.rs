use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::api::state::AppState;
use crate::search::{suggest, Suggestion};

#[derive(Debug, Serialize)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<Suggestion>,
}

pub async fn suggestions(
    State(state): State<AppState>,
    Path(query): Path<String>,
) -> Json<SuggestionsResponse> {
    let suggestions = suggest(&state.store, &state.client, &query).await;
    Json(SuggestionsResponse { suggestions })
}
