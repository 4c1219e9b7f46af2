use axum::extract::{Path, State};
use axum::Json;

use crate::api::state::AppState;
use crate::api::ApiError;
use crate::search::{search_user, SearchError, SearchReport};

pub async fn search(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<SearchReport>, ApiError> {
    match search_user(&state.store, &state.client, &username).await {
        Ok(report) => Ok(Json(report)),
        Err(e @ SearchError::TermTooShort) => Err(ApiError::BadRequest(e.to_string())),
        Err(e) => Err(ApiError::internal("Failed to search user", e)),
    }
}
