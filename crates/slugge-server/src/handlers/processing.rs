use axum::extract::{Path, State};
use axum::Json;

use slugge_core::ids::ProjectId;
use slugge_core::processing::ProcessingStatus;

use crate::error::ApiError;
use crate::state::AppState;

pub async fn start(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<ProcessingStatus>, ApiError> {
    let status = state.tracker.start(&ProjectId::from_raw(project_id))?;
    Ok(Json(status))
}

/// Never fails; unknown projects report `Idle`.
pub async fn status(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Json<ProcessingStatus> {
    Json(state.tracker.status(&ProjectId::from_raw(project_id)))
}
