use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{Map, Value};

use slugge_core::ids::{ProjectId, SnapshotId};
use slugge_store::projects::ProjectRepo;
use slugge_store::snapshots::{SnapshotRepo, SnapshotRow, SnapshotSummary};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateSnapshotRequest {
    /// Board contents; must be a JSON object.
    pub snapshot: Map<String, Value>,
}

pub async fn create(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    Json(body): Json<CreateSnapshotRequest>,
) -> Result<Json<SnapshotRow>, ApiError> {
    let project_id = ProjectId::from_raw(project_id);
    if !ProjectRepo::new(state.db.clone()).exists(&project_id)? {
        return Err(ApiError::project_not_found());
    }
    let row = SnapshotRepo::new(state.db.clone())
        .create(&project_id, &Value::Object(body.snapshot))?;
    tracing::info!(project_id = %project_id, version = row.version, "board snapshot saved");
    Ok(Json(row))
}

pub async fn list(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<Vec<SnapshotSummary>>, ApiError> {
    let rows = SnapshotRepo::new(state.db.clone()).list(&ProjectId::from_raw(project_id))?;
    Ok(Json(rows))
}

pub async fn get(
    State(state): State<AppState>,
    Path((project_id, snapshot_id)): Path<(String, String)>,
) -> Result<Json<SnapshotRow>, ApiError> {
    SnapshotRepo::new(state.db.clone())
        .get(
            &ProjectId::from_raw(project_id),
            &SnapshotId::from_raw(snapshot_id),
        )
        .map(Json)
        .map_err(|e| match e {
            e if e.is_not_found() => ApiError::NotFound("Snapshot not found".into()),
            other => other.into(),
        })
}
