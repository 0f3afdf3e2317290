//! Public share links.

use axum::extract::{Path, State};
use axum::Json;
use chrono::{Duration, Utc};
use serde::Serialize;

use slugge_core::ids::ProjectId;
use slugge_store::projects::{ProjectRepo, ProjectRow};
use slugge_store::share_tokens::ShareTokenRepo;
use slugge_store::StoreError;

use crate::error::ApiError;
use crate::handlers::Ack;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ShareLink {
    pub url: String,
}

fn token_not_found(e: StoreError) -> ApiError {
    if e.is_not_found() {
        ApiError::NotFound("Share token not found".into())
    } else {
        e.into()
    }
}

pub async fn mint(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<ShareLink>, ApiError> {
    let project_id = ProjectId::from_raw(project_id);
    if !ProjectRepo::new(state.db.clone()).exists(&project_id)? {
        return Err(ApiError::project_not_found());
    }
    let ttl = Duration::days(state.config.share_token_ttl_days);
    let row = ShareTokenRepo::new(state.db.clone()).mint(&project_id, ttl)?;
    tracing::info!(project_id = %project_id, "share link minted");
    Ok(Json(ShareLink {
        url: state.config.share_url(&row.token),
    }))
}

/// Read-only project view for a valid token.
pub async fn resolve(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<ProjectRow>, ApiError> {
    let project_id = ShareTokenRepo::new(state.db.clone())
        .resolve(&token, Utc::now())
        .map_err(token_not_found)?;
    ProjectRepo::new(state.db.clone())
        .find(&project_id)?
        .map(Json)
        .ok_or_else(ApiError::project_not_found)
}

pub async fn revoke(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<Ack>, ApiError> {
    ShareTokenRepo::new(state.db.clone())
        .revoke(&token)
        .map_err(token_not_found)?;
    Ok(Json(Ack::ok()))
}
