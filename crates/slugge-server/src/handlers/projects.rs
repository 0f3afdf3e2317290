use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use slugge_core::ids::ProjectId;
use slugge_store::projects::{NewProject, ProjectRepo, ProjectRow, ProjectSummary};

use crate::error::ApiError;
use crate::handlers::Ack;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub slug: Option<String>,
    pub privacy: Option<String>,
    pub default_language: Option<String>,
    pub default_model: Option<String>,
    pub budget_cap: Option<f64>,
    #[serde(default)]
    pub auto_start: bool,
}

/// Row of the project listing.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectListItem {
    pub id: String,
    pub name: String,
    pub status: String,
    pub docs: u64,
    pub cost: String,
    pub updated: String,
}

impl ProjectListItem {
    fn from_summary(summary: ProjectSummary, now: DateTime<Utc>) -> Self {
        let p = summary.project;
        Self {
            updated: time_ago(&p.updated_at, now),
            cost: format!("${:.2}", p.cost),
            id: p.id.to_string(),
            name: p.name,
            status: p.status,
            docs: summary.document_count,
        }
    }
}

/// Coarse relative time for list views.
fn time_ago(timestamp: &str, now: DateTime<Utc>) -> String {
    let Ok(then) = DateTime::parse_from_rfc3339(timestamp) else {
        return "just now".into();
    };
    let secs = (now - then.with_timezone(&Utc)).num_seconds().max(0);
    match secs {
        0..=59 => "just now".into(),
        60..=3_599 => format!("{}m ago", secs / 60),
        3_600..=86_399 => format!("{}h ago", secs / 3_600),
        _ => format!("{}d ago", secs / 86_400),
    }
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<ProjectListItem>>, ApiError> {
    let now = Utc::now();
    let items = ProjectRepo::new(state.db.clone())
        .list()?
        .into_iter()
        .map(|s| ProjectListItem::from_summary(s, now))
        .collect();
    Ok(Json(items))
}

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateProjectRequest>,
) -> Result<Json<ProjectRow>, ApiError> {
    if body.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name required".into()));
    }

    let project = ProjectRepo::new(state.db.clone()).create(NewProject {
        name: body.name,
        slug: body.slug,
        privacy: body.privacy,
        default_language: body.default_language,
        default_model: body.default_model,
        budget_cap: body.budget_cap,
    })?;
    info!(project_id = %project.id, "project created");

    if body.auto_start {
        state.tracker.start(&project.id)?;
    }
    Ok(Json(project))
}

pub async fn get(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<ProjectRow>, ApiError> {
    ProjectRepo::new(state.db.clone())
        .find(&ProjectId::from_raw(project_id))?
        .map(Json)
        .ok_or_else(ApiError::project_not_found)
}

pub async fn delete(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<Ack>, ApiError> {
    let id = ProjectId::from_raw(project_id);
    ProjectRepo::new(state.db.clone())
        .delete(&id)
        .map_err(|e| match e {
            e if e.is_not_found() => ApiError::project_not_found(),
            other => other.into(),
        })?;
    state.tracker.forget(&id);
    info!(project_id = %id, "project deleted");
    Ok(Json(Ack::ok()))
}
