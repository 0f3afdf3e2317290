use axum::extract::{Multipart, Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use slugge_core::ids::{DocumentId, ProjectId};
use slugge_store::documents::{DocumentRepo, DocumentRow};
use slugge_store::projects::ProjectRepo;

use crate::error::ApiError;
use crate::handlers::Ack;
use crate::state::AppState;

/// Multipart field carrying the upload.
const FILE_FIELD: &str = "file";

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentResponse {
    pub id: String,
    pub file_name: String,
    pub size: u64,
    pub status: String,
    pub created_at: String,
}

impl From<DocumentRow> for DocumentResponse {
    fn from(row: DocumentRow) -> Self {
        Self {
            id: row.id.to_string(),
            file_name: row.file_name,
            size: row.size,
            status: row.status,
            created_at: row.created_at,
        }
    }
}

pub async fn upload(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<DocumentResponse>, ApiError> {
    let project_id = ProjectId::from_raw(project_id);
    if !ProjectRepo::new(state.db.clone()).exists(&project_id)? {
        return Err(ApiError::project_not_found());
    }

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_owned();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;

        let doc = DocumentRepo::new(state.db.clone()).create(&project_id, &file_name, &bytes)?;
        info!(project_id = %project_id, document_id = %doc.id, size = doc.size, "document uploaded");
        return Ok(Json(doc.into()));
    }

    Err(ApiError::BadRequest(format!("multipart field '{FILE_FIELD}' required")))
}

pub async fn list(
    State(state): State<AppState>,
    Path(project_id): Path<String>,
) -> Result<Json<Vec<DocumentResponse>>, ApiError> {
    let docs = DocumentRepo::new(state.db.clone())
        .list_newest_first(&ProjectId::from_raw(project_id))?
        .into_iter()
        .map(DocumentResponse::from)
        .collect();
    Ok(Json(docs))
}

pub async fn delete(
    State(state): State<AppState>,
    Path((project_id, document_id)): Path<(String, String)>,
) -> Result<Json<Ack>, ApiError> {
    DocumentRepo::new(state.db.clone())
        .delete(
            &ProjectId::from_raw(project_id),
            &DocumentId::from_raw(document_id),
        )
        .map_err(|e| match e {
            e if e.is_not_found() => ApiError::NotFound("Document not found".into()),
            other => other.into(),
        })?;
    Ok(Json(Ack::ok()))
}
