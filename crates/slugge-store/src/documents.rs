use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use slugge_core::ids::{DocumentId, ProjectId};

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers::get;

const TABLE: &str = "documents";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentRow {
    pub id: DocumentId,
    pub project_id: ProjectId,
    pub file_name: String,
    pub size: u64,
    pub status: String,
    /// Decoded text; `None` when the upload was not valid UTF-8.
    #[serde(skip_serializing)]
    pub content: Option<String>,
    pub created_at: String,
}

impl DocumentRow {
    pub fn has_content(&self) -> bool {
        self.content.is_some()
    }
}

pub struct DocumentRepo {
    db: Database,
}

impl DocumentRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Store an uploaded file. Content is kept only if the bytes decode as UTF-8.
    #[instrument(skip(self, bytes), fields(project_id = %project_id, file_name, size = bytes.len()))]
    pub fn create(
        &self,
        project_id: &ProjectId,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<DocumentRow, StoreError> {
        let row = DocumentRow {
            id: DocumentId::new(),
            project_id: project_id.clone(),
            file_name: file_name.to_owned(),
            size: bytes.len() as u64,
            status: "Uploaded".into(),
            content: std::str::from_utf8(bytes).ok().map(str::to_owned),
            created_at: Utc::now().to_rfc3339(),
        };

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO documents (id, project_id, file_name, size, status, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    row.id.as_str(),
                    row.project_id.as_str(),
                    row.file_name,
                    row.size as i64,
                    row.status,
                    row.content,
                    row.created_at,
                ],
            )?;
            Ok(())
        })?;

        if !row.has_content() {
            tracing::debug!(document_id = %row.id, "upload is not UTF-8; stored without content");
        }
        Ok(row)
    }

    /// Documents for a project in insertion order.
    #[instrument(skip(self), fields(project_id = %project_id))]
    pub fn list_for_project(&self, project_id: &ProjectId) -> Result<Vec<DocumentRow>, StoreError> {
        self.query_project(project_id, "ORDER BY rowid ASC")
    }

    /// Documents for a project, newest first.
    #[instrument(skip(self), fields(project_id = %project_id))]
    pub fn list_newest_first(&self, project_id: &ProjectId) -> Result<Vec<DocumentRow>, StoreError> {
        self.query_project(project_id, "ORDER BY created_at DESC, rowid DESC")
    }

    fn query_project(
        &self,
        project_id: &ProjectId,
        order: &str,
    ) -> Result<Vec<DocumentRow>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT id, project_id, file_name, size, status, content, created_at
                 FROM documents WHERE project_id = ?1 {order}"
            ))?;
            let mut rows = stmt.query([project_id.as_str()])?;
            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                out.push(row_to_document(row)?);
            }
            Ok(out)
        })
    }

    /// Delete a document belonging to the given project.
    #[instrument(skip(self), fields(project_id = %project_id, document_id = %id))]
    pub fn delete(&self, project_id: &ProjectId, id: &DocumentId) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM documents WHERE id = ?1 AND project_id = ?2",
                [id.as_str(), project_id.as_str()],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!("document {id}")));
            }
            Ok(())
        })
    }
}

fn row_to_document(row: &rusqlite::Row<'_>) -> Result<DocumentRow, StoreError> {
    let size: i64 = get(row, 3, TABLE, "size")?;
    Ok(DocumentRow {
        id: DocumentId::from_raw(get::<String>(row, 0, TABLE, "id")?),
        project_id: ProjectId::from_raw(get::<String>(row, 1, TABLE, "project_id")?),
        file_name: get(row, 2, TABLE, "file_name")?,
        size: size.max(0) as u64,
        status: get(row, 4, TABLE, "status")?,
        content: get(row, 5, TABLE, "content")?,
        created_at: get(row, 6, TABLE, "created_at")?,
    })
}
