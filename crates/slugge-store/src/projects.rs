use chrono::Utc;
use rusqlite::OptionalExtension;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use slugge_core::ids::ProjectId;

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers::get;

const TABLE: &str = "projects";
const COLUMNS: &str = "id, name, slug, privacy, default_language, default_model, budget_cap, cost, status, created_at, updated_at";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectRow {
    pub id: ProjectId,
    pub name: String,
    pub slug: String,
    pub privacy: String,
    pub default_language: String,
    pub default_model: String,
    pub budget_cap: f64,
    pub cost: f64,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

/// A project plus the number of documents it owns.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectSummary {
    pub project: ProjectRow,
    pub document_count: u64,
}

/// Fields accepted when creating a project; `None` falls back to defaults.
#[derive(Clone, Debug, Default)]
pub struct NewProject {
    pub name: String,
    pub slug: Option<String>,
    pub privacy: Option<String>,
    pub default_language: Option<String>,
    pub default_model: Option<String>,
    pub budget_cap: Option<f64>,
}

pub struct ProjectRepo {
    db: Database,
}

impl ProjectRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create a project. The id is the lower-cased slug when given, a short
    /// random id otherwise; a colliding id gets a random suffix.
    #[instrument(skip(self, new), fields(name = %new.name))]
    pub fn create(&self, new: NewProject) -> Result<ProjectRow, StoreError> {
        let base = new
            .slug
            .as_deref()
            .map(ProjectId::from_slug)
            .filter(|id| !id.as_str().is_empty())
            .unwrap_or_else(ProjectId::short);
        let now = Utc::now().to_rfc3339();

        self.db.with_tx(|tx| {
            let taken: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM projects WHERE id = ?1 OR slug = ?1)",
                [base.as_str()],
                |row| row.get(0),
            )?;
            let id = if taken { base.with_suffix() } else { base };

            let row = ProjectRow {
                slug: id.as_str().to_owned(),
                id,
                name: new.name.trim().to_owned(),
                privacy: new.privacy.unwrap_or_else(|| "org".into()),
                default_language: new.default_language.unwrap_or_else(|| "en".into()),
                default_model: new.default_model.unwrap_or_else(|| "OpenAI".into()),
                budget_cap: new.budget_cap.unwrap_or(0.0),
                cost: 0.0,
                status: "Active".into(),
                created_at: now.clone(),
                updated_at: now,
            };

            tx.execute(
                &format!("INSERT INTO projects ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"),
                rusqlite::params![
                    row.id.as_str(),
                    row.name,
                    row.slug,
                    row.privacy,
                    row.default_language,
                    row.default_model,
                    row.budget_cap,
                    row.cost,
                    row.status,
                    row.created_at,
                    row.updated_at,
                ],
            )?;
            Ok(row)
        })
    }

    /// Get a project by ID.
    #[instrument(skip(self), fields(project_id = %id))]
    pub fn get(&self, id: &ProjectId) -> Result<ProjectRow, StoreError> {
        self.find(id)?
            .ok_or_else(|| StoreError::NotFound(format!("project {id}")))
    }

    /// Look up a project, returning `None` when absent.
    pub fn find(&self, id: &ProjectId) -> Result<Option<ProjectRow>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM projects WHERE id = ?1"))?;
            let mut rows = stmt.query([id.as_str()])?;
            match rows.next()? {
                Some(row) => row_to_project(row).map(Some),
                None => Ok(None),
            }
        })
    }

    pub fn exists(&self, id: &ProjectId) -> Result<bool, StoreError> {
        self.db.with_conn(|conn| {
            let found = conn
                .query_row("SELECT 1 FROM projects WHERE id = ?1", [id.as_str()], |_| Ok(()))
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// List all projects with their document counts, newest first.
    #[instrument(skip(self))]
    pub fn list(&self) -> Result<Vec<ProjectSummary>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.id, p.name, p.slug, p.privacy, p.default_language, p.default_model,
                        p.budget_cap, p.cost, p.status, p.created_at, p.updated_at,
                        (SELECT COUNT(*) FROM documents d WHERE d.project_id = p.id)
                 FROM projects p
                 ORDER BY p.created_at DESC, p.rowid DESC",
            )?;
            let mut rows = stmt.query([])?;
            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                let count: i64 = get(row, 11, TABLE, "document_count")?;
                out.push(ProjectSummary {
                    project: row_to_project(row)?,
                    document_count: count.max(0) as u64,
                });
            }
            Ok(out)
        })
    }

    /// Delete a project and, through cascading keys, everything it owns.
    #[instrument(skip(self), fields(project_id = %id))]
    pub fn delete(&self, id: &ProjectId) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM projects WHERE id = ?1", [id.as_str()])?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!("project {id}")));
            }
            Ok(())
        })
    }
}

fn row_to_project(row: &rusqlite::Row<'_>) -> Result<ProjectRow, StoreError> {
    Ok(ProjectRow {
        id: ProjectId::from_raw(get::<String>(row, 0, TABLE, "id")?),
        name: get(row, 1, TABLE, "name")?,
        slug: get(row, 2, TABLE, "slug")?,
        privacy: get(row, 3, TABLE, "privacy")?,
        default_language: get(row, 4, TABLE, "default_language")?,
        default_model: get(row, 5, TABLE, "default_model")?,
        budget_cap: get(row, 6, TABLE, "budget_cap")?,
        cost: get(row, 7, TABLE, "cost")?,
        status: get(row, 8, TABLE, "status")?,
        created_at: get(row, 9, TABLE, "created_at")?,
        updated_at: get(row, 10, TABLE, "updated_at")?,
    })
}
