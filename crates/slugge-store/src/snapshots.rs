use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use slugge_core::ids::{ProjectId, SnapshotId};

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers::{get, parse_json};

const TABLE: &str = "board_snapshots";

/// Listing entry (snapshot body omitted).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotSummary {
    pub id: SnapshotId,
    pub version: u32,
    pub created_at: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRow {
    pub id: SnapshotId,
    pub version: u32,
    pub created_at: String,
    pub snapshot: serde_json::Value,
}

pub struct SnapshotRepo {
    db: Database,
}

impl SnapshotRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Persist a new immutable snapshot as the next version for the project.
    #[instrument(skip(self, snapshot), fields(project_id = %project_id))]
    pub fn create(
        &self,
        project_id: &ProjectId,
        snapshot: &serde_json::Value,
    ) -> Result<SnapshotRow, StoreError> {
        let body = serde_json::to_string(snapshot)?;
        let id = SnapshotId::new();
        let now = Utc::now().to_rfc3339();

        let version = self.db.with_tx(|tx| {
            let latest: u32 = tx.query_row(
                "SELECT COALESCE(MAX(version), 0) FROM board_snapshots WHERE project_id = ?1",
                [project_id.as_str()],
                |row| row.get(0),
            )?;
            let version = latest + 1;
            tx.execute(
                "INSERT INTO board_snapshots (id, project_id, version, snapshot_json, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id.as_str(), project_id.as_str(), version, body, now],
            )?;
            Ok(version)
        })?;

        Ok(SnapshotRow {
            id,
            version,
            created_at: now,
            snapshot: snapshot.clone(),
        })
    }

    /// Snapshots for a project, highest version first.
    #[instrument(skip(self), fields(project_id = %project_id))]
    pub fn list(&self, project_id: &ProjectId) -> Result<Vec<SnapshotSummary>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, version, created_at FROM board_snapshots
                 WHERE project_id = ?1 ORDER BY version DESC",
            )?;
            let mut rows = stmt.query([project_id.as_str()])?;
            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                out.push(SnapshotSummary {
                    id: SnapshotId::from_raw(get::<String>(row, 0, TABLE, "id")?),
                    version: get(row, 1, TABLE, "version")?,
                    created_at: get(row, 2, TABLE, "created_at")?,
                });
            }
            Ok(out)
        })
    }

    #[instrument(skip(self), fields(project_id = %project_id, snapshot_id = %id))]
    pub fn get(&self, project_id: &ProjectId, id: &SnapshotId) -> Result<SnapshotRow, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, version, created_at, snapshot_json FROM board_snapshots
                 WHERE project_id = ?1 AND id = ?2",
            )?;
            let mut rows = stmt.query([project_id.as_str(), id.as_str()])?;
            let Some(row) = rows.next()? else {
                return Err(StoreError::NotFound(format!("snapshot {id}")));
            };
            let raw: String = get(row, 3, TABLE, "snapshot_json")?;
            Ok(SnapshotRow {
                id: SnapshotId::from_raw(get::<String>(row, 0, TABLE, "id")?),
                version: get(row, 1, TABLE, "version")?,
                created_at: get(row, 2, TABLE, "created_at")?,
                snapshot: parse_json(&raw, TABLE, "snapshot_json")?,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projects::{NewProject, ProjectRepo};
    use serde_json::json;

    fn setup() -> (SnapshotRepo, ProjectId) {
        let db = Database::in_memory().unwrap();
        let project = ProjectRepo::new(db.clone())
            .create(NewProject {
                name: "Board".into(),
                slug: Some("board".into()),
                ..Default::default()
            })
            .unwrap();
        (SnapshotRepo::new(db), project.id)
    }

    #[test]
    fn versions_increment_per_project() {
        let (repo, pid) = setup();
        let v1 = repo.create(&pid, &json!({"cards": []})).unwrap();
        let v2 = repo.create(&pid, &json!({"cards": [1]})).unwrap();
        assert_eq!(v1.version, 1);
        assert_eq!(v2.version, 2);
        assert_ne!(v1.id, v2.id);
    }

    #[test]
    fn list_highest_version_first() {
        let (repo, pid) = setup();
        for i in 0..3 {
            repo.create(&pid, &json!({ "i": i })).unwrap();
        }
        let versions: Vec<u32> = repo.list(&pid).unwrap().iter().map(|s| s.version).collect();
        assert_eq!(versions, vec![3, 2, 1]);
    }

    #[test]
    fn get_returns_stored_body() {
        let (repo, pid) = setup();
        let body = json!({"cards": [{"id": "c1", "x": 10}]});
        let created = repo.create(&pid, &body).unwrap();
        let fetched = repo.get(&pid, &created.id).unwrap();
        assert_eq!(fetched.snapshot, body);
        assert_eq!(fetched.version, 1);
    }

    #[test]
    fn get_is_scoped_to_project() {
        let (repo, pid) = setup();
        let created = repo.create(&pid, &json!({})).unwrap();
        let err = repo.get(&ProjectId::from_raw("other"), &created.id).unwrap_err();
        assert!(err.is_not_found());
    }
}
