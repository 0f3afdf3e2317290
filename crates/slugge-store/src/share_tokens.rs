use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use slugge_core::ids::{new_share_token, ProjectId};

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers::{get, parse_timestamp};

const TABLE: &str = "share_tokens";

/// Share links stay valid for this long unless revoked.
pub const DEFAULT_TOKEN_TTL_DAYS: i64 = 30;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShareTokenRow {
    pub token: String,
    pub project_id: ProjectId,
    pub created_at: String,
    pub expires_at: Option<String>,
    pub revoked: bool,
}

pub struct ShareTokenRepo {
    db: Database,
}

impl ShareTokenRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Mint a fresh token for a project.
    #[instrument(skip(self), fields(project_id = %project_id))]
    pub fn mint(&self, project_id: &ProjectId, ttl: Duration) -> Result<ShareTokenRow, StoreError> {
        let now = Utc::now();
        let row = ShareTokenRow {
            token: new_share_token(),
            project_id: project_id.clone(),
            created_at: now.to_rfc3339(),
            expires_at: Some((now + ttl).to_rfc3339()),
            revoked: false,
        };

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO share_tokens (token, project_id, created_at, expires_at, revoked, updated_at)
                 VALUES (?1, ?2, ?3, ?4, 0, ?3)",
                rusqlite::params![row.token, row.project_id.as_str(), row.created_at, row.expires_at],
            )?;
            Ok(())
        })?;
        Ok(row)
    }

    /// Resolve a token to its project if it is neither revoked nor expired at `now`.
    #[instrument(skip(self, token))]
    pub fn resolve(&self, token: &str, now: DateTime<Utc>) -> Result<ProjectId, StoreError> {
        let row = self.get(token)?;
        if row.revoked {
            return Err(StoreError::NotFound("share token".into()));
        }
        if let Some(expires_at) = &row.expires_at {
            if parse_timestamp(expires_at, TABLE, "expires_at")? <= now {
                return Err(StoreError::NotFound("share token".into()));
            }
        }
        Ok(row.project_id)
    }

    pub fn get(&self, token: &str) -> Result<ShareTokenRow, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT token, project_id, created_at, expires_at, revoked FROM share_tokens WHERE token = ?1",
            )?;
            let mut rows = stmt.query([token])?;
            let Some(row) = rows.next()? else {
                return Err(StoreError::NotFound("share token".into()));
            };
            Ok(ShareTokenRow {
                token: get(row, 0, TABLE, "token")?,
                project_id: ProjectId::from_raw(get::<String>(row, 1, TABLE, "project_id")?),
                created_at: get(row, 2, TABLE, "created_at")?,
                expires_at: get(row, 3, TABLE, "expires_at")?,
                revoked: get(row, 4, TABLE, "revoked")?,
            })
        })
    }

    /// Revoke a token. Revoking twice is not an error.
    #[instrument(skip(self, token))]
    pub fn revoke(&self, token: &str) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();
        self.db.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE share_tokens SET revoked = 1, updated_at = ?2 WHERE token = ?1",
                [token, now.as_str()],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound("share token".into()));
            }
            Ok(())
        })
    }
}
