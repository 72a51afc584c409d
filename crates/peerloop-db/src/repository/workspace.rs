//! SurrealDB implementation of [`WorkspaceRepository`].

use chrono::{DateTime, Utc};
use peerloop_core::error::PeerloopResult;
use peerloop_core::models::workspace::{CreateWorkspace, Workspace};
use peerloop_core::repository::{PaginatedResult, Pagination, WorkspaceRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct WorkspaceRow {
    name: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct WorkspaceRowWithId {
    record_id: String,
    name: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl WorkspaceRowWithId {
    fn try_into_workspace(self) -> Result<Workspace, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Migration(format!("invalid UUID: {e}")))?;
        Ok(Workspace {
            id,
            name: self.name,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the Workspace repository.
#[derive(Clone)]
pub struct SurrealWorkspaceRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealWorkspaceRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> WorkspaceRepository for SurrealWorkspaceRepository<C> {
    async fn create(&self, input: CreateWorkspace) -> PeerloopResult<Workspace> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('workspace', $id) SET \
                 name = $name, description = $description",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("description", input.description))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<WorkspaceRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "workspace".into(),
            id: id_str,
        })?;

        Ok(Workspace {
            id,
            name: row.name,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    async fn get_by_id(&self, id: Uuid) -> PeerloopResult<Workspace> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('workspace', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<WorkspaceRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "workspace".into(),
            id: id_str,
        })?;

        Ok(Workspace {
            id,
            name: row.name,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    async fn delete(&self, id: Uuid) -> PeerloopResult<()> {
        let id_str = id.to_string();

        // Remove dependent rows first, then the workspace record.
        let query = format!(
            "DELETE membership WHERE workspace_id = '{id_str}'; \
             DELETE group WHERE workspace_id = '{id_str}'; \
             DELETE type::record('workspace', $id);"
        );

        self.db
            .query(query)
            .bind(("id", id_str))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn list(&self, pagination: Pagination) -> PeerloopResult<PaginatedResult<Workspace>> {
        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM workspace GROUP ALL")
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM workspace \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<WorkspaceRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_workspace())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
