//! SurrealDB implementation of [`AssignmentRepository`].

use chrono::{DateTime, Utc};
use peerloop_core::error::PeerloopResult;
use peerloop_core::models::assignment::{
    CreateReviewAssignment, ReviewAssignment, UpdateReviewAssignment,
};
use peerloop_core::repository::{AssignmentRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct AssignmentRow {
    workspace_id: String,
    description: String,
    questions: Vec<String>,
    start_date: DateTime<Utc>,
    due_date: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn row_to_assignment(row: AssignmentRow, id: Uuid) -> Result<ReviewAssignment, DbError> {
    let workspace_id = Uuid::parse_str(&row.workspace_id)
        .map_err(|e| DbError::Migration(format!("invalid workspace UUID: {e}")))?;
    Ok(ReviewAssignment {
        id,
        workspace_id,
        description: row.description,
        questions: row.questions,
        start_date: row.start_date,
        due_date: row.due_date,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct AssignmentRowWithId {
    record_id: String,
    workspace_id: String,
    description: String,
    questions: Vec<String>,
    start_date: DateTime<Utc>,
    due_date: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AssignmentRowWithId {
    fn try_into_assignment(self) -> Result<ReviewAssignment, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Migration(format!("invalid UUID: {e}")))?;
        row_to_assignment(
            AssignmentRow {
                workspace_id: self.workspace_id,
                description: self.description,
                questions: self.questions,
                start_date: self.start_date,
                due_date: self.due_date,
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
            id,
        )
    }
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the ReviewAssignment repository.
#[derive(Clone)]
pub struct SurrealAssignmentRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAssignmentRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> AssignmentRepository for SurrealAssignmentRepository<C> {
    async fn create(&self, input: CreateReviewAssignment) -> PeerloopResult<ReviewAssignment> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('review_assignment', $id) SET \
                 workspace_id = $workspace_id, \
                 description = $description, \
                 questions = $questions, \
                 start_date = $start_date, \
                 due_date = $due_date",
            )
            .bind(("id", id_str.clone()))
            .bind(("workspace_id", input.workspace_id.to_string()))
            .bind(("description", input.description.unwrap_or_default()))
            .bind(("questions", input.questions))
            .bind(("start_date", input.start_date))
            .bind(("due_date", input.due_date))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<AssignmentRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "review_assignment".into(),
            id: id_str,
        })?;

        row_to_assignment(row, id).map_err(Into::into)
    }

    async fn get_by_id(&self, id: Uuid) -> PeerloopResult<ReviewAssignment> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('review_assignment', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AssignmentRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "review_assignment".into(),
            id: id_str,
        })?;

        row_to_assignment(row, id).map_err(Into::into)
    }

    async fn update(
        &self,
        id: Uuid,
        input: UpdateReviewAssignment,
    ) -> PeerloopResult<ReviewAssignment> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.description.is_some() {
            sets.push("description = $description");
        }
        if input.questions.is_some() {
            sets.push("questions = $questions");
        }
        if input.start_date.is_some() {
            sets.push("start_date = $start_date");
        }
        if input.due_date.is_some() {
            sets.push("due_date = $due_date");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('review_assignment', $id) SET {}",
            sets.join(", ")
        );

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(description) = input.description {
            builder = builder.bind(("description", description));
        }
        if let Some(questions) = input.questions {
            builder = builder.bind(("questions", questions));
        }
        if let Some(start_date) = input.start_date {
            builder = builder.bind(("start_date", start_date));
        }
        if let Some(due_date) = input.due_date {
            builder = builder.bind(("due_date", due_date));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<AssignmentRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "review_assignment".into(),
            id: id_str,
        })?;

        row_to_assignment(row, id).map_err(Into::into)
    }

    async fn delete(&self, id: Uuid) -> PeerloopResult<()> {
        self.db
            .query("DELETE type::record('review_assignment', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn list(
        &self,
        workspace_id: Uuid,
        pagination: Pagination,
    ) -> PeerloopResult<PaginatedResult<ReviewAssignment>> {
        let workspace_id_str = workspace_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM review_assignment \
                 WHERE workspace_id = $workspace_id GROUP ALL",
            )
            .bind(("workspace_id", workspace_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM review_assignment \
                 WHERE workspace_id = $workspace_id \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("workspace_id", workspace_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AssignmentRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_assignment())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn list_by_due_date(&self, workspace_id: Uuid) -> PeerloopResult<Vec<ReviewAssignment>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM review_assignment \
                 WHERE workspace_id = $workspace_id \
                 ORDER BY due_date ASC",
            )
            .bind(("workspace_id", workspace_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AssignmentRowWithId> = result.take(0).map_err(DbError::from)?;

        rows.into_iter()
            .map(|row| row.try_into_assignment().map_err(Into::into))
            .collect()
    }
}
