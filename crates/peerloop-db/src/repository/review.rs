//! SurrealDB implementation of [`ReviewRepository`].
//!
//! `insert_pairings` is the write path with the strongest contract:
//! every row of an assignment's pairing set lands in one transaction,
//! and the unique (assignment_id, reviewer_id, target_id) index turns
//! a conflicting re-run into a wholesale rollback instead of a
//! duplicate or partial row set.

use chrono::{DateTime, Utc};
use peerloop_core::error::PeerloopResult;
use peerloop_core::models::review::{NewReview, Review};
use peerloop_core::repository::ReviewRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct ReviewRow {
    assignment_id: String,
    group_id: String,
    reviewer_id: String,
    target_id: String,
    ratings: Vec<i64>,
    comment: Option<String>,
    completed: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn row_to_review(row: ReviewRow, id: Uuid) -> Result<Review, DbError> {
    let assignment_id = Uuid::parse_str(&row.assignment_id)
        .map_err(|e| DbError::Migration(format!("invalid assignment UUID: {e}")))?;
    let group_id = Uuid::parse_str(&row.group_id)
        .map_err(|e| DbError::Migration(format!("invalid group UUID: {e}")))?;
    let reviewer_id = Uuid::parse_str(&row.reviewer_id)
        .map_err(|e| DbError::Migration(format!("invalid reviewer UUID: {e}")))?;
    let target_id = Uuid::parse_str(&row.target_id)
        .map_err(|e| DbError::Migration(format!("invalid target UUID: {e}")))?;
    Ok(Review {
        id,
        assignment_id,
        group_id,
        reviewer_id,
        target_id,
        ratings: row.ratings,
        comment: row.comment,
        completed: row.completed,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct ReviewRowWithId {
    record_id: String,
    assignment_id: String,
    group_id: String,
    reviewer_id: String,
    target_id: String,
    ratings: Vec<i64>,
    comment: Option<String>,
    completed: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ReviewRowWithId {
    fn try_into_review(self) -> Result<Review, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Migration(format!("invalid UUID: {e}")))?;
        row_to_review(
            ReviewRow {
                assignment_id: self.assignment_id,
                group_id: self.group_id,
                reviewer_id: self.reviewer_id,
                target_id: self.target_id,
                ratings: self.ratings,
                comment: self.comment,
                completed: self.completed,
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

/// SurrealDB implementation of the Review repository.
#[derive(Clone)]
pub struct SurrealReviewRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealReviewRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn list_where(
        &self,
        condition: &str,
        binds: Vec<(&'static str, String)>,
    ) -> PeerloopResult<Vec<Review>> {
        let query = format!(
            "SELECT meta::id(id) AS record_id, * FROM review \
             WHERE {condition} \
             ORDER BY created_at ASC"
        );

        let mut builder = self.db.query(query);
        for (key, value) in binds {
            builder = builder.bind((key, value));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<ReviewRowWithId> = result.take(0).map_err(DbError::from)?;

        rows.into_iter()
            .map(|row| row.try_into_review().map_err(Into::into))
            .collect()
    }

    async fn count_where(
        &self,
        condition: &str,
        binds: Vec<(&'static str, String)>,
    ) -> PeerloopResult<u64> {
        let query = format!("SELECT count() AS total FROM review WHERE {condition} GROUP ALL");

        let mut builder = self.db.query(query);
        for (key, value) in binds {
            builder = builder.bind((key, value));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }
}

impl<C: Connection> ReviewRepository for SurrealReviewRepository<C> {
    async fn insert_pairings(
        &self,
        assignment_id: Uuid,
        pairings: Vec<NewReview>,
    ) -> PeerloopResult<u64> {
        if pairings.is_empty() {
            return Ok(0);
        }

        // One CREATE per row, all inside a single transaction. A unique
        // index violation on any row aborts the whole statement, so the
        // caller observes either the full pairing set or nothing.
        let mut statements = Vec::with_capacity(pairings.len() + 2);
        statements.push("BEGIN TRANSACTION;".to_string());
        for i in 0..pairings.len() {
            statements.push(format!(
                "CREATE type::record('review', $id_{i}) SET \
                 assignment_id = $assignment_id, \
                 group_id = $group_{i}, \
                 reviewer_id = $reviewer_{i}, \
                 target_id = $target_{i}, \
                 ratings = [], \
                 comment = NONE, \
                 completed = false;"
            ));
        }
        statements.push("COMMIT TRANSACTION;".to_string());

        let mut builder = self
            .db
            .query(statements.join(" "))
            .bind(("assignment_id", assignment_id.to_string()));

        for (i, pairing) in pairings.iter().enumerate() {
            builder = builder
                .bind((format!("id_{i}"), Uuid::new_v4().to_string()))
                .bind((format!("group_{i}"), pairing.group_id.to_string()))
                .bind((format!("reviewer_{i}"), pairing.reviewer_id.to_string()))
                .bind((format!("target_{i}"), pairing.target_id.to_string()));
        }

        builder
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(pairings.len() as u64)
    }

    async fn get_by_id(&self, id: Uuid) -> PeerloopResult<Review> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('review', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ReviewRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "review".into(),
            id: id_str,
        })?;

        row_to_review(row, id).map_err(Into::into)
    }

    async fn get_by_key(
        &self,
        assignment_id: Uuid,
        reviewer_id: Uuid,
        target_id: Uuid,
    ) -> PeerloopResult<Review> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM review \
                 WHERE assignment_id = $assignment_id \
                 AND reviewer_id = $reviewer_id \
                 AND target_id = $target_id",
            )
            .bind(("assignment_id", assignment_id.to_string()))
            .bind(("reviewer_id", reviewer_id.to_string()))
            .bind(("target_id", target_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ReviewRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "review".into(),
            id: format!("assignment={assignment_id} reviewer={reviewer_id} target={target_id}"),
        })?;

        row.try_into_review().map_err(Into::into)
    }

    async fn complete(
        &self,
        id: Uuid,
        ratings: Vec<i64>,
        comment: Option<String>,
    ) -> PeerloopResult<Review> {
        let id_str = id.to_string();

        // Single UPDATE: ratings, comment, and the completed flag land
        // atomically, with no read-modify-write window.
        let result = self
            .db
            .query(
                "UPDATE type::record('review', $id) SET \
                 ratings = $ratings, \
                 comment = $comment, \
                 completed = true, \
                 updated_at = time::now()",
            )
            .bind(("id", id_str.clone()))
            .bind(("ratings", ratings))
            .bind(("comment", comment))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<ReviewRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "review".into(),
            id: id_str,
        })?;

        row_to_review(row, id).map_err(Into::into)
    }

    async fn list_by_assignment(&self, assignment_id: Uuid) -> PeerloopResult<Vec<Review>> {
        self.list_where(
            "assignment_id = $assignment_id",
            vec![("assignment_id", assignment_id.to_string())],
        )
        .await
    }

    async fn list_by_reviewer(
        &self,
        assignment_id: Uuid,
        reviewer_id: Uuid,
    ) -> PeerloopResult<Vec<Review>> {
        self.list_where(
            "assignment_id = $assignment_id AND reviewer_id = $reviewer_id",
            vec![
                ("assignment_id", assignment_id.to_string()),
                ("reviewer_id", reviewer_id.to_string()),
            ],
        )
        .await
    }

    async fn list_for_target(
        &self,
        assignment_id: Uuid,
        target_id: Uuid,
    ) -> PeerloopResult<Vec<Review>> {
        self.list_where(
            "assignment_id = $assignment_id AND target_id = $target_id",
            vec![
                ("assignment_id", assignment_id.to_string()),
                ("target_id", target_id.to_string()),
            ],
        )
        .await
    }

    async fn count_by_assignment(&self, assignment_id: Uuid) -> PeerloopResult<u64> {
        self.count_where(
            "assignment_id = $assignment_id",
            vec![("assignment_id", assignment_id.to_string())],
        )
        .await
    }

    async fn count_completed(&self, assignment_id: Uuid) -> PeerloopResult<u64> {
        self.count_where(
            "assignment_id = $assignment_id AND completed = true",
            vec![("assignment_id", assignment_id.to_string())],
        )
        .await
    }

    async fn delete_by_assignment(&self, assignment_id: Uuid) -> PeerloopResult<()> {
        self.db
            .query("DELETE review WHERE assignment_id = $assignment_id")
            .bind(("assignment_id", assignment_id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }
}
