//! Review domain model.
//!
//! A review is one directed (reviewer, target) rating task generated
//! from group membership. Reviews are created in bulk by the graph
//! generator and mutated exactly once to `completed = true` by the
//! submission validator (idempotent re-submission allowed).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Uniquely keyed by (assignment_id, reviewer_id, target_id).
/// `reviewer_id != target_id` always holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub assignment_id: Uuid,
    /// Group membership snapshot at generation time.
    pub group_id: Uuid,
    pub reviewer_id: Uuid,
    pub target_id: Uuid,
    /// Positionally aligned to the assignment's questions. Empty while
    /// the review is pending.
    pub ratings: Vec<i64>,
    pub comment: Option<String>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One pending row produced by the review-graph generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReview {
    pub group_id: Uuid,
    pub reviewer_id: Uuid,
    pub target_id: Uuid,
}
