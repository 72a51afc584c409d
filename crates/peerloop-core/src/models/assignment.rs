//! Review assignment domain model.
//!
//! An assignment is one instructor-defined peer-review cycle with a
//! question set and a submission time window.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewAssignment {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub description: String,
    /// Ordered question list. Ratings on a review align positionally
    /// to this list. Always non-empty.
    pub questions: Vec<String>,
    pub start_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReviewAssignment {
    /// True iff `start_date <= now <= due_date`.
    pub fn is_open_for_submission(&self, now: DateTime<Utc>) -> bool {
        self.start_date <= now && now <= self.due_date
    }
}

/// Fields required to create a new review assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReviewAssignment {
    pub workspace_id: Uuid,
    pub description: Option<String>,
    pub questions: Vec<String>,
    pub start_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
}

/// Fields that can be updated on an existing assignment.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateReviewAssignment {
    pub description: Option<String>,
    pub questions: Option<Vec<String>>,
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
}
