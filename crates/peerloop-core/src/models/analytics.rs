//! Derived analytics rows.
//!
//! These are read-only projections over completed reviews, recomputed
//! at read time. Nothing here is persisted or hand-edited.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A target's mean rating within one assignment, flattened across
/// questions (every individual rating counts once).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetAverage {
    pub target_id: Uuid,
    pub average: f64,
    /// Number of individual ratings the average is taken over.
    pub rating_count: u64,
}

/// A reviewer's progress through their assigned reviews.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionStatus {
    pub reviewer_id: Uuid,
    pub assigned: u64,
    pub completed: u64,
}

impl CompletionStatus {
    pub fn fraction(&self) -> f64 {
        if self.assigned == 0 {
            0.0
        } else {
            self.completed as f64 / self.assigned as f64
        }
    }
}

/// One point of a target's rating trend across a workspace, ordered by
/// assignment due date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub assignment_id: Uuid,
    pub due_date: DateTime<Utc>,
    pub average: f64,
}
