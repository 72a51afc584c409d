//! Submission validation — the pending → completed state machine.

use chrono::Utc;
use peerloop_core::error::PeerloopResult;
use peerloop_core::repository::{AssignmentRepository, ReviewRepository};
use tracing::info;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::EngineError;

/// Input for submitting one review.
#[derive(Debug, Clone)]
pub struct SubmitReview {
    pub assignment_id: Uuid,
    pub reviewer_id: Uuid,
    pub target_id: Uuid,
    /// Positionally aligned to the assignment's questions.
    pub ratings: Vec<i64>,
    pub comment: Option<String>,
}

/// Submission validation service.
///
/// A review moves pending → completed exactly once; re-submission of a
/// completed review is treated as an edit and overwrites the previous
/// ratings (last writer wins — only the assigned reviewer can ever
/// reach the row).
pub struct SubmissionService<A, R>
where
    A: AssignmentRepository,
    R: ReviewRepository,
{
    assignments: A,
    reviews: R,
    config: EngineConfig,
}

impl<A, R> SubmissionService<A, R>
where
    A: AssignmentRepository,
    R: ReviewRepository,
{
    pub fn new(assignments: A, reviews: R, config: EngineConfig) -> Self {
        Self {
            assignments,
            reviews,
            config,
        }
    }

    /// Validate and commit a rating vector for one generated pairing.
    /// Returns the review id.
    pub async fn submit(&self, caller_id: Uuid, input: SubmitReview) -> PeerloopResult<Uuid> {
        // 1. Only generated pairings can be rated; a missing row means
        //    the caller was never assigned this target.
        let review = self
            .reviews
            .get_by_key(input.assignment_id, input.reviewer_id, input.target_id)
            .await?;

        // 2. The caller must be the assigned reviewer.
        if caller_id != review.reviewer_id {
            return Err(EngineError::NotAssignedReviewer.into());
        }

        // 3. The assignment's window must contain now.
        let assignment = self.assignments.get_by_id(input.assignment_id).await?;
        if !assignment.is_open_for_submission(Utc::now()) {
            return Err(EngineError::WindowNotOpen.into());
        }

        // 4. The rating vector must match the question schema, every
        //    value inside the configured bounds. Out-of-range values
        //    are rejected, never clamped.
        if input.ratings.len() != assignment.questions.len() {
            return Err(EngineError::RatingCountMismatch {
                expected: assignment.questions.len(),
                actual: input.ratings.len(),
            }
            .into());
        }
        for &value in &input.ratings {
            if value < self.config.min_rating || value > self.config.max_rating {
                return Err(EngineError::RatingOutOfRange {
                    value,
                    min: self.config.min_rating,
                    max: self.config.max_rating,
                }
                .into());
            }
        }

        // 5. Commit in a single atomic update.
        let completed = self
            .reviews
            .complete(review.id, input.ratings, input.comment)
            .await?;

        info!(
            review_id = %completed.id,
            assignment_id = %completed.assignment_id,
            reviewer_id = %completed.reviewer_id,
            target_id = %completed.target_id,
            "Review submitted"
        );

        Ok(completed.id)
    }
}
