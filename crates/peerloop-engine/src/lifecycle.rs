//! Assignment lifecycle — creation, editing, deletion, and review
//! graph generation.

use chrono::{DateTime, Utc};
use peerloop_core::error::PeerloopResult;
use peerloop_core::models::assignment::{
    CreateReviewAssignment, ReviewAssignment, UpdateReviewAssignment,
};
use peerloop_core::models::review::NewReview;
use peerloop_core::repository::{
    AssignmentRepository, MembershipRepository, ReviewRepository, WorkspaceRepository,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::EngineError;
use crate::pairing::generate_pairs;

fn validate_schema(questions: &[String], start: DateTime<Utc>, due: DateTime<Utc>) -> Result<(), EngineError> {
    if questions.is_empty() {
        return Err(EngineError::EmptyQuestions);
    }
    if let Some(index) = questions.iter().position(|q| q.trim().is_empty()) {
        return Err(EngineError::BlankQuestion { index });
    }
    if due < start {
        return Err(EngineError::DatesInverted);
    }
    Ok(())
}

/// Assignment lifecycle service.
///
/// Generic over repository implementations so the engine has no
/// dependency on the database crate.
pub struct AssignmentService<W, M, A, R>
where
    W: WorkspaceRepository,
    M: MembershipRepository,
    A: AssignmentRepository,
    R: ReviewRepository,
{
    workspaces: W,
    memberships: M,
    assignments: A,
    reviews: R,
}

impl<W, M, A, R> AssignmentService<W, M, A, R>
where
    W: WorkspaceRepository,
    M: MembershipRepository,
    A: AssignmentRepository,
    R: ReviewRepository,
{
    pub fn new(workspaces: W, memberships: M, assignments: A, reviews: R) -> Self {
        Self {
            workspaces,
            memberships,
            assignments,
            reviews,
        }
    }

    /// Create a new review assignment.
    ///
    /// When the start date has already passed the review graph is
    /// generated synchronously before returning; a generation failure
    /// deletes the just-created assignment again so the caller
    /// observes either full success or the original state.
    pub async fn create(&self, input: CreateReviewAssignment) -> PeerloopResult<ReviewAssignment> {
        // 1. Validate the question schema and time window.
        validate_schema(&input.questions, input.start_date, input.due_date)?;

        // 2. The owning workspace must exist.
        self.workspaces.get_by_id(input.workspace_id).await?;

        // 3. Persist the assignment.
        let assignment = self.assignments.create(input).await?;
        info!(
            assignment_id = %assignment.id,
            workspace_id = %assignment.workspace_id,
            "Created review assignment"
        );

        // 4. If the window is already open, expand the review graph
        //    now; otherwise an external trigger calls `generate_for`
        //    once the start date is reached.
        if assignment.start_date <= Utc::now() {
            if let Err(err) = self.generate(&assignment).await {
                warn!(
                    assignment_id = %assignment.id,
                    error = %err,
                    "Generation failed, rolling back assignment creation"
                );
                self.reviews.delete_by_assignment(assignment.id).await?;
                self.assignments.delete(assignment.id).await?;
                return Err(err);
            }
        }

        Ok(assignment)
    }

    /// Entry point for the external scheduling trigger: expand the
    /// review graph of an assignment whose start date has been
    /// reached. Idempotent; a re-run against an already generated
    /// assignment is a no-op.
    pub async fn generate_for(&self, assignment_id: Uuid) -> PeerloopResult<u64> {
        let assignment = self.assignments.get_by_id(assignment_id).await?;

        if Utc::now() < assignment.start_date {
            return Err(EngineError::NotYetOpen.into());
        }

        self.generate(&assignment).await
    }

    /// Expand current group membership into the full pairing set and
    /// insert it in one transaction. Returns the number of rows
    /// inserted (zero when the graph already exists or no group has
    /// two members).
    async fn generate(&self, assignment: &ReviewAssignment) -> PeerloopResult<u64> {
        let groups = self
            .memberships
            .list_groups_with_members(assignment.workspace_id)
            .await?;

        let mut rows = Vec::new();
        for group in &groups {
            for (reviewer_id, target_id) in generate_pairs(&group.member_ids) {
                rows.push(NewReview {
                    group_id: group.group_id,
                    reviewer_id,
                    target_id,
                });
            }
        }

        if rows.is_empty() {
            info!(
                assignment_id = %assignment.id,
                groups = groups.len(),
                "No pairable group members, review graph is empty"
            );
            return Ok(0);
        }

        match self
            .reviews
            .insert_pairings(assignment.id, rows.clone())
            .await
        {
            Ok(inserted) => {
                info!(
                    assignment_id = %assignment.id,
                    groups = groups.len(),
                    reviews = inserted,
                    "Generated review graph"
                );
                Ok(inserted)
            }
            Err(first_err) => {
                // A conflicting re-run aborts on the unique pairing
                // index; existing rows mean the graph is already there.
                if self.reviews.count_by_assignment(assignment.id).await? > 0 {
                    info!(
                        assignment_id = %assignment.id,
                        "Review graph already generated, skipping"
                    );
                    return Ok(0);
                }

                // One retry, then surface the failure.
                warn!(
                    assignment_id = %assignment.id,
                    error = %first_err,
                    "Review graph insertion failed, retrying once"
                );
                match self.reviews.insert_pairings(assignment.id, rows).await {
                    Ok(inserted) => Ok(inserted),
                    Err(retry_err) => {
                        Err(EngineError::GenerationFailed(retry_err.to_string()).into())
                    }
                }
            }
        }
    }

    /// Apply a partial update to an assignment.
    ///
    /// Question edits are rejected once any completed review exists:
    /// completed rating vectors are positionally bound to the question
    /// list and would become misaligned. Pending rows carry no ratings
    /// and are unaffected.
    pub async fn edit(
        &self,
        assignment_id: Uuid,
        input: UpdateReviewAssignment,
    ) -> PeerloopResult<ReviewAssignment> {
        let existing = self.assignments.get_by_id(assignment_id).await?;

        if input.questions.is_some() && self.reviews.count_completed(assignment_id).await? > 0 {
            return Err(EngineError::QuestionsLocked.into());
        }

        let questions = input.questions.as_deref().unwrap_or(&existing.questions);
        let start = input.start_date.unwrap_or(existing.start_date);
        let due = input.due_date.unwrap_or(existing.due_date);
        validate_schema(questions, start, due)?;

        self.assignments.update(assignment_id, input).await
    }

    /// Delete an assignment and all of its reviews.
    pub async fn delete(&self, assignment_id: Uuid) -> PeerloopResult<()> {
        // Ensure the assignment exists so deletion of a missing id
        // reports NotFound rather than silently succeeding.
        self.assignments.get_by_id(assignment_id).await?;

        self.reviews.delete_by_assignment(assignment_id).await?;
        self.assignments.delete(assignment_id).await?;
        info!(assignment_id = %assignment_id, "Deleted assignment and its reviews");
        Ok(())
    }
}
