//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Workspace-scoped repositories
//! take the owning `workspace_id` where tenant isolation matters; the
//! review tables are reached through assignment-scoped keys instead
//! because every engine operation starts from an assignment id.

use uuid::Uuid;

use crate::error::PeerloopResult;
use crate::models::{
    assignment::{CreateReviewAssignment, ReviewAssignment, UpdateReviewAssignment},
    group::{CreateGroup, Group},
    membership::{GroupMembers, Membership, UpsertMembership},
    review::{NewReview, Review},
    workspace::{CreateWorkspace, Workspace},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Workspaces
// ---------------------------------------------------------------------------

pub trait WorkspaceRepository: Send + Sync {
    fn create(&self, input: CreateWorkspace) -> impl Future<Output = PeerloopResult<Workspace>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = PeerloopResult<Workspace>> + Send;
    fn delete(&self, id: Uuid) -> impl Future<Output = PeerloopResult<()>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = PeerloopResult<PaginatedResult<Workspace>>> + Send;
}

// ---------------------------------------------------------------------------
// Groups & memberships (workspace-scoped)
// ---------------------------------------------------------------------------

/// Group and membership management, plus the two resolver methods the
/// review-cycle engine consumes: [`MembershipRepository::list_groups_with_members`]
/// and [`MembershipRepository::is_instructor`].
pub trait MembershipRepository: Send + Sync {
    fn create_group(&self, input: CreateGroup) -> impl Future<Output = PeerloopResult<Group>> + Send;

    fn get_group(
        &self,
        workspace_id: Uuid,
        group_id: Uuid,
    ) -> impl Future<Output = PeerloopResult<Group>> + Send;

    /// Create or replace a user's membership. At most one membership
    /// exists per (workspace, user).
    fn upsert(
        &self,
        input: UpsertMembership,
    ) -> impl Future<Output = PeerloopResult<Membership>> + Send;

    fn remove(
        &self,
        workspace_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = PeerloopResult<()>> + Send;

    /// The membership resolver: every group of the workspace with its
    /// current member list. Members without a group are not returned.
    fn list_groups_with_members(
        &self,
        workspace_id: Uuid,
    ) -> impl Future<Output = PeerloopResult<Vec<GroupMembers>>> + Send;

    /// True iff the user holds the Instructor role in the workspace.
    fn is_instructor(
        &self,
        user_id: Uuid,
        workspace_id: Uuid,
    ) -> impl Future<Output = PeerloopResult<bool>> + Send;
}

// ---------------------------------------------------------------------------
// Review assignments
// ---------------------------------------------------------------------------

pub trait AssignmentRepository: Send + Sync {
    fn create(
        &self,
        input: CreateReviewAssignment,
    ) -> impl Future<Output = PeerloopResult<ReviewAssignment>> + Send;

    fn get_by_id(&self, id: Uuid) -> impl Future<Output = PeerloopResult<ReviewAssignment>> + Send;

    fn update(
        &self,
        id: Uuid,
        input: UpdateReviewAssignment,
    ) -> impl Future<Output = PeerloopResult<ReviewAssignment>> + Send;

    /// Deletes the assignment row only. Cascading review deletion is
    /// orchestrated by the engine via [`ReviewRepository::delete_by_assignment`].
    fn delete(&self, id: Uuid) -> impl Future<Output = PeerloopResult<()>> + Send;

    fn list(
        &self,
        workspace_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = PeerloopResult<PaginatedResult<ReviewAssignment>>> + Send;

    /// All assignments of a workspace ordered by due date, for the
    /// rating-trend series.
    fn list_by_due_date(
        &self,
        workspace_id: Uuid,
    ) -> impl Future<Output = PeerloopResult<Vec<ReviewAssignment>>> + Send;
}

// ---------------------------------------------------------------------------
// Reviews
// ---------------------------------------------------------------------------

pub trait ReviewRepository: Send + Sync {
    /// Insert the full pairing set for an assignment in one transaction.
    /// Partial insertion is never observable: either every row lands or
    /// none does. The unique (assignment_id, reviewer_id, target_id)
    /// index makes a conflicting re-run fail wholesale, which the
    /// caller treats as "already generated". Returns the row count.
    fn insert_pairings(
        &self,
        assignment_id: Uuid,
        pairings: Vec<NewReview>,
    ) -> impl Future<Output = PeerloopResult<u64>> + Send;

    fn get_by_id(&self, id: Uuid) -> impl Future<Output = PeerloopResult<Review>> + Send;

    /// Look up the unique review for an ordered (reviewer, target) pair
    /// within an assignment.
    fn get_by_key(
        &self,
        assignment_id: Uuid,
        reviewer_id: Uuid,
        target_id: Uuid,
    ) -> impl Future<Output = PeerloopResult<Review>> + Send;

    /// Atomically set ratings, comment, and `completed = true` in a
    /// single UPDATE. No read-modify-write window.
    fn complete(
        &self,
        id: Uuid,
        ratings: Vec<i64>,
        comment: Option<String>,
    ) -> impl Future<Output = PeerloopResult<Review>> + Send;

    fn list_by_assignment(
        &self,
        assignment_id: Uuid,
    ) -> impl Future<Output = PeerloopResult<Vec<Review>>> + Send;

    /// All reviews a user must write for an assignment.
    fn list_by_reviewer(
        &self,
        assignment_id: Uuid,
        reviewer_id: Uuid,
    ) -> impl Future<Output = PeerloopResult<Vec<Review>>> + Send;

    /// All reviews written about a user for an assignment.
    fn list_for_target(
        &self,
        assignment_id: Uuid,
        target_id: Uuid,
    ) -> impl Future<Output = PeerloopResult<Vec<Review>>> + Send;

    fn count_by_assignment(
        &self,
        assignment_id: Uuid,
    ) -> impl Future<Output = PeerloopResult<u64>> + Send;

    fn count_completed(
        &self,
        assignment_id: Uuid,
    ) -> impl Future<Output = PeerloopResult<u64>> + Send;

    fn delete_by_assignment(
        &self,
        assignment_id: Uuid,
    ) -> impl Future<Output = PeerloopResult<()>> + Send;
}
