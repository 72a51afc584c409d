//! Membership domain model.
//!
//! A membership records a user's role and optional group assignment
//! within a workspace. Memberships are managed by the workspace
//! administration surface; the review-cycle engine only ever reads them
//! through the resolver methods on
//! [`crate::repository::MembershipRepository`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The fixed role vocabulary of a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Instructor,
    Student,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    pub workspace_id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
    /// Students may be unassigned; unassigned members are excluded from
    /// review-graph generation.
    pub group_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating or replacing a user's membership in a workspace.
/// At most one membership exists per (workspace, user).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertMembership {
    pub workspace_id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
    pub group_id: Option<Uuid>,
}

/// One group and its current member list, as returned by the
/// membership resolver at generation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMembers {
    pub group_id: Uuid,
    pub member_ids: Vec<Uuid>,
}
