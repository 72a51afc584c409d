//! SurrealDB implementation of [`MembershipRepository`].
//!
//! Memberships are stored as plain rows rather than graph edges
//! because a membership carries a role and an optional group; the
//! unique (workspace_id, user_id) index enforces at most one
//! membership per user per workspace.

use chrono::{DateTime, Utc};
use peerloop_core::error::PeerloopResult;
use peerloop_core::models::group::{CreateGroup, Group};
use peerloop_core::models::membership::{GroupMembers, Membership, Role, UpsertMembership};
use peerloop_core::repository::MembershipRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct GroupRow {
    workspace_id: String,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct GroupRowWithId {
    record_id: String,
    workspace_id: String,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl GroupRowWithId {
    fn try_into_group(self) -> Result<Group, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Migration(format!("invalid UUID: {e}")))?;
        let workspace_id = Uuid::parse_str(&self.workspace_id)
            .map_err(|e| DbError::Migration(format!("invalid workspace UUID: {e}")))?;
        Ok(Group {
            id,
            workspace_id,
            name: self.name,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct MembershipRow {
    workspace_id: String,
    user_id: String,
    role: String,
    group_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_role(s: &str) -> Result<Role, DbError> {
    match s {
        "Instructor" => Ok(Role::Instructor),
        "Student" => Ok(Role::Student),
        other => Err(DbError::Migration(format!("unknown role: {other}"))),
    }
}

fn role_str(role: Role) -> &'static str {
    match role {
        Role::Instructor => "Instructor",
        Role::Student => "Student",
    }
}

impl MembershipRow {
    fn try_into_membership(self) -> Result<Membership, DbError> {
        let workspace_id = Uuid::parse_str(&self.workspace_id)
            .map_err(|e| DbError::Migration(format!("invalid workspace UUID: {e}")))?;
        let user_id = Uuid::parse_str(&self.user_id)
            .map_err(|e| DbError::Migration(format!("invalid user UUID: {e}")))?;
        let group_id = self
            .group_id
            .map(|g| {
                Uuid::parse_str(&g)
                    .map_err(|e| DbError::Migration(format!("invalid group UUID: {e}")))
            })
            .transpose()?;
        Ok(Membership {
            workspace_id,
            user_id,
            role: parse_role(&self.role)?,
            group_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the Membership repository.
#[derive(Clone)]
pub struct SurrealMembershipRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealMembershipRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> MembershipRepository for SurrealMembershipRepository<C> {
    async fn create_group(&self, input: CreateGroup) -> PeerloopResult<Group> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let workspace_id_str = input.workspace_id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('group', $id) SET \
                 workspace_id = $workspace_id, name = $name",
            )
            .bind(("id", id_str.clone()))
            .bind(("workspace_id", workspace_id_str))
            .bind(("name", input.name))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<GroupRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "group".into(),
            id: id_str,
        })?;

        Ok(Group {
            id,
            workspace_id: input.workspace_id,
            name: row.name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    async fn get_group(&self, workspace_id: Uuid, group_id: Uuid) -> PeerloopResult<Group> {
        let id_str = group_id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('group', $id) \
                 WHERE workspace_id = $workspace_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("workspace_id", workspace_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<GroupRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "group".into(),
            id: id_str,
        })?;

        row.try_into_group().map_err(Into::into)
    }

    async fn upsert(&self, input: UpsertMembership) -> PeerloopResult<Membership> {
        let workspace_id_str = input.workspace_id.to_string();
        let user_id_str = input.user_id.to_string();

        // Replace any existing membership for (workspace, user) in one
        // transaction so the unique index never sees both rows.
        let result = self
            .db
            .query(
                "BEGIN TRANSACTION; \
                 DELETE membership WHERE workspace_id = $workspace_id \
                 AND user_id = $user_id; \
                 CREATE membership SET \
                 workspace_id = $workspace_id, \
                 user_id = $user_id, \
                 role = $role, \
                 group_id = $group_id; \
                 COMMIT TRANSACTION;",
            )
            .bind(("workspace_id", workspace_id_str))
            .bind(("user_id", user_id_str.clone()))
            .bind(("role", role_str(input.role)))
            .bind(("group_id", input.group_id.map(|g| g.to_string())))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<MembershipRow> = result.take(2).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "membership".into(),
            id: user_id_str,
        })?;

        row.try_into_membership().map_err(Into::into)
    }

    async fn remove(&self, workspace_id: Uuid, user_id: Uuid) -> PeerloopResult<()> {
        self.db
            .query(
                "DELETE membership WHERE workspace_id = $workspace_id \
                 AND user_id = $user_id",
            )
            .bind(("workspace_id", workspace_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn list_groups_with_members(
        &self,
        workspace_id: Uuid,
    ) -> PeerloopResult<Vec<GroupMembers>> {
        let workspace_id_str = workspace_id.to_string();

        // Groups first (stable generation order), then the grouped
        // memberships; assembled in code rather than in the query so a
        // group with no members still appears with an empty list.
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM group \
                 WHERE workspace_id = $workspace_id \
                 ORDER BY created_at ASC; \
                 SELECT * FROM membership \
                 WHERE workspace_id = $workspace_id \
                 AND group_id != NONE \
                 ORDER BY created_at ASC;",
            )
            .bind(("workspace_id", workspace_id_str))
            .await
            .map_err(DbError::from)?;

        let group_rows: Vec<GroupRowWithId> = result.take(0).map_err(DbError::from)?;
        let member_rows: Vec<MembershipRow> = result.take(1).map_err(DbError::from)?;

        let mut groups = Vec::with_capacity(group_rows.len());
        for row in group_rows {
            let group = row.try_into_group()?;
            groups.push(GroupMembers {
                group_id: group.id,
                member_ids: Vec::new(),
            });
        }

        for row in member_rows {
            let membership = row.try_into_membership()?;
            let Some(group_id) = membership.group_id else {
                continue;
            };
            if let Some(entry) = groups.iter_mut().find(|g| g.group_id == group_id) {
                entry.member_ids.push(membership.user_id);
            }
        }

        Ok(groups)
    }

    async fn is_instructor(&self, user_id: Uuid, workspace_id: Uuid) -> PeerloopResult<bool> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM membership \
                 WHERE workspace_id = $workspace_id \
                 AND user_id = $user_id \
                 AND role = 'Instructor' GROUP ALL",
            )
            .bind(("workspace_id", workspace_id.to_string()))
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }
}
