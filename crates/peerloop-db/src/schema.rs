//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings. Enums are stored as strings with
//! ASSERT constraints for validation.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1 — initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Workspaces (global scope)
-- =======================================================================
DEFINE TABLE workspace SCHEMAFULL;
DEFINE FIELD name ON TABLE workspace TYPE string;
DEFINE FIELD description ON TABLE workspace TYPE string;
DEFINE FIELD created_at ON TABLE workspace TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE workspace TYPE datetime \
    DEFAULT time::now();

-- =======================================================================
-- Groups (workspace scope)
-- =======================================================================
DEFINE TABLE group SCHEMAFULL;
DEFINE FIELD workspace_id ON TABLE group TYPE string;
DEFINE FIELD name ON TABLE group TYPE string;
DEFINE FIELD created_at ON TABLE group TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE group TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_group_workspace_name ON TABLE group \
    COLUMNS workspace_id, name UNIQUE;

-- =======================================================================
-- Memberships (workspace scope)
-- =======================================================================
DEFINE TABLE membership SCHEMAFULL;
DEFINE FIELD workspace_id ON TABLE membership TYPE string;
DEFINE FIELD user_id ON TABLE membership TYPE string;
DEFINE FIELD role ON TABLE membership TYPE string \
    ASSERT $value IN ['Instructor', 'Student'];
DEFINE FIELD group_id ON TABLE membership TYPE option<string>;
DEFINE FIELD created_at ON TABLE membership TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE membership TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_membership_workspace_user ON TABLE membership \
    COLUMNS workspace_id, user_id UNIQUE;
DEFINE INDEX idx_membership_group ON TABLE membership \
    COLUMNS workspace_id, group_id;

-- =======================================================================
-- Review assignments (workspace scope)
-- =======================================================================
DEFINE TABLE review_assignment SCHEMAFULL;
DEFINE FIELD workspace_id ON TABLE review_assignment TYPE string;
DEFINE FIELD description ON TABLE review_assignment TYPE string;
DEFINE FIELD questions ON TABLE review_assignment TYPE array;
DEFINE FIELD questions.* ON TABLE review_assignment TYPE string;
DEFINE FIELD start_date ON TABLE review_assignment TYPE datetime;
DEFINE FIELD due_date ON TABLE review_assignment TYPE datetime;
DEFINE FIELD created_at ON TABLE review_assignment TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE review_assignment TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_assignment_workspace ON TABLE review_assignment \
    COLUMNS workspace_id;

-- =======================================================================
-- Reviews (assignment scope)
-- =======================================================================
DEFINE TABLE review SCHEMAFULL;
DEFINE FIELD assignment_id ON TABLE review TYPE string;
DEFINE FIELD group_id ON TABLE review TYPE string;
DEFINE FIELD reviewer_id ON TABLE review TYPE string;
DEFINE FIELD target_id ON TABLE review TYPE string;
DEFINE FIELD ratings ON TABLE review TYPE array;
DEFINE FIELD ratings.* ON TABLE review TYPE int;
DEFINE FIELD comment ON TABLE review TYPE option<string>;
DEFINE FIELD completed ON TABLE review TYPE bool DEFAULT false;
DEFINE FIELD created_at ON TABLE review TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE review TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_review_pairing ON TABLE review \
    COLUMNS assignment_id, reviewer_id, target_id UNIQUE;
DEFINE INDEX idx_review_assignment ON TABLE review \
    COLUMNS assignment_id;
DEFINE INDEX idx_review_target ON TABLE review \
    COLUMNS assignment_id, target_id;
DEFINE INDEX idx_review_reviewer ON TABLE review \
    COLUMNS assignment_id, reviewer_id;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
/// All DEFINE statements are idempotent so re-running is safe.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    // Ensure migration tracking table exists (idempotent).
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    // Determine current schema version.
    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            // Record the applied migration.
            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            info!(
                version = migration.version,
                "Migration applied successfully"
            );
        }
    }

    Ok(())
}
