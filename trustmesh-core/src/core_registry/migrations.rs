//! Database migrations for the group registry
//!
//! Each migration is applied atomically and tracked in the
//! registry_schema_version table.

use super::errors::RegistryResult;
use super::types::Timestamp;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use tracing::info;

/// Current schema version for core_registry
pub const CURRENT_REGISTRY_SCHEMA_VERSION: i32 = 1;

/// Migration descriptor
pub struct Migration {
    pub version: i32,
    pub description: &'static str,
    pub up_sql: &'static str,
}

/// All available migrations in order
pub fn get_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial groups, membership, epochs and activity schema",
        up_sql: r#"
            CREATE TABLE IF NOT EXISTS groups (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                current_epoch INTEGER NOT NULL CHECK(current_epoch >= 1),
                created_at INTEGER NOT NULL,
                created_by TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS group_members (
                id TEXT PRIMARY KEY,
                group_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                role TEXT NOT NULL CHECK(role IN ('admin', 'member')),
                public_key BLOB NOT NULL,
                joined_at INTEGER NOT NULL,
                left_at INTEGER,
                epoch_joined INTEGER NOT NULL,
                epoch_left INTEGER,
                FOREIGN KEY (group_id) REFERENCES groups(id)
            );

            -- One live record per (group, user)
            CREATE UNIQUE INDEX IF NOT EXISTS idx_group_members_active
                ON group_members(group_id, user_id) WHERE left_at IS NULL;
            CREATE INDEX IF NOT EXISTS idx_group_members_group ON group_members(group_id);
            CREATE INDEX IF NOT EXISTS idx_group_members_user ON group_members(group_id, user_id);

            CREATE TABLE IF NOT EXISTS group_epochs (
                id TEXT PRIMARY KEY,
                group_id TEXT NOT NULL,
                epoch_number INTEGER NOT NULL CHECK(epoch_number >= 1),
                started_at INTEGER NOT NULL,
                ended_at INTEGER,
                reason TEXT NOT NULL
                    CHECK(reason IN ('initial', 'member_removed', 'key_rotation', 'manual')),
                initiated_by TEXT NOT NULL,
                key_hash TEXT,
                UNIQUE (group_id, epoch_number),
                FOREIGN KEY (group_id) REFERENCES groups(id)
            );

            -- At most one open epoch per group
            CREATE UNIQUE INDEX IF NOT EXISTS idx_group_epochs_open
                ON group_epochs(group_id) WHERE ended_at IS NULL;

            CREATE TRIGGER IF NOT EXISTS group_epochs_no_delete
            BEFORE DELETE ON group_epochs
            BEGIN
                SELECT RAISE(ABORT, 'epoch rows are append-only');
            END;

            CREATE TRIGGER IF NOT EXISTS group_epochs_no_renumber
            BEFORE UPDATE OF id, group_id, epoch_number, started_at ON group_epochs
            BEGIN
                SELECT RAISE(ABORT, 'epoch rows are append-only');
            END;

            CREATE TABLE IF NOT EXISTS group_activity (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                group_id TEXT NOT NULL,
                actor_id TEXT NOT NULL,
                action TEXT NOT NULL,
                target_id TEXT,
                epoch_number INTEGER NOT NULL,
                timestamp INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_group_activity_group
                ON group_activity(group_id, timestamp);
        "#,
    }]
}

/// Get current schema version from database
fn get_current_version(pool: &Pool<SqliteConnectionManager>) -> RegistryResult<i32> {
    let conn = pool.get()?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS registry_schema_version (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let version: Option<i32> = conn.query_row(
        "SELECT MAX(version) FROM registry_schema_version",
        [],
        |row| row.get(0),
    )?;

    Ok(version.unwrap_or(0))
}

/// Run all pending migrations
pub fn migrate(pool: &Pool<SqliteConnectionManager>) -> RegistryResult<()> {
    let current_version = get_current_version(pool)?;

    let pending_migrations: Vec<_> =
        get_migrations().into_iter().filter(|m| m.version > current_version).collect();

    if pending_migrations.is_empty() {
        return Ok(());
    }

    let conn = pool.get()?;

    for migration in pending_migrations {
        let tx = conn.unchecked_transaction()?;

        tx.execute_batch(migration.up_sql)?;
        tx.execute(
            "INSERT INTO registry_schema_version (version, applied_at) VALUES (?, ?)",
            params![migration.version, Timestamp::now().as_sql()],
        )?;

        tx.commit()?;

        info!("Applied registry migration v{}: {}", migration.version, migration.description);
    }

    Ok(())
}

/// Get the latest migration version available
pub fn get_latest_version() -> i32 {
    get_migrations().iter().map(|m| m.version).max().unwrap_or(0)
}
