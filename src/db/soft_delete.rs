//! Soft-delete and restore helpers for reducing boilerplate in queries.
//!
//! Entities are tombstoned with `deleted_at` plus a `deleted_cascade_depth`
//! recording how far down a cascade the tombstone was applied.
//!
//! # Cascade Hierarchy
//!
//! ```text
//! shops (root)
//! ├── deals (depth 1)
//! │   └── redemptions are NOT cascaded: historical redemptions must stay
//! │       readable, with the deleted deal backfilled on read
//!
//! deals (can be deleted directly)
//!
//! redemptions (leaf; tombstoned individually when a coupon is rescinded)
//! ```

use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{Connection, params, types::Value};

use crate::error::Result;

/// Get current Unix timestamp in seconds.
fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

/// Result of a soft-delete operation.
pub struct SoftDeleteResult {
    /// Whether the entity was found and deleted
    pub deleted: bool,
    /// The timestamp used for this delete (for cascade matching)
    pub deleted_at: i64,
}

/// Soft-delete an entity by ID.
///
/// Sets `deleted_at` to current timestamp and `deleted_cascade_depth` to 0.
/// Returns `SoftDeleteResult` with the timestamp for use in cascade operations.
pub fn soft_delete_entity(
    conn: &Connection,
    table: &str,
    id: impl Into<Value>,
) -> Result<SoftDeleteResult> {
    let now = now();
    let sql = format!(
        "UPDATE {} SET deleted_at = ?1, deleted_cascade_depth = 0 WHERE id = ?2 AND deleted_at IS NULL",
        table
    );
    let updated = conn.execute(&sql, params![now, id.into()])?;
    Ok(SoftDeleteResult {
        deleted: updated > 0,
        deleted_at: now,
    })
}

/// Cascade soft-delete to a child table via a direct foreign key.
///
/// Sets `deleted_at` and `deleted_cascade_depth` on all matching rows.
pub fn cascade_delete_direct(
    conn: &Connection,
    child_table: &str,
    fk_column: &str,
    parent_id: impl Into<Value>,
    deleted_at: i64,
    depth: i32,
) -> Result<usize> {
    let sql = format!(
        "UPDATE {} SET deleted_at = ?1, deleted_cascade_depth = ?2 WHERE {} = ?3 AND deleted_at IS NULL",
        child_table, fk_column
    );
    let updated = conn.execute(&sql, params![deleted_at, depth, parent_id.into()])?;
    Ok(updated)
}

/// Restore cascaded children in a child table via direct foreign key.
///
/// Only restores rows that match the parent's `deleted_at` timestamp and have `depth > 0`.
pub fn restore_cascaded_direct(
    conn: &Connection,
    child_table: &str,
    fk_column: &str,
    parent_id: impl Into<Value>,
    deleted_at: i64,
) -> Result<usize> {
    let sql = format!(
        "UPDATE {} SET deleted_at = NULL, deleted_cascade_depth = NULL \
         WHERE {} = ?1 AND deleted_at = ?2 AND deleted_cascade_depth > 0",
        child_table, fk_column
    );
    let updated = conn.execute(&sql, params![parent_id.into(), deleted_at])?;
    Ok(updated)
}

/// Restore the entity itself (clear deleted_at and deleted_cascade_depth).
pub fn restore_entity(conn: &Connection, table: &str, id: impl Into<Value>) -> Result<usize> {
    let sql = format!(
        "UPDATE {} SET deleted_at = NULL, deleted_cascade_depth = NULL WHERE id = ?1",
        table
    );
    let updated = conn.execute(&sql, params![id.into()])?;
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn setup_test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE parent (id INTEGER PRIMARY KEY, deleted_at INTEGER, deleted_cascade_depth INTEGER);
             CREATE TABLE child (id INTEGER PRIMARY KEY, parent_id INTEGER, deleted_at INTEGER, deleted_cascade_depth INTEGER);
             INSERT INTO parent VALUES (1, NULL, NULL);
             INSERT INTO child VALUES (1, 1, NULL, NULL);
             INSERT INTO child VALUES (2, 1, NULL, NULL);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_soft_delete_entity() {
        let conn = setup_test_db();
        let result = soft_delete_entity(&conn, "parent", 1i64).unwrap();
        assert!(result.deleted);
        assert!(result.deleted_at > 0);

        let deleted_at: Option<i64> = conn
            .query_row("SELECT deleted_at FROM parent WHERE id = 1", [], |r| {
                r.get(0)
            })
            .unwrap();
        assert!(deleted_at.is_some());
    }

    #[test]
    fn test_soft_delete_is_not_repeatable() {
        let conn = setup_test_db();
        assert!(soft_delete_entity(&conn, "parent", 1i64).unwrap().deleted);
        // Already tombstoned; second attempt matches nothing.
        assert!(!soft_delete_entity(&conn, "parent", 1i64).unwrap().deleted);
    }

    #[test]
    fn test_cascade_delete_direct() {
        let conn = setup_test_db();
        let result = soft_delete_entity(&conn, "parent", 1i64).unwrap();
        let cascaded =
            cascade_delete_direct(&conn, "child", "parent_id", 1i64, result.deleted_at, 1).unwrap();
        assert_eq!(cascaded, 2);

        let depth: i32 = conn
            .query_row(
                "SELECT deleted_cascade_depth FROM child WHERE id = 1",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(depth, 1);
    }

    #[test]
    fn test_restore_cascaded_direct() {
        let conn = setup_test_db();
        let result = soft_delete_entity(&conn, "parent", 1i64).unwrap();
        cascade_delete_direct(&conn, "child", "parent_id", 1i64, result.deleted_at, 1).unwrap();

        let restored =
            restore_cascaded_direct(&conn, "child", "parent_id", 1i64, result.deleted_at).unwrap();
        assert_eq!(restored, 2);

        let deleted_at: Option<i64> = conn
            .query_row("SELECT deleted_at FROM child WHERE id = 1", [], |r| {
                r.get(0)
            })
            .unwrap();
        assert!(deleted_at.is_none());
    }
}
