//! Store schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.

use rusqlite::Connection;

use crate::error::StoreError;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: Initial schema
    r#"
    -- Append-only behavioral events. Rows are never mutated or deleted
    -- by this service; retention is an external concern.
    CREATE TABLE IF NOT EXISTS analytics_events (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        event_type       TEXT NOT NULL,
        -- Correlation id shared with the browser pixel; NOT unique.
        event_id         TEXT,
        path             TEXT,
        source           TEXT,
        utm              JSON,
        data             JSON NOT NULL,
        recorded_at      DATETIME NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_events_type_time
        ON analytics_events(event_type, recorded_at);

    -- Transactional records. Written by the rest of the platform;
    -- read-only to the aggregation engine.
    CREATE TABLE IF NOT EXISTS orders (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        status           TEXT NOT NULL,
        total            REAL NOT NULL CHECK (total >= 0),
        placed_at        DATETIME NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_orders_status ON orders(status);

    CREATE TABLE IF NOT EXISTS customers (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        name             TEXT,
        email            TEXT,
        role             TEXT NOT NULL,
        created_at       DATETIME NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_customers_role ON customers(role);

    CREATE TABLE IF NOT EXISTS activity_log (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        actor_name       TEXT,
        action           TEXT NOT NULL,
        target           TEXT,
        details          TEXT,
        occurred_at      DATETIME NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_activity_time ON activity_log(occurred_at);
    "#,
];

/// Run any pending migrations
pub fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    let current_version: i32 = conn
        .query_row("PRAGMA user_version", [], |r| r.get(0))
        .unwrap_or(0);

    tracing::info!(
        current_version,
        target_version = SCHEMA_VERSION,
        "Checking store migrations"
    );

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i32;
        if version > current_version {
            tracing::info!(version, "Running migration");
            conn.execute_batch(migration)?;
            conn.execute(&format!("PRAGMA user_version = {}", version), [])?;
        }
    }

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> Result<i32, StoreError> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let version = get_schema_version(&conn).unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn test_tables_created() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let tables = ["analytics_events", "orders", "customers", "activity_log"];
        for table in tables {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
                    [table],
                    |r| r.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "table {} should exist", table);
        }
    }

    #[test]
    fn test_negative_order_total_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO orders (status, total, placed_at) VALUES ('paid', -5.0, '2024-01-01T00:00:00Z')",
            [],
        );
        assert!(result.is_err());
    }
}
