//! Store repository layer
//!
//! Query and insert operations for events, orders, customers, and the
//! activity log. Event writes are append-only; transactional records
//! are written by the rest of the platform and only read here.

use crate::error::StoreError;
use crate::types::*;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::path::PathBuf;
use std::sync::Mutex;

/// Store handle (single connection behind a mutex).
///
/// Safe for unlimited concurrent callers; aggregate reads are
/// snapshot-at-read-time, not transactional across queries.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &PathBuf) -> Result<Self, StoreError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // WAL mode for concurrent readers during ingestion writes
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        super::schema::run_migrations(&conn)
    }

    /// Get the underlying connection (for advanced use)
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }

    // ============================================
    // Analytics event operations (append-only)
    // ============================================

    /// Record one analytics event.
    ///
    /// Append-only; no validation beyond the data model and no
    /// deduplication — the same correlation id may appear in any number
    /// of rows (one per measurement channel).
    pub fn record_event(&self, event: &AnalyticsEvent) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO analytics_events (event_type, event_id, path, source, utm, data, recorded_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                event.event_type,
                event.event_id,
                event.path,
                event.source,
                event.utm.as_ref().map(|v| v.to_string()),
                serde_json::Value::Object(event.data.clone()).to_string(),
                event.recorded_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Most recent events, newest first (internal analytics surface)
    pub fn recent_events(&self, limit: usize) -> Result<Vec<AnalyticsEvent>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT * FROM analytics_events ORDER BY recorded_at DESC, id DESC LIMIT ?",
        )?;

        let events = stmt
            .query_map([limit as i64], Self::row_to_event)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(events)
    }

    /// Count stored events
    pub fn count_events(&self) -> Result<i64, StoreError> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM analytics_events", [], |r| r.get(0))?;
        Ok(count)
    }

    fn row_to_event(row: &Row) -> rusqlite::Result<AnalyticsEvent> {
        let utm_str: Option<String> = row.get("utm")?;
        let data_str: String = row.get("data")?;
        let recorded_at_str: String = row.get("recorded_at")?;

        let data = serde_json::from_str::<serde_json::Value>(&data_str)
            .ok()
            .and_then(|v| v.as_object().cloned())
            .unwrap_or_default();

        Ok(AnalyticsEvent {
            event_type: row.get("event_type")?,
            event_id: row.get("event_id")?,
            path: row.get("path")?,
            source: row.get("source")?,
            utm: utm_str.and_then(|s| serde_json::from_str(&s).ok()),
            data,
            recorded_at: parse_ts(&recorded_at_str),
        })
    }

    // ============================================
    // Order operations
    // ============================================

    /// Insert an order (write surface for the rest of the platform and tests)
    pub fn insert_order(
        &self,
        status: OrderStatus,
        total: f64,
        placed_at: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO orders (status, total, placed_at) VALUES (?1, ?2, ?3)",
            params![status.as_str(), total, placed_at.to_rfc3339()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// All orders whose status is not `Cancelled`
    pub fn orders_excluding_cancelled(&self) -> Result<Vec<Order>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT * FROM orders WHERE status != 'cancelled'")?;

        let orders = stmt
            .query_map([], Self::row_to_order)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(orders)
    }

    fn row_to_order(row: &Row) -> rusqlite::Result<Order> {
        let status_str: String = row.get("status")?;
        let placed_at_str: String = row.get("placed_at")?;

        Ok(Order {
            id: row.get("id")?,
            status: status_str.parse().unwrap_or(OrderStatus::Pending),
            total: row.get("total")?,
            placed_at: parse_ts(&placed_at_str),
        })
    }

    // ============================================
    // Customer operations
    // ============================================

    /// Insert a customer record
    pub fn insert_customer(
        &self,
        name: Option<&str>,
        email: Option<&str>,
        role: CustomerRole,
        created_at: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO customers (name, email, role, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![name, email, role.as_str(), created_at.to_rfc3339()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// All customer records with the given role classification
    pub fn customers_by_role(&self, role: CustomerRole) -> Result<Vec<Customer>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT * FROM customers WHERE role = ?")?;

        let customers = stmt
            .query_map([role.as_str()], Self::row_to_customer)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(customers)
    }

    fn row_to_customer(row: &Row) -> rusqlite::Result<Customer> {
        let role_str: String = row.get("role")?;
        let created_at_str: String = row.get("created_at")?;

        Ok(Customer {
            id: row.get("id")?,
            name: row.get("name")?,
            email: row.get("email")?,
            role: role_str.parse().unwrap_or(CustomerRole::Customer),
            created_at: parse_ts(&created_at_str),
        })
    }

    // ============================================
    // Activity log operations
    // ============================================

    /// Insert an activity log entry
    pub fn insert_activity(
        &self,
        actor_name: Option<&str>,
        action: &str,
        target: Option<&str>,
        details: Option<&str>,
        occurred_at: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO activity_log (actor_name, action, target, details, occurred_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![actor_name, action, target, details, occurred_at.to_rfc3339()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Most recent activity entries, newest first, bounded by `limit`
    pub fn recent_activity(&self, limit: usize) -> Result<Vec<ActivityLogEntry>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT * FROM activity_log ORDER BY occurred_at DESC, id DESC LIMIT ?")?;

        let entries = stmt
            .query_map([limit as i64], Self::row_to_activity)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    fn row_to_activity(row: &Row) -> rusqlite::Result<ActivityLogEntry> {
        let occurred_at_str: String = row.get("occurred_at")?;

        Ok(ActivityLogEntry {
            id: row.get("id")?,
            actor_name: row.get("actor_name")?,
            action: row.get("action")?,
            target: row.get("target")?,
            details: row.get("details")?,
            occurred_at: parse_ts(&occurred_at_str),
        })
    }
}

/// Parse an RFC 3339 column, falling back to now on corrupt data
fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
