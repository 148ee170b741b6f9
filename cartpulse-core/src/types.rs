//! Core domain types for cartpulse
//!
//! These types model the analytics pipeline: inbound tracked events,
//! the transactional records the dashboard aggregates over, and the
//! derived summary shapes.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **AnalyticsEvent** | One durable record per tracked occurrence |
//! | **Correlation id** | Caller-supplied `eventId` shared by the browser pixel and the server-side report of the same action |
//! | **RequestContext** | Explicit per-request signal (IP, user-agent, browser ids, optional identity) used for external identity matching |
//! | **KPI** | A derived business metric paired with a growth figure |
//!
//! Events arrive over two measurement channels (browser pixel and
//! server-side call). The core stores both without deduplication; the
//! correlation id is forwarded unchanged so the external conversion
//! API can deduplicate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================
// Tracked events
// ============================================

/// One record per tracked occurrence.
///
/// Created exactly once per ingestion call that reaches the store-write
/// step; never mutated, never deleted by this core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    /// Category tag from the caller (not constrained server-side)
    pub event_type: String,
    /// Correlation id, forwarded unchanged for external deduplication.
    /// Not unique in the store.
    pub event_id: Option<String>,
    /// Page path the event originated from
    pub path: Option<String>,
    /// Traffic source label
    pub source: Option<String>,
    /// UTM descriptor, opaque to this core (string or map)
    pub utm: Option<serde_json::Value>,
    /// Free-form remainder of the inbound payload
    pub data: serde_json::Map<String, serde_json::Value>,
    /// When this record was created by ingestion
    pub recorded_at: DateTime<Utc>,
}

/// Inbound body of a track call.
///
/// Recognized fields are lifted out; everything else stays in `custom`
/// with no fixed schema.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackRequest {
    /// Event category tag (the only required field)
    pub event_type: String,
    /// Correlation id shared with the browser pixel
    pub event_id: Option<String>,
    /// Browser cookie correlation id (`_fbp`)
    pub fbp: Option<String>,
    /// Click correlation id (`_fbc`)
    pub fbc: Option<String>,
    /// Page path
    pub path: Option<String>,
    /// Traffic source
    pub source: Option<String>,
    /// UTM descriptor
    pub utm: Option<serde_json::Value>,
    /// Everything not otherwise recognized
    #[serde(flatten)]
    pub custom: serde_json::Map<String, serde_json::Value>,
}

/// Explicit per-request context passed into ingestion.
///
/// Replaces ambient request/user state: everything the relay needs for
/// identity matching travels in this value.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Client IP address
    pub ip: Option<String>,
    /// Client user-agent string
    pub user_agent: Option<String>,
    /// Browser cookie correlation id
    pub fbp: Option<String>,
    /// Click correlation id
    pub fbc: Option<String>,
    /// Authenticated identity, when the session middleware provided one
    pub identity: Option<Identity>,
}

/// Contact fields of an authenticated caller.
///
/// Only ever included in the conversion payload when actually present;
/// never substituted with placeholders.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Identity {
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Uniform acknowledgement for a track call.
///
/// Always delivered with a success-class response code; the status
/// field reflects the true internal outcome only informatively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackAck {
    pub status: AckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TrackAck {
    /// Both downstream legs completed (or were intentionally skipped)
    pub fn ok() -> Self {
        Self {
            status: AckStatus::Ok,
            message: None,
        }
    }

    /// Something failed internally; the failure was logged, not surfaced
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: AckStatus::Error,
            message: Some(message.into()),
        }
    }
}

/// Informative status carried by a [`TrackAck`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AckStatus {
    Ok,
    Error,
}

// ============================================
// Transactional records (read-only to this core)
// ============================================

/// An order read from the shared store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub status: OrderStatus,
    /// Non-negative monetary amount
    pub total: f64,
    /// When the order occurred
    pub placed_at: DateTime<Utc>,
}

/// Order lifecycle status. Only `Cancelled` is excluded from revenue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "paid" => Ok(OrderStatus::Paid),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            _ => Err(format!("unknown order status: {}", s)),
        }
    }
}

/// A customer record read from the shared store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: CustomerRole,
    pub created_at: DateTime<Utc>,
}

/// Role classification; only ordinary customers count toward the
/// "new customers" KPI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerRole {
    Customer,
    Staff,
    Admin,
}

impl CustomerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerRole::Customer => "customer",
            CustomerRole::Staff => "staff",
            CustomerRole::Admin => "admin",
        }
    }
}

impl std::str::FromStr for CustomerRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(CustomerRole::Customer),
            "staff" => Ok(CustomerRole::Staff),
            "admin" => Ok(CustomerRole::Admin),
            _ => Err(format!("unknown customer role: {}", s)),
        }
    }
}

/// One admin activity log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub id: i64,
    /// Who acted; `None` renders as the system label
    pub actor_name: Option<String>,
    pub action: String,
    pub target: Option<String>,
    pub details: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

// ============================================
// Derived dashboard shapes (never persisted)
// ============================================

/// A single KPI: value plus growth indicator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Kpi {
    pub value: f64,
    pub growth: f64,
}

/// The KPI block of the dashboard summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardKpis {
    pub total_revenue: Kpi,
    pub total_orders: Kpi,
    pub new_customers: Kpi,
    pub avg_order_value: Kpi,
}

/// Activity entry as projected into the dashboard response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityView {
    /// Actor name with the "System" fallback already applied
    pub user_name: String,
    pub action: String,
    pub target: Option<String>,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ActivityView {
    /// Project a store record into the response shape.
    pub fn from_entry(entry: ActivityLogEntry) -> Self {
        Self {
            user_name: entry.actor_name.unwrap_or_else(|| "System".to_string()),
            action: entry.action,
            target: entry.target,
            details: entry.details,
            created_at: entry.occurred_at,
        }
    }
}

/// Dashboard summary, constructed fresh on every request.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub kpis: DashboardKpis,
    pub logs: Vec<ActivityView>,
    /// Revenue for the current calendar month. Computed alongside the
    /// KPI block but not part of the wire response.
    #[serde(skip)]
    pub this_month_revenue: f64,
}
