//! Dashboard aggregation over the shared store
//!
//! Computes the admin dashboard KPIs (revenue, order counts, customer
//! count, average order value) and the recent-activity feed. Summaries
//! are derived fresh on every request; nothing here is persisted.

mod engine;

pub use engine::{DashboardEngine, ACTIVITY_PAGE_SIZE};

use std::future::Future;
use std::sync::Arc;

use crate::error::StoreError;
use crate::store::Database;
use crate::types::{ActivityLogEntry, Customer, CustomerRole, Order};

/// Read surface the dashboard aggregates over.
///
/// The three reads are independent and may run concurrently;
/// consistency between them is snapshot-at-read-time, not
/// transactional.
pub trait DashboardReads: Send + Sync {
    /// All orders excluding cancelled status
    fn fetch_orders(&self) -> impl Future<Output = Result<Vec<Order>, StoreError>> + Send;

    /// All records classified as ordinary customers
    fn fetch_customers(&self) -> impl Future<Output = Result<Vec<Customer>, StoreError>> + Send;

    /// Most recent activity entries, newest first, bounded by `limit`
    fn fetch_recent_activity(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<ActivityLogEntry>, StoreError>> + Send;
}

impl DashboardReads for Database {
    async fn fetch_orders(&self) -> Result<Vec<Order>, StoreError> {
        self.orders_excluding_cancelled()
    }

    async fn fetch_customers(&self) -> Result<Vec<Customer>, StoreError> {
        self.customers_by_role(CustomerRole::Customer)
    }

    async fn fetch_recent_activity(&self, limit: usize) -> Result<Vec<ActivityLogEntry>, StoreError> {
        self.recent_activity(limit)
    }
}

impl<T: DashboardReads + ?Sized> DashboardReads for Arc<T> {
    fn fetch_orders(&self) -> impl Future<Output = Result<Vec<Order>, StoreError>> + Send {
        (**self).fetch_orders()
    }

    fn fetch_customers(&self) -> impl Future<Output = Result<Vec<Customer>, StoreError>> + Send {
        (**self).fetch_customers()
    }

    fn fetch_recent_activity(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<ActivityLogEntry>, StoreError>> + Send {
        (**self).fetch_recent_activity(limit)
    }
}
