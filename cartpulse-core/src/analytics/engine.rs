//! Dashboard summary computation
//!
//! Three concurrent reads (orders, customers, activity log) reduced
//! into the KPI block. Any read failing aborts the whole computation;
//! partial summaries are never returned.

use chrono::{DateTime, Datelike, TimeZone, Utc};

use crate::error::AggregationError;
use crate::types::{ActivityView, DashboardKpis, DashboardSummary, Kpi};

use super::DashboardReads;

/// Fixed page size of the recent-activity feed
pub const ACTIVITY_PAGE_SIZE: usize = 10;

// Placeholder growth figures. These are static until a prior-period
// comparison is wired in; the {value, growth} field shape is the
// contract to preserve when that lands.
// TODO: derive growth from the previous period's aggregates.
const REVENUE_GROWTH: f64 = 12.5;
const ORDERS_GROWTH: f64 = 8.2;
const CUSTOMERS_GROWTH: f64 = 4.1;
const AOV_GROWTH: f64 = 2.3;

/// Computes dashboard summaries over a [`DashboardReads`] source.
pub struct DashboardEngine<R> {
    reads: R,
}

impl<R: DashboardReads> DashboardEngine<R> {
    pub fn new(reads: R) -> Self {
        Self { reads }
    }

    /// Compute the dashboard summary as of the given instant.
    ///
    /// The three reads run concurrently and must all complete before
    /// reduction begins.
    pub async fn compute_summary(
        &self,
        as_of: DateTime<Utc>,
    ) -> Result<DashboardSummary, AggregationError> {
        let start_of_month = month_start(as_of);

        let (orders, customers, logs) = tokio::try_join!(
            self.reads.fetch_orders(),
            self.reads.fetch_customers(),
            self.reads.fetch_recent_activity(ACTIVITY_PAGE_SIZE),
        )?;

        let total_revenue: f64 = orders.iter().map(|o| o.total).sum();
        let this_month_revenue: f64 = orders
            .iter()
            .filter(|o| o.placed_at >= start_of_month)
            .map(|o| o.total)
            .sum();

        let total_orders = orders.len();
        // Division by zero is a defined edge case, not an error.
        let avg_order_value = if total_orders > 0 {
            (total_revenue / total_orders as f64).round()
        } else {
            0.0
        };

        // Gauge of the current ordinary-customer population, not a
        // windowed signup count. Intentional: matches the upstream
        // product behavior until intent is clarified.
        let new_customers = customers.len();

        Ok(DashboardSummary {
            kpis: DashboardKpis {
                total_revenue: Kpi {
                    value: total_revenue,
                    growth: REVENUE_GROWTH,
                },
                total_orders: Kpi {
                    value: total_orders as f64,
                    growth: ORDERS_GROWTH,
                },
                new_customers: Kpi {
                    value: new_customers as f64,
                    growth: CUSTOMERS_GROWTH,
                },
                avg_order_value: Kpi {
                    value: avg_order_value,
                    growth: AOV_GROWTH,
                },
            },
            logs: logs
                .into_iter()
                .take(ACTIVITY_PAGE_SIZE)
                .map(ActivityView::from_entry)
                .collect(),
            this_month_revenue,
        })
    }
}

/// First instant of the calendar month containing `as_of`, UTC.
fn month_start(as_of: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(as_of.year(), as_of.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(as_of)
}
