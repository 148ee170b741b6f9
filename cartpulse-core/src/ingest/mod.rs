//! Ingestion layer for inbound tracking events
//!
//! One call per client event: the inbound payload is partitioned into
//! structured fields and a free-form remainder, then fanned out to the
//! event store and the conversion relay.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌───────────────┐     ┌──────────────────┐
//! │ Track call   │ ──► │ IngestService │ ──► │ Event store      │
//! │ (browser or  │     │   (fan-out)   │     │ (append-only)    │
//! │  server-side)│     │               │ ──► │ Conversion relay │
//! └──────────────┘     └───────────────┘     └──────────────────┘
//! ```
//!
//! The two downstream legs are independent: a failure in either one
//! never prevents the other from attempting its work, and neither
//! failure ever surfaces to the event sender. Tracking calls originate
//! from client-side instrumentation; a failing response there would
//! show end users console errors for a best-effort side channel.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;

use crate::error::{RelayError, StoreError};
use crate::relay::ConversionClient;
use crate::store::Database;
use crate::types::{AnalyticsEvent, RequestContext, TrackAck, TrackRequest};

/// Durable, append-only destination for analytics events.
pub trait EventStore: Send + Sync {
    /// Record one event. Failures are typed, never fatal.
    fn record(&self, event: &AnalyticsEvent) -> Result<(), StoreError>;
}

impl EventStore for Database {
    fn record(&self, event: &AnalyticsEvent) -> Result<(), StoreError> {
        self.record_event(event)
    }
}

impl<T: EventStore + ?Sized> EventStore for Arc<T> {
    fn record(&self, event: &AnalyticsEvent) -> Result<(), StoreError> {
        (**self).record(event)
    }
}

/// Outbound leg toward the external conversion-tracking API.
pub trait ConversionRelay: Send + Sync {
    /// Dispatch one event. At-most-once: implementations must not retry.
    fn dispatch(
        &self,
        event: &AnalyticsEvent,
        ctx: &RequestContext,
    ) -> impl Future<Output = Result<(), RelayError>> + Send;
}

impl ConversionRelay for ConversionClient {
    async fn dispatch(
        &self,
        event: &AnalyticsEvent,
        ctx: &RequestContext,
    ) -> Result<(), RelayError> {
        ConversionClient::dispatch(self, event, ctx).await
    }
}

impl<T: ConversionRelay + ?Sized> ConversionRelay for Arc<T> {
    fn dispatch(
        &self,
        event: &AnalyticsEvent,
        ctx: &RequestContext,
    ) -> impl Future<Output = Result<(), RelayError>> + Send {
        (**self).dispatch(event, ctx)
    }
}

/// Fans one inbound event out to the store and the relay.
///
/// Never fails the caller: every outcome maps to a uniform
/// acknowledgement, with internal failures logged for operational
/// visibility only.
pub struct IngestService<S, R> {
    store: S,
    relay: Option<R>,
}

impl<S: EventStore, R: ConversionRelay> IngestService<S, R> {
    /// Create a service. `relay` is `None` when the conversion leg is
    /// not configured; ingestion then runs store-only.
    pub fn new(store: S, relay: Option<R>) -> Self {
        Self { store, relay }
    }

    /// Ingest one tracking call.
    ///
    /// Both downstream legs are always attempted; the returned
    /// acknowledgement reflects the internal outcome informatively but
    /// is always success-shaped to the transport layer.
    pub async fn ingest(&self, req: TrackRequest, mut ctx: RequestContext) -> TrackAck {
        // Browser correlation ids ride in the body; fold them into the
        // explicit request context the relay consumes.
        if ctx.fbp.is_none() {
            ctx.fbp = req.fbp.clone();
        }
        if ctx.fbc.is_none() {
            ctx.fbc = req.fbc.clone();
        }

        let event = AnalyticsEvent {
            event_type: req.event_type,
            event_id: req.event_id,
            path: req.path,
            source: req.source,
            utm: req.utm,
            data: req.custom,
            recorded_at: Utc::now(),
        };

        // Fan-out, not a pipeline: neither leg gates the other.
        let (store_res, relay_res) = tokio::join!(
            async { self.store.record(&event) },
            async {
                match &self.relay {
                    Some(relay) => relay.dispatch(&event, &ctx).await.map(|()| true),
                    None => Ok(false),
                }
            },
        );

        let mut degraded = false;

        if let Err(e) = store_res {
            degraded = true;
            tracing::error!(
                event_type = %event.event_type,
                event_id = ?event.event_id,
                error = %e,
                "Failed to record analytics event"
            );
        }

        match relay_res {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(
                    event_type = %event.event_type,
                    "Conversion relay not configured; event stored only"
                );
            }
            Err(e) => {
                degraded = true;
                // At-most-once: the event is lost on this leg, but the
                // local store has it.
                tracing::warn!(
                    event_type = %event.event_type,
                    event_id = ?event.event_id,
                    error = %e,
                    "Failed to dispatch conversion event"
                );
            }
        }

        if degraded {
            TrackAck::error("Logged internally")
        } else {
            TrackAck::ok()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AckStatus;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FakeStore {
        fail: bool,
        calls: AtomicUsize,
    }

    impl FakeStore {
        fn new(fail: bool) -> Self {
            Self {
                fail,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl EventStore for FakeStore {
        fn record(&self, _event: &AnalyticsEvent) -> Result<(), StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(StoreError::Database(rusqlite::Error::InvalidQuery))
            } else {
                Ok(())
            }
        }
    }

    #[derive(Default)]
    struct FakeRelay {
        fail: bool,
        calls: AtomicUsize,
        seen: Mutex<Vec<(Option<String>, Option<String>)>>,
    }

    impl FakeRelay {
        fn new(fail: bool) -> Self {
            Self {
                fail,
                ..Default::default()
            }
        }
    }

    impl ConversionRelay for FakeRelay {
        async fn dispatch(
            &self,
            event: &AnalyticsEvent,
            ctx: &RequestContext,
        ) -> Result<(), RelayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen
                .lock()
                .unwrap()
                .push((event.event_id.clone(), ctx.fbp.clone()));
            if self.fail {
                Err(RelayError::Request("connection refused".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn track_request(event_id: Option<&str>) -> TrackRequest {
        TrackRequest {
            event_type: "add_to_cart".to_string(),
            event_id: event_id.map(String::from),
            fbp: Some("fb.1.123.456".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_both_legs_succeed() {
        let service = IngestService::new(FakeStore::new(false), Some(FakeRelay::new(false)));

        let ack = service
            .ingest(track_request(None), RequestContext::default())
            .await;

        assert_eq!(ack, TrackAck::ok());
    }

    #[tokio::test]
    async fn test_store_failure_does_not_prevent_relay() {
        let service = IngestService::new(FakeStore::new(true), Some(FakeRelay::new(false)));

        let ack = service
            .ingest(track_request(None), RequestContext::default())
            .await;

        // Acknowledgement is error-shaped but the relay was attempted.
        assert_eq!(ack.status, AckStatus::Error);
        assert_eq!(service.relay.as_ref().unwrap().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_relay_failure_does_not_prevent_store() {
        let service = IngestService::new(FakeStore::new(false), Some(FakeRelay::new(true)));

        let ack = service
            .ingest(track_request(None), RequestContext::default())
            .await;

        assert_eq!(ack.status, AckStatus::Error);
        assert_eq!(service.store.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_relay_configured_is_not_degraded() {
        let service = IngestService::<_, FakeRelay>::new(FakeStore::new(false), None);

        let ack = service
            .ingest(track_request(None), RequestContext::default())
            .await;

        assert_eq!(ack, TrackAck::ok());
    }

    #[tokio::test]
    async fn test_correlation_ids_reach_the_relay() {
        let service = IngestService::new(FakeStore::new(false), Some(FakeRelay::new(false)));

        service
            .ingest(track_request(Some("abc123")), RequestContext::default())
            .await;
        service
            .ingest(track_request(Some("abc123")), RequestContext::default())
            .await;

        let seen = service.relay.as_ref().unwrap().seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        // Same event id both times; body fbp folded into the context.
        for (event_id, fbp) in seen.iter() {
            assert_eq!(event_id.as_deref(), Some("abc123"));
            assert_eq!(fbp.as_deref(), Some("fb.1.123.456"));
        }
    }
}
