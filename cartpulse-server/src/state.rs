//! Shared application state threaded through the axum router.

use std::sync::Arc;

use cartpulse_core::{ConversionClient, Database, DashboardEngine, IngestService};

/// Everything the handlers need, cheap to clone per request.
#[derive(Clone)]
pub struct AppState {
    pub ingest: Arc<IngestService<Arc<Database>, ConversionClient>>,
    pub dashboard: Arc<DashboardEngine<Arc<Database>>>,
    pub admin_token: Option<Arc<str>>,
}

impl AppState {
    pub fn new(
        db: Arc<Database>,
        relay: Option<ConversionClient>,
        admin_token: Option<String>,
    ) -> Self {
        Self {
            ingest: Arc::new(IngestService::new(db.clone(), relay)),
            dashboard: Arc::new(DashboardEngine::new(db)),
            admin_token: admin_token.map(Arc::from),
        }
    }
}
