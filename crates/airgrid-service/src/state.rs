//! Application state shared across handlers.

use std::sync::Arc;

use time::OffsetDateTime;

use airgrid_core::{Services, StoreHandle};
use airgrid_types::RangeTable;

use crate::config::SecurityConfig;

/// Shared application state.
pub struct AppState {
    /// Workflow services over the one store opened at startup.
    pub services: Services,
    /// API key settings, shared with the auth middleware.
    pub security: Arc<SecurityConfig>,
    pub started_at: OffsetDateTime,
}

impl AppState {
    pub fn new(store: StoreHandle, ranges: RangeTable, security: SecurityConfig) -> Arc<Self> {
        Arc::new(Self {
            services: Services::new(store, ranges),
            security: Arc::new(security),
            started_at: OffsetDateTime::now_utc(),
        })
    }
}
