//! HTTP REST API for the airgrid feedback workflow.
//!
//! Supervisors file air-quality reports, administrators assign them to
//! inspectors of the same region, and inspectors confirm them by submitting a
//! classified measurement.
//!
//! # REST API Endpoints
//!
//! - `GET /api/health` - Service health check (no auth required)
//! - `GET /api/public/levels` - Classification table
//! - `GET /api/public/measurements` - Confirmed measurements, newest first
//! - `GET /api/public/provinces` - Known provinces
//! - `GET /api/public/provinces/{id}/cities` - Cities of a province
//! - `POST /api/supervisor/feedback` - File a report
//! - `GET /api/supervisor/feedback` - The caller's own reports
//! - `GET /api/admin/feedback` - All reports, filterable by region and state
//! - `POST /api/admin/feedback/assign` - Assign a report to an inspector
//! - `POST /api/admin/inspectors` - Register an inspector
//! - `GET /api/admin/inspectors` - List inspectors
//! - `PUT /api/admin/inspectors/{id}/availability` - Mark working or inactive
//! - `GET /api/inspector/tasks` - The caller's assigned and confirmed reports
//! - `POST /api/inspector/measurements` - Submit a reading
//!
//! The caller is identified by the `X-Caller-Role` and `X-Caller-Id`
//! headers, set by the gateway in front of this service.
//!
//! # Configuration
//!
//! The service reads configuration from `~/.config/airgrid/server.toml`:
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:8080"
//!
//! [storage]
//! path = "~/.local/share/airgrid/airgrid.db"
//! busy_timeout_ms = 5000
//!
//! [security]
//! api_key_enabled = true
//! api_key = "your-secure-random-key-at-least-16-chars"
//!
//! [[regions]]
//! id = 1
//! name = "Liaoning"
//! abbr = "LN"
//! cities = [{ id = 1, name = "Shenyang" }, { id = 2, name = "Dalian" }]
//! ```
//!
//! Without `[[levels]]` the built-in six-level classification table is used.

pub mod api;
pub mod auth;
pub mod config;
pub mod middleware;
pub mod state;

pub use auth::Caller;
pub use config::{
    CityConfig, Config, ConfigError, RegionConfig, RetrySettings, SecurityConfig, ServerConfig,
    StorageConfig,
};
pub use state::AppState;
