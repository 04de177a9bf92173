//! API layer
//!
//! HTTP handlers for:
//! - GitHub proxy endpoints (for the UI)
//! - Metrics (Prometheus)

mod github;
pub mod metrics;

pub use github::github_router;
pub use metrics::{metrics_router, track_http_metrics};
