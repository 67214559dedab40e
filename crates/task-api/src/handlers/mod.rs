//! HTTP request handlers for the Task API.

pub mod auth_handler;
pub mod health;
pub mod metrics;

pub use health::{health_check, readiness_check};
pub use metrics::metrics_handler;
