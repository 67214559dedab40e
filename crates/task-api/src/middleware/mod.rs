//! HTTP middleware for the Task API.
//!
//! - `auth` - Authentication gate (header and download variants)
//! - `role` - Role gate over the identity the authentication gate attaches
//! - `http_metrics` - Request metrics, outermost layer

pub mod auth;
pub mod http_metrics;
pub mod role;

pub use auth::{require_auth, require_download_auth, AuthState, IdentityExt};
pub use http_metrics::http_metrics_middleware;
pub use role::{require_role, RoleGate};
