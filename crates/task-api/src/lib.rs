//! Task API Service Library
//!
//! Authentication and authorization core for the task-management API:
//!
//! - Token issuance and stateless verification (HS256)
//! - Stateful revocation of logged-out tokens, swept in the background
//! - Authentication gate (header and download-link variants)
//! - Role gate over `admin` / `manager` / `staff`
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> middleware/*.rs -> handlers/*.rs -> services/*.rs -> repositories/*.rs
//! ```
//!
//! The revocation registry is owned by a [`auth::RevocationService`] built
//! once in `main` and handed to the router through [`routes::AppState`].
//!
//! # Modules
//!
//! - `auth` - Codec, claims, passwords, revocation registry
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Authentication, role and metrics middleware
//! - `models` - Request and response bodies
//! - `observability` - Metrics and log-safe fingerprints
//! - `repositories` - PostgreSQL principal store
//! - `routes` - Axum router setup
//! - `services` - Registration, login, logout, token issuance
//! - `tasks` - Background tasks

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod tasks;
