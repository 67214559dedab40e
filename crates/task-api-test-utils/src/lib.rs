//! # Task API Test Utilities
//!
//! Shared test utilities for the Task API service.
//!
//! This crate provides:
//! - Server test harness (`TestApiServer` for E2E tests)
//! - Token builders for hand-crafted and malformed tokens
//! - Token assertions
//! - Fixed test identifiers and secrets
//!
//! ## Usage
//!
//! ```rust,ignore
//! use task_api_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<(), anyhow::Error> {
//!     let server = TestApiServer::spawn().await?;
//!
//!     let response = reqwest::get(format!("{}/health", server.url())).await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod assertions;
pub mod server_harness;
pub mod test_ids;
pub mod token_builders;

pub use assertions::*;
pub use server_harness::*;
pub use test_ids::*;
pub use token_builders::*;
