//! Common utilities and types shared across the task API crates.

#![warn(clippy::pedantic)]

/// Module for common data types (user identifiers, roles)
pub mod types;

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for JWT utilities (size limits, clock skew, iat validation)
pub mod jwt;
