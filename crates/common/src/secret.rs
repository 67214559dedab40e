//! Secret wrappers for values that must never reach a log line.
//!
//! Thin re-export of the [`secrecy`] crate. Any struct that derives `Debug`
//! and holds one of these types prints `[REDACTED]` in place of the value,
//! so `tracing` fields and `{:?}` formatting stay safe by construction.
//!
//! Use `SecretString` for:
//! - Login passwords while they travel from the request body to bcrypt
//! - Bearer tokens kept in request extensions for logout
//!
//! Use `SecretBox<Vec<u8>>` for the HMAC signing key.
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct LoginForm {
//!     identifier: String,
//!     password: SecretString,
//! }
//!
//! let form = LoginForm {
//!     identifier: "alice".to_string(),
//!     password: SecretString::from("hunter2"),
//! };
//!
//! assert!(!format!("{form:?}").contains("hunter2"));
//! assert_eq!(form.password.expose_secret(), "hunter2");
//! ```

pub use secrecy::{ExposeSecret, SecretBox, SecretString};
