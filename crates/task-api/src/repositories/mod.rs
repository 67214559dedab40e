//! Database repositories.

pub mod users;

pub use users::PgPrincipalStore;
