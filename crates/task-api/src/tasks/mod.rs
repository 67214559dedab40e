//! Background tasks for the Task API.
//!
//! # Tasks
//!
//! - `revocation_sweeper` - Periodically drops expired revocation entries

pub mod revocation_sweeper;

pub use revocation_sweeper::start_revocation_sweeper;
