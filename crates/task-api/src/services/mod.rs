pub mod auth_service;
pub mod principal_store;
pub mod token_service;

pub use principal_store::{InMemoryPrincipalStore, NewPrincipal, Principal, PrincipalStore};
pub use token_service::TokenIssuer;
