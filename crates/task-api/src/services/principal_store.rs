//! Principal store: the user records that back issued tokens.
//!
//! Production uses [`PgPrincipalStore`](crate::repositories::PgPrincipalStore).
//! Tests and the test harness use [`InMemoryPrincipalStore`].

use crate::errors::ApiError;
use async_trait::async_trait;
use common::types::{Role, UserId};
use std::fmt;
use thiserror::Error;

/// A stored user.
#[derive(Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Principal")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password_hash", &"[REDACTED]")
            .field("role", &self.role)
            .finish()
    }
}

/// Fields for a user about to be created. The id is assigned by the store.
#[derive(Clone)]
pub struct NewPrincipal {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Debug, Error)]
pub enum PrincipalStoreError {
    /// Username or email already taken.
    #[error("username or email already exists")]
    Duplicate,

    #[error("principal store failure: {0}")]
    Backend(String),
}

impl From<PrincipalStoreError> for ApiError {
    fn from(err: PrincipalStoreError) -> Self {
        match err {
            PrincipalStoreError::Duplicate => {
                ApiError::BadRequest("Username or email already exists".to_string())
            }
            PrincipalStoreError::Backend(detail) => ApiError::Database(detail),
        }
    }
}

/// Every capability the service needs from a user store.
#[async_trait]
pub trait PrincipalStore: Send + Sync {
    /// Look up a user by username or email (exact match on either).
    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<Principal>, PrincipalStoreError>;

    /// Create a user. Fails with `Duplicate` if the username or email is taken.
    async fn create(&self, new: NewPrincipal) -> Result<Principal, PrincipalStoreError>;

    /// Cheap liveness probe for the readiness endpoint.
    async fn ping(&self) -> Result<(), PrincipalStoreError>;
}

pub mod memory {
    //! Process-local store for tests and the test server harness.

    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::RwLock;

    /// In-memory principal store.
    #[derive(Default)]
    pub struct InMemoryPrincipalStore {
        principals: RwLock<Vec<Principal>>,
        unavailable: AtomicBool,
    }

    impl InMemoryPrincipalStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Create a store whose every call fails, for readiness and error-path tests.
        pub fn failing() -> Self {
            let store = Self::default();
            store.set_available(false);
            store
        }

        /// Toggle simulated backend availability.
        pub fn set_available(&self, available: bool) {
            self.unavailable.store(!available, Ordering::SeqCst);
        }

        /// Insert a fully-formed principal, bypassing duplicate checks.
        pub async fn insert(&self, principal: Principal) {
            self.principals.write().await.push(principal);
        }

        /// Number of stored principals.
        pub async fn len(&self) -> usize {
            self.principals.read().await.len()
        }

        pub async fn is_empty(&self) -> bool {
            self.principals.read().await.is_empty()
        }

        fn check_available(&self) -> Result<(), PrincipalStoreError> {
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(PrincipalStoreError::Backend(
                    "in-memory store marked unavailable".to_string(),
                ));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl PrincipalStore for InMemoryPrincipalStore {
        async fn find_by_identifier(
            &self,
            identifier: &str,
        ) -> Result<Option<Principal>, PrincipalStoreError> {
            self.check_available()?;
            let principals = self.principals.read().await;
            Ok(principals
                .iter()
                .find(|p| p.username == identifier || p.email == identifier)
                .cloned())
        }

        async fn create(&self, new: NewPrincipal) -> Result<Principal, PrincipalStoreError> {
            self.check_available()?;
            let mut principals = self.principals.write().await;

            if principals
                .iter()
                .any(|p| p.username == new.username || p.email == new.email)
            {
                return Err(PrincipalStoreError::Duplicate);
            }

            let principal = Principal {
                id: UserId::new(),
                username: new.username,
                email: new.email,
                password_hash: new.password_hash,
                role: new.role,
            };
            principals.push(principal.clone());
            Ok(principal)
        }

        async fn ping(&self) -> Result<(), PrincipalStoreError> {
            self.check_available()
        }
    }
}

pub use memory::InMemoryPrincipalStore;
