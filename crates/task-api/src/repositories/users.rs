//! User repository: PostgreSQL-backed principal store.
//!
//! Schema lives in `migrations/`. `role` is stored as lowercase text and
//! parsed on read.

use crate::services::principal_store::{
    NewPrincipal, Principal, PrincipalStore, PrincipalStoreError,
};
use async_trait::async_trait;
use common::types::{Role, UserId};
use sqlx::PgPool;
use uuid::Uuid;

/// User row (maps to users table)
#[derive(Debug, Clone, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    role: String,
}

impl TryFrom<UserRow> for Principal {
    type Error = PrincipalStoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = row.role.parse::<Role>().map_err(|e| {
            tracing::error!(target: "task_api.repositories.users", user_id = %row.id, "Stored role is not recognized");
            PrincipalStoreError::Backend(e.to_string())
        })?;

        Ok(Principal {
            id: UserId(row.id),
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            role,
        })
    }
}

/// Principal store over a PostgreSQL pool.
#[derive(Clone)]
pub struct PgPrincipalStore {
    pool: PgPool,
}

impl PgPrincipalStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PrincipalStore for PgPrincipalStore {
    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<Principal>, PrincipalStoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, email, password_hash, role
            FROM users
            WHERE username = $1 OR email = $1
            LIMIT 1
            "#,
        )
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PrincipalStoreError::Backend(format!("Failed to fetch user: {}", e)))?;

        row.map(Principal::try_from).transpose()
    }

    async fn create(&self, new: NewPrincipal) -> Result<Principal, PrincipalStoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (username, email, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, email, password_hash, role
            "#,
        )
        .bind(&new.username)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(new.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => PrincipalStoreError::Duplicate,
            _ => PrincipalStoreError::Backend(format!("Failed to create user: {}", e)),
        })?;

        Principal::try_from(row)
    }

    async fn ping(&self) -> Result<(), PrincipalStoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| PrincipalStoreError::Backend(e.to_string()))
    }
}
