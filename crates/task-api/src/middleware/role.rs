//! Role gate.
//!
//! Runs after the authentication gate and admits a request only if the
//! attached identity's role is in the route group's allow-set. A request with
//! no identity means the gate was mounted without authentication in front of
//! it; it is rejected as unauthenticated.

use crate::auth::AuthenticatedUser;
use crate::errors::{ApiError, MSG_NOT_AUTHENTICATED};
use crate::middleware::auth::IdentityExt;
use crate::observability::metrics;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use common::types::Role;
use std::sync::Arc;

/// Allow-set of roles for one route group.
#[derive(Debug, Clone)]
pub struct RoleGate {
    allowed: Arc<[Role]>,
}

impl RoleGate {
    /// Gate admitting exactly `roles`.
    pub fn require(roles: &[Role]) -> Self {
        Self {
            allowed: Arc::from(roles),
        }
    }

    /// `{admin}`
    pub fn admin() -> Self {
        Self::require(&[Role::Admin])
    }

    /// `{admin, manager}`
    pub fn manager() -> Self {
        Self::require(&[Role::Admin, Role::Manager])
    }

    /// `{admin, manager, staff}`
    pub fn staff() -> Self {
        Self::require(&[Role::Admin, Role::Manager, Role::Staff])
    }

    pub fn admits(&self, role: Role) -> bool {
        self.allowed.contains(&role)
    }

    /// Decide for an optional identity.
    ///
    /// # Errors
    ///
    /// - `ApiError::Unauthenticated` if there is no identity
    /// - `ApiError::Forbidden` if the role is not allowed
    pub fn check(&self, identity: Option<&AuthenticatedUser>) -> Result<(), ApiError> {
        let Some(user) = identity else {
            tracing::warn!(target: "task_api.middleware.role", "Role gate reached without an identity");
            metrics::record_auth_rejection("no_identity");
            return Err(ApiError::unauthenticated(MSG_NOT_AUTHENTICATED));
        };

        if !self.admits(user.role) {
            tracing::debug!(
                target: "task_api.middleware.role",
                role = %user.role,
                "Role not permitted for route group"
            );
            metrics::record_auth_rejection("forbidden");
            return Err(ApiError::Forbidden);
        }

        Ok(())
    }
}

/// Role gate middleware, used with `from_fn_with_state(RoleGate, require_role)`.
pub async fn require_role(
    State(gate): State<RoleGate>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    gate.check(req.identity())?;
    Ok(next.run(req).await)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, middleware, routing::get, Router};
    use tower::ServiceExt;

    fn user(role: Role) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: "user-1".to_string(),
            username: "alice".to_string(),
            role,
        }
    }

    #[test]
    fn test_admits_iff_role_in_allow_set() {
        // Every subset of the three roles
        for mask in 0u8..8 {
            let allowed: Vec<Role> = Role::ALL
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, r)| *r)
                .collect();
            let gate = RoleGate::require(&allowed);

            for role in Role::ALL {
                assert_eq!(gate.admits(role), allowed.contains(&role), "mask {mask} role {role}");
                assert_eq!(gate.check(Some(&user(role))).is_ok(), allowed.contains(&role));
            }
        }
    }

    #[test]
    fn test_standard_groups() {
        assert!(RoleGate::admin().admits(Role::Admin));
        assert!(!RoleGate::admin().admits(Role::Manager));
        assert!(RoleGate::manager().admits(Role::Manager));
        assert!(!RoleGate::manager().admits(Role::Staff));
        assert!(Role::ALL.iter().all(|r| RoleGate::staff().admits(*r)));
    }

    #[test]
    fn test_missing_identity_fails_closed() {
        let result = RoleGate::staff().check(None);
        assert!(matches!(result, Err(ApiError::Unauthenticated(msg)) if msg == "User not authenticated"));
    }

    #[test]
    fn test_disallowed_role_is_forbidden() {
        let result = RoleGate::manager().check(Some(&user(Role::Staff)));
        assert!(matches!(result, Err(ApiError::Forbidden)));
    }

    #[tokio::test]
    async fn test_middleware_without_auth_gate_returns_401() {
        let app = Router::new()
            .route("/reports", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(RoleGate::admin(), require_role));

        let response = app
            .oneshot(axum::http::Request::builder().uri("/reports").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_middleware_with_identity() {
        let app = |identity: AuthenticatedUser| {
            Router::new()
                .route("/reports", get(|| async { "ok" }))
                .layer(middleware::from_fn_with_state(RoleGate::manager(), require_role))
                .layer(axum::Extension(identity))
        };
        let request = || axum::http::Request::builder().uri("/reports").body(Body::empty()).unwrap();

        let staff = app(user(Role::Staff)).oneshot(request()).await.unwrap();
        let manager = app(user(Role::Manager)).oneshot(request()).await.unwrap();

        assert_eq!(staff.status(), StatusCode::FORBIDDEN);
        assert_eq!(manager.status(), StatusCode::OK);
    }
}
