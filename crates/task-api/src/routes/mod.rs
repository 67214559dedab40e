//! HTTP routes for the Task API.
//!
//! Defines the Axum router, the application state, and the role-gated route
//! groups that business routers mount into.

use crate::auth::{RevocationRegistry, TokenCodec};
use crate::config::Config;
use crate::handlers::{self, auth_handler};
use crate::middleware::{
    http_metrics_middleware, require_auth, require_download_auth, require_role, AuthState,
    RoleGate,
};
use crate::services::{PrincipalStore, TokenIssuer};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Users backing issued tokens.
    pub store: Arc<dyn PrincipalStore>,

    /// Token codec, shared with the authentication gate.
    pub codec: Arc<TokenCodec>,

    /// Mints tokens at login.
    pub issuer: TokenIssuer,

    /// Revocation registry owned by the running `RevocationService`.
    pub revocations: Arc<RevocationRegistry>,

    /// Service configuration.
    pub config: Config,
}

impl AppState {
    /// Build state from configuration, deriving the codec from the signing secret.
    pub fn new(
        config: Config,
        store: Arc<dyn PrincipalStore>,
        revocations: Arc<RevocationRegistry>,
    ) -> Self {
        let codec = Arc::new(TokenCodec::new(
            config.jwt_secret_bytes(),
            config.token_ttl_seconds,
            config.jwt_clock_skew_seconds,
        ));

        Self {
            store,
            issuer: TokenIssuer::new(codec.clone()),
            codec,
            revocations,
            config,
        }
    }
}

/// Business routers mounted behind the gates.
///
/// Each router's paths are relative to its group prefix. Empty routers are
/// allowed and mount nothing.
#[derive(Default)]
pub struct ApiRoutes {
    /// `/api/admin`: `{admin}`
    pub admin: Router,

    /// `/api/manager`: `{admin, manager}`
    pub manager: Router,

    /// `/api/staff`: `{admin, manager, staff}`
    pub staff: Router,

    /// `/api/attachments`: download gate, `{admin, manager, staff}`
    pub attachments: Router,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health`, `/ready`, `/metrics` - public operational endpoints
/// - `/api/auth/register`, `/api/auth/login` - public
/// - `/api/auth/logout`, `/api/auth/verify` - authentication gate
/// - `/api/{admin,manager,staff}/...` - authentication gate, then role gate
/// - `/api/attachments/...` - download gate, then role gate
/// - TraceLayer, a 30 second timeout, and HTTP metrics (outermost)
pub fn build_routes(
    state: Arc<AppState>,
    metrics_handle: PrometheusHandle,
    api: ApiRoutes,
) -> Router {
    let auth_state = Arc::new(AuthState {
        codec: state.codec.clone(),
        revocations: state.revocations.clone(),
    });

    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/api/auth/register", post(auth_handler::register))
        .route("/api/auth/login", post(auth_handler::login))
        .with_state(state.clone());

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let session_routes = Router::new()
        .route("/api/auth/logout", post(auth_handler::logout))
        .route("/api/auth/verify", get(auth_handler::verify))
        .route_layer(middleware::from_fn_with_state(
            auth_state.clone(),
            require_auth,
        ))
        .with_state(state);

    // Role gate runs inside the authentication gate: the last layer added runs first
    let header_gated = |router: Router, gate: RoleGate| {
        router
            .layer(middleware::from_fn_with_state(gate, require_role))
            .layer(middleware::from_fn_with_state(
                auth_state.clone(),
                require_auth,
            ))
    };

    let attachment_routes = api
        .attachments
        .layer(middleware::from_fn_with_state(RoleGate::staff(), require_role))
        .layer(middleware::from_fn_with_state(
            auth_state.clone(),
            require_download_auth,
        ));

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer (innermost)
    // 2. TraceLayer
    // 3. http_metrics_middleware (outermost), sees every response
    public_routes
        .merge(metrics_routes)
        .merge(session_routes)
        .nest("/api/admin", header_gated(api.admin, RoleGate::admin()))
        .nest("/api/manager", header_gated(api.manager, RoleGate::manager()))
        .nest("/api/staff", header_gated(api.staff, RoleGate::staff()))
        .nest("/api/attachments", attachment_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(middleware::from_fn(http_metrics_middleware))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }
}
