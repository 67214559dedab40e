//! Test server harness for E2E testing
//!
//! Provides `TestApiServer` for spawning real Task API server instances in
//! tests. The server runs the production router over an in-memory principal
//! store, so no database is required.

use crate::test_ids::TEST_JWT_SECRET_B64;
use axum::{extract::Path, routing::get, Extension, Json, Router};
use common::types::{Role, UserId};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use task_api::auth::password::hash_password;
use task_api::auth::{AuthenticatedUser, RevocationRegistry, RevocationService, TokenCodec};
use task_api::config::Config;
use task_api::routes::{self, ApiRoutes, AppState};
use task_api::services::{InMemoryPrincipalStore, Principal};
use tokio::task::JoinHandle;

/// Bcrypt cost used by test servers (the minimum the service accepts).
const TEST_BCRYPT_COST: &str = "10";

/// Test harness for spawning the Task API server in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_health() -> Result<(), anyhow::Error> {
///     let server = TestApiServer::spawn().await?;
///
///     let response = reqwest::get(format!("{}/health", server.url())).await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestApiServer {
    addr: SocketAddr,
    state: Arc<AppState>,
    store: Arc<InMemoryPrincipalStore>,
    revocation_service: Option<RevocationService>,
    _handle: JoinHandle<()>,
}

/// Options for [`TestApiServer`].
pub struct TestApiServerBuilder {
    routes: ApiRoutes,
    store: Arc<InMemoryPrincipalStore>,
    vars: HashMap<String, String>,
}

impl TestApiServerBuilder {
    /// Mount business routers into the gated groups.
    pub fn routes(mut self, routes: ApiRoutes) -> Self {
        self.routes = routes;
        self
    }

    /// Use a specific principal store (e.g. `InMemoryPrincipalStore::failing()`).
    pub fn store(mut self, store: Arc<InMemoryPrincipalStore>) -> Self {
        self.store = store;
        self
    }

    /// Override a configuration variable.
    pub fn var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_string(), value.to_string());
        self
    }

    /// Spawn the server.
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Start its revocation sweeper
    /// - Start the HTTP server in the background
    pub async fn spawn(self) -> Result<TestApiServer, anyhow::Error> {
        let config = Config::from_vars(&self.vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let revocation_service = RevocationService::start(Duration::from_secs(
            config.revocation_sweep_interval_seconds,
        ));

        let state = Arc::new(AppState::new(
            config,
            self.store.clone(),
            revocation_service.registry(),
        ));

        // Recorder is not installed globally; the handle only renders /metrics
        let metrics_handle = PrometheusBuilder::new().build_recorder().handle();

        let app = routes::build_routes(state.clone(), metrics_handle, self.routes);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(TestApiServer {
            addr,
            state,
            store: self.store,
            revocation_service: Some(revocation_service),
            _handle: handle,
        })
    }
}

impl TestApiServer {
    /// Builder with test defaults: in-memory store, test secret, bcrypt cost 10.
    pub fn builder() -> TestApiServerBuilder {
        let vars = HashMap::from([
            (
                "DATABASE_URL".to_string(),
                "postgresql://test/test".to_string(),
            ),
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            ("JWT_SECRET".to_string(), TEST_JWT_SECRET_B64.to_string()),
            ("BCRYPT_COST".to_string(), TEST_BCRYPT_COST.to_string()),
            ("DRAIN_SECONDS".to_string(), "0".to_string()),
        ]);

        TestApiServerBuilder {
            routes: ApiRoutes::default(),
            store: Arc::new(InMemoryPrincipalStore::new()),
            vars,
        }
    }

    /// Spawn with defaults and no business routes.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::builder().spawn().await
    }

    /// Spawn with [`identity_echo_routes`] mounted in every group.
    pub async fn spawn_with_echo_routes() -> Result<Self, anyhow::Error> {
        Self::builder().routes(identity_echo_routes()).spawn().await
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.state.config
    }

    /// The codec the server verifies with.
    pub fn codec(&self) -> &TokenCodec {
        &self.state.codec
    }

    /// The server's revocation registry.
    pub fn registry(&self) -> Arc<RevocationRegistry> {
        self.state.revocations.clone()
    }

    /// The server's principal store.
    pub fn store(&self) -> &InMemoryPrincipalStore {
        &self.store
    }

    /// Seed a user directly into the store with [`TEST_PASSWORD`](crate::TEST_PASSWORD).
    pub async fn seed_user(&self, username: &str, role: Role) -> Principal {
        let principal = Principal {
            id: UserId::new(),
            username: username.to_string(),
            email: format!("{}@example.com", username),
            password_hash: hash_password(crate::TEST_PASSWORD, self.config().bcrypt_cost)
                .expect("hashing the test password should succeed"),
            role,
        };
        self.store.insert(principal.clone()).await;
        principal
    }

    /// Issue a live token for a fresh identity with the given role.
    pub fn token_for(&self, role: Role) -> String {
        self.codec()
            .issue(&UserId::new().to_string(), "tester", role)
            .expect("issuing a test token should succeed")
    }

    /// Stop the revocation sweeper and wait for it to exit.
    pub async fn shutdown_sweeper(&mut self) {
        if let Some(service) = self.revocation_service.take() {
            service.shutdown().await;
        }
    }
}

impl Drop for TestApiServer {
    fn drop(&mut self) {
        // The revocation service cancels its sweeper on drop
        self._handle.abort();
    }
}

/// Business routes that echo the gate's identity.
///
/// - `GET /api/{admin,manager,staff}/whoami`
/// - `GET /api/attachments/:id/download`
pub fn identity_echo_routes() -> ApiRoutes {
    async fn whoami(Extension(user): Extension<AuthenticatedUser>) -> Json<Value> {
        Json(identity_json(&user))
    }

    async fn download(
        Path(id): Path<String>,
        Extension(user): Extension<AuthenticatedUser>,
    ) -> Json<Value> {
        let mut body = identity_json(&user);
        body["attachment_id"] = json!(id);
        Json(body)
    }

    ApiRoutes {
        admin: Router::new().route("/whoami", get(whoami)),
        manager: Router::new().route("/whoami", get(whoami)),
        staff: Router::new().route("/whoami", get(whoami)),
        attachments: Router::new().route("/:id/download", get(download)),
    }
}

fn identity_json(user: &AuthenticatedUser) -> Value {
    json!({
        "user_id": user.user_id,
        "username": user.username,
        "role": user.role,
    })
}
