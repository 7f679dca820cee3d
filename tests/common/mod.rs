use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use textile_erp::{
    auth::{AuthConfig, AuthService},
    config::AppConfig,
    db,
    events,
    services::users::{CreateUser, UserService},
    AppState,
};
use tower::ServiceExt;
use uuid::Uuid;

pub const ADMIN_EMAIL: &str = "admin@mill.test";
pub const ADMIN_PASSWORD: &str = "Spindle2024x";
pub const USER_PASSWORD: &str = "Rotor55shift";

/// Helper harness for spinning up the full router over an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    token: String,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with a migrated schema and a logged-in admin.
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "integration_tests_only_weft_warp_heddle_reed_shuttle_secret_5c1e9a7b".to_string(),
            3600,
            86_400,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // Every connection to sqlite::memory: is its own database.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.cors_allow_any_origin = true;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_sender, event_rx) = events::channel(256);
        let event_task = tokio::spawn(events::process_events(event_rx));

        UserService::new(db_arc.clone())
            .create(CreateUser {
                name: "Mill Admin".to_string(),
                email: ADMIN_EMAIL.to_string(),
                password: ADMIN_PASSWORD.to_string(),
                role: "admin".to_string(),
                unit: None,
            })
            .await
            .expect("seed admin for tests");

        let auth_service = Arc::new(AuthService::new(AuthConfig::from(&cfg), db_arc.clone()));
        let state = AppState::new(db_arc, cfg, event_sender);
        let router = textile_erp::app_router(state.clone(), auth_service);

        let mut app = Self {
            router,
            state,
            token: String::new(),
            _event_task: event_task,
        };
        app.token = app.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
        app
    }

    /// Access the bearer token for the seeded admin.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Log in and return the access token.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .request(
                Method::POST,
                "/auth/login",
                Some(json!({ "email": email, "password": password })),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK, "login failed for {email}");
        let body = json_body(response).await;
        body["data"]["access_token"]
            .as_str()
            .expect("access token in login response")
            .to_string()
    }

    /// Provision an account with the given role and unit, then log it in.
    pub async fn token_for(&self, role: &str, unit: Option<i32>) -> String {
        let email = format!("{}-{}@mill.test", role, Uuid::new_v4().simple());
        self.state
            .services
            .users
            .create(CreateUser {
                name: format!("Test {}", role),
                email: email.clone(),
                password: USER_PASSWORD.to_string(),
                role: role.to_string(),
                unit,
            })
            .await
            .expect("seed user for tests");
        self.login(&email, USER_PASSWORD).await
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Convenience helper for admin-authenticated JSON requests.
    pub async fn request_authenticated(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response {
        self.request(method, uri, body, Some(self.token())).await
    }

    /// Admin request that must succeed; returns the `data` member of the envelope.
    pub async fn ok(&self, method: Method, uri: &str, body: Option<Value>) -> Value {
        let response = self.request_authenticated(method.clone(), uri, body).await;
        let status = response.status();
        let body = json_body(response).await;
        assert!(
            status.is_success(),
            "{method} {uri} returned {status}: {body}"
        );
        body["data"].clone()
    }

    /// Create an ASU machine and return its id.
    pub async fn seed_asu_machine(&self, unit: i32, machine_no: i32, production_at_100: f64) -> i64 {
        let data = self
            .ok(
                Method::POST,
                "/api/v1/asu/machines",
                Some(json!({
                    "unit": unit,
                    "machine_no": machine_no,
                    "machine_name": format!("ASU-{}-{:02}", unit, machine_no),
                    "count": "30s",
                    "yarn_type": "Cotton Combed",
                    "spindles": 1008,
                    "speed": 17500.0,
                    "production_at_100": production_at_100
                })),
            )
            .await;
        data["id"].as_i64().expect("machine id")
    }

    /// Create a stock item and return its id.
    pub async fn seed_item(&self, sku: &str, quantity: f64, unit_cost: f64) -> i64 {
        let data = self
            .ok(
                Method::POST,
                "/api/v1/inventory",
                Some(json!({
                    "sku": sku,
                    "name": format!("Item {}", sku),
                    "category": "raw_material",
                    "unit_of_measure": "kg",
                    "quantity": quantity,
                    "reorder_level": 10.0,
                    "unit_cost": unit_cost
                })),
            )
            .await;
        data["id"].as_i64().expect("item id")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

/// Read a response body as JSON.
pub async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("response body is json")
}
