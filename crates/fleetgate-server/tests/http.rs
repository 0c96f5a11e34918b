use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use fleetgate_server::auth::{Argon2Verifier, JwtManager, TokenPolicy};
use fleetgate_server::http::build_router;
use fleetgate_server::state::AppState;
use fleetgate_server::storage::FleetDatabase;

const POLICY: TokenPolicy = TokenPolicy {
    device_ttl_secs: 365 * 24 * 3600,
    admin_ttl_secs: 1800,
};

struct TestApp {
    router: axum::Router,
}

impl TestApp {
    async fn new() -> Self {
        let db = FleetDatabase::open_in_memory().await.unwrap();
        let state = AppState::new(
            db,
            JwtManager::new(b"integration-secret"),
            POLICY,
            Arc::new(Argon2Verifier::with_params(8, 1, 1).unwrap()),
        );
        Self {
            router: build_router(state, 64 * 1024),
        }
    }

    /// Send a request and return (status, body as JSON).
    ///
    /// Non-JSON bodies come back as a JSON string.
    async fn send(
        &self,
        method: Method,
        uri: &str,
        headers: &[(&str, &str)],
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        for &(name, value) in headers {
            builder = builder.header(name, value);
        }
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let resp = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, value)
    }

    async fn admin_token(&self, username: &str) -> String {
        let creds = [("username", username), ("password", "admin-pw")];
        let (status, _) = self
            .send(Method::POST, "/user/register", &creds, None)
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = self.send(Method::GET, "/user/login", &creds, None).await;
        assert_eq!(status, StatusCode::OK);
        body["access_token"].as_str().unwrap().to_string()
    }

    /// Register a device and return (id, token).
    async fn register_device(&self, username: &str, serial: &str) -> (i64, String) {
        let (status, body) = self
            .send(
                Method::POST,
                "/auth/register",
                &[("username", username), ("password", "device-pw")],
                Some(json!({ "serial_number": serial })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        (
            body["device"]["id"].as_i64().unwrap(),
            body["access_token"].as_str().unwrap().to_string(),
        )
    }

    async fn set_status(&self, admin: &str, device_id: i64, status: &str) -> (StatusCode, Value) {
        self.send(
            Method::PATCH,
            "/auth/update",
            &[("authorization", bearer(admin).as_str())],
            Some(json!({ "status": status, "device_id": device_id })),
        )
        .await
    }

    async fn submit(&self, token: &str, value: f64) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            "/data",
            &[("authorization", bearer(token).as_str())],
            Some(json!({ "value": value, "name": "temperature", "unit": "C" })),
        )
        .await
    }

    async fn status(&self, token: &str) -> (StatusCode, Value) {
        self.send(
            Method::GET,
            "/auth/status",
            &[("authorization", bearer(token).as_str())],
            None,
        )
        .await
    }
}

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new().await;
    let (status, body) = app.send(Method::GET, "/health", &[], None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn device_lifecycle_end_to_end() {
    let app = TestApp::new().await;
    let admin = app.admin_token("root").await;
    let (device_id, token) = app.register_device("sensor", "SN-1").await;

    // Pending devices get their status but no token, and cannot submit.
    let (status, body) = app.status(&token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["device"]["status"], "CREATED");
    assert!(body.get("access_token").is_none());

    let (status, body) = app.submit(&token, 20.0).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");

    let (status, body) = app
        .send(
            Method::GET,
            "/devices/requests",
            &[("authorization", bearer(&admin).as_str())],
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    // Approval unlocks ingest.
    let (status, body) = app.set_status(&admin, device_id, "APPROVED").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "APPROVED");

    let (status, body) = app.status(&token).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["access_token"].is_string());

    let (status, body) = app.submit(&token, 21.5).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "New data added successfully");

    // Blacklisting cuts the device off on its next request.
    let (status, _) = app.set_status(&admin, device_id, "BLACKLISTED").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.submit(&token, 22.0).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.status(&token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "token_revoked");

    let (status, _) = app
        .send(
            Method::GET,
            &format!("/auth/login/{device_id}"),
            &[("username", "sensor"), ("password", "device-pw")],
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn deleted_device_is_reactivated_by_serial() {
    let app = TestApp::new().await;
    let (device_id, _) = app.register_device("sensor", "SN-7").await;
    let creds = [("username", "sensor"), ("password", "device-pw")];

    let (status, body) = app
        .send(Method::DELETE, &format!("/auth/delete/{device_id}"), &creds, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "DELETED");

    let (status, body) = app
        .send(Method::DELETE, &format!("/auth/delete/{device_id}"), &creds, None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "already_deleted");

    let (status, body) = app
        .send(Method::GET, &format!("/auth/login/{device_id}"), &creds, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "account_deleted");

    let (again, _) = app.register_device("sensor-new", "SN-7").await;
    assert_eq!(again, device_id);

    let (status, body) = app
        .send(
            Method::GET,
            &format!("/auth/login/{device_id}"),
            &[("username", "sensor-new"), ("password", "device-pw")],
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["device"]["status"], "CREATED");
}

#[tokio::test]
async fn admin_logout_revokes_token() {
    let app = TestApp::new().await;
    let admin = app.admin_token("root").await;
    let header = bearer(&admin);
    let auth = [("authorization", header.as_str())];

    let (status, _) = app.send(Method::GET, "/devices/all", &auth, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.send(Method::GET, "/user/logout", &auth, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "The user was successfully logged out.");

    let (status, body) = app.send(Method::GET, "/devices/all", &auth, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "token_revoked");
}

#[tokio::test]
async fn admin_delete_removes_account() {
    let app = TestApp::new().await;
    let admin = app.admin_token("root").await;

    let (status, _) = app
        .send(
            Method::DELETE,
            "/user/delete",
            &[("authorization", bearer(&admin).as_str())],
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .send(
            Method::GET,
            "/user/login",
            &[("username", "root"), ("password", "admin-pw")],
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn device_token_cannot_manage_devices() {
    let app = TestApp::new().await;
    let (device_id, token) = app.register_device("sensor", "SN-1").await;

    let (status, _) = app.set_status(&token, device_id, "APPROVED").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send(
            Method::GET,
            "/devices/all",
            &[("authorization", bearer(&token).as_str())],
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_status_name_is_bad_request() {
    let app = TestApp::new().await;
    let admin = app.admin_token("root").await;
    let (device_id, _) = app.register_device("sensor", "SN-1").await;

    app.set_status(&admin, device_id, "APPROVED").await;

    let (status, body) = app.set_status(&admin, device_id, "LOST").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_status");

    let (status, body) = app
        .send(
            Method::GET,
            "/devices/all",
            &[("authorization", bearer(&admin).as_str())],
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["status"], "APPROVED");
}

#[tokio::test]
async fn auth_failures_are_distinguished() {
    let app = TestApp::new().await;

    let (status, body) = app.send(Method::GET, "/auth/status", &[], None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "authorization_required");

    let (status, body) = app.status("garbage").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_token");

    let expired = JwtManager::new(b"integration-secret")
        .issue(1, fleetgate_server::storage::AccountKind::Device, -3600)
        .unwrap();
    let (status, body) = app.status(&expired.token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "token_expired");
}

#[tokio::test]
async fn malformed_input_is_a_validation_error() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send(Method::POST, "/user/register", &[("username", "root")], None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (status, body) = app
        .send(
            Method::POST,
            "/auth/register",
            &[("username", "sensor"), ("password", "pw")],
            Some(json!({ "serial": "SN-1" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn duplicate_registrations_conflict() {
    let app = TestApp::new().await;
    app.admin_token("root").await;
    app.register_device("sensor", "SN-1").await;

    let (status, _) = app
        .send(
            Method::POST,
            "/user/register",
            &[("username", "root"), ("password", "x")],
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .send(
            Method::POST,
            "/auth/register",
            &[("username", "other"), ("password", "x")],
            Some(json!({ "serial_number": "SN-1" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
async fn reading_accepts_time_alias() {
    let app = TestApp::new().await;
    let admin = app.admin_token("root").await;
    let (device_id, token) = app.register_device("sensor", "SN-1").await;
    app.set_status(&admin, device_id, "APPROVED").await;

    let (status, _) = app
        .send(
            Method::POST,
            "/data",
            &[("authorization", bearer(&token).as_str())],
            Some(json!({ "value": 3, "name": "pressure", "unit": "kPa", "time": 1_700_000_000 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn reading_value_may_be_a_numeric_string() {
    let app = TestApp::new().await;
    let admin = app.admin_token("root").await;
    let (device_id, token) = app.register_device("sensor", "SN-1").await;
    app.set_status(&admin, device_id, "APPROVED").await;
    let auth = bearer(&token);

    let (status, _) = app
        .send(
            Method::POST,
            "/data",
            &[("authorization", auth.as_str())],
            Some(json!({ "value": "11", "name": "Temp", "unit": "C" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .send(
            Method::POST,
            "/data",
            &[("authorization", auth.as_str())],
            Some(json!({ "value": "warm", "name": "Temp", "unit": "C" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}
