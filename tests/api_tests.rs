use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use fleet_mileage::config::environment::EnvironmentConfig;
use fleet_mileage::models::auth::{Actor, UserRole};
use fleet_mileage::utils::jwt::generate_token;
use fleet_mileage::{create_app, AppState};

struct TestApp {
    router: Router,
    state: AppState,
}

impl TestApp {
    fn new() -> Self {
        let state = AppState::in_memory(EnvironmentConfig::default());
        Self {
            router: create_app(state.clone()),
            state,
        }
    }

    fn token(&self, role: UserRole, assigned_vehicle_id: Option<Uuid>) -> String {
        let actor = Actor {
            user_id: Uuid::new_v4(),
            role,
            assigned_vehicle_id,
        };
        generate_token(&actor, &self.state.jwt).unwrap()
    }

    async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    async fn create_vehicle(&self, token: &str, fleet_number: &str) -> Value {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/vehicles",
                Some(token),
                Some(json!({
                    "registration_number": format!("REG {}", fleet_number),
                    "fleet_number": fleet_number
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["data"].clone()
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "fleet_mileage");
}

#[tokio::test]
async fn test_api_requires_token() {
    let app = TestApp::new();

    let (status, body) = app.send(Method::GET, "/api/vehicles", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = app.send(Method::GET, "/api/vehicles", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_record_mileage_flow() {
    let app = TestApp::new();
    let token = app.token(UserRole::Manager, None);
    app.create_vehicle(&token, "VH-100").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/mileage",
            Some(&token),
            Some(json!({ "vehicle_id": "VH-100", "mileage": 4850 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["vehicle"]["status"], "NEAR_LIMIT");
    assert_eq!(body["data"]["alert"]["kind"], "NEAR_LIMIT");
    assert_eq!(body["data"]["record"]["recorded_mileage"], 4850);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/mileage",
            Some(&token),
            Some(json!({ "vehicle_id": "VH-100", "mileage": 4850 })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "DUPLICATE_SUBMISSION");

    let (status, body) = app
        .send(
            Method::POST,
            "/api/mileage",
            Some(&token),
            Some(json!({ "vehicle_id": "VH-100", "mileage": 100 })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["details"]["current_mileage"], 4850);

    let (status, body) = app
        .send(Method::GET, "/api/mileage/VH-100/history", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["miles_added"], 4850);
}

#[tokio::test]
async fn test_unknown_vehicle_returns_404() {
    let app = TestApp::new();
    let token = app.token(UserRole::Admin, None);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/mileage",
            Some(&token),
            Some(json!({ "vehicle_id": "GHOST-1", "mileage": 10 })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_driver_cannot_manage_fleet() {
    let app = TestApp::new();
    let manager = app.token(UserRole::Manager, None);
    let vehicle = app.create_vehicle(&manager, "VH-200").await;
    let other = app.create_vehicle(&manager, "VH-201").await;
    let vehicle_id: Uuid = serde_json::from_value(vehicle["id"].clone()).unwrap();
    let driver = app.token(UserRole::Driver, Some(vehicle_id));

    let (status, _) = app
        .send(
            Method::POST,
            "/api/vehicles",
            Some(&driver),
            Some(json!({ "registration_number": "REG 999" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/mileage",
            Some(&driver),
            Some(json!({ "vehicle_id": other["id"], "mileage": 10 })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.send(Method::PUT, "/api/alerts/acknowledge-all", Some(&driver), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.send(Method::GET, "/api/vehicles", Some(&driver), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_alert_acknowledgement() {
    let app = TestApp::new();
    let token = app.token(UserRole::Manager, None);
    app.create_vehicle(&token, "VH-300").await;
    app.create_vehicle(&token, "VH-301").await;

    for (vehicle, mileage) in [("VH-300", 5000), ("VH-301", 4900)] {
        let (status, _) = app
            .send(
                Method::POST,
                "/api/mileage",
                Some(&token),
                Some(json!({ "vehicle_id": vehicle, "mileage": mileage })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, body) = app
        .send(Method::GET, "/api/alerts?vehicle_id=VH-300", Some(&token), None)
        .await;
    assert_eq!(body["data"]["total"], 1);
    let alert_id = body["data"]["items"][0]["id"].as_str().unwrap().to_string();

    let uri = format!("/api/alerts/{}/acknowledge", alert_id);
    let (status, first) = app.send(Method::PATCH, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["data"]["acknowledged"], true);
    let (_, second) = app.send(Method::PATCH, &uri, Some(&token), None).await;
    assert_eq!(first["data"]["acknowledged_at"], second["data"]["acknowledged_at"]);

    let (status, body) = app.send(Method::PUT, "/api/alerts/acknowledge-all", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "acknowledged": 1 }));

    let (_, body) = app
        .send(Method::GET, "/api/alerts?acknowledged=false", Some(&token), None)
        .await;
    assert_eq!(body["data"]["total"], 0);
}

#[tokio::test]
async fn test_settings_update_requires_admin() {
    let app = TestApp::new();
    let manager = app.token(UserRole::Manager, None);
    let admin = app.token(UserRole::Admin, None);
    let patch = json!({ "warning_margin": 300 });

    let (status, _) = app.send(Method::PUT, "/api/settings", Some(&manager), Some(patch.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.send(Method::PUT, "/api/settings", Some(&admin), Some(patch)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["warning_margin"], 300);

    let (_, body) = app.send(Method::GET, "/api/settings", Some(&manager), None).await;
    assert_eq!(body["data"]["warning_margin"], 300);
    assert_eq!(body["data"]["default_mileage_limit"], 5000);
}

#[tokio::test]
async fn test_maintenance_reset_and_activity() {
    let app = TestApp::new();
    let token = app.token(UserRole::Admin, None);
    app.create_vehicle(&token, "VH-400").await;
    app.send(
        Method::POST,
        "/api/mileage",
        Some(&token),
        Some(json!({ "vehicle_id": "VH-400", "mileage": 5200 })),
    )
    .await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/maintenance",
            Some(&token),
            Some(json!({
                "vehicle_id": "VH-400",
                "description": "Oil and filters",
                "cost": "149.90",
                "reset_mileage": true
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["vehicle"]["status"], "ACTIVE");
    assert_eq!(body["data"]["vehicle"]["service_cycle"], 1);

    let (status, body) = app
        .send(Method::GET, "/api/maintenance?vehicle_id=VH-400", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);

    let (status, body) = app.send(Method::GET, "/api/activity?limit=10", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let kinds: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|e| e["kind"].as_str())
        .collect();
    assert!(kinds.contains(&"MAINTENANCE"));
    assert!(kinds.contains(&"MILEAGE"));
}

#[tokio::test]
async fn test_deleted_vehicle_is_gone() {
    let app = TestApp::new();
    let token = app.token(UserRole::Manager, None);
    app.create_vehicle(&token, "VH-500").await;

    let (status, _) = app.send(Method::DELETE, "/api/vehicles/VH-500", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.send(Method::GET, "/api/vehicles/VH-500", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/mileage",
            Some(&token),
            Some(json!({ "vehicle_id": "VH-500", "mileage": 10 })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_metrics_exposition() {
    let app = TestApp::new();
    let token = app.token(UserRole::Manager, None);
    app.create_vehicle(&token, "VH-600").await;
    app.send(
        Method::POST,
        "/api/mileage",
        Some(&token),
        Some(json!({ "vehicle_id": "VH-600", "mileage": 4900 })),
    )
    .await;

    let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("fleet_mileage_recordings_total"));
    assert!(text.contains("fleet_alerts_fired_total"));
}
