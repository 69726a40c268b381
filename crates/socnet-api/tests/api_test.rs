// Router tests against the in-memory store
// Run with: cargo test -p socnet-api --test api_test

use std::sync::{mpsc, Arc};

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use socnet_api::api::Health;
use socnet_api::{build_router, AppState, Dispatcher};
use socnet_pool::{WorkerPool, WorkerPoolConfig};
use socnet_storage::StorageBackend;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    workers: Arc<WorkerPool>,
    health: Arc<Health>,
}

fn test_app(threads: usize, capacity: usize) -> TestApp {
    let workers = Arc::new(
        WorkerPool::new(
            WorkerPoolConfig::new("api-test")
                .with_threads(threads)
                .with_capacity(capacity),
        )
        .unwrap(),
    );
    let health = Arc::new(Health::new());
    health.set_live(true);
    health.set_ready(true);

    let state = AppState::new(
        StorageBackend::in_memory(),
        Dispatcher::new(Arc::clone(&workers)),
        Arc::clone(&health),
    );

    TestApp {
        router: build_router(state),
        workers,
        health,
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn json_body(body: &Bytes) -> Value {
    serde_json::from_slice(body).unwrap()
}

fn registration(first_name: &str, second_name: &str) -> Value {
    json!({
        "password": "long-enough",
        "first_name": first_name,
        "second_name": second_name,
        "birthdate": "1991-07-15",
        "biography": "Rowing",
        "city": "Tver"
    })
}

async fn register(app: &Router, first_name: &str, second_name: &str) -> String {
    let (status, _, body) = send(
        app,
        post_json("/user/register", registration(first_name, second_name)),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", String::from_utf8_lossy(&body));
    json_body(&body)["user_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_register_login_and_get() {
    let app = test_app(2, 16);

    let user_id = register(&app.router, "Maria", "Orlova").await;

    let (status, _, body) = send(&app.router, get(&format!("/user/get/{user_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json_body(&body),
        json!({
            "id": user_id,
            "first_name": "Maria",
            "second_name": "Orlova",
            "birthdate": "1991-07-15",
            "biography": "Rowing",
            "city": "Tver"
        })
    );

    let (status, _, body) = send(
        &app.router,
        post_json("/login", json!({"id": user_id, "password": "long-enough"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body), json!({"token": user_id}));

    let (status, _, body) = send(
        &app.router,
        post_json("/login", json!({"id": user_id, "password": "wrong-password"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json_body(&body)["code"], 400);
}

#[tokio::test]
async fn test_login_errors() {
    let app = test_app(1, 16);

    let (status, _, body) = send(
        &app.router,
        post_json(
            "/login",
            json!({"id": "0192f0c1-7a4b-7c3e-9d2f-1a2b3c4d5e6f", "password": "whatever1"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json_body(&body)["code"], 404);

    let (status, _, _) = send(
        &app.router,
        post_json("/login", json!({"id": "not-a-uuid", "password": "whatever1"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = send(&app.router, post_json("/login", json!({"id": 42}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_validation() {
    let app = test_app(1, 16);

    let mut short_password = registration("Ivan", "Petrov");
    short_password["password"] = json!("1234567");

    let mut bad_date = registration("Ivan", "Petrov");
    bad_date["birthdate"] = json!("15.07.1991");

    let mut too_young = registration("Ivan", "Petrov");
    too_young["birthdate"] = json!("2010-01-01");

    let mut long_city = registration("Ivan", "Petrov");
    long_city["city"] = json!("x".repeat(51));

    let mut missing_city = registration("Ivan", "Petrov");
    missing_city.as_object_mut().unwrap().remove("city");

    for body in [short_password, bad_date, too_young, long_city, missing_city] {
        let (status, headers, response) = send(&app.router, post_json("/user/register", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        assert_eq!(json_body(&response)["code"], 400);
    }

    // Nothing reached the worker pool
    assert_eq!(app.workers.stats().last_id, 0);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = test_app(1, 16);

    let request = Request::builder()
        .method("POST")
        .uri("/user/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"password\":"))
        .unwrap();

    let (status, _, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json_body(&body)["code"], 400);
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let app = test_app(1, 16);

    let mut body = registration("Ivan", "Petrov");
    body["biography"] = json!("b".repeat(2 * 1024 * 1024));

    let (status, _, _) = send(&app.router, post_json("/user/register", body)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_get_user_errors() {
    let app = test_app(1, 16);

    let (status, _, body) = send(&app.router, get("/user/get/12345")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json_body(&body)["code"], 400);

    let (status, _, body) = send(
        &app.router,
        get("/user/get/0192f0c1-7a4b-7c3e-9d2f-1a2b3c4d5e6f"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        json_body(&body),
        json!({"code": 404, "message": "user not found"})
    );
}

#[tokio::test]
async fn test_search_users() {
    let app = test_app(2, 16);

    let first = register(&app.router, "Anna", "Petrova").await;
    let second = register(&app.router, "Anastasia", "Petrenko").await;
    register(&app.router, "Boris", "Petrov").await;
    register(&app.router, "Anna", "Sokolova").await;

    let (status, _, body) = send(&app.router, get("/user/search?first_name=An&last_name=Petr")).await;
    assert_eq!(status, StatusCode::OK);

    let mut expected = vec![first, second];
    expected.sort();
    let ids: Vec<String> = json_body(&body)
        .as_array()
        .unwrap()
        .iter()
        .map(|user| user["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, expected);

    let (status, _, body) = send(&app.router, get("/user/search?first_name=Zz&last_name=")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_body(&body), json!([]));

    let (status, _, body) = send(&app.router, get("/user/search?first_name=An")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json_body(&body)["code"], 400);
}

#[tokio::test]
async fn test_unknown_path_not_implemented() {
    let app = test_app(1, 16);

    let (status, headers, body) = send(&app.router, get("/friend/add/1")).await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(json_body(&body)["code"], 501);
    assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
}

#[tokio::test]
async fn test_security_headers() {
    let app = test_app(1, 16);

    let (status, headers, _) = send(&app.router, get("/livez")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::SERVER]
        .to_str()
        .unwrap()
        .starts_with("social_network/"));
    assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
    assert_eq!(
        headers[header::CONTENT_SECURITY_POLICY],
        "default-src 'self'"
    );
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = test_app(1, 16);

    let (status, headers, body) = send(&app.router, get("/livez")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "text/plain");
    assert_eq!(&body[..], b"ok\n");

    app.health.set_ready(false);
    let (status, _, body) = send(&app.router, get("/readyz")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(&body[..], b"fail\n");
}

#[tokio::test]
async fn test_openapi_document() {
    let app = test_app(1, 16);

    let (status, _, body) = send(&app.router, get("/api-doc/openapi.json")).await;
    assert_eq!(status, StatusCode::OK);

    let doc = json_body(&body);
    assert_eq!(doc["info"]["title"], "socnet API");
    assert!(doc["paths"]["/user/search"]["get"].is_object());
}

#[tokio::test]
async fn test_saturated_pool_returns_503() {
    let app = test_app(1, 1);
    let (open, gate) = mpsc::channel::<()>();

    // Occupy the only worker, then the only queue slot
    app.workers
        .execute(move || {
            let _ = gate.recv();
        })
        .unwrap();
    while app.workers.queued() > 0 {
        tokio::task::yield_now().await;
    }
    app.workers.execute(|| {}).unwrap();

    let (status, _, body) = send(
        &app.router,
        get("/user/get/0192f0c1-7a4b-7c3e-9d2f-1a2b3c4d5e6f"),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(&body)["code"], 503);

    open.send(()).unwrap();
    let workers = Arc::clone(&app.workers);
    tokio::task::spawn_blocking(move || workers.wait_all())
        .await
        .unwrap();

    let (status, _, _) = send(
        &app.router,
        get("/user/get/0192f0c1-7a4b-7c3e-9d2f-1a2b3c4d5e6f"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    assert_eq!(app.workers.stats().refused, 1);
}
