// Liveness and readiness checks
// Decision: Plain-text bodies ("ok\n" / "fail\n") for kubelet-style health checks

use std::sync::atomic::{AtomicBool, Ordering};

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};

use crate::app::AppState;

/// Process health flags flipped by `main`
#[derive(Debug, Default)]
pub struct Health {
    live: AtomicBool,
    ready: AtomicBool,
}

impl Health {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_live(&self, live: bool) {
        self.live.store(live, Ordering::Release);
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Release);
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/livez", get(livez))
        .route("/readyz", get(readyz))
        .with_state(state)
}

fn status_body(ok: bool) -> impl IntoResponse {
    let (status, body) = if ok {
        (StatusCode::OK, "ok\n")
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "fail\n")
    };
    (status, [(header::CONTENT_TYPE, "text/plain")], body)
}

/// GET /livez - Process is up and its worker pool accepts work
#[utoipa::path(
    get,
    path = "/livez",
    responses(
        (status = 200, description = "Alive", body = String, content_type = "text/plain"),
        (status = 500, description = "Not alive", body = String, content_type = "text/plain")
    ),
    tag = "health"
)]
pub async fn livez(State(state): State<AppState>) -> impl IntoResponse {
    status_body(state.health.is_live())
}

/// GET /readyz - Storage is connected and requests are being served
#[utoipa::path(
    get,
    path = "/readyz",
    responses(
        (status = 200, description = "Ready", body = String, content_type = "text/plain"),
        (status = 500, description = "Not ready", body = String, content_type = "text/plain")
    ),
    tag = "health"
)]
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    status_body(state.health.is_ready())
}
