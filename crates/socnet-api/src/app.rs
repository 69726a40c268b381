// Router assembly
// Decision: Unknown paths answer 501, matching the service's fixed route table
// Decision: Only user-facing routes are counted in request metrics; health checks are not

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Request},
    http::{header, HeaderValue},
    middleware,
    routing::get,
    Json, Router,
};
use socnet_storage::StorageBackend;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::api::{self, ApiError, Health};
use crate::dispatch::Dispatcher;
use crate::openapi::ApiDoc;

/// Maximum accepted request body
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

pub const SERVER_NAME: &str = concat!("social_network/", env!("CARGO_PKG_VERSION"));

/// App state shared across routes
#[derive(Clone)]
pub struct AppState {
    pub storage: StorageBackend,
    pub dispatcher: Dispatcher,
    pub health: Arc<Health>,
}

impl AppState {
    pub fn new(storage: StorageBackend, dispatcher: Dispatcher, health: Arc<Health>) -> Self {
        Self {
            storage,
            dispatcher,
            health,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let user_routes = Router::new()
        .merge(api::auth::routes(state.clone()))
        .merge(api::users::routes(state.clone()))
        .route_layer(middleware::from_fn(crate::metrics::track_requests));

    Router::new()
        .merge(api::health::routes(state))
        .merge(user_routes)
        .route("/api-doc/openapi.json", get(openapi_json))
        .fallback(not_implemented)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(SetResponseHeaderLayer::overriding(
            header::SERVER,
            HeaderValue::from_static(SERVER_NAME),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static("default-src 'self'"),
        ))
        .layer(TraceLayer::new_for_http())
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

async fn not_implemented(req: Request) -> ApiError {
    ApiError::NotImplemented(format!(
        "Can't handle '{} {}'",
        req.method(),
        req.uri().path()
    ))
}
