// Login route
// Decision: The token is the user ID itself; there is no session store

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use socnet_storage::password;
use utoipa::ToSchema;
use uuid::Uuid;

use super::common::{ApiError, ErrorResponse};
use super::validation::parse_user_id;
use crate::app::AppState;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// User ID returned by registration.
    #[schema(example = "0192f0c1-7a4b-7c3e-9d2f-1a2b3c4d5e6f")]
    pub id: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub token: Uuid,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/login", post(login))
        .with_state(state)
}

/// POST /login - Check credentials and issue a token
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Invalid input or wrong password", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 503, description = "Service saturated", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(req) = payload?;
    let id = parse_user_id(&req.id)?;

    let storage = state.storage.clone();
    let token = state
        .dispatcher
        .run(move || {
            let credentials = storage
                .get_credentials(id)?
                .ok_or_else(|| ApiError::not_found("user not found"))?;

            if !password::verify_password(&req.password, &credentials.pwd_hash)? {
                tracing::warn!(user_id = %id, "Password mismatch");
                return Err(ApiError::bad_request("request param 'password' does not match"));
            }
            Ok(credentials.id)
        })
        .await?;

    Ok(Json(LoginResponse { token }))
}
