// User HTTP routes
// Decision: Registration writes to the primary; profile reads go to replicas
// Decision: Validation happens on the runtime thread, before a worker slot is taken

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use socnet_storage::{password, CreateUserRow, UserRow, UserSearch};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::common::{ApiError, ErrorResponse};
use super::validation::{parse_birthdate, parse_user_id, validate_name, validate_password};
use crate::app::AppState;

/// Request to register a new user
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegisterUserRequest {
    /// Plain-text password, at least 8 characters.
    #[schema(example = "s3cret-pass")]
    pub password: String,
    #[schema(example = "Ivan")]
    pub first_name: String,
    #[schema(example = "Petrov")]
    pub second_name: String,
    /// Date of birth as `YYYY-MM-DD`, year between 1900 and 2007.
    #[schema(example = "1990-04-12")]
    pub birthdate: String,
    #[schema(example = "Hiking, chess")]
    pub biography: String,
    #[schema(example = "Kazan")]
    pub city: String,
}

impl RegisterUserRequest {
    fn validate(&self) -> Result<NaiveDate, ApiError> {
        validate_password(&self.password)?;
        validate_name("first_name", &self.first_name)?;
        validate_name("second_name", &self.second_name)?;
        validate_name("city", &self.city)?;
        parse_birthdate(&self.birthdate)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterUserResponse {
    pub user_id: Uuid,
}

/// Public user profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub first_name: String,
    pub second_name: String,
    pub birthdate: Option<NaiveDate>,
    pub biography: Option<String>,
    pub city: Option<String>,
}

impl From<UserRow> for UserResponse {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            first_name: row.first_name,
            second_name: row.second_name,
            birthdate: row.birthdate,
            biography: row.biography,
            city: row.city,
        }
    }
}

/// Name prefixes to search for; both are required, either may be empty
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchUsersParams {
    /// Prefix of the first name
    pub first_name: String,
    /// Prefix of the second name
    pub last_name: String,
}

/// Create user routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/user/register", post(register_user))
        .route("/user/get/{id}", get(get_user))
        .route("/user/search", get(search_users))
        .with_state(state)
}

/// POST /user/register - Register a new user
#[utoipa::path(
    post,
    path = "/user/register",
    request_body = RegisterUserRequest,
    responses(
        (status = 200, description = "User registered", body = RegisterUserResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 503, description = "Service saturated", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn register_user(
    State(state): State<AppState>,
    payload: Result<Json<RegisterUserRequest>, JsonRejection>,
) -> Result<Json<RegisterUserResponse>, ApiError> {
    let Json(req) = payload?;
    let birthdate = req.validate()?;

    let storage = state.storage.clone();
    let user_id = state
        .dispatcher
        .run(move || {
            let pwd_hash = password::hash_password(&req.password)?;
            let id = storage.create_user(CreateUserRow {
                first_name: req.first_name,
                second_name: req.second_name,
                birthdate,
                biography: req.biography,
                city: req.city,
                pwd_hash,
            })?;
            Ok(id)
        })
        .await?;

    tracing::info!(user_id = %user_id, "User registered");
    Ok(Json(RegisterUserResponse { user_id }))
}

/// GET /user/get/{id} - Get a user profile by ID
#[utoipa::path(
    get,
    path = "/user/get/{id}",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 400, description = "Malformed user ID", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 503, description = "Service saturated", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
) -> Result<Json<UserResponse>, ApiError> {
    let Path(raw) = id?;
    let id = parse_user_id(&raw)?;

    let storage = state.storage.clone();
    let user = state
        .dispatcher
        .run(move || Ok(storage.get_user(id)?))
        .await?
        .ok_or_else(|| ApiError::not_found("user not found"))?;

    Ok(Json(user.into()))
}

/// GET /user/search - Search users by name prefixes
#[utoipa::path(
    get,
    path = "/user/search",
    params(SearchUsersParams),
    responses(
        (status = 200, description = "Matching users ordered by ID, at most 100", body = Vec<UserResponse>),
        (status = 400, description = "Missing query parameters", body = ErrorResponse),
        (status = 503, description = "Service saturated", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn search_users(
    State(state): State<AppState>,
    params: Result<Query<SearchUsersParams>, QueryRejection>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let Query(params) = params?;
    let search = UserSearch::new(params.first_name, params.last_name);

    let storage = state.storage.clone();
    let rows = state
        .dispatcher
        .run(move || Ok(storage.search_users(&search)?))
        .await?;

    Ok(Json(rows.into_iter().map(UserResponse::from).collect()))
}
