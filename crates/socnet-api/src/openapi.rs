// OpenAPI specification generation
//
// Served by the API at /api-doc/openapi.json.

use crate::api;
use utoipa::OpenApi;

/// OpenAPI documentation for the socnet API
#[derive(OpenApi)]
#[openapi(
    paths(
        api::auth::login,
        api::users::register_user,
        api::users::get_user,
        api::users::search_users,
        api::health::livez,
        api::health::readyz,
    ),
    components(
        schemas(
            api::ErrorResponse,
            api::auth::LoginRequest,
            api::auth::LoginResponse,
            api::users::RegisterUserRequest,
            api::users::RegisterUserResponse,
            api::users::UserResponse,
        )
    ),
    tags(
        (name = "auth", description = "Login"),
        (name = "users", description = "User registration and profiles"),
        (name = "health", description = "Liveness and readiness checks")
    ),
    info(
        title = "socnet API",
        description = "User registration, login and profile search",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_routes_documented() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();

        for path in [
            "/login",
            "/user/register",
            "/user/get/{id}",
            "/user/search",
            "/livez",
            "/readyz",
        ] {
            assert!(paths.contains(&path), "missing {path}");
        }
    }
}
