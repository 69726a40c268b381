// HTTP API routes
//
// Each submodule exposes `routes(state)`; handlers validate input and then
// hand the blocking storage work to the request worker pool.

pub mod auth;
pub mod common;
pub mod health;
pub mod users;
pub mod validation;

pub use common::{ApiError, ErrorResponse};
pub use health::Health;
