// socnet HTTP service
//
// Handlers validate input on the runtime, then run their storage work on the
// bounded request worker pool (see `dispatch`). The binary in `main.rs` wires
// configuration, storage and the two listeners together.

pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod metrics;
pub mod openapi;
pub mod telemetry;

pub use app::{build_router, AppState};
pub use config::Config;
pub use dispatch::Dispatcher;
