// Logging initialization
//
// Configure via environment variables:
// - RUST_LOG: log filter (default: DEFAULT_LOG_FILTER)
// - LOG_ANSI: set to "false" to disable colored output

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub const DEFAULT_LOG_FILTER: &str =
    "socnet_api=debug,socnet_storage=info,socnet_pool=info,tower_http=info";

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub log_filter: Option<String>,
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_filter: None,
            ansi: true,
        }
    }
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self {
            log_filter: std::env::var("RUST_LOG").ok().filter(|s| !s.is_empty()),
            ansi: std::env::var("LOG_ANSI")
                .map(|s| !(s.eq_ignore_ascii_case("false") || s == "0"))
                .unwrap_or(true),
        }
    }

    fn filter(&self) -> EnvFilter {
        self.log_filter
            .as_ref()
            .and_then(|f| EnvFilter::try_new(f).ok())
            .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
    }
}

/// Install the global subscriber; call once from `main`
pub fn init_logging(config: &LoggingConfig) {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_names(true)
        .with_ansi(config.ansi)
        .with_filter(config.filter());

    tracing_subscriber::registry().with(console_layer).init();
}
