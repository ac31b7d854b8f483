use tracing_subscriber::{fmt, EnvFilter};

/// Configuration for setting up the subscriber
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Fallback directive when `RUST_LOG` is unset
    pub default_directive: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            default_directive: "info".to_string(),
            json: false,
        }
    }
}

/// Installs a global tracing subscriber with configurable options.
///
/// Returns an error if a global subscriber is already set, so callers
/// embedding the crate can keep their own subscriber.
pub fn setup_logger(config: LoggerConfig) -> Result<(), String> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_directive.clone()));

    let result = if config.json {
        fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .try_init()
    } else {
        fmt().with_env_filter(filter).with_target(true).try_init()
    };

    result.map_err(|e| format!("Failed to install tracing subscriber: {}", e))
}

/// Convenience wrapper installing the default configuration.
pub fn init_tracing() {
    let _ = setup_logger(LoggerConfig::default());
}
