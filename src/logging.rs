use tracing_subscriber::{fmt, EnvFilter};

pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),

    #[error("Failed to initialize logging: {0}")]
    Initialization(String),
}

/// Installs the fmt subscriber. `RUST_LOG` overrides the default level;
/// records emitted through the `log` facade are forwarded as well.
pub fn init_logging() -> Result<(), LoggingError> {
    let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) => {
            EnvFilter::try_new(&directives).map_err(|e| LoggingError::InvalidFilter(e.to_string()))?
        }
        Err(_) => EnvFilter::new(DEFAULT_LOG_LEVEL),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| LoggingError::Initialization(e.to_string()))
}
