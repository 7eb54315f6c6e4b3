//! Tracing subscriber initialization

use crate::config::LoggingConfig;
use crate::error::{RuntimeError, RuntimeResult};
use tracing_subscriber::{
    Registry, filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Install a global `tracing` subscriber writing to stderr.
///
/// `RUST_LOG` takes precedence over [`LoggingConfig::level`].
///
/// # Errors
///
/// Returns [`RuntimeError::Config`] if the filter directive is invalid or a
/// global subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> RuntimeResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| RuntimeError::Config(format!("Invalid log level: {e}")))?;

    if config.json {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .json();

        Registry::default()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| RuntimeError::Config(e.to_string()))
    } else {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false);

        Registry::default()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| RuntimeError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_invalid_level_is_rejected() {
        // SAFETY: serialized with every other test touching the environment
        unsafe { std::env::remove_var("RUST_LOG") };

        let config = LoggingConfig {
            level: "warden=loud".to_string(),
            json: false,
        };
        assert!(matches!(init_tracing(&config), Err(RuntimeError::Config(_))));
    }

    #[test]
    #[serial]
    fn test_second_init_fails() {
        let config = LoggingConfig::default();
        let _ = init_tracing(&config);
        assert!(init_tracing(&config).is_err());
    }
}
