//! Runtime configuration
//!
//! Loaded from a TOML, YAML or JSON file with `WARDEN__`-prefixed environment
//! variables layered on top, e.g. `WARDEN__PATHS__STYLE=posix` or
//! `WARDEN__AUDIT__BUFFER_SIZE=64`.

use crate::audit::AuditConfig;
use crate::deserialize::{SerializerSettings, TypeNameHandling};
use crate::error::{RuntimeError, RuntimeResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use warden_core::PathStyle;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "WARDEN";

/// Top-level runtime configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WardenConfig {
    pub paths: PathsConfig,
    pub deserialization: DeserializationConfig,
    pub audit: AuditConfig,
    pub logging: LoggingConfig,
}

/// Path construction settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Path convention to validate against; defaults to the host's
    pub style: PathStyle,
    /// Let file helpers accept relative names with subdirectories
    pub allow_subdirectories: bool,
}

/// Deserializer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeserializationConfig {
    pub type_name_handling: TypeNameHandling,
    /// Maximum nesting depth of accepted payloads; `None` disables the check
    pub max_depth: Option<usize>,
}

impl Default for DeserializationConfig {
    fn default() -> Self {
        Self {
            type_name_handling: TypeNameHandling::None,
            max_depth: Some(64),
        }
    }
}

impl DeserializationConfig {
    pub fn settings(&self) -> SerializerSettings {
        SerializerSettings {
            type_name_handling: self.type_name_handling,
            max_depth: self.max_depth,
        }
    }
}

/// Tracing subscriber settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON records instead of human-readable lines
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl WardenConfig {
    /// Load configuration from a file (TOML, YAML, or JSON).
    ///
    /// The format is picked from the extension. Environment variables with the
    /// `WARDEN__` prefix override file settings.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Config`] if the file is missing, has an
    /// unsupported extension, or does not describe a valid configuration.
    pub fn from_file(path: impl AsRef<Path>) -> RuntimeResult<Self> {
        use config::{Config, File, FileFormat};

        let path = path.as_ref();
        if !path.exists() {
            return Err(RuntimeError::Config(format!(
                "configuration file not found: {}",
                path.display()
            )));
        }

        let format = match path.extension().and_then(|s| s.to_str()) {
            Some("toml") => FileFormat::Toml,
            Some("yaml") | Some("yml") => FileFormat::Yaml,
            Some("json") => FileFormat::Json,
            _ => {
                return Err(RuntimeError::Config(
                    "unsupported configuration file format, use .toml, .yaml, .yml, or .json"
                        .to_string(),
                ));
            }
        };

        let file = path.to_str().ok_or_else(|| {
            RuntimeError::Config(format!("non UTF-8 configuration path: {}", path.display()))
        })?;

        let config = Config::builder()
            .add_source(File::new(file, format))
            .add_source(environment())
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Load configuration from defaults and `WARDEN__` environment variables only.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Config`] if an override has the wrong shape.
    pub fn from_env() -> RuntimeResult<Self> {
        let config = config::Config::builder().add_source(environment()).build()?;
        Ok(config.try_deserialize()?)
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
}
