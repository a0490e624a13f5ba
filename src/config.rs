//! Configuration System
//!
//! Layered configuration for the beacon: built-in defaults, the base URL of the
//! selected environment preset, an optional TOML file, then `DATATAG_*`
//! environment variables (nested keys use `__`, e.g. `DATATAG_HTTP__REQUEST_TIMEOUT_SECS`).

use crate::error::ConfigError;
use crate::logging::LoggingConfig;
use config::{Config, ConfigBuilder, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

/// Default tracking id sent as `tid`
pub const DEFAULT_TRACKING_ID: &str = "UA-FINNO";
/// Default inactivity window before a session rotates
pub const DEFAULT_SESSION_TIMEOUT_MINUTES: u64 = 30;
/// Environment variable that selects the preset when none is given explicitly
pub const ENV_SELECTOR: &str = "DATATAG_ENV";
const ENV_PREFIX: &str = "DATATAG";

/// Collection endpoint presets; they differ only in base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    #[default]
    Development,
    Uat,
    Production,
}

impl Environment {
    pub fn base_url(self) -> &'static str {
        match self {
            Environment::Development => "https://gtm-int.finnomena.com/mpua",
            Environment::Uat => "https://gtm-uat.finnomena.com/mpua",
            Environment::Production => "https://gtm.finnomena.com/mpua",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Uat => "uat",
            Environment::Production => "production",
        }
    }

    /// Preset named by `DATATAG_ENV`, or development when unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(ENV_SELECTOR) {
            Ok(name) => name.parse().map_err(ConfigError::Invalid),
            Err(_) => Ok(Environment::default()),
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "uat" => Ok(Environment::Uat),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!(
                "Unknown environment '{}' (expected development, uat or production)",
                other
            )),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP client settings for the collection transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggingConfig {
    /// Collection endpoint
    pub base_url: String,

    /// Sent inside the `p` params as `user_agent`, and as the HTTP User-Agent
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_tracking_id")]
    pub tracking_id: String,

    #[serde(default = "default_session_timeout_minutes")]
    pub session_timeout_minutes: u64,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

pub fn default_user_agent() -> String {
    format!("datatag/{}", env!("CARGO_PKG_VERSION"))
}

fn default_tracking_id() -> String {
    DEFAULT_TRACKING_ID.to_string()
}

fn default_session_timeout_minutes() -> u64 {
    DEFAULT_SESSION_TIMEOUT_MINUTES
}

impl TaggingConfig {
    /// Defaults for everything but the endpoint
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            user_agent: default_user_agent(),
            tracking_id: default_tracking_id(),
            session_timeout_minutes: default_session_timeout_minutes(),
            http: HttpConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    pub fn for_environment(environment: Environment) -> Self {
        Self::new(environment.base_url())
    }

    pub fn development() -> Self {
        Self::for_environment(Environment::Development)
    }

    pub fn uat() -> Self {
        Self::for_environment(Environment::Uat)
    }

    pub fn production() -> Self {
        Self::for_environment(Environment::Production)
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_tracking_id(mut self, tracking_id: impl Into<String>) -> Self {
        self.tracking_id = tracking_id.into();
        self
    }

    pub fn with_session_timeout_minutes(mut self, minutes: u64) -> Self {
        self.session_timeout_minutes = minutes;
        self
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            errors.push(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            ));
        }
        if self.tracking_id.trim().is_empty() {
            errors.push("tracking_id cannot be empty".to_string());
        }
        if self.user_agent.trim().is_empty() {
            errors.push("user_agent cannot be empty".to_string());
        }
        if self.http.connect_timeout_secs == 0 || self.http.request_timeout_secs == 0 {
            errors.push("http timeouts must be greater than zero".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors.join("; ")))
        }
    }
}

/// Loads [`TaggingConfig`] from layered sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load using the process environment for both preset selection and overrides.
    pub fn load(environment: Option<Environment>, file: Option<&Path>) -> Result<TaggingConfig, ConfigError> {
        let environment = match environment {
            Some(environment) => environment,
            None => Environment::from_env()?,
        };
        Self::load_from(environment, file, None)
    }

    /// Load with an explicit variable map in place of the process environment.
    pub fn load_from(
        environment: Environment,
        file: Option<&Path>,
        vars: Option<HashMap<String, String>>,
    ) -> Result<TaggingConfig, ConfigError> {
        let mut builder = builder_with_defaults(environment)?;

        if let Some(path) = file {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(vars),
        );

        let config: TaggingConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}

fn builder_with_defaults(
    environment: Environment,
) -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError> {
    let builder = Config::builder()
        .set_default("base_url", environment.base_url())?
        .set_default("user_agent", default_user_agent())?
        .set_default("tracking_id", DEFAULT_TRACKING_ID)?
        .set_default("session_timeout_minutes", DEFAULT_SESSION_TIMEOUT_MINUTES)?;
    Ok(builder)
}
