use std::collections::HashMap;
use std::time::Duration;

use envconfig::Envconfig;

use crate::builder::ClientBuilder;
use crate::constants::{DEFAULT_CACHE_TTL_SECS, DEFAULT_FEATURES_ENDPOINT};
use crate::context::Context;
use crate::errors::{ClientError, ErrorKind};

/// Client configuration read from `UNLEASH_*` environment variables.
///
/// | variable | default |
/// |---|---|
/// | `UNLEASH_URL` | empty |
/// | `UNLEASH_ENABLED` | `true` |
/// | `UNLEASH_CACHE_ENABLED` | `false` |
/// | `UNLEASH_CACHE_TTL` | `15` (seconds) |
/// | `UNLEASH_CACHE_FAILOVER` | `true` |
/// | `UNLEASH_FEATURES_ENDPOINT` | `/api/client/features` |
/// | `UNLEASH_APP_NAME` | unset |
/// | `UNLEASH_INSTANCE_ID` | unset |
/// | `UNLEASH_ENVIRONMENT` | unset |
#[derive(Envconfig, Clone, Debug)]
pub struct EnvConfig {
    /// Base URL of the flag service.
    #[envconfig(from = "UNLEASH_URL", default = "")]
    pub url: String,

    /// Turns flag evaluation on or off.
    #[envconfig(from = "UNLEASH_ENABLED", default = "true")]
    pub enabled: bool,

    /// Stores fetched flags in the cache.
    #[envconfig(from = "UNLEASH_CACHE_ENABLED", default = "false")]
    pub cache_enabled: bool,

    /// Cache TTL in seconds.
    #[envconfig(from = "UNLEASH_CACHE_TTL", default = "15")]
    pub cache_ttl: u64,

    /// Answers from the failover copy when the flag service fails.
    #[envconfig(from = "UNLEASH_CACHE_FAILOVER", default = "true")]
    pub failover: bool,

    /// Path of the features endpoint.
    #[envconfig(from = "UNLEASH_FEATURES_ENDPOINT", default = "/api/client/features")]
    pub features_endpoint: String,

    /// Application name, sent to the flag service and put into the default context.
    #[envconfig(from = "UNLEASH_APP_NAME")]
    pub app_name: Option<String>,

    /// Instance identifier sent to the flag service.
    #[envconfig(from = "UNLEASH_INSTANCE_ID")]
    pub instance_id: Option<String>,

    /// Environment name put into the default context.
    #[envconfig(from = "UNLEASH_ENVIRONMENT")]
    pub environment: Option<String>,
}

impl EnvConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Fails with [`ErrorKind::InvalidEnvironmentConfig`] if a variable cannot be parsed.
    pub fn load() -> Result<Self, ClientError> {
        Self::init_from_env().map_err(invalid)
    }

    /// Reads the configuration from the given variables instead of the process environment.
    ///
    /// # Errors
    ///
    /// Fails with [`ErrorKind::InvalidEnvironmentConfig`] if a variable cannot be parsed.
    pub fn load_from(vars: &HashMap<String, String>) -> Result<Self, ClientError> {
        Self::init_from_hashmap(vars).map_err(invalid)
    }

    /// Turns the configuration into a [`ClientBuilder`] that can be refined further.
    pub fn into_builder(self) -> ClientBuilder {
        let mut builder = ClientBuilder::new(self.url.as_str())
            .enabled(self.enabled)
            .cache_enabled(self.cache_enabled)
            .cache_ttl(Duration::from_secs(self.cache_ttl))
            .failover(self.failover)
            .features_endpoint(self.features_endpoint.as_str());

        let mut context = Context::new();
        if let Some(app_name) = self.app_name.as_deref() {
            builder = builder.app_name(app_name);
            context = context.app_name(app_name);
        }
        if let Some(instance_id) = self.instance_id.as_deref() {
            builder = builder.instance_id(instance_id);
        }
        if let Some(environment) = self.environment.as_deref() {
            context = context.environment(environment);
        }
        if context != Context::default() {
            builder = builder.default_context(context);
        }
        builder
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            url: String::default(),
            enabled: true,
            cache_enabled: false,
            cache_ttl: DEFAULT_CACHE_TTL_SECS,
            failover: true,
            features_endpoint: DEFAULT_FEATURES_ENDPOINT.to_owned(),
            app_name: None,
            instance_id: None,
            environment: None,
        }
    }
}

fn invalid(err: envconfig::Error) -> ClientError {
    ClientError::new(
        ErrorKind::InvalidEnvironmentConfig,
        format!("Invalid environment configuration. {err}"),
    )
}
