use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;

use crate::cache::{FeatureCache, InMemoryCache};
use crate::constants::{DEFAULT_CACHE_TTL_SECS, DEFAULT_FEATURES_ENDPOINT, DEFAULT_HTTP_TIMEOUT_SECS};
use crate::constraint::{ConstraintHandler, ConstraintRegistry};
use crate::context::Context;
use crate::env::EnvConfig;
use crate::errors::{ClientError, ErrorKind};
use crate::strategy::{StrategyHandler, StrategyRegistry};
use crate::Client;

pub struct Options {
    features_url: String,
    enabled: bool,
    cache_enabled: bool,
    cache_ttl: Duration,
    failover: bool,
    http_timeout: Duration,
    cache: Arc<dyn FeatureCache>,
    app_name: Option<String>,
    instance_id: Option<String>,
    headers: Vec<(String, String)>,
    strategies: StrategyRegistry,
    constraints: ConstraintRegistry,
    default_context: Option<Context>,
}

impl Options {
    pub(crate) fn features_url(&self) -> &str {
        &self.features_url
    }

    pub(crate) fn enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn cache_enabled(&self) -> bool {
        self.cache_enabled
    }

    pub(crate) fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    pub(crate) fn failover(&self) -> bool {
        self.failover
    }

    pub(crate) fn http_timeout(&self) -> Duration {
        self.http_timeout
    }

    pub(crate) fn cache(&self) -> Arc<dyn FeatureCache> {
        Arc::clone(&self.cache)
    }

    pub(crate) fn app_name(&self) -> Option<&str> {
        self.app_name.as_deref()
    }

    pub(crate) fn instance_id(&self) -> Option<&str> {
        self.instance_id.as_deref()
    }

    pub(crate) fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub(crate) fn strategies(&self) -> &StrategyRegistry {
        &self.strategies
    }

    pub(crate) fn constraints(&self) -> &ConstraintRegistry {
        &self.constraints
    }

    pub(crate) fn default_context(&self) -> &Option<Context> {
        &self.default_context
    }
}

/// Builder to create an Unleash [`Client`].
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use unleash_client::Client;
///
/// let builder = Client::builder("https://unleash.example.com")
///     .cache_enabled(true)
///     .cache_ttl(Duration::from_secs(30))
///     .header("Authorization", "client-token");
///
/// let client = builder.build().unwrap();
/// ```
pub struct ClientBuilder {
    url: String,
    features_endpoint: Option<String>,
    enabled: bool,
    cache_enabled: bool,
    cache_ttl: Option<Duration>,
    failover: bool,
    http_timeout: Option<Duration>,
    cache: Option<Arc<dyn FeatureCache>>,
    app_name: Option<String>,
    instance_id: Option<String>,
    headers: Vec<(String, String)>,
    strategies: StrategyRegistry,
    constraints: ConstraintRegistry,
    default_context: Option<Context>,
}

impl ClientBuilder {
    pub(crate) fn new(url: &str) -> Self {
        Self {
            url: url.to_owned(),
            features_endpoint: None,
            enabled: true,
            cache_enabled: false,
            cache_ttl: None,
            failover: true,
            http_timeout: None,
            cache: None,
            app_name: None,
            instance_id: None,
            headers: vec![],
            strategies: StrategyRegistry::default(),
            constraints: ConstraintRegistry::default(),
            default_context: None,
        }
    }

    /// Creates a builder from the `UNLEASH_*` environment variables.
    ///
    /// # Errors
    ///
    /// This method fails if a variable holds a value that cannot be parsed.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use unleash_client::ClientBuilder;
    ///
    /// let client = ClientBuilder::from_env().unwrap().build().unwrap();
    /// ```
    pub fn from_env() -> Result<Self, ClientError> {
        Ok(EnvConfig::load()?.into_builder())
    }

    /// Sets the path of the features endpoint, relative to the service URL.
    /// Default value is `/api/client/features`.
    pub fn features_endpoint(mut self, endpoint: &str) -> Self {
        self.features_endpoint = Some(endpoint.to_owned());
        self
    }

    /// Turns flag evaluation on or off. A disabled client reports every flag as
    /// absent and never calls the flag service.
    /// Default value is `true`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use unleash_client::Client;
    ///
    /// let builder = Client::builder("https://unleash.example.com")
    ///     .enabled(false);
    /// ```
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Stores the fetched flags in the [`FeatureCache`] for [`ClientBuilder::cache_ttl`].
    /// When off, the flags are fetched once and kept by the client.
    /// Default value is `false`.
    pub fn cache_enabled(mut self, cache_enabled: bool) -> Self {
        self.cache_enabled = cache_enabled;
        self
    }

    /// Sets how long fetched flags stay in the cache.
    /// Default value is `15` seconds.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use unleash_client::Client;
    ///
    /// let builder = Client::builder("https://unleash.example.com")
    ///     .cache_enabled(true)
    ///     .cache_ttl(Duration::from_secs(60));
    /// ```
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// Answers with the last successfully resolved flags when the flag service
    /// cannot be reached or responds with something unusable.
    /// Default value is `true`.
    pub fn failover(mut self, failover: bool) -> Self {
        self.failover = failover;
        self
    }

    /// Sets the HTTP request timeout.
    /// Default value is `30` seconds.
    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = Some(timeout);
        self
    }

    /// Sets a [`FeatureCache`] implementation used for caching.
    /// Default value is an [`InMemoryCache`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use std::time::Duration;
    /// use unleash_client::{Client, FeatureCache};
    ///
    /// let builder = Client::builder("https://unleash.example.com")
    ///     .cache(Arc::new(CustomCache {}));
    ///
    /// struct CustomCache {}
    ///
    /// impl FeatureCache for CustomCache {
    ///     fn get(&self, key: &str) -> Option<String> {
    ///         // read from cache
    ///         None
    ///     }
    ///
    ///     fn set(&self, key: &str, value: &str, ttl: Duration) {
    ///         // write to cache with expiration
    ///     }
    ///
    ///     fn set_forever(&self, key: &str, value: &str) {
    ///         // write to cache
    ///     }
    ///
    ///     fn forget(&self, key: &str) {
    ///         // remove from cache
    ///     }
    /// }
    /// ```
    pub fn cache(mut self, cache: Arc<dyn FeatureCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Sets the application name sent to the flag service.
    pub fn app_name(mut self, app_name: &str) -> Self {
        self.app_name = Some(app_name.to_owned());
        self
    }

    /// Sets the instance identifier sent to the flag service.
    pub fn instance_id(mut self, instance_id: &str) -> Self {
        self.instance_id = Some(instance_id.to_owned());
        self
    }

    /// Adds a header to every request sent to the flag service, e.g. `Authorization`.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    /// Registers a strategy handler under `name`, next to the built-in strategies.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::collections::HashMap;
    /// use unleash_client::{Client, Context, StrategyHandler, Value};
    ///
    /// struct Weekend;
    ///
    /// impl StrategyHandler for Weekend {
    ///     fn is_enabled(&self, _: &HashMap<String, String>, _: &Context, _: &[Value]) -> bool {
    ///         false
    ///     }
    /// }
    ///
    /// let builder = Client::builder("https://unleash.example.com")
    ///     .strategy("weekend", Weekend);
    /// ```
    pub fn strategy(mut self, name: &str, handler: impl StrategyHandler + 'static) -> Self {
        self.strategies.register(name, handler);
        self
    }

    /// Registers a strategy factory under `name`; a new handler is made for every evaluation.
    pub fn strategy_factory<H, F>(mut self, name: &str, factory: F) -> Self
    where
        H: StrategyHandler + 'static,
        F: Fn() -> H + Send + Sync + 'static,
    {
        self.strategies.register_factory(name, factory);
        self
    }

    /// Replaces the whole strategy registry, built-ins included.
    pub fn strategies(mut self, strategies: StrategyRegistry) -> Self {
        self.strategies = strategies;
        self
    }

    /// Registers a constraint handler for a context attribute.
    pub fn constraint(
        mut self,
        context_name: &str,
        handler: impl ConstraintHandler + 'static,
    ) -> Self {
        self.constraints.register(context_name, handler);
        self
    }

    /// Replaces the whole constraint registry, built-ins included.
    pub fn constraints(mut self, constraints: ConstraintRegistry) -> Self {
        self.constraints = constraints;
        self
    }

    /// Sets the [`Context`] used when an evaluation is called without one. Its
    /// fields also fill the gaps of the contexts passed to evaluations.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use unleash_client::{Client, Context};
    ///
    /// let builder = Client::builder("https://unleash.example.com")
    ///     .default_context(Context::new().environment("production").app_name("shop"));
    /// ```
    pub fn default_context(mut self, context: Context) -> Self {
        self.default_context = Some(context);
        self
    }

    /// Creates a [`Client`] from the configuration made on the builder.
    ///
    /// # Errors
    ///
    /// This method fails if the URL is empty or invalid, or the HTTP client
    /// cannot be initialized with the given headers.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use unleash_client::Client;
    ///
    /// let client = Client::builder("https://unleash.example.com")
    ///     .app_name("shop")
    ///     .build()
    ///     .unwrap();
    /// ```
    pub fn build(self) -> Result<Client, ClientError> {
        Client::with_options(self.build_options()?)
    }

    pub(crate) fn build_options(self) -> Result<Options, ClientError> {
        let features_url = self.features_url()?;
        Ok(Options {
            features_url,
            enabled: self.enabled,
            cache_enabled: self.cache_enabled,
            cache_ttl: self
                .cache_ttl
                .unwrap_or(Duration::from_secs(DEFAULT_CACHE_TTL_SECS)),
            failover: self.failover,
            http_timeout: self
                .http_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS)),
            cache: self.cache.unwrap_or(Arc::new(InMemoryCache::new())),
            app_name: self.app_name,
            instance_id: self.instance_id,
            headers: self.headers,
            strategies: self.strategies,
            constraints: self.constraints,
            default_context: self.default_context,
        })
    }

    fn features_url(&self) -> Result<String, ClientError> {
        let base = self.url.trim().trim_end_matches('/');
        if base.is_empty() {
            return Err(ClientError::new(
                ErrorKind::InvalidUrl,
                "Flag service URL cannot be empty".to_owned(),
            ));
        }
        let endpoint = self
            .features_endpoint
            .as_deref()
            .unwrap_or(DEFAULT_FEATURES_ENDPOINT);
        let full = format!("{base}/{}", endpoint.trim_start_matches('/'));
        match Url::parse(full.as_str()) {
            Ok(_) => Ok(full),
            Err(err) => Err(ClientError::new(
                ErrorKind::InvalidUrl,
                format!("Flag service URL '{}' is invalid. {err}", self.url),
            )),
        }
    }
}
