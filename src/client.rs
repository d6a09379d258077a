use std::borrow::Cow;
use std::sync::Arc;

use async_trait::async_trait;
use log::error;

use crate::builder::{ClientBuilder, Options};
use crate::context::Context;
use crate::errors::ClientError;
use crate::eval::evaluator::Evaluator;
use crate::features::Features;
use crate::fetch::service::FeatureService;
use crate::model::flag::{FeatureFlag, FeatureFlagCollection};
use crate::model::variant::Variant;
use crate::value::Value;

/// The main component for evaluating feature flags.
///
/// # Examples
///
/// ```no_run
/// use unleash_client::{Client, Context};
///
/// #[tokio::main]
/// async fn main() {
///     let client = Client::builder("https://unleash.example.com")
///         .header("Authorization", "client-token")
///         .build()
///         .unwrap();
///
///     let context = Context::new().user_id("user-id");
///     let is_flag_enabled = client.enabled("flag-name", Some(&context), &[]).await.unwrap();
/// }
/// ```
pub struct Client {
    options: Arc<Options>,
    service: FeatureService,
    evaluator: Evaluator,
}

impl Client {
    pub(crate) fn with_options(options: Options) -> Result<Self, ClientError> {
        let service = FeatureService::new(&options)?;
        let evaluator = Evaluator::new(
            options.strategies().clone(),
            options.constraints().clone(),
        );
        Ok(Self {
            options: Arc::new(options),
            service,
            evaluator,
        })
    }

    /// Creates a new [`ClientBuilder`] used to build a [`Client`].
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::time::Duration;
    /// use unleash_client::Client;
    ///
    /// let client = Client::builder("https://unleash.example.com")
    ///     .cache_enabled(true)
    ///     .cache_ttl(Duration::from_secs(60))
    ///     .build()
    ///     .unwrap();
    /// ```
    pub fn builder(url: &str) -> ClientBuilder {
        ClientBuilder::new(url)
    }

    /// Creates a new [`Client`] with default options.
    ///
    /// # Errors
    ///
    /// This method fails if the given URL is empty or invalid.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use unleash_client::Client;
    ///
    /// let client = Client::new("https://unleash.example.com").unwrap();
    /// ```
    pub fn new(url: &str) -> Result<Self, ClientError> {
        ClientBuilder::new(url).build()
    }

    /// Returns every flag currently known.
    ///
    /// # Errors
    ///
    /// When the flag service fails, the failover copy of the flags, or an empty set, is returned.
    /// Variant payloads are not decoded here, so a bad payload never fails this call.
    pub async fn all(&self) -> Result<Arc<FeatureFlagCollection>, ClientError> {
        self.service.get_all_flags().await
    }

    /// Returns the flag with the given `name`, or [`None`] if there is no such flag.
    pub async fn get(&self, name: &str) -> Result<Option<FeatureFlag>, ClientError> {
        Ok(self.all().await?.get(name).cloned())
    }

    /// Returns whether the flag with the given `name` is on for `context`.
    ///
    /// Missing flags are off. `args` are passed to every consulted strategy.
    /// Without a `context`, the default context of the client is used.
    ///
    /// # Errors
    ///
    /// Only configuration errors are returned (e.g. an unknown constraint operator).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use unleash_client::{Client, Context, Value};
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let client = Client::new("https://unleash.example.com").unwrap();
    ///
    ///     let context = Context::new().user_id(42);
    ///     let on = client.enabled("checkout", Some(&context), &[Value::from("tenant-1")]).await.unwrap();
    /// }
    /// ```
    pub async fn enabled(
        &self,
        name: &str,
        context: Option<&Context>,
        args: &[Value],
    ) -> Result<bool, ClientError> {
        let flags = self.all().await?;
        let Some(flag) = flags.get(name) else {
            return Ok(false);
        };
        self.evaluator
            .is_enabled(flag, &self.context(context), args)
            .inspect_err(log_err)
    }

    /// The negation of [`Client::enabled`].
    pub async fn disabled(
        &self,
        name: &str,
        context: Option<&Context>,
        args: &[Value],
    ) -> Result<bool, ClientError> {
        Ok(!self.enabled(name, context, args).await?)
    }

    /// Returns the variant of the flag with the given `name` assigned to `context`.
    ///
    /// The default variant, whose payload wraps `default`, is returned when the
    /// flag is missing, off for the context, or has no variants.
    ///
    /// # Errors
    ///
    /// Fails with [`crate::ErrorKind::UnknownVariantPayloadType`] or
    /// [`crate::ErrorKind::InvalidVariantPayload`] when the payload of the selected
    /// variant cannot be decoded.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use unleash_client::{Client, Context};
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let client = Client::new("https://unleash.example.com").unwrap();
    ///
    ///     let context = Context::new().user_id(42);
    ///     let variant = client.variant("button-color", "blue", Some(&context)).await.unwrap();
    ///     println!("{}", variant.name);
    /// }
    /// ```
    pub async fn variant(
        &self,
        name: &str,
        default: impl Into<serde_json::Value>,
        context: Option<&Context>,
    ) -> Result<Variant, ClientError> {
        let default = default.into();
        let flags = self.all().await?;
        let Some(flag) = flags.get(name) else {
            return Ok(Variant::default_variant(default));
        };
        self.evaluator
            .variant(flag, default, &self.context(context))
            .inspect_err(log_err)
    }

    fn context<'a>(&'a self, context: Option<&'a Context>) -> Cow<'a, Context> {
        match (context, self.options.default_context()) {
            (Some(ctx), Some(fallback)) => Cow::Owned(ctx.or(fallback)),
            (Some(ctx), None) => Cow::Borrowed(ctx),
            (None, Some(fallback)) => Cow::Borrowed(fallback),
            (None, None) => Cow::Owned(Context::default()),
        }
    }
}

#[async_trait]
impl Features for Client {
    async fn all(&self) -> Result<Arc<FeatureFlagCollection>, ClientError> {
        Client::all(self).await
    }

    async fn get(&self, name: &str) -> Result<Option<FeatureFlag>, ClientError> {
        Client::get(self, name).await
    }

    async fn enabled(
        &self,
        name: &str,
        context: Option<&Context>,
        args: &[Value],
    ) -> Result<bool, ClientError> {
        Client::enabled(self, name, context, args).await
    }

    async fn variant(
        &self,
        name: &str,
        default: serde_json::Value,
        context: Option<&Context>,
    ) -> Result<Variant, ClientError> {
        Client::variant(self, name, default, context).await
    }
}

fn log_err(err: &ClientError) {
    error!(event_id = err.kind.as_u8(); "{}", err);
}
