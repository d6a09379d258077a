use std::sync::Arc;

use async_trait::async_trait;

use crate::context::Context;
use crate::errors::ClientError;
use crate::model::flag::{FeatureFlag, FeatureFlagCollection};
use crate::model::variant::Variant;
use crate::value::Value;

/// The flag evaluation surface shared by [`crate::Client`] and [`crate::FakeClient`].
///
/// Code that depends on this trait (instead of a concrete client) can be tested
/// against the fake.
///
/// # Examples
///
/// ```rust
/// use unleash_client::{Features, FakeClient};
///
/// async fn checkout_enabled(features: &dyn Features) -> bool {
///     features.enabled("checkout", None, &[]).await.unwrap_or(false)
/// }
///
/// #[tokio::main]
/// async fn main() {
///     let fake = FakeClient::new().fake(["checkout"]);
///     assert!(checkout_enabled(&fake).await);
/// }
/// ```
#[async_trait]
pub trait Features: Send + Sync {
    /// Returns every flag currently known.
    async fn all(&self) -> Result<Arc<FeatureFlagCollection>, ClientError>;

    /// Returns the flag with the given `name`, or [`None`] if there is no such flag.
    async fn get(&self, name: &str) -> Result<Option<FeatureFlag>, ClientError>;

    /// Returns whether the flag with the given `name` is on for `context`.
    ///
    /// Missing flags are off. `args` are passed to every consulted strategy.
    async fn enabled(
        &self,
        name: &str,
        context: Option<&Context>,
        args: &[Value],
    ) -> Result<bool, ClientError>;

    /// The negation of [`Features::enabled`].
    async fn disabled(
        &self,
        name: &str,
        context: Option<&Context>,
        args: &[Value],
    ) -> Result<bool, ClientError> {
        Ok(!self.enabled(name, context, args).await?)
    }

    /// Returns the variant of the flag with the given `name` assigned to `context`,
    /// or the default variant wrapping `default` when the flag is missing or off.
    async fn variant(
        &self,
        name: &str,
        default: serde_json::Value,
        context: Option<&Context>,
    ) -> Result<Variant, ClientError>;
}
