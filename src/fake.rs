use std::collections::HashMap;
use std::fmt::{Debug, Display, Formatter};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::context::Context;
use crate::errors::ClientError;
use crate::eval::evaluator::Evaluator;
use crate::eval::variant::select_variant;
use crate::features::Features;
use crate::model::flag::{FeatureFlag, FeatureFlagCollection};
use crate::model::variant::Variant;
use crate::value::Value;

type StatusFn = dyn Fn(&str, bool, &[Value]) -> bool + Send + Sync;
type ArgsFn = dyn Fn(&[Value]) -> bool + Send + Sync;

/// Decides which extra arguments a faked flag answers to.
#[derive(Clone)]
enum ArgsMatcher {
    Any,
    Exact(Vec<Value>),
    Using(Arc<ArgsFn>),
}

impl ArgsMatcher {
    fn matches(&self, args: &[Value]) -> bool {
        match self {
            ArgsMatcher::Any => true,
            ArgsMatcher::Exact(expected) => expected.as_slice() == args,
            ArgsMatcher::Using(matcher) => matcher(args),
        }
    }
}

#[doc(hidden)]
#[derive(Clone)]
pub struct FakeFlag {
    flag: FeatureFlag,
    args: ArgsMatcher,
}

/// Flags accepted by [`FakeClient::fake`].
///
/// Flags given as [`FeatureFlag`]s answer only to calls without extra
/// arguments; flags given by name are enabled and answer to any arguments.
pub trait IntoFakeFlags {
    #[doc(hidden)]
    fn into_fake_flags(self) -> Vec<FakeFlag>;
}

impl IntoFakeFlags for FeatureFlag {
    fn into_fake_flags(self) -> Vec<FakeFlag> {
        vec![FakeFlag {
            flag: self,
            args: ArgsMatcher::Exact(vec![]),
        }]
    }
}

impl IntoFakeFlags for Vec<FeatureFlag> {
    fn into_fake_flags(self) -> Vec<FakeFlag> {
        self.into_iter()
            .flat_map(IntoFakeFlags::into_fake_flags)
            .collect()
    }
}

impl IntoFakeFlags for FeatureFlagCollection {
    fn into_fake_flags(self) -> Vec<FakeFlag> {
        self.into_iter()
            .flat_map(IntoFakeFlags::into_fake_flags)
            .collect()
    }
}

impl IntoFakeFlags for Vec<&str> {
    fn into_fake_flags(self) -> Vec<FakeFlag> {
        self.into_iter()
            .map(|name| FakeFlag {
                flag: FeatureFlag::new(name, true),
                args: ArgsMatcher::Any,
            })
            .collect()
    }
}

impl<const N: usize> IntoFakeFlags for [&str; N] {
    fn into_fake_flags(self) -> Vec<FakeFlag> {
        Vec::from(self).into_fake_flags()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Call {
    Enabled,
    Disabled,
    Get,
    All,
}

impl Display for Call {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Call::Enabled => f.write_str("enabled"),
            Call::Disabled => f.write_str("disabled"),
            Call::Get => f.write_str("get"),
            Call::All => f.write_str("all"),
        }
    }
}

/// An in-memory stand-in for [`crate::Client`] in tests.
///
/// The fake answers from the flags it was seeded with, falls back to a
/// configurable default status for everything else, and records the calls
/// made to it so tests can assert on them.
///
/// # Examples
///
/// ```rust
/// use unleash_client::{FakeClient, FeatureFlag, Features, Value};
///
/// #[tokio::main]
/// async fn main() {
///     let fake = FakeClient::new()
///         .fake(["checkout"])
///         .fake(FeatureFlag::new("legacy-search", false))
///         .fake_with_args(FeatureFlag::new("beta", true), vec![Value::from("tenant-1")]);
///
///     assert!(fake.enabled("checkout", None, &[]).await.unwrap());
///     assert!(fake.disabled("legacy-search", None, &[]).await.unwrap());
///     assert!(fake.enabled("beta", None, &[Value::from("tenant-1")]).await.unwrap());
///     assert!(!fake.enabled("beta", None, &[Value::from("tenant-2")]).await.unwrap());
///
///     fake.assert_called_enabled_times("beta", 2);
///     fake.assert_not_called_get("checkout");
/// }
/// ```
pub struct FakeClient {
    flags: Vec<FakeFlag>,
    default_status: bool,
    default_status_using: Option<Arc<StatusFn>>,
    delegate: Option<Arc<dyn Features>>,
    evaluator: Evaluator,
    calls: Mutex<HashMap<(Call, String), usize>>,
}

impl FakeClient {
    /// Creates a fake without flags. Every flag is off until faked.
    pub fn new() -> Self {
        Self {
            flags: vec![],
            default_status: false,
            default_status_using: None,
            delegate: None,
            evaluator: Evaluator::default(),
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a fake that wraps a real flag source. [`Features::all`] returns the
    /// real flags merged with the faked ones, and [`Features::variant`] of flags
    /// that are not faked is answered by `delegate`.
    pub fn wrapping(delegate: Arc<dyn Features>) -> Self {
        Self {
            delegate: Some(delegate),
            ..Self::new()
        }
    }

    /// Adds flags to the fake. Later calls append to the earlier ones.
    pub fn fake(mut self, flags: impl IntoFakeFlags) -> Self {
        self.flags.extend(flags.into_fake_flags());
        self
    }

    /// Adds a flag that answers only to calls with exactly `args`.
    pub fn fake_with_args(mut self, flag: FeatureFlag, args: Vec<Value>) -> Self {
        self.flags.push(FakeFlag {
            flag,
            args: ArgsMatcher::Exact(args),
        });
        self
    }

    /// Adds a flag that answers to calls whose arguments are accepted by `matcher`.
    pub fn fake_with_args_using<F>(mut self, flag: FeatureFlag, matcher: F) -> Self
    where
        F: Fn(&[Value]) -> bool + Send + Sync + 'static,
    {
        self.flags.push(FakeFlag {
            flag,
            args: ArgsMatcher::Using(Arc::new(matcher)),
        });
        self
    }

    /// Sets the status of flags that are not faked, or not faked for the given arguments.
    pub fn with_default_status(mut self, status: bool) -> Self {
        self.default_status = status;
        self
    }

    /// Sets a callback deciding every status the fake reports. It receives the
    /// flag name, the status the fake would report otherwise, and the extra arguments.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use unleash_client::{FakeClient, Features};
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let fake = FakeClient::new()
    ///         .with_default_status_using(|name, _, _| name.starts_with("beta-"));
    ///
    ///     assert!(fake.enabled("beta-search", None, &[]).await.unwrap());
    ///     assert!(!fake.enabled("search", None, &[]).await.unwrap());
    /// }
    /// ```
    pub fn with_default_status_using<F>(mut self, status: F) -> Self
    where
        F: Fn(&str, bool, &[Value]) -> bool + Send + Sync + 'static,
    {
        self.default_status_using = Some(Arc::new(status));
        self
    }

    /// Number of [`Features::enabled`] calls made for `name`.
    pub fn enabled_calls(&self, name: &str) -> usize {
        self.calls_of(Call::Enabled, name)
    }

    /// Number of [`Features::disabled`] calls made for `name`.
    pub fn disabled_calls(&self, name: &str) -> usize {
        self.calls_of(Call::Disabled, name)
    }

    /// Number of [`Features::get`] calls made for `name`.
    pub fn get_calls(&self, name: &str) -> usize {
        self.calls_of(Call::Get, name)
    }

    /// Number of [`Features::all`] calls.
    pub fn all_calls(&self) -> usize {
        self.calls_of(Call::All, "")
    }

    /// Panics unless [`Features::enabled`] was called for `name`.
    pub fn assert_called_enabled(&self, name: &str) {
        self.assert_called(Call::Enabled, name);
    }

    /// Panics unless [`Features::disabled`] was called for `name`.
    pub fn assert_called_disabled(&self, name: &str) {
        self.assert_called(Call::Disabled, name);
    }

    /// Panics unless [`Features::get`] was called for `name`.
    pub fn assert_called_get(&self, name: &str) {
        self.assert_called(Call::Get, name);
    }

    /// Panics unless [`Features::all`] was called.
    pub fn assert_called_all(&self) {
        assert!(
            self.all_calls() > 0,
            "Get all feature flags called 0 times, expected at least 1"
        );
    }

    /// Panics unless [`Features::enabled`] was called exactly `times` times for `name`.
    pub fn assert_called_enabled_times(&self, name: &str, times: usize) {
        self.assert_called_times(Call::Enabled, name, times);
    }

    /// Panics unless [`Features::disabled`] was called exactly `times` times for `name`.
    pub fn assert_called_disabled_times(&self, name: &str, times: usize) {
        self.assert_called_times(Call::Disabled, name, times);
    }

    /// Panics unless [`Features::get`] was called exactly `times` times for `name`.
    pub fn assert_called_get_times(&self, name: &str, times: usize) {
        self.assert_called_times(Call::Get, name, times);
    }

    /// Panics unless [`Features::all`] was called exactly `times` times.
    pub fn assert_called_all_times(&self, times: usize) {
        let calls = self.all_calls();
        assert_eq!(
            calls, times,
            "Get all feature flags called {calls} times, expected {times}"
        );
    }

    /// Panics if [`Features::enabled`] was called for `name`.
    pub fn assert_not_called_enabled(&self, name: &str) {
        self.assert_called_times(Call::Enabled, name, 0);
    }

    /// Panics if [`Features::disabled`] was called for `name`.
    pub fn assert_not_called_disabled(&self, name: &str) {
        self.assert_called_times(Call::Disabled, name, 0);
    }

    /// Panics if [`Features::get`] was called for `name`.
    pub fn assert_not_called_get(&self, name: &str) {
        self.assert_called_times(Call::Get, name, 0);
    }

    /// Panics if [`Features::all`] was called.
    pub fn assert_not_called_all(&self) {
        self.assert_called_all_times(0);
    }

    fn assert_called(&self, call: Call, name: &str) {
        assert!(
            self.calls_of(call, name) > 0,
            "Feature flag {call} called for {name} 0 times, expected at least 1"
        );
    }

    fn assert_called_times(&self, call: Call, name: &str, times: usize) {
        let calls = self.calls_of(call, name);
        assert_eq!(
            calls, times,
            "Feature flag {call} called for {name} {calls} times, expected {times}"
        );
    }

    fn record(&self, call: Call, name: &str) {
        if let Ok(mut calls) = self.calls.lock() {
            *calls.entry((call, name.to_owned())).or_insert(0) += 1;
        }
    }

    fn calls_of(&self, call: Call, name: &str) -> usize {
        self.calls
            .lock()
            .map(|calls| calls.get(&(call, name.to_owned())).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    fn status(&self, name: &str, status: bool, args: &[Value]) -> bool {
        match &self.default_status_using {
            Some(using) => using(name, status, args),
            None => status,
        }
    }

    fn fake_for(&self, name: &str, args: &[Value]) -> Option<&FakeFlag> {
        self.flags
            .iter()
            .find(|fake| fake.flag.name == name && fake.args.matches(args))
    }

    fn is_faked(&self, name: &str) -> bool {
        self.flags.iter().any(|fake| fake.flag.name == name)
    }

    fn evaluate(
        &self,
        name: &str,
        context: Option<&Context>,
        args: &[Value],
    ) -> Result<bool, ClientError> {
        let Some(fake) = self.fake_for(name, args) else {
            return Ok(self.status(name, self.default_status, args));
        };
        let context = context.cloned().unwrap_or_default();
        let enabled = self.evaluator.is_enabled(&fake.flag, &context, args)?;
        Ok(self.status(name, enabled, args))
    }
}

impl Default for FakeClient {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for FakeClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.flags.iter().map(|f| f.flag.name.as_str()).collect();
        f.debug_struct("FakeClient")
            .field("flags", &names)
            .field("default_status", &self.default_status)
            .field("delegate", &self.delegate.is_some())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Features for FakeClient {
    async fn all(&self) -> Result<Arc<FeatureFlagCollection>, ClientError> {
        self.record(Call::All, "");
        let faked: FeatureFlagCollection = FeatureFlagCollection::empty()
            .merge(&self.flags.iter().map(|fake| fake.flag.clone()).collect());
        match &self.delegate {
            Some(delegate) => Ok(Arc::new(delegate.all().await?.merge(&faked))),
            None => Ok(Arc::new(faked)),
        }
    }

    async fn get(&self, name: &str) -> Result<Option<FeatureFlag>, ClientError> {
        self.record(Call::Get, name);
        match self.fake_for(name, &[]) {
            Some(fake) => {
                let mut flag = fake.flag.clone();
                flag.enabled = self.status(name, flag.enabled, &[]);
                Ok(Some(flag))
            }
            None => Ok(Some(FeatureFlag::new(
                name,
                self.status(name, self.default_status, &[]),
            ))),
        }
    }

    async fn enabled(
        &self,
        name: &str,
        context: Option<&Context>,
        args: &[Value],
    ) -> Result<bool, ClientError> {
        self.record(Call::Enabled, name);
        self.evaluate(name, context, args)
    }

    async fn disabled(
        &self,
        name: &str,
        context: Option<&Context>,
        args: &[Value],
    ) -> Result<bool, ClientError> {
        self.record(Call::Disabled, name);
        Ok(!self.evaluate(name, context, args)?)
    }

    async fn variant(
        &self,
        name: &str,
        default: serde_json::Value,
        context: Option<&Context>,
    ) -> Result<Variant, ClientError> {
        if !self.is_faked(name) {
            if let Some(delegate) = &self.delegate {
                return delegate.variant(name, default, context).await;
            }
        }
        let enabled = self.evaluate(name, context, &[])?;
        let Some(fake) = self.fake_for(name, &[]) else {
            return Ok(Variant::default_variant(default));
        };
        let context = context.cloned().unwrap_or_default();
        select_variant(&fake.flag, default, &context, enabled)
    }
}
