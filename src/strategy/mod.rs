use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use crate::context::Context;
use crate::value::Value;

pub mod builtin;

pub use builtin::BuiltinStrategy;

/// An activation strategy: a predicate deciding whether a flag is on for a context.
///
/// Implement this to add custom strategies and register them on the
/// [`crate::ClientBuilder`] under the name the flag service uses for them.
///
/// # Examples
///
/// ```rust
/// use std::collections::HashMap;
/// use unleash_client::{Context, StrategyHandler, Value};
///
/// struct TenantStrategy;
///
/// impl StrategyHandler for TenantStrategy {
///     fn is_enabled(&self, params: &HashMap<String, String>, _: &Context, args: &[Value]) -> bool {
///         let Some(tenant) = args.first().and_then(Value::as_str) else {
///             return false;
///         };
///         params.get("tenants").is_some_and(|list| list.split(',').any(|t| t.trim() == tenant))
///     }
/// }
/// ```
pub trait StrategyHandler: Send + Sync {
    /// Returns `true` when the strategy grants the flag.
    ///
    /// `params` are the strategy parameters configured on the flag service, and
    /// `args` are the extra arguments of the enablement check, passed through untouched.
    fn is_enabled(&self, params: &HashMap<String, String>, context: &Context, args: &[Value])
        -> bool;
}

type Factory = Arc<dyn Fn() -> Arc<dyn StrategyHandler> + Send + Sync>;

#[derive(Clone)]
enum Registration {
    Instance(Arc<dyn StrategyHandler>),
    Factory(Factory),
}

/// Maps strategy names to their handlers.
///
/// A name is bound either to a shared instance or to a factory that produces a
/// fresh handler on every lookup. The default registry holds the [`BuiltinStrategy`] set.
#[derive(Clone)]
pub struct StrategyRegistry {
    entries: HashMap<String, Registration>,
}

impl StrategyRegistry {
    /// Creates a registry without any strategy.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Binds `name` to a shared handler instance, replacing any earlier binding.
    pub fn register(&mut self, name: &str, handler: impl StrategyHandler + 'static) {
        self.entries
            .insert(name.to_owned(), Registration::Instance(Arc::new(handler)));
    }

    /// Binds `name` to a factory called on every lookup, replacing any earlier binding.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use unleash_client::{BuiltinStrategy, StrategyRegistry};
    ///
    /// let mut registry = StrategyRegistry::default();
    /// registry.register_factory("gradualRollout", || BuiltinStrategy::Default);
    /// assert!(registry.contains("gradualRollout"));
    /// ```
    pub fn register_factory<H, F>(&mut self, name: &str, factory: F)
    where
        H: StrategyHandler + 'static,
        F: Fn() -> H + Send + Sync + 'static,
    {
        let factory: Factory = Arc::new(move || Arc::new(factory()) as Arc<dyn StrategyHandler>);
        self.entries
            .insert(name.to_owned(), Registration::Factory(factory));
    }

    /// Removes the binding of `name`.
    pub fn remove(&mut self, name: &str) {
        self.entries.remove(name);
    }

    /// Returns `true` when `name` is bound.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Resolves the handler bound to `name`.
    pub fn get(&self, name: &str) -> Option<Arc<dyn StrategyHandler>> {
        match self.entries.get(name)? {
            Registration::Instance(handler) => Some(Arc::clone(handler)),
            Registration::Factory(factory) => Some(factory()),
        }
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        for strategy in BuiltinStrategy::ALL {
            registry.register(strategy.name(), strategy);
        }
        registry
    }
}

impl Debug for StrategyRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.entries.keys().collect();
        names.sort();
        f.debug_struct("StrategyRegistry")
            .field("names", &names)
            .finish()
    }
}
