use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use crate::context::{Context, APP_NAME, ENVIRONMENT, IP_ADDRESS, SESSION_ID, USER_ID};
use crate::errors::{ClientError, ErrorKind};
use crate::model::flag::{Constraint, ConstraintOperator};

/// Validates strategy constraints for one context attribute.
pub trait ConstraintHandler: Send + Sync {
    /// Returns whether `context` satisfies `constraint`.
    ///
    /// # Errors
    ///
    /// Fails with [`ErrorKind::UnknownConstraintOperator`] when the operator is not supported.
    fn validate(&self, constraint: &Constraint, context: &Context) -> Result<bool, ClientError>;
}

/// Compares the context attribute named by the constraint with the constraint values.
#[derive(Clone, Copy, Debug, Default)]
pub struct ContextFieldConstraint;

impl ConstraintHandler for ContextFieldConstraint {
    fn validate(&self, constraint: &Constraint, context: &Context) -> Result<bool, ClientError> {
        let value = context.get(constraint.context_name.as_str());
        let listed = value.is_some_and(|val| constraint.values.iter().any(|item| item == val));
        match &constraint.operator {
            ConstraintOperator::In => Ok(listed),
            ConstraintOperator::NotIn => Ok(!listed),
            ConstraintOperator::Unknown(op) => Err(ClientError::new(
                ErrorKind::UnknownConstraintOperator,
                format!(
                    "Unknown constraint operator '{op}' on context attribute '{}'.",
                    constraint.context_name
                ),
            )),
        }
    }
}

/// Maps context attribute names to the handlers validating constraints on them.
///
/// Constraints on attributes without a handler are skipped.
#[derive(Clone)]
pub struct ConstraintRegistry {
    handlers: HashMap<String, Arc<dyn ConstraintHandler>>,
}

impl ConstraintRegistry {
    /// Creates a registry without any handler.
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Binds the handler of a context attribute, replacing any earlier binding.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use unleash_client::{ConstraintRegistry, ContextFieldConstraint};
    ///
    /// let mut registry = ConstraintRegistry::default();
    /// registry.register("tenant", ContextFieldConstraint);
    /// assert!(registry.get("tenant").is_some());
    /// ```
    pub fn register(&mut self, context_name: &str, handler: impl ConstraintHandler + 'static) {
        self.handlers
            .insert(context_name.to_owned(), Arc::new(handler));
    }

    /// Removes the handler of a context attribute.
    pub fn remove(&mut self, context_name: &str) {
        self.handlers.remove(context_name);
    }

    /// Gets the handler of a context attribute.
    pub fn get(&self, context_name: &str) -> Option<&dyn ConstraintHandler> {
        self.handlers.get(context_name).map(|h| h.as_ref())
    }
}

impl Default for ConstraintRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        for name in [ENVIRONMENT, APP_NAME, USER_ID, SESSION_ID, IP_ADDRESS] {
            registry.register(name, ContextFieldConstraint);
        }
        registry
    }
}

impl Debug for ConstraintRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("ConstraintRegistry")
            .field("context_names", &names)
            .finish()
    }
}
