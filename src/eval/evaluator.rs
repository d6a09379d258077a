use std::sync::Arc;

use log::{debug, warn};

use crate::constraint::ConstraintRegistry;
use crate::context::Context;
use crate::errors::ClientError;
use crate::model::flag::{FeatureFlag, Strategy};
use crate::model::variant::Variant;
use crate::strategy::StrategyRegistry;
use crate::value::Value;

/// Decides flag enablement and variant assignment with a fixed set of strategies and constraints.
#[derive(Clone, Debug, Default)]
pub(crate) struct Evaluator {
    strategies: Arc<StrategyRegistry>,
    constraints: Arc<ConstraintRegistry>,
}

impl Evaluator {
    pub(crate) fn new(strategies: StrategyRegistry, constraints: ConstraintRegistry) -> Self {
        Self {
            strategies: Arc::new(strategies),
            constraints: Arc::new(constraints),
        }
    }

    /// A disabled flag is off, an enabled flag without strategies is on. Otherwise
    /// the first strategy that passes its constraints and grants turns the flag on.
    pub(crate) fn is_enabled(
        &self,
        flag: &FeatureFlag,
        context: &Context,
        args: &[Value],
    ) -> Result<bool, ClientError> {
        if !flag.enabled {
            return Ok(false);
        }
        if flag.strategies.is_empty() {
            return Ok(true);
        }
        for strategy in flag.strategies.iter() {
            let Some(handler) = self.strategies.get(strategy.name.as_str()) else {
                debug!("Strategy '{}' of flag '{}' is not registered, skipping it.", strategy.name, flag.name);
                continue;
            };
            if !self.constraints_pass(flag, strategy, context)? {
                continue;
            }
            if handler.is_enabled(&strategy.parameters, context, args) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Selects the variant of `flag` for `context`, or the default variant wrapping
    /// `default` when the flag is off for the context. Fails when the payload of
    /// the selected variant cannot be decoded.
    pub(crate) fn variant(
        &self,
        flag: &FeatureFlag,
        default: serde_json::Value,
        context: &Context,
    ) -> Result<Variant, ClientError> {
        let enabled = self.is_enabled(flag, context, &[])?;
        crate::eval::variant::select_variant(flag, default, context, enabled)
    }

    fn constraints_pass(
        &self,
        flag: &FeatureFlag,
        strategy: &Strategy,
        context: &Context,
    ) -> Result<bool, ClientError> {
        for constraint in strategy.constraints.iter() {
            let Some(handler) = self.constraints.get(constraint.context_name.as_str()) else {
                warn!(event_id = 3001; "Constraint on unsupported context attribute '{}' of flag '{}' is skipped.", constraint.context_name, flag.name);
                continue;
            };
            if !handler.validate(constraint, context)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
