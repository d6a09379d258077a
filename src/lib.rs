//! Unleash feature flag client for Rust.
//!
//! Fetches feature flag definitions from an Unleash-compatible service, caches
//! them with failover, and evaluates them per request through pluggable
//! strategies, constraints and sticky variant assignment.

#![warn(missing_docs)]

#[macro_use]
mod macros;
mod builder;
mod cache;
mod client;
mod constants;
mod constraint;
mod context;
mod env;
mod errors;
mod eval;
mod fake;
mod features;
mod fetch;
mod model;
mod strategy;
mod utils;
mod value;

pub use builder::ClientBuilder;
pub use cache::{FeatureCache, InMemoryCache};
pub use client::Client;
pub use constants::PKG_VERSION;
pub use constraint::{ConstraintHandler, ConstraintRegistry, ContextFieldConstraint};
pub use context::Context;
pub use env::EnvConfig;
pub use errors::{ClientError, ErrorKind};
pub use fake::{FakeClient, IntoFakeFlags};
pub use features::Features;
pub use model::flag::{Constraint, ConstraintOperator, FeatureFlag, FeatureFlagCollection, Strategy};
pub use model::variant::{
    CsvPayload, JsonPayload, Override, Payload, RawPayload, Variant, VariantDefinition,
};
pub use model::Error as ModelError;
pub use strategy::{BuiltinStrategy, StrategyHandler, StrategyRegistry};
pub use value::Value;
