use std::collections::{HashMap, HashSet};
use std::fmt::{Display, Formatter};
use std::slice::Iter;
use std::vec::IntoIter;

use serde::{Deserialize, Serialize};

use crate::model::variant::VariantDefinition;

pub const DEFAULT_PROJECT: &str = "default";
pub const DEFAULT_FLAG_TYPE: &str = "release";

/// Describes a feature flag.
///
/// Flags are rebuilt on every retrieval of the flag set and never changed afterwards.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct FeatureFlag {
    /// The unique name of the flag.
    pub name: String,
    /// The on/off toggle of the flag. When `false`, no strategy or variant is consulted.
    pub enabled: bool,
    /// Free-form description.
    pub description: String,
    /// The project the flag belongs to.
    pub project: String,
    /// Marked as stale on the flag service.
    pub stale: bool,
    /// The kind of the flag (`release`, `experiment`, `operational`, ...).
    #[serde(rename = "type")]
    pub flag_type: String,
    /// The activation strategies (where there is a logical OR relation between the items).
    pub strategies: Vec<Strategy>,
    /// The variants of the flag.
    pub variants: Vec<VariantDefinition>,
}

impl FeatureFlag {
    /// Creates a flag with the given name and toggle, and defaults for everything else.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use unleash_client::FeatureFlag;
    ///
    /// let flag = FeatureFlag::new("someFeature", true);
    /// assert_eq!(flag.project, "default");
    /// assert_eq!(flag.flag_type, "release");
    /// ```
    pub fn new(name: &str, enabled: bool) -> Self {
        Self {
            name: name.to_owned(),
            enabled,
            description: String::default(),
            project: DEFAULT_PROJECT.to_owned(),
            stale: false,
            flag_type: DEFAULT_FLAG_TYPE.to_owned(),
            strategies: vec![],
            variants: vec![],
        }
    }

    /// Appends an activation strategy.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategies.push(strategy);
        self
    }

    /// Appends a variant.
    pub fn with_variant(mut self, variant: VariantDefinition) -> Self {
        self.variants.push(variant);
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_owned();
        self
    }
}

impl Display for FeatureFlag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let state = if self.enabled { "enabled" } else { "disabled" };
        write!(
            f,
            "{} ({state}, {} strategies, {} variants)",
            self.name,
            self.strategies.len(),
            self.variants.len()
        )
    }
}

/// Binds a named strategy, with its parameters and constraints, to a flag.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Strategy {
    /// The name the strategy is registered under.
    pub name: String,
    /// The configuration of the strategy.
    #[serde(default, deserialize_with = "nullable_map")]
    pub parameters: HashMap<String, String>,
    /// The constraints that must all pass before the strategy is asked.
    #[serde(default)]
    pub constraints: Vec<Constraint>,
}

impl Strategy {
    /// Creates a strategy binding without parameters or constraints.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            parameters: HashMap::new(),
            constraints: vec![],
        }
    }

    /// Adds a parameter.
    pub fn param(mut self, key: &str, value: &str) -> Self {
        self.parameters.insert(key.to_owned(), value.to_owned());
        self
    }

    /// Appends a constraint.
    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }
}

fn nullable_map<'de, D>(deserializer: D) -> Result<HashMap<String, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<HashMap<String, serde_json::Value>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| match v {
            serde_json::Value::String(text) => (k, text),
            other => (k, other.to_string()),
        })
        .collect())
}

/// A condition attached to a strategy that matches a context attribute against a value set.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Constraint {
    /// The context attribute the constraint is based on.
    pub context_name: String,
    /// The relation between the context attribute and the values.
    pub operator: ConstraintOperator,
    /// The values compared to the context attribute.
    #[serde(default)]
    pub values: Vec<String>,
}

impl Constraint {
    /// Creates a constraint.
    pub fn new(context_name: &str, operator: ConstraintOperator, values: &[&str]) -> Self {
        Self {
            context_name: context_name.to_owned(),
            operator,
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }
}

impl Display for Constraint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} [{}]",
            self.context_name,
            self.operator,
            self.values.join(", ")
        )
    }
}

/// Constraint comparison operator.
///
/// Operators unknown to this client are kept as [`ConstraintOperator::Unknown`]
/// and rejected when the constraint is evaluated.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(from = "String", into = "String")]
pub enum ConstraintOperator {
    /// Checks whether the context attribute is one of the values.
    In,
    /// Checks whether the context attribute is none of the values.
    NotIn,
    /// An operator this client does not support.
    Unknown(String),
}

impl From<String> for ConstraintOperator {
    fn from(value: String) -> Self {
        match value.as_str() {
            "IN" => ConstraintOperator::In,
            "NOT_IN" => ConstraintOperator::NotIn,
            _ => ConstraintOperator::Unknown(value),
        }
    }
}

impl From<ConstraintOperator> for String {
    fn from(value: ConstraintOperator) -> Self {
        value.to_string()
    }
}

impl Display for ConstraintOperator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConstraintOperator::In => f.write_str("IN"),
            ConstraintOperator::NotIn => f.write_str("NOT_IN"),
            ConstraintOperator::Unknown(op) => f.write_str(op),
        }
    }
}

/// An ordered list of [`FeatureFlag`]s addressable by name.
///
/// This is the unit the flag service returns and the caches store.
#[derive(Serialize, Clone, Debug, Default, PartialEq)]
pub struct FeatureFlagCollection {
    #[serde(rename = "features")]
    flags: Vec<FeatureFlag>,
}

impl FeatureFlagCollection {
    /// Creates a collection from the given flags, keeping their order.
    pub fn new(flags: Vec<FeatureFlag>) -> Self {
        Self { flags }
    }

    /// Creates an empty collection.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Gets the first flag with the given name.
    pub fn get(&self, name: &str) -> Option<&FeatureFlag> {
        self.flags.iter().find(|flag| flag.name == name)
    }

    /// Returns `true` when a flag with the given name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Appends a flag.
    pub fn push(&mut self, flag: FeatureFlag) {
        self.flags.push(flag);
    }

    /// Returns a new collection with the flags of `self`, followed by the flags of
    /// `other` whose names are not present yet.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use unleash_client::{FeatureFlag, FeatureFlagCollection};
    ///
    /// let remote = FeatureFlagCollection::new(vec![FeatureFlag::new("a", false)]);
    /// let local = FeatureFlagCollection::new(vec![FeatureFlag::new("a", true), FeatureFlag::new("b", true)]);
    ///
    /// let merged = remote.merge(&local);
    /// assert_eq!(merged.names(), vec!["a", "b"]);
    /// assert!(!merged.get("a").unwrap().enabled);
    /// ```
    pub fn merge(&self, other: &FeatureFlagCollection) -> Self {
        let mut seen: HashSet<&str> = self.flags.iter().map(|f| f.name.as_str()).collect();
        let mut flags = self.flags.clone();
        for flag in other.iter() {
            if seen.insert(flag.name.as_str()) {
                flags.push(flag.clone());
            }
        }
        Self { flags }
    }

    /// Names of the flags in order.
    pub fn names(&self) -> Vec<&str> {
        self.flags.iter().map(|f| f.name.as_str()).collect()
    }

    /// Iterates the flags in order.
    pub fn iter(&self) -> Iter<'_, FeatureFlag> {
        self.flags.iter()
    }

    /// Number of flags.
    pub fn len(&self) -> usize {
        self.flags.len()
    }

    /// Returns `true` when there are no flags.
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

impl From<Vec<FeatureFlag>> for FeatureFlagCollection {
    fn from(value: Vec<FeatureFlag>) -> Self {
        Self::new(value)
    }
}

impl FromIterator<FeatureFlag> for FeatureFlagCollection {
    fn from_iter<T: IntoIterator<Item = FeatureFlag>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl IntoIterator for FeatureFlagCollection {
    type Item = FeatureFlag;
    type IntoIter = IntoIter<FeatureFlag>;

    fn into_iter(self) -> Self::IntoIter {
        self.flags.into_iter()
    }
}

impl<'a> IntoIterator for &'a FeatureFlagCollection {
    type Item = &'a FeatureFlag;
    type IntoIter = Iter<'a, FeatureFlag>;

    fn into_iter(self) -> Self::IntoIter {
        self.flags.iter()
    }
}

#[cfg(test)]
mod flag_model_tests {
    use crate::model::flag::{ConstraintOperator, FeatureFlag, FeatureFlagCollection};

    #[test]
    fn lookup_returns_first_match() {
        let collection = FeatureFlagCollection::new(vec![
            FeatureFlag::new("a", true),
            FeatureFlag::new("a", false),
        ]);
        assert!(collection.get("a").unwrap().enabled);
        assert!(collection.get("b").is_none());
    }

    #[test]
    fn merge_keeps_existing() {
        let first = FeatureFlagCollection::new(vec![FeatureFlag::new("a", true)]);
        let second: FeatureFlagCollection =
            vec![FeatureFlag::new("b", true), FeatureFlag::new("a", false)].into();
        let merged = first.merge(&second);
        assert_eq!(merged.len(), 2);
        assert!(merged.get("a").unwrap().enabled);
        assert!(merged.contains("b"));
    }

    #[test]
    fn operator_strings() {
        assert_eq!(ConstraintOperator::from("IN".to_owned()), ConstraintOperator::In);
        assert_eq!(ConstraintOperator::from("NOT_IN".to_owned()), ConstraintOperator::NotIn);
        assert_eq!(
            ConstraintOperator::from("STR_CONTAINS".to_owned()),
            ConstraintOperator::Unknown("STR_CONTAINS".to_owned())
        );
        assert_eq!(String::from(ConstraintOperator::NotIn), "NOT_IN");
    }
}
