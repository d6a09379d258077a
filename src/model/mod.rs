use std::collections::HashMap;

use serde::Deserialize;
use thiserror::Error;

use crate::model::flag::{
    Constraint, FeatureFlag, FeatureFlagCollection, Strategy, DEFAULT_FLAG_TYPE, DEFAULT_PROJECT,
};
use crate::model::variant::{
    Override, RawPayload, VariantDefinition, DEFAULT_STICKINESS, FIXED_WEIGHT_TYPE,
};

pub mod flag;
pub mod variant;

/// Error raised while decoding a flag set.
#[derive(Error, Debug, PartialEq)]
pub enum Error {
    /// The document is not valid JSON or does not have the expected shape.
    #[error("JSON parsing failed. ({0})")]
    Parse(String),
    /// A variant declares a payload type this client cannot decode.
    #[error("Unknown variant payload type: {0}")]
    UnknownPayloadType(String),
    /// A variant payload could not be decoded as its declared type.
    #[error("Invalid '{0}' variant payload ({1})")]
    InvalidPayload(String, String),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFeature {
    name: String,
    #[serde(default)]
    enabled: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    project: Option<String>,
    #[serde(default)]
    stale: Option<bool>,
    #[serde(default, rename = "type")]
    flag_type: Option<String>,
    #[serde(default)]
    strategies: Option<Vec<Strategy>>,
    #[serde(default)]
    variants: Option<Vec<RawVariant>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawVariant {
    name: String,
    #[serde(default)]
    weight: u32,
    #[serde(default)]
    weight_type: Option<String>,
    #[serde(default)]
    stickiness: Option<String>,
    #[serde(default)]
    payload: Option<RawPayload>,
    #[serde(default)]
    overrides: Option<Vec<Override>>,
}

impl From<RawVariant> for VariantDefinition {
    fn from(raw: RawVariant) -> Self {
        VariantDefinition {
            name: raw.name,
            weight: raw.weight,
            weight_type: raw.weight_type.unwrap_or(FIXED_WEIGHT_TYPE.to_owned()),
            stickiness: raw.stickiness.unwrap_or(DEFAULT_STICKINESS.to_owned()),
            payload: raw.payload,
            overrides: raw.overrides.unwrap_or_default(),
        }
    }
}

impl From<RawFeature> for FeatureFlag {
    fn from(raw: RawFeature) -> Self {
        let variants = raw
            .variants
            .unwrap_or_default()
            .into_iter()
            .map(VariantDefinition::from)
            .collect();
        FeatureFlag {
            name: raw.name,
            enabled: raw.enabled,
            description: raw.description.unwrap_or_default(),
            project: raw.project.unwrap_or(DEFAULT_PROJECT.to_owned()),
            stale: raw.stale.unwrap_or(false),
            flag_type: raw.flag_type.unwrap_or(DEFAULT_FLAG_TYPE.to_owned()),
            strategies: raw.strategies.unwrap_or_default(),
            variants,
        }
    }
}

impl FeatureFlagCollection {
    /// Decodes a features document (`{"features": [...]}`).
    ///
    /// A document without a `features` attribute yields an empty collection.
    /// Missing flag attributes get their defaults: empty description, `default`
    /// project, not stale, `release` type, no strategies and no variants.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::Parse`] when the text is not a valid features document.
    /// Variant payloads are kept undecoded, so their content never fails here.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use unleash_client::FeatureFlagCollection;
    ///
    /// let flags = FeatureFlagCollection::from_json(r#"{"features": [{"name": "someFeature", "enabled": true}]}"#).unwrap();
    /// let flag = flags.get("someFeature").unwrap();
    ///
    /// assert!(flag.enabled);
    /// assert_eq!(flag.project, "default");
    /// assert!(flag.strategies.is_empty());
    /// ```
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let mut document: HashMap<String, serde_json::Value> =
            serde_json::from_str(json).map_err(|err| Error::Parse(err.to_string()))?;
        let Some(features) = document.remove("features") else {
            return Ok(Self::empty());
        };
        if features.is_null() {
            return Ok(Self::empty());
        }
        let raw: Vec<RawFeature> =
            serde_json::from_value(features).map_err(|err| Error::Parse(err.to_string()))?;
        Ok(Self::new(raw.into_iter().map(FeatureFlag::from).collect()))
    }

    /// Encodes the collection into a features document that [`FeatureFlagCollection::from_json`]
    /// reads back unchanged.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod model_tests {
    use std::collections::HashMap;

    use crate::model::flag::{ConstraintOperator, FeatureFlagCollection};
    use crate::model::Error;

    #[test]
    fn defaults_are_applied() {
        let flags =
            FeatureFlagCollection::from_json(r#"{"features": [{"name": "a", "enabled": true}]}"#)
                .unwrap();
        let flag = flags.get("a").unwrap();
        assert_eq!(flag.description, "");
        assert_eq!(flag.project, "default");
        assert!(!flag.stale);
        assert_eq!(flag.flag_type, "release");
        assert!(flag.strategies.is_empty());
        assert!(flag.variants.is_empty());
    }

    #[test]
    fn missing_features_is_empty() {
        let flags = FeatureFlagCollection::from_json(r#"{"version": 1}"#).unwrap();
        assert!(flags.is_empty());
    }

    #[test]
    fn full_document() {
        let flags = FeatureFlagCollection::from_json(
            r#"{"version": 1, "features": [{
                "name": "checkout",
                "description": "New checkout",
                "project": "shop",
                "enabled": true,
                "stale": true,
                "type": "experiment",
                "strategies": [{
                    "name": "userWithId",
                    "parameters": {"userIds": "1,2"},
                    "constraints": [{"contextName": "environment", "operator": "IN", "values": ["production"]}]
                }],
                "variants": [{
                    "name": "blue", "weight": 500, "weightType": "variable", "stickiness": "sessionId",
                    "payload": {"type": "string", "value": "b"},
                    "overrides": [{"contextName": "userId", "values": ["7"]}]
                }, {
                    "name": "red", "weight": 500
                }]
            }]}"#,
        )
        .unwrap();

        let flag = flags.get("checkout").unwrap();
        assert_eq!(flag.project, "shop");
        assert!(flag.stale);
        assert_eq!(flag.flag_type, "experiment");
        assert_eq!(
            flag.strategies[0].parameters,
            HashMap::from([("userIds".to_owned(), "1,2".to_owned())])
        );
        assert_eq!(flag.strategies[0].constraints[0].operator, ConstraintOperator::In);

        let blue = &flag.variants[0];
        assert_eq!(blue.weight_type, "variable");
        assert_eq!(blue.stickiness, "sessionId");
        assert_eq!(blue.payload.as_ref().unwrap().kind, "string");
        assert_eq!(blue.resolve().unwrap().payload.unwrap().as_str(), Some("b"));
        assert_eq!(blue.overrides[0].values, vec!["7"]);

        let red = &flag.variants[1];
        assert_eq!(red.weight_type, "fixed");
        assert_eq!(red.stickiness, "default");
        assert!(red.payload.is_none());
    }

    #[test]
    fn null_parameters() {
        let flags = FeatureFlagCollection::from_json(
            r#"{"features": [{"name": "a", "enabled": true, "strategies": [{"name": "default", "parameters": null}]}]}"#,
        )
        .unwrap();
        assert!(flags.get("a").unwrap().strategies[0].parameters.is_empty());
    }

    #[test]
    fn invalid_document() {
        match FeatureFlagCollection::from_json(r#"{"features": [{"#) {
            Err(Error::Parse(_)) => {}
            _ => panic!(),
        }
        match FeatureFlagCollection::from_json(r#"{"features": "nope"}"#) {
            Err(Error::Parse(_)) => {}
            _ => panic!(),
        }
    }

    #[test]
    fn bad_payloads_do_not_fail_the_document() {
        let flags = FeatureFlagCollection::from_json(
            r#"{"features": [
                {"name": "a", "enabled": true, "variants": [
                    {"name": "v", "weight": 1, "payload": {"type": "xml", "value": "<a/>"}}
                ]},
                {"name": "b", "enabled": true, "variants": [
                    {"name": "v", "weight": 1, "payload": {"type": "json", "value": "{oops"}}
                ]},
                {"name": "c", "enabled": true}
            ]}"#,
        )
        .unwrap();
        assert_eq!(flags.names(), vec!["a", "b", "c"]);

        let xml = &flags.get("a").unwrap().variants[0];
        assert_eq!(xml.resolve(), Err(Error::UnknownPayloadType("xml".to_owned())));
        let json = &flags.get("b").unwrap().variants[0];
        match json.resolve() {
            Err(Error::InvalidPayload(kind, _)) => assert_eq!(kind, "json"),
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn json_round_trip_through_cache_format() {
        let source = r#"{"features": [{"name": "a", "enabled": true, "variants": [
            {"name": "v", "weight": 1000, "payload": {"type": "csv", "value": "x,y"}}
        ]}]}"#;
        let flags = FeatureFlagCollection::from_json(source).unwrap();
        let restored = FeatureFlagCollection::from_json(flags.to_json().as_str()).unwrap();
        assert_eq!(flags, restored);
    }

    #[test]
    fn undecodable_payload_survives_cache_format() {
        let source = r#"{"features": [{"name": "a", "enabled": true, "variants": [
            {"name": "v", "weight": 1000, "payload": {"type": "number"}},
            {"name": "w", "weight": 0, "payload": {"type": "json", "value": "{oops"}}
        ]}]}"#;
        let flags = FeatureFlagCollection::from_json(source).unwrap();
        let json = flags.to_json();
        assert!(json.contains(r#""payload":{"type":"number","value":null}"#));
        assert!(json.contains(r#""payload":{"type":"json","value":"{oops"}"#));

        let restored = FeatureFlagCollection::from_json(json.as_str()).unwrap();
        assert_eq!(flags, restored);
        assert_eq!(
            restored.get("a").unwrap().variants[0].resolve(),
            Err(Error::UnknownPayloadType("number".to_owned()))
        );
    }
}
