use std::fmt::{Display, Formatter};
use std::ops::Index;
use std::slice::Iter;

use serde::{Deserialize, Serialize};

use crate::model::Error;

pub const DEFAULT_VARIANT_NAME: &str = "default";
pub const DEFAULT_STICKINESS: &str = "default";
pub const FIXED_WEIGHT_TYPE: &str = "fixed";

/// Declares one of the payload-bearing outcomes of a feature flag, as received
/// from the flag service.
///
/// The payload is kept in its wire form and decoded only when the variant is
/// selected, so a bad payload affects nothing but the variant lookups of its own flag.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VariantDefinition {
    /// The name of the variant.
    pub name: String,
    /// The share of the variant in the weight space of its flag.
    pub weight: u32,
    /// How the weight was assigned.
    pub weight_type: String,
    /// The context attribute used as bucketing seed, or `default`.
    pub stickiness: String,
    /// The undecoded payload of the variant (if any).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<RawPayload>,
    /// Rules that force this variant for matching contexts.
    pub overrides: Vec<Override>,
}

impl VariantDefinition {
    /// Creates a variant with the given weight, `fixed` weight type, `default`
    /// stickiness, no payload and no overrides.
    pub fn new(name: &str, weight: u32) -> Self {
        Self {
            name: name.to_owned(),
            weight,
            weight_type: FIXED_WEIGHT_TYPE.to_owned(),
            stickiness: DEFAULT_STICKINESS.to_owned(),
            payload: None,
            overrides: vec![],
        }
    }

    /// Sets the payload.
    pub fn with_payload(mut self, kind: &str, value: impl Into<serde_json::Value>) -> Self {
        self.payload = Some(RawPayload {
            kind: kind.to_owned(),
            value: value.into(),
        });
        self
    }

    /// Sets the stickiness.
    pub fn with_stickiness(mut self, stickiness: &str) -> Self {
        self.stickiness = stickiness.to_owned();
        self
    }

    /// Appends an override.
    pub fn with_override(mut self, context_name: &str, values: &[&str]) -> Self {
        self.overrides.push(Override {
            context_name: context_name.to_owned(),
            values: values.iter().map(|v| (*v).to_owned()).collect(),
        });
        self
    }

    /// Decodes the payload and produces the [`Variant`] handed to callers.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::UnknownPayloadType`] or [`Error::InvalidPayload`] when
    /// the payload cannot be decoded as its declared type.
    pub fn resolve(&self) -> Result<Variant, Error> {
        let payload = match &self.payload {
            Some(raw) => Some(Payload::decode(raw.kind.as_str(), raw.value.clone())?),
            None => None,
        };
        Ok(Variant {
            name: self.name.clone(),
            payload,
        })
    }

    pub(crate) fn has_overrides(&self) -> bool {
        !self.overrides.is_empty()
    }
}

impl Display for VariantDefinition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.weight)
    }
}

/// A variant payload in its wire form: `{"type": ..., "value": ...}`.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct RawPayload {
    /// The declared type: `string`, `json`, `csv` or `default`.
    #[serde(rename = "type")]
    pub kind: String,
    /// The payload value as received.
    #[serde(default)]
    pub value: serde_json::Value,
}

/// The variant assigned to a context.
#[derive(Clone, Debug, PartialEq)]
pub struct Variant {
    /// The name of the variant, `default` for the fallback variant.
    pub name: String,
    /// The decoded payload of the variant (if any).
    pub payload: Option<Payload>,
}

impl Variant {
    /// The synthetic variant returned when no real variant applies. Its payload
    /// wraps the caller-supplied `default` value unchanged.
    pub fn default_variant(default: serde_json::Value) -> Self {
        Self {
            name: DEFAULT_VARIANT_NAME.to_owned(),
            payload: Some(Payload::Default(default)),
        }
    }

    /// Returns `true` when this is the synthetic default variant.
    pub fn is_default(&self) -> bool {
        matches!(self.payload, Some(Payload::Default(_)))
    }
}

impl Display for Variant {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name.as_str())
    }
}

/// Forces a variant when the named context attribute holds one of the values.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Override {
    /// The context attribute the override is based on.
    pub context_name: String,
    /// The values that select the variant.
    #[serde(default)]
    pub values: Vec<String>,
}

/// The decoded payload of a [`Variant`].
///
/// Built from a [`RawPayload`] when the variant is selected.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    /// A plain text payload.
    String(String),
    /// A JSON document payload.
    Json(JsonPayload),
    /// A comma separated list payload.
    Csv(CsvPayload),
    /// The caller-supplied fallback value of the default variant.
    Default(serde_json::Value),
}

impl Payload {
    pub(crate) fn decode(kind: &str, value: serde_json::Value) -> Result<Self, Error> {
        match kind {
            "string" => Ok(Payload::String(text_of(value))),
            "json" => JsonPayload::parse(value).map(Payload::Json),
            "csv" => Ok(Payload::Csv(CsvPayload::parse(text_of(value)))),
            "default" => Ok(Payload::Default(value)),
            other => Err(Error::UnknownPayloadType(other.to_owned())),
        }
    }

    /// The declared type of the payload: `string`, `json`, `csv` or `default`.
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::String(_) => "string",
            Payload::Json(_) => "json",
            Payload::Csv(_) => "csv",
            Payload::Default(_) => "default",
        }
    }

    /// The text of a [`Payload::String`].
    pub fn as_str(&self) -> Option<&str> {
        if let Payload::String(val) = self {
            return Some(val.as_str());
        }
        None
    }

    /// The parsed document of a [`Payload::Json`].
    pub fn as_json(&self) -> Option<&JsonPayload> {
        if let Payload::Json(val) = self {
            return Some(val);
        }
        None
    }

    /// The items of a [`Payload::Csv`].
    pub fn as_csv(&self) -> Option<&CsvPayload> {
        if let Payload::Csv(val) = self {
            return Some(val);
        }
        None
    }

    /// The wrapped fallback value of a [`Payload::Default`].
    pub fn as_default(&self) -> Option<&serde_json::Value> {
        if let Payload::Default(val) = self {
            return Some(val);
        }
        None
    }
}

fn text_of(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(val) => val,
        serde_json::Value::Null => String::default(),
        other => other.to_string(),
    }
}

/// A JSON variant payload. Lookups go straight into the parsed document.
///
/// # Examples
///
/// ```rust
/// use unleash_client::FeatureFlagCollection;
///
/// let flags = FeatureFlagCollection::from_json(r#"{"features": [{
///     "name": "checkout", "enabled": true,
///     "variants": [{"name": "red", "weight": 1000, "weightType": "fixed", "stickiness": "default",
///                   "payload": {"type": "json", "value": "{\"color\": \"red\"}"}}]
/// }]}"#).unwrap();
///
/// let variant = flags.get("checkout").unwrap().variants[0].resolve().unwrap();
/// let payload = variant.payload.unwrap();
/// assert_eq!(payload.as_json().unwrap().get("color").unwrap(), "red");
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct JsonPayload {
    raw: String,
    value: serde_json::Value,
}

impl JsonPayload {
    fn parse(value: serde_json::Value) -> Result<Self, Error> {
        match value {
            serde_json::Value::String(raw) => match serde_json::from_str(raw.as_str()) {
                Ok(value) => Ok(Self { raw, value }),
                Err(err) => Err(Error::InvalidPayload("json".to_owned(), err.to_string())),
            },
            other => Ok(Self {
                raw: other.to_string(),
                value: other,
            }),
        }
    }

    /// Gets a top-level attribute of the document.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.value.get(key)
    }

    /// Returns `true` when the document has the given top-level attribute.
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Looks up a value by a JSON Pointer, e.g. `/settings/limit`.
    pub fn pointer(&self, pointer: &str) -> Option<&serde_json::Value> {
        self.value.pointer(pointer)
    }

    /// The parsed document.
    pub fn value(&self) -> &serde_json::Value {
        &self.value
    }

    /// The payload text as it was received.
    pub fn raw(&self) -> &str {
        self.raw.as_str()
    }
}

/// A CSV variant payload: an ordered, read-only list of items.
///
/// The list can only be read; there is no way to change the items once decoded.
///
/// # Examples
///
/// ```rust
/// use unleash_client::VariantDefinition;
///
/// let variant = VariantDefinition::new("v", 1000).with_payload("csv", "a,b,c").resolve().unwrap();
/// let payload = variant.payload.unwrap();
/// let csv = payload.as_csv().unwrap();
/// assert_eq!(&csv[1], "b");
/// assert_eq!(csv.len(), 3);
/// ```
///
/// Items cannot be replaced through indexing:
///
/// ```compile_fail
/// use unleash_client::VariantDefinition;
///
/// let variant = VariantDefinition::new("v", 1000).with_payload("csv", "a,b,c").resolve().unwrap();
/// let mut payload = variant.payload.unwrap();
/// if let unleash_client::Payload::Csv(csv) = &mut payload {
///     csv[0].make_ascii_uppercase();
/// }
/// ```
///
/// Nor through the slice view:
///
/// ```compile_fail
/// use unleash_client::VariantDefinition;
///
/// let variant = VariantDefinition::new("v", 1000).with_payload("csv", "a,b,c").resolve().unwrap();
/// let payload = variant.payload.unwrap();
/// payload.as_csv().unwrap().as_slice()[0] = "z".to_owned();
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct CsvPayload {
    raw: String,
    values: Vec<String>,
}

impl CsvPayload {
    fn parse(raw: String) -> Self {
        let values = raw.split(',').map(|item| item.to_owned()).collect();
        Self { raw, values }
    }

    /// Gets the item at `index`.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` when there are no items.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates the items in order.
    pub fn iter(&self) -> Iter<'_, String> {
        self.values.iter()
    }

    /// The items as a slice.
    pub fn as_slice(&self) -> &[String] {
        self.values.as_slice()
    }

    /// The payload text as it was received.
    pub fn raw(&self) -> &str {
        self.raw.as_str()
    }
}

impl Index<usize> for CsvPayload {
    type Output = str;

    fn index(&self, index: usize) -> &Self::Output {
        self.values[index].as_str()
    }
}

impl<'a> IntoIterator for &'a CsvPayload {
    type Item = &'a String;
    type IntoIter = Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

#[cfg(test)]
mod variant_model_tests {
    use serde_json::json;

    use crate::model::variant::{Payload, VariantDefinition};
    use crate::model::Error;

    #[test]
    fn decode_string() {
        let payload = Payload::decode("string", json!("testing")).unwrap();
        assert_eq!(payload.as_str(), Some("testing"));
        assert_eq!(payload.kind(), "string");
    }

    #[test]
    fn decode_json() {
        let payload = Payload::decode("json", json!(r#"{"foo": "bar", "baz": "bat"}"#)).unwrap();
        let doc = payload.as_json().unwrap();
        assert_eq!(doc.get("foo").unwrap(), "bar");
        assert_eq!(doc.get("baz").unwrap(), "bat");
        assert!(doc.has("foo"));
        assert!(!doc.has("bar"));
    }

    #[test]
    fn decode_json_pointer() {
        let payload = Payload::decode("json", json!(r#"{"a": {"b": [1, 2]}}"#)).unwrap();
        assert_eq!(payload.as_json().unwrap().pointer("/a/b/1").unwrap(), 2);
    }

    #[test]
    fn decode_invalid_json() {
        match Payload::decode("json", json!("{nope")) {
            Err(Error::InvalidPayload(kind, _)) => assert_eq!(kind, "json"),
            _ => panic!(),
        }
    }

    #[test]
    fn decode_csv() {
        let payload = Payload::decode("csv", json!("foo,bar,baz")).unwrap();
        let csv = payload.as_csv().unwrap();
        assert_eq!(csv.len(), 3);
        assert_eq!(&csv[0], "foo");
        assert_eq!(csv.get(2), Some("baz"));
        assert_eq!(csv.get(3), None);
        assert_eq!(csv.iter().cloned().collect::<Vec<String>>(), vec!["foo", "bar", "baz"]);
    }

    #[test]
    fn decode_default_keeps_value() {
        let payload = Payload::decode("default", json!({"x": 1})).unwrap();
        assert_eq!(payload.as_default().unwrap(), &json!({"x": 1}));
    }

    #[test]
    fn decode_unknown() {
        match Payload::decode("yaml", json!("a: b")) {
            Err(err) => assert_eq!(err.to_string(), "Unknown variant payload type: yaml"),
            Ok(_) => panic!(),
        }
    }

    #[test]
    fn serialize_keeps_raw_payload() {
        let definition = VariantDefinition::new("v", 1000).with_payload("json", r#"{"foo":"bar"}"#);
        let json = serde_json::to_string(&definition).unwrap();
        assert!(json.contains(r#""payload":{"type":"json","value":"{\"foo\":\"bar\"}"}"#));
    }

    #[test]
    fn resolve_decodes_payload() {
        let variant = VariantDefinition::new("v", 1000).with_payload("string", "hi").resolve().unwrap();
        assert_eq!(variant.name, "v");
        assert_eq!(variant.payload, Some(Payload::String("hi".to_owned())));
        assert!(!variant.is_default());

        let bare = VariantDefinition::new("w", 1).resolve().unwrap();
        assert_eq!(bare.payload, None);
    }

    #[test]
    fn resolve_reports_bad_payload() {
        let unknown = VariantDefinition::new("v", 1000).with_payload("number", 5);
        assert_eq!(unknown.resolve(), Err(Error::UnknownPayloadType("number".to_owned())));

        let invalid = VariantDefinition::new("v", 1000).with_payload("json", "{oops");
        match invalid.resolve() {
            Err(Error::InvalidPayload(kind, _)) => assert_eq!(kind, "json"),
            other => panic!("{other:?}"),
        }
    }
}
