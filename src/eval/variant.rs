use log::debug;

use crate::context::{Context, IP_ADDRESS, SESSION_ID, USER_ID};
use crate::errors::ClientError;
use crate::errors::ErrorKind::{InvalidVariantPayload, UnknownVariantPayloadType};
use crate::model::flag::FeatureFlag;
use crate::model::variant::{Variant, VariantDefinition, DEFAULT_STICKINESS};
use crate::model::Error;
use crate::utils::{murmur3, random_seed};

/// Assigns one of the variants of `flag` to `context`.
///
/// Falls back to the default variant wrapping `default` when the flag is off
/// (`enabled == false`), has no variants, or has no weight to distribute. A
/// variant whose override matches the context wins outright. Otherwise the
/// context is bucketed by hashing `<flag name>:<stickiness seed>` into the
/// total weight.
///
/// Only the payload of the selected variant is decoded. A payload that cannot
/// be decoded fails this lookup and nothing else.
pub(crate) fn select_variant(
    flag: &FeatureFlag,
    default: serde_json::Value,
    context: &Context,
    enabled: bool,
) -> Result<Variant, ClientError> {
    match pick(flag, context, enabled) {
        Some(definition) => definition.resolve().map_err(|err| payload_error(flag, definition, err)),
        None => Ok(Variant::default_variant(default)),
    }
}

fn pick<'a>(flag: &'a FeatureFlag, context: &Context, enabled: bool) -> Option<&'a VariantDefinition> {
    if !enabled || flag.variants.is_empty() {
        return None;
    }
    let total_weight: u64 = flag.variants.iter().map(|v| v.weight as u64).sum();
    if total_weight == 0 {
        return None;
    }

    if let Some(forced) = overridden(flag, context) {
        return Some(forced);
    }

    let seed = stickiness_seed(flag, context);
    let bucket = bucket_of(flag.name.as_str(), seed.as_str(), total_weight);

    let mut threshold: u64 = 0;
    for variant in flag.variants.iter() {
        if variant.has_overrides() || variant.weight == 0 {
            continue;
        }
        threshold += variant.weight as u64;
        if threshold >= bucket {
            return Some(variant);
        }
    }
    None
}

fn overridden<'a>(flag: &'a FeatureFlag, context: &Context) -> Option<&'a VariantDefinition> {
    flag.variants.iter().find(|variant| {
        variant.overrides.iter().any(|ov| {
            context
                .get(ov.context_name.as_str())
                .is_some_and(|value| ov.values.iter().any(|item| item == value))
        })
    })
}

fn payload_error(flag: &FeatureFlag, variant: &VariantDefinition, err: Error) -> ClientError {
    let kind = match err {
        Error::UnknownPayloadType(_) => UnknownVariantPayloadType,
        Error::InvalidPayload(_, _) | Error::Parse(_) => InvalidVariantPayload,
    };
    ClientError::new(
        kind,
        format!("Variant '{}' of flag '{}' cannot be used. {err}", variant.name, flag.name),
    )
}

fn stickiness_seed(flag: &FeatureFlag, context: &Context) -> String {
    let stickiness = flag
        .variants
        .first()
        .map(|v| v.stickiness.as_str())
        .unwrap_or(DEFAULT_STICKINESS);

    let seed = if stickiness == DEFAULT_STICKINESS {
        [USER_ID, SESSION_ID, IP_ADDRESS]
            .into_iter()
            .find_map(|name| context.get(name))
    } else {
        context.get(stickiness)
    };

    match seed {
        Some(seed) => seed.to_owned(),
        None => {
            debug!(
                "No '{stickiness}' stickiness value in the context, variant of flag '{}' is assigned randomly.",
                flag.name
            );
            random_seed()
        }
    }
}

/// 1-based position of `<name>:<seed>` in a weight space of `total_weight`.
pub(crate) fn bucket_of(name: &str, seed: &str, total_weight: u64) -> u64 {
    murmur3(format!("{name}:{seed}").as_str()) as u64 % total_weight + 1
}

#[cfg(test)]
mod variant_selection_tests {
    use serde_json::json;

    use crate::context::Context;
    use crate::errors::ErrorKind;
    use crate::eval::variant::{bucket_of, select_variant};
    use crate::model::flag::FeatureFlag;
    use crate::model::variant::{Payload, Variant, VariantDefinition};

    fn variant(name: &str, weight: u32) -> VariantDefinition {
        VariantDefinition::new(name, weight)
    }

    fn select(flag: &FeatureFlag, default: serde_json::Value, ctx: &Context, enabled: bool) -> Variant {
        select_variant(flag, default, ctx, enabled).unwrap()
    }

    fn flag() -> FeatureFlag {
        FeatureFlag::new("someFeature", true)
            .with_variant(variant("testing", 500))
            .with_variant(variant("testing 2", 500))
    }

    #[test]
    fn buckets() {
        assert_eq!(bucket_of("someFeature", "1", 1000), 171);
        assert_eq!(bucket_of("someFeature", "2", 1000), 210);
        assert_eq!(bucket_of("someFeature", "3", 1000), 635);
    }

    #[test]
    fn sticky_by_user_id() {
        let flag = flag();
        let pick = |id: u32| select(&flag, json!("d"), &Context::new().user_id(id), true).name;
        assert_eq!(pick(1), "testing");
        assert_eq!(pick(2), "testing");
        assert_eq!(pick(3), "testing 2");
    }

    #[test]
    fn session_and_ip_fallbacks() {
        let flag = flag();
        let by_session = select(&flag, json!("d"), &Context::new().session_id("3"), true);
        let by_ip = select(&flag, json!("d"), &Context::new().ip_address("3"), true);
        assert_eq!(by_session.name, "testing 2");
        assert_eq!(by_ip.name, "testing 2");
    }

    #[test]
    fn custom_stickiness() {
        let mut flag = flag();
        for v in flag.variants.iter_mut() {
            v.stickiness = "tenant".to_owned();
        }
        let ctx = Context::new().user_id(1).custom("tenant", "3");
        assert_eq!(select(&flag, json!("d"), &ctx, true).name, "testing 2");
    }

    #[test]
    fn disabled_gives_default() {
        let selected = select(&flag(), json!({"x": 1}), &Context::new().user_id(1), false);
        assert!(selected.is_default());
        assert_eq!(selected.payload.unwrap().as_default(), Some(&json!({"x": 1})));
    }

    #[test]
    fn zero_weight_gives_default() {
        let flag = FeatureFlag::new("f", true).with_variant(variant("a", 0));
        assert!(select(&flag, json!("d"), &Context::new().user_id(1), true).is_default());
        let empty = FeatureFlag::new("f", true);
        assert!(select(&empty, json!("d"), &Context::new().user_id(1), true).is_default());
    }

    #[test]
    fn override_wins() {
        let forced = variant("forced", 1).with_override("userId", &["1", "99"]);
        let flag = FeatureFlag::new("someFeature", true)
            .with_variant(variant("testing", 999))
            .with_variant(forced);

        assert_eq!(select(&flag, json!("d"), &Context::new().user_id(99), true).name, "forced");
        assert_eq!(select(&flag, json!("d"), &Context::new().user_id(1), true).name, "forced");
        assert_eq!(select(&flag, json!("d"), &Context::new().user_id(2), true).name, "testing");
    }

    #[test]
    fn payload_decoded_on_selection() {
        let flag = FeatureFlag::new("f", true).with_variant(variant("v", 1000).with_payload("csv", "a,b"));
        let selected = select(&flag, json!("d"), &Context::new().user_id(1), true);
        assert_eq!(selected.payload.unwrap().as_csv().unwrap().as_slice(), &["a", "b"]);
    }

    #[test]
    fn bad_payload_fails_only_when_selected() {
        let flag = FeatureFlag::new("someFeature", true)
            .with_variant(variant("testing", 500))
            .with_variant(variant("testing 2", 500).with_payload("number", 5));

        assert_eq!(select(&flag, json!("d"), &Context::new().user_id(1), true).name, "testing");
        assert!(select(&flag, json!("d"), &Context::new().user_id(3), false).is_default());

        let err = select_variant(&flag, json!("d"), &Context::new().user_id(3), true).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownVariantPayloadType);
        assert_eq!(
            err.message,
            "Variant 'testing 2' of flag 'someFeature' cannot be used. Unknown variant payload type: number"
        );
    }

    #[test]
    fn invalid_json_payload() {
        let flag = FeatureFlag::new("f", true).with_variant(variant("v", 1000).with_payload("json", "{oops"));
        let err = select_variant(&flag, json!("d"), &Context::new().user_id(1), true).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidVariantPayload);
        assert!(err.is_configuration());
    }

    #[test]
    fn default_variant_keeps_payload_type() {
        let selected = select(&FeatureFlag::new("f", true), json!([1]), &Context::new(), true);
        assert_eq!(selected.payload, Some(Payload::Default(json!([1]))));
    }
}
