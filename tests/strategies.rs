#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use unleash_client::{
    Client, ClientError, Constraint, ConstraintHandler, ConstraintRegistry, Context,
    StrategyHandler, StrategyRegistry, Value,
};

use crate::utils::{features_json, log_record_init, mock_features, RecordingLogger};

mod utils;

/// Enabled when the first argument is one of the comma separated `tenants`.
struct TenantStrategy;

impl StrategyHandler for TenantStrategy {
    fn is_enabled(&self, params: &HashMap<String, String>, _: &Context, args: &[Value]) -> bool {
        let Some(Value::String(tenant)) = args.first() else {
            return false;
        };
        params
            .get("tenants")
            .is_some_and(|tenants| tenants.split(',').any(|t| t.trim() == tenant))
    }
}

/// Passes when the context value starts with any of the constraint values.
struct PrefixConstraint;

impl ConstraintHandler for PrefixConstraint {
    fn validate(&self, constraint: &Constraint, context: &Context) -> Result<bool, ClientError> {
        let Some(value) = context.get(constraint.context_name.as_str()) else {
            return Ok(false);
        };
        Ok(constraint.values.iter().any(|v| value.starts_with(v.as_str())))
    }
}

const TENANT_FLAG: &str = r#"{"name": "tenantFeature", "enabled": true, "strategies": [
    {"name": "tenant", "parameters": {"tenants": "acme, globex"}}
]}"#;

#[tokio::test]
async fn custom_strategy_receives_args() {
    let mut server = mockito::Server::new_async().await;
    mock_features(&mut server, features_json(&[TENANT_FLAG]).as_str()).await;

    let client = Client::builder(server.url().as_str())
        .strategy("tenant", TenantStrategy)
        .build()
        .unwrap();

    assert!(client.enabled("tenantFeature", None, &[Value::from("acme")]).await.unwrap());
    assert!(client.enabled("tenantFeature", None, &[Value::from("globex")]).await.unwrap());
    assert!(!client.enabled("tenantFeature", None, &[Value::from("initech")]).await.unwrap());
    assert!(!client.enabled("tenantFeature", None, &[]).await.unwrap());
}

#[tokio::test]
async fn unregistered_strategy_is_skipped() {
    let mut server = mockito::Server::new_async().await;
    mock_features(
        &mut server,
        features_json(&[
            TENANT_FLAG,
            r#"{"name": "mixed", "enabled": true, "strategies": [
                {"name": "tenant", "parameters": {"tenants": "acme"}},
                {"name": "default"}
            ]}"#,
        ])
        .as_str(),
    )
    .await;

    let client = Client::new(server.url().as_str()).unwrap();

    assert!(!client.enabled("tenantFeature", None, &[Value::from("acme")]).await.unwrap());
    assert!(client.enabled("mixed", None, &[]).await.unwrap());
}

#[tokio::test]
async fn strategy_factory_called_per_evaluation() {
    let mut server = mockito::Server::new_async().await;
    mock_features(&mut server, features_json(&[TENANT_FLAG]).as_str()).await;

    let created = Arc::new(AtomicUsize::new(0));
    let counter = created.clone();
    let client = Client::builder(server.url().as_str())
        .strategy_factory("tenant", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            TenantStrategy
        })
        .build()
        .unwrap();

    for _ in 0..3 {
        assert!(client.enabled("tenantFeature", None, &[Value::from("acme")]).await.unwrap());
    }
    assert_eq!(created.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn replaced_registry_drops_builtins() {
    let mut server = mockito::Server::new_async().await;
    mock_features(
        &mut server,
        features_json(&[r#"{"name": "f", "enabled": true, "strategies": [{"name": "default"}]}"#])
            .as_str(),
    )
    .await;

    let client = Client::builder(server.url().as_str())
        .strategies(StrategyRegistry::empty())
        .build()
        .unwrap();

    assert!(!client.enabled("f", None, &[]).await.unwrap());
}

#[tokio::test]
async fn constraints_and() {
    let mut server = mockito::Server::new_async().await;
    mock_features(
        &mut server,
        features_json(&[r#"{"name": "f", "enabled": true, "strategies": [{"name": "default", "constraints": [
            {"contextName": "environment", "operator": "IN", "values": ["production", "staging"]},
            {"contextName": "userId", "operator": "NOT_IN", "values": ["666"]}
        ]}]}"#])
        .as_str(),
    )
    .await;

    let client = Client::new(server.url().as_str()).unwrap();
    let prod = Context::new().environment("production").user_id(1);
    let banned = Context::new().environment("production").user_id(666);
    let dev = Context::new().environment("dev").user_id(1);

    assert!(client.enabled("f", Some(&prod), &[]).await.unwrap());
    assert!(!client.enabled("f", Some(&banned), &[]).await.unwrap());
    assert!(!client.enabled("f", Some(&dev), &[]).await.unwrap());
}

#[tokio::test]
async fn custom_constraint_handler() {
    let mut server = mockito::Server::new_async().await;
    mock_features(
        &mut server,
        features_json(&[r#"{"name": "f", "enabled": true, "strategies": [{"name": "default", "constraints": [
            {"contextName": "region", "operator": "IN", "values": ["eu-"]}
        ]}]}"#])
        .as_str(),
    )
    .await;

    let client = Client::builder(server.url().as_str())
        .constraint("region", PrefixConstraint)
        .build()
        .unwrap();

    let west = Context::new().custom("region", "eu-west-1");
    let us = Context::new().custom("region", "us-east-1");
    assert!(client.enabled("f", Some(&west), &[]).await.unwrap());
    assert!(!client.enabled("f", Some(&us), &[]).await.unwrap());
}

#[tokio::test]
async fn unsupported_constraint_is_skipped() {
    log_record_init();

    let mut server = mockito::Server::new_async().await;
    mock_features(
        &mut server,
        features_json(&[r#"{"name": "f", "enabled": true, "strategies": [{"name": "default", "constraints": [
            {"contextName": "region", "operator": "IN", "values": ["eu-west-1"]}
        ]}]}"#])
        .as_str(),
    )
    .await;

    let client = Client::builder(server.url().as_str())
        .constraints(ConstraintRegistry::default())
        .build()
        .unwrap();
    RecordingLogger::take();

    let us = Context::new().custom("region", "us-east-1");
    assert!(client.enabled("f", Some(&us), &[]).await.unwrap());
    assert!(RecordingLogger::take()
        .contains("WARNING [3001] Constraint on unsupported context attribute 'region' of flag 'f' is skipped."));
}
