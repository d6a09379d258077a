use criterion::Criterion;
use criterion::{criterion_group, criterion_main};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use unleash_client::{Client, Context, FeatureCache};

struct SingleValueCache {
    value: String,
}

impl SingleValueCache {
    pub fn new(val: String) -> Self {
        Self { value: val }
    }
}

impl FeatureCache for SingleValueCache {
    fn get(&self, _: &str) -> Option<String> {
        Some(self.value.clone())
    }
    fn set(&self, _: &str, _: &str, _: Duration) {}
    fn set_forever(&self, _: &str, _: &str) {}
    fn forget(&self, _: &str) {}
}

fn enabled_bench(c: &mut Criterion) {
    let client = Arc::new(
        Client::builder("https://unleash.example.com")
            .cache_enabled(true)
            // The cache always answers, so no HTTP request is made during the measurement.
            .cache(Arc::new(SingleValueCache::new(construct_features_payload())))
            .build()
            .unwrap(),
    );
    c.bench_function("enabled", |b| {
        b.to_async(Runtime::new().unwrap()).iter(|| async {
            let mut handles = Vec::new();
            for i in 0..200 {
                let cl = client.clone();
                handles.push(tokio::spawn(async move {
                    let ctx = Context::new().user_id(i);
                    _ = cl.enabled("testKey", Some(&ctx), &[]).await;
                }));
            }
            for handle in handles {
                handle.await.unwrap();
            }
        });
    });
    c.bench_function("variant", |b| {
        b.to_async(Runtime::new().unwrap()).iter(|| async {
            let mut handles = Vec::new();
            for i in 0..200 {
                let cl = client.clone();
                handles.push(tokio::spawn(async move {
                    let ctx = Context::new().user_id(i);
                    _ = cl.variant("testKey", "off", Some(&ctx)).await;
                }));
            }
            for handle in handles {
                handle.await.unwrap();
            }
        });
    });
}

fn construct_features_payload() -> String {
    r#"{"version": 1, "features": [{"name": "testKey", "enabled": true,
        "strategies": [
            {"name": "userWithId", "parameters": {"userIds": "1,2,3"}},
            {"name": "default", "constraints": [{"contextName": "userId", "operator": "NOT_IN", "values": ["4"]}]}
        ],
        "variants": [
            {"name": "a", "weight": 500, "weightType": "variable", "stickiness": "default"},
            {"name": "b", "weight": 500, "weightType": "variable", "stickiness": "default"}
        ]}]}"#
        .to_owned()
}

criterion_group!(benches, enabled_bench);
criterion_main!(benches);
