use std::cell::RefCell;
use std::sync::Mutex;
use std::time::Duration;

use log::kv::Key;
use log::{set_max_level, Level, Log, Metadata, Record};
use mockito::{Mock, ServerGuard};
use rand::distr::{Alphanumeric, SampleString};
use unleash_client::{FeatureCache, InMemoryCache};

pub const FEATURES_PATH: &str = "/api/client/features";

pub async fn mock_features(server: &mut ServerGuard, body: &str) -> Mock {
    server
        .mock("GET", FEATURES_PATH)
        .with_status(200)
        .with_body(body)
        .create_async()
        .await
}

pub fn features_json(features: &[&str]) -> String {
    format!(r#"{{"version": 1, "features": [{}]}}"#, features.join(","))
}

pub fn flag_json(name: &str, enabled: bool) -> String {
    format!(r#"{{"name": "{name}", "enabled": {enabled}}}"#)
}

pub fn rand_str(len: usize) -> String {
    Alphanumeric.sample_string(&mut rand::rng(), len)
}

/// An [`InMemoryCache`] that remembers which keys were touched and how.
#[derive(Default)]
pub struct SpyCache {
    inner: InMemoryCache,
    ttl_writes: Mutex<Vec<String>>,
    forever_writes: Mutex<Vec<String>>,
    forgotten: Mutex<Vec<String>>,
}

impl SpyCache {
    pub fn ttl_writes(&self) -> Vec<String> {
        self.ttl_writes.lock().unwrap().clone()
    }

    pub fn forever_writes(&self) -> Vec<String> {
        self.forever_writes.lock().unwrap().clone()
    }

    pub fn forgotten(&self) -> Vec<String> {
        self.forgotten.lock().unwrap().clone()
    }

    pub fn put(&self, key: &str, value: &str) {
        self.inner.set_forever(key, value);
    }
}

impl FeatureCache for SpyCache {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) {
        self.ttl_writes.lock().unwrap().push(key.to_owned());
        self.inner.set(key, value, ttl);
    }

    fn set_forever(&self, key: &str, value: &str) {
        self.forever_writes.lock().unwrap().push(key.to_owned());
        self.inner.set_forever(key, value);
    }

    fn forget(&self, key: &str) {
        self.forgotten.lock().unwrap().push(key.to_owned());
        self.inner.forget(key);
    }
}

pub struct RecordingLogger {}

impl RecordingLogger {
    thread_local!(pub static LOGS: RefCell<String> = RefCell::new(String::default()));

    pub fn take() -> String {
        Self::LOGS.with_borrow_mut(std::mem::take)
    }
}

impl Log for RecordingLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level() && metadata.target().contains("unleash_client")
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let level = match record.level() {
            Level::Error => "ERROR",
            Level::Warn => "WARNING",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        };
        let event_id = record
            .key_values()
            .get(Key::from("event_id"))
            .and_then(|v| v.to_i64())
            .unwrap_or_default();
        Self::LOGS.with_borrow_mut(|l| l.push_str(format!("{level} [{event_id}] {}\n", record.args()).as_str()));
    }

    fn flush(&self) {}
}

pub fn log_record_init() {
    set_max_level(log::LevelFilter::Warn);
    _ = log::set_logger(&RecordingLogger {});
}
