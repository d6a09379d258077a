/// The version of this crate.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_FEATURES_ENDPOINT: &str = "/api/client/features";
pub const CACHE_KEY_PREFIX: &str = "unleash";
pub const FAILOVER_CACHE_KEY_PREFIX: &str = "unleash_failover";
pub const SERIALIZATION_FORMAT_VERSION: &str = "v1";

pub const DEFAULT_CACHE_TTL_SECS: u64 = 15;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
