use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};

use crate::builder::Options;
use crate::cache::FeatureCache;
use crate::constants::{CACHE_KEY_PREFIX, FAILOVER_CACHE_KEY_PREFIX, SERIALIZATION_FORMAT_VERSION};
use crate::errors::ClientError;
use crate::fetch::fetcher::Fetcher;
use crate::model::flag::FeatureFlagCollection;
use crate::utils::sha1;

/// Resolves the current flag set: from the TTL-bound cache entry or a
/// once-per-client fetch, with the failover entry as last resort.
pub struct FeatureService {
    fetcher: Fetcher,
    cache: Arc<dyn FeatureCache>,
    cache_key: String,
    failover_key: String,
    enabled: bool,
    cache_enabled: bool,
    cache_ttl: Duration,
    failover: bool,
    memo: tokio::sync::Mutex<Option<Arc<FeatureFlagCollection>>>,
}

impl FeatureService {
    pub fn new(opts: &Options) -> Result<Self, ClientError> {
        let fetcher = Fetcher::new(
            opts.features_url().to_owned(),
            opts.http_timeout(),
            opts.app_name(),
            opts.instance_id(),
            opts.headers(),
        )?;
        let key_hash = sha1(
            format!(
                "{url}_{SERIALIZATION_FORMAT_VERSION}",
                url = opts.features_url()
            )
            .as_str(),
        );
        Ok(Self {
            fetcher,
            cache: opts.cache(),
            cache_key: format!("{CACHE_KEY_PREFIX}_{key_hash}"),
            failover_key: format!("{FAILOVER_CACHE_KEY_PREFIX}_{key_hash}"),
            enabled: opts.enabled(),
            cache_enabled: opts.cache_enabled(),
            cache_ttl: opts.cache_ttl(),
            failover: opts.failover(),
            memo: tokio::sync::Mutex::new(None),
        })
    }

    /// Returns the current flag set.
    ///
    /// Retrieval failures (transport errors, unexpected statuses, undecodable
    /// responses) are answered from the failover entry, or with an empty set when
    /// failover is off. Only configuration errors are returned.
    pub async fn get_all_flags(&self) -> Result<Arc<FeatureFlagCollection>, ClientError> {
        if !self.enabled {
            return Ok(Arc::new(FeatureFlagCollection::empty()));
        }
        match self.resolve().await {
            Ok(flags) => {
                self.cache
                    .set_forever(self.failover_key.as_str(), flags.to_json().as_str());
                Ok(flags)
            }
            Err(err) if err.is_failover_eligible() => Ok(Arc::new(self.failover_flags(&err))),
            Err(err) => Err(err),
        }
    }

    #[cfg(test)]
    pub fn cache_key(&self) -> &str {
        self.cache_key.as_str()
    }

    #[cfg(test)]
    pub fn failover_key(&self) -> &str {
        self.failover_key.as_str()
    }

    async fn resolve(&self) -> Result<Arc<FeatureFlagCollection>, ClientError> {
        if self.cache_enabled {
            self.remember().await
        } else {
            self.memoized().await
        }
    }

    /// Reads the cached flag set, or fetches and caches it for the configured TTL.
    async fn remember(&self) -> Result<Arc<FeatureFlagCollection>, ClientError> {
        if let Some(cached) = self.cache.get(self.cache_key.as_str()) {
            match FeatureFlagCollection::from_json(cached.as_str()) {
                Ok(flags) => {
                    debug!("Feature flags read from the cache");
                    return Ok(Arc::new(flags));
                }
                Err(err) => {
                    warn!(event_id = 2201; "Cached feature flags are invalid, fetching them again. {err}");
                    self.cache.forget(self.cache_key.as_str());
                }
            }
        }
        let flags = self.fetcher.fetch().await?;
        self.cache.set(
            self.cache_key.as_str(),
            flags.to_json().as_str(),
            self.cache_ttl,
        );
        Ok(Arc::new(flags))
    }

    /// Fetches the flag set once and keeps it for the lifetime of the service.
    async fn memoized(&self) -> Result<Arc<FeatureFlagCollection>, ClientError> {
        let mut memo = self.memo.lock().await;
        if let Some(flags) = memo.as_ref() {
            return Ok(Arc::clone(flags));
        }
        let flags = Arc::new(self.fetcher.fetch().await?);
        *memo = Some(Arc::clone(&flags));
        Ok(flags)
    }

    fn failover_flags(&self, cause: &ClientError) -> FeatureFlagCollection {
        if !self.failover {
            warn!(event_id = 3101; "Feature flags are unavailable and failover is disabled, continuing without flags. ({cause})");
            return FeatureFlagCollection::empty();
        }
        let Some(stored) = self.cache.get(self.failover_key.as_str()) else {
            warn!(event_id = 3102; "Feature flags are unavailable and no failover copy exists, continuing without flags. ({cause})");
            return FeatureFlagCollection::empty();
        };
        match FeatureFlagCollection::from_json(stored.as_str()) {
            Ok(flags) => {
                warn!(event_id = 3103; "Feature flags are unavailable, using the failover copy. ({cause})");
                flags
            }
            Err(err) => {
                warn!(event_id = 3104; "Failover copy of the feature flags is invalid, continuing without flags. {err}");
                FeatureFlagCollection::empty()
            }
        }
    }
}
