use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::sync::Cache;
use traderdna_core::{AnalysisRequest, WalletError, WalletReport};

use crate::config::CacheConfig;

/// Reports are only reusable for the same wallet, reference time and
/// upstream data snapshot.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct ReportKey {
    pub wallet: String,
    pub as_of: Option<DateTime<Utc>>,
    pub snapshot_version: String,
}

impl ReportKey {
    /// `None` when the request carries no snapshot version; such requests
    /// are never cached.
    pub fn for_request(request: &AnalysisRequest) -> Option<Self> {
        let snapshot_version = request.snapshot_version.clone()?;
        Some(Self {
            wallet: request.wallet.clone(),
            as_of: request.as_of.or_else(|| request.trades.last().map(|t| t.timestamp)),
            snapshot_version,
        })
    }
}

/// Report cache guaranteeing at most one computation per key
#[derive(Clone)]
pub struct ReportCache {
    cache: Option<Cache<ReportKey, Arc<WalletReport>>>,
}

impl ReportCache {
    pub fn new(config: &CacheConfig) -> Self {
        let cache = config.enabled.then(|| {
            Cache::builder()
                .max_capacity(config.max_capacity)
                .time_to_live(Duration::from_secs(config.ttl_seconds))
                .build()
        });
        Self { cache }
    }

    /// Cached report for `request`, computing it with `analyze` on a miss.
    /// Concurrent callers for the same key wait for the first computation.
    pub fn get_or_analyze<F>(
        &self,
        request: &AnalysisRequest,
        analyze: F,
    ) -> Result<Arc<WalletReport>, WalletError>
    where
        F: FnOnce() -> Result<WalletReport, WalletError>,
    {
        let (Some(cache), Some(key)) = (&self.cache, ReportKey::for_request(request)) else {
            return analyze().map(Arc::new);
        };

        if let Some(report) = cache.get(&key) {
            tracing::debug!(wallet = %key.wallet, "Report cache hit");
            return Ok(report);
        }

        cache
            .try_get_with(key, || analyze().map(Arc::new))
            .map_err(|e| WalletError::clone(&e))
    }
}
