//! Pair enricher
//!
//! Best-effort pair-indexer lookup for a pool that is already proven
//! tradable. Keyed by pool address only. Every call resolves within the
//! configured timeout and never returns an error: misses, rate limits and
//! timeouts all degrade to "no pair".
//!
//! Per-pool state lives in a bounded TTL cache. A found pair is served
//! from cache until it expires; a miss schedules the next query with
//! exponential backoff and stops after `max_attempts`.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::types::{Enrichment, PairInfo};
use crate::cache::TtlCache;
use crate::config::EnrichmentConfig;
use crate::dexscreener::{DexPair, PairIndexer};

/// How long bookkeeping for unfound pools is kept
const MISS_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, PartialEq)]
enum PoolState {
    Found(PairInfo),
    Waiting { attempts: u32, retry_at: Instant },
    Exhausted { attempts: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnricherSettings {
    pub enabled: bool,
    pub timeout: Duration,
    pub max_attempts: u32,
    pub min_backoff: Duration,
    pub max_backoff: Duration,
    pub found_ttl: Duration,
    pub cache_capacity: usize,
}

impl EnricherSettings {
    pub fn from_config(config: &EnrichmentConfig) -> Self {
        Self {
            enabled: config.enabled,
            // Never allowed to hold up a verdict for long
            timeout: Duration::from_millis(config.timeout_ms.min(3000)),
            max_attempts: config.max_attempts.max(1),
            min_backoff: Duration::from_secs(config.min_backoff_secs),
            max_backoff: Duration::from_secs(config.max_backoff_secs),
            found_ttl: Duration::from_secs(config.found_ttl_secs),
            cache_capacity: config.cache_capacity,
        }
    }

    /// Delay before the next query after `attempts` misses
    pub fn backoff_after(&self, attempts: u32) -> Duration {
        let exp = attempts.saturating_sub(1).min(16);
        self.min_backoff
            .saturating_mul(1u32 << exp)
            .min(self.max_backoff)
    }
}

pub struct PairEnricher {
    indexer: Arc<dyn PairIndexer>,
    settings: EnricherSettings,
    cache: TtlCache<String, PoolState>,
}

impl PairEnricher {
    pub fn new(indexer: Arc<dyn PairIndexer>, settings: EnricherSettings) -> Self {
        let cache = TtlCache::new(settings.cache_capacity, settings.found_ttl);
        Self {
            indexer,
            settings,
            cache,
        }
    }

    pub async fn enrich(&self, pool_address: &str) -> Enrichment {
        if !self.settings.enabled {
            return Enrichment::Disabled;
        }

        let key = pool_address.to_string();
        let attempts = match self.cache.get(&key) {
            Some(PoolState::Found(pair)) => return Enrichment::Found(pair),
            Some(PoolState::Exhausted { attempts }) => {
                return Enrichment::NotIndexed {
                    attempts,
                    retry_in_secs: None,
                }
            }
            Some(PoolState::Waiting { attempts, retry_at }) => {
                let now = Instant::now();
                if retry_at > now && attempts == 0 {
                    return Enrichment::Unavailable {
                        reason: "pair indexer backing off".to_string(),
                    };
                }
                if retry_at > now {
                    return Enrichment::NotIndexed {
                        attempts,
                        retry_in_secs: Some((retry_at - now).as_secs().max(1)),
                    };
                }
                attempts
            }
            None => 0,
        };

        let lookup = tokio::time::timeout(self.settings.timeout, self.indexer.get_pair(pool_address)).await;
        match lookup {
            Ok(Ok(Some(pair))) => {
                let info = pair_info(&pair);
                debug!(pool = %pool_address, "Pair indexed");
                self.cache
                    .insert_with_ttl(key, PoolState::Found(info.clone()), self.settings.found_ttl);
                Enrichment::Found(info)
            }
            Ok(Ok(None)) => {
                let attempts = attempts + 1;
                if attempts >= self.settings.max_attempts {
                    debug!(pool = %pool_address, attempts, "Pair not indexed, giving up");
                    self.cache
                        .insert_with_ttl(key, PoolState::Exhausted { attempts }, MISS_TTL);
                    Enrichment::NotIndexed {
                        attempts,
                        retry_in_secs: None,
                    }
                } else {
                    let delay = self.settings.backoff_after(attempts);
                    self.cache.insert_with_ttl(
                        key,
                        PoolState::Waiting {
                            attempts,
                            retry_at: Instant::now() + delay,
                        },
                        MISS_TTL,
                    );
                    Enrichment::NotIndexed {
                        attempts,
                        retry_in_secs: Some(delay.as_secs()),
                    }
                }
            }
            Ok(Err(e)) => {
                warn!(pool = %pool_address, "Pair lookup failed: {}", e);
                self.hold_off(key, attempts);
                Enrichment::Unavailable {
                    reason: e.short_reason(),
                }
            }
            Err(_) => {
                warn!(pool = %pool_address, "Pair lookup timed out");
                self.hold_off(key, attempts);
                Enrichment::Unavailable {
                    reason: "pair indexer timed out".to_string(),
                }
            }
        }
    }

    // Errors do not spend an attempt but still wait out the minimum backoff
    fn hold_off(&self, key: String, attempts: u32) {
        self.cache.insert_with_ttl(
            key,
            PoolState::Waiting {
                attempts,
                retry_at: Instant::now() + self.settings.min_backoff,
            },
            MISS_TTL,
        );
    }

}

fn pair_info(pair: &DexPair) -> PairInfo {
    PairInfo {
        pair_address: pair.pair_address.clone(),
        dex_id: pair.dex_id.clone(),
        price_usd: pair.price_usd(),
        volume_24h: pair.volume_24h(),
        liquidity_usd: pair.liquidity_usd(),
    }
}


#[cfg(test)]
mod tests {
    use super::mock::{Behaviour, MockIndexer};
    use super::*;
    use crate::candidate::TokenStage;

    fn enricher(indexer: Arc<MockIndexer>) -> PairEnricher {
        PairEnricher::new(indexer, EnricherSettings::from_config(&EnrichmentConfig::default()))
    }

    #[test]
    fn test_backoff_schedule() {
        let s = EnricherSettings::from_config(&EnrichmentConfig::default());
        assert_eq!(s.backoff_after(1), Duration::from_secs(30));
        assert_eq!(s.backoff_after(2), Duration::from_secs(60));
        assert_eq!(s.backoff_after(3), Duration::from_secs(120));
        assert_eq!(s.backoff_after(9), Duration::from_secs(120));
    }

    #[tokio::test]
    async fn test_found_is_cached() {
        let indexer = Arc::new(MockIndexer::new(Behaviour::Found));
        let enricher = enricher(indexer.clone());

        let first = enricher.enrich("PoolA").await;
        assert_eq!(first.stage(), TokenStage::Listed);
        assert_eq!(first.pair().and_then(|p| p.price_usd), Some(0.25));

        let second = enricher.enrich("PoolA").await;
        assert!(second.pair_found());
        assert_eq!(indexer.calls(), 1);
        assert_eq!(indexer.queried.lock().unwrap()[0], "PoolA");
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_pair_backs_off_and_caps() {
        let indexer = Arc::new(MockIndexer::new(Behaviour::Missing));
        let enricher = enricher(indexer.clone());

        let first = enricher.enrich("PoolA").await;
        assert_eq!(first, Enrichment::NotIndexed { attempts: 1, retry_in_secs: Some(30) });
        assert_eq!(first.stage(), TokenStage::Indexing);

        // Inside the backoff window: no query
        let again = enricher.enrich("PoolA").await;
        assert_eq!(again.stage(), TokenStage::Indexing);
        assert_eq!(indexer.calls(), 1);

        tokio::time::advance(Duration::from_secs(31)).await;
        let second = enricher.enrich("PoolA").await;
        assert_eq!(second, Enrichment::NotIndexed { attempts: 2, retry_in_secs: Some(60) });

        tokio::time::advance(Duration::from_secs(61)).await;
        let third = enricher.enrich("PoolA").await;
        assert_eq!(third, Enrichment::NotIndexed { attempts: 3, retry_in_secs: None });
        assert_eq!(third.stage(), TokenStage::LpLive);

        tokio::time::advance(Duration::from_secs(600)).await;
        enricher.enrich("PoolA").await;
        assert_eq!(indexer.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pair_appears_later() {
        let indexer = Arc::new(MockIndexer::new(Behaviour::Missing));
        let enricher = enricher(indexer.clone());

        enricher.enrich("PoolA").await;
        indexer.set(Behaviour::Found);
        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(enricher.enrich("PoolA").await.pair_found());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_indexer_resolves_within_timeout() {
        let indexer = Arc::new(MockIndexer::new(Behaviour::Hang));
        let enricher = enricher(indexer);

        let started = Instant::now();
        let result = enricher.enrich("PoolA").await;
        assert!(matches!(result, Enrichment::Unavailable { .. }));
        assert_eq!(result.stage(), TokenStage::LpLive);
        assert!(started.elapsed() <= Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_rate_limit_degrades_without_spending_attempt() {
        let indexer = Arc::new(MockIndexer::new(Behaviour::RateLimited));
        let enricher = enricher(indexer.clone());

        let result = enricher.enrich("PoolA").await;
        assert!(!result.pair_found());
        assert_eq!(result.stage(), TokenStage::LpLive);
        // Held off: the next call does not hit the indexer
        let held = enricher.enrich("PoolA").await;
        assert!(matches!(held, Enrichment::Unavailable { .. }));
        assert_eq!(held.stage(), TokenStage::LpLive);
        assert_eq!(indexer.calls(), 1);
    }

    #[tokio::test]
    async fn test_disabled() {
        let indexer = Arc::new(MockIndexer::new(Behaviour::Found));
        let enricher = PairEnricher::new(
            indexer.clone(),
            EnricherSettings::from_config(&EnrichmentConfig {
                enabled: false,
                ..EnrichmentConfig::default()
            }),
        );
        assert_eq!(enricher.enrich("PoolA").await, Enrichment::Disabled);
        assert_eq!(indexer.calls(), 0);
    }
}
