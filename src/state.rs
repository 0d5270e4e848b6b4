use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use crate::cache::CacheEntry;
use crate::providers::ProviderRegistry;
use crate::rate_limit::RateLimiter;
// app's shared state

pub struct AppState {
    pub client: reqwest::Client,
    pub cache: DashMap<String, CacheEntry>, // String -> CacheEntry
    pub ttl: Duration,                      // how long cache will be valid
    pub providers: ProviderRegistry,
    pub limiter: Arc<RateLimiter>, // Arc so the sweeper can hold it too
}
