use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram};


lazy_static! {
    pub static ref CHAT_REQUESTS_TOTAL: Counter =
        register_counter!("vanguard_chat_requests_total", "Total number of chat requests").unwrap();
    pub static ref CHAT_THROTTLED_TOTAL: Counter = register_counter!(
        "vanguard_chat_throttled_total",
        "Chat requests rejected by the rate limiter"
    )
    .unwrap();
    pub static ref CACHE_HITS: Counter =
        register_counter!("vanguard_cache_hits_total", "Total cache hits").unwrap();
    pub static ref CACHE_MISSES: Counter =
        register_counter!("vanguard_cache_misses_total", "Total cache misses").unwrap();
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "vanguard_request_latency_seconds",
        "Request latency in seconds"
    )
    .unwrap();
    pub static ref CACHE_SIZE: Gauge =
        register_gauge!("vanguard_cache_size", "Current number of items in cache").unwrap();
    pub static ref RATE_LIMIT_KEYS: Gauge = register_gauge!(
        "vanguard_rate_limit_keys",
        "Distinct keys tracked by the rate limiter"
    )
    .unwrap();
}
