use lazy_static::lazy_static;
use prometheus::{Counter, Histogram, register_counter, register_histogram};

lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("recenzione_requests_total", "Total number of generate requests")
            .expect("register recenzione_requests_total");
    pub static ref CACHE_HITS: Counter =
        register_counter!("recenzione_cache_hits_total", "Total cache hits")
            .expect("register recenzione_cache_hits_total");
    pub static ref CACHE_MISSES: Counter =
        register_counter!("recenzione_cache_misses_total", "Total cache misses")
            .expect("register recenzione_cache_misses_total");
    pub static ref BACKEND_GENERATIONS: Counter = register_counter!(
        "recenzione_backend_generations_total",
        "Requests answered by the generation backend"
    )
    .expect("register recenzione_backend_generations_total");
    pub static ref FALLBACKS: Counter = register_counter!(
        "recenzione_fallbacks_total",
        "Requests answered by template substitution"
    )
    .expect("register recenzione_fallbacks_total");
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "recenzione_request_latency_seconds",
        "Generate request latency in seconds"
    )
    .expect("register recenzione_request_latency_seconds");
}
