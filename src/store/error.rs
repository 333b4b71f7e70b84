/// Attempt store errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("Counter overflow for key {0}")]
    Overflow(String),
    #[error("Invalid TTL for key {key}: {ttl_ms}ms")]
    InvalidTtl { key: String, ttl_ms: i64 },
}
