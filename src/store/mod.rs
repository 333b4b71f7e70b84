//! Key-value backing for login attempt records.
//!
//! Every write carries a TTL so abandoned records disappear on their own.
//!
//! ```text
//! login:{user_type}:id:{identifier}:attempts  → failure count
//! login:{user_type}:id:{identifier}:first     → first failure (unix ms)
//! login:{user_type}:id:{identifier}:lock      → locked until (unix ms)
//! login:{user_type}:ip:{address}:...          → same, keyed by client IP
//! ```

pub mod error;
pub mod memory;

pub use error::StoreError;
pub use memory::MemoryStore;

use chrono::Duration;

pub trait AttemptStore: Send + Sync {
    /// Current value, `None` if absent or expired.
    fn get(&self, key: &str) -> Result<Option<i64>, StoreError>;

    /// Atomically increments and returns the new value.
    /// `ttl` applies only when the entry is created.
    fn incr(&self, key: &str, ttl: Duration) -> Result<i64, StoreError>;

    /// Overwrites the value and restarts its TTL.
    fn set(&self, key: &str, value: i64, ttl: Duration) -> Result<(), StoreError>;

    /// Restarts the TTL of a live entry without touching its value.
    /// Returns `false` when the key is absent or expired.
    fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError>;

    /// Removes the entry. Missing keys are not an error.
    fn delete(&self, key: &str) -> Result<(), StoreError>;
}
