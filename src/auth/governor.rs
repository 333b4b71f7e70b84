//! Login attempt governor.
//!
//! Fixed-window failure counters keyed by `(identifier, user_type)` and by
//! `(ip, user_type)`. A key locks when its count reaches the threshold and
//! unlocks passively once `locked_until` has passed, or on an explicit clear.

use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use login_governor_api::UserType;

use crate::clock::Clock;
use crate::store::{AttemptStore, StoreError};

#[derive(Debug, Clone, thiserror::Error)]
pub enum GovernorError {
    #[error("Locked out until {locked_until}")]
    LockedOut {
        locked_until: DateTime<Utc>,
        retry_after_seconds: i64,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Thresholds and durations of the lockout policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    pub max_attempts: u32,
    pub ip_max_attempts: u32,
    pub window: Duration,
    pub lock_duration: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            ip_max_attempts: 20,
            window: Duration::minutes(15),
            lock_duration: Duration::minutes(15),
        }
    }
}

/// Outcome of `record_failed_attempt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailedAttempt {
    pub is_locked: bool,
    pub attempts_remaining: Option<u32>,
    pub locked_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptRecord {
    pub failure_count: u32,
    pub first_failure_at: Option<DateTime<Utc>>,
    pub locked_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyKind {
    Identifier,
    Ip,
}

impl KeyKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Identifier => "id",
            Self::Ip => "ip",
        }
    }
}

struct RecordKey {
    kind: KeyKind,
    base: String,
}

impl RecordKey {
    fn new(kind: KeyKind, user_type: UserType, value: &str) -> Self {
        Self {
            kind,
            base: format!("login:{}:{}:{}", user_type.as_str(), kind.as_str(), value),
        }
    }

    fn attempts(&self) -> String {
        format!("{}:attempts", self.base)
    }

    fn first(&self) -> String {
        format!("{}:first", self.base)
    }

    fn lock(&self) -> String {
        format!("{}:lock", self.base)
    }
}

/// Trims and lower-cases an identifier so `A@x.com ` and `a@x.com` share a record.
pub fn normalize_identifier(identifier: &str) -> String {
    identifier.trim().to_lowercase()
}

pub struct LoginAttemptGovernor {
    store: Arc<dyn AttemptStore>,
    clock: Arc<dyn Clock>,
    policy: LockoutPolicy,
}

impl LoginAttemptGovernor {
    pub fn new(store: Arc<dyn AttemptStore>, clock: Arc<dyn Clock>, policy: LockoutPolicy) -> Self {
        Self {
            store,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> &LockoutPolicy {
        &self.policy
    }

    /// Seconds a caller should wait before `locked_until`, per this governor's clock.
    pub fn retry_after_seconds(&self, locked_until: DateTime<Utc>) -> i64 {
        retry_after(locked_until, self.clock.now())
    }

    /// Fails with `LockedOut` while either key is locked.
    pub fn check_login_allowed(
        &self,
        identifier: &str,
        user_type: UserType,
        ip: IpAddr,
    ) -> Result<(), GovernorError> {
        let now = self.clock.now();
        let mut locked_until: Option<DateTime<Utc>> = None;
        for key in Self::keys(identifier, user_type, ip) {
            if let Some(until) = self.active_lock(&key, now)? {
                locked_until = locked_until.max(Some(until));
            }
        }

        match locked_until {
            Some(locked_until) => {
                let retry_after_seconds = retry_after(locked_until, now);
                tracing::warn!(
                    target: "security",
                    identifier = %normalize_identifier(identifier),
                    %user_type,
                    %ip,
                    %locked_until,
                    retry_after_seconds,
                    "Login rejected: locked out"
                );
                Err(GovernorError::LockedOut {
                    locked_until,
                    retry_after_seconds,
                })
            }
            None => Ok(()),
        }
    }

    /// Counts one failure against both keys, engaging a lock on each key
    /// whose count reaches its threshold.
    pub fn record_failed_attempt(
        &self,
        identifier: &str,
        user_type: UserType,
        ip: IpAddr,
    ) -> Result<FailedAttempt, GovernorError> {
        let now = self.clock.now();
        let mut locked_until: Option<DateTime<Utc>> = None;
        let mut attempts_remaining = u32::MAX;

        for key in Self::keys(identifier, user_type, ip) {
            let threshold = self.threshold(key.kind);
            let count = self.store.incr(&key.attempts(), self.policy.window)?;
            if count == 1 {
                self.store
                    .set(&key.first(), now.timestamp_millis(), self.policy.window)?;
            }
            let count = u32::try_from(count).unwrap_or(u32::MAX);

            let lock = match self.active_lock(&key, now)? {
                Some(until) => Some(until),
                None if count >= threshold => Some(self.engage_lock(&key, count, now)?),
                None => None,
            };

            match lock {
                Some(until) => locked_until = locked_until.max(Some(until)),
                None => attempts_remaining = attempts_remaining.min(threshold - count),
            }

            tracing::info!(
                target: "security",
                key = %key.base,
                failure_count = count,
                threshold,
                "Failed login attempt recorded"
            );
        }

        Ok(FailedAttempt {
            is_locked: locked_until.is_some(),
            attempts_remaining: if locked_until.is_some() {
                None
            } else {
                Some(attempts_remaining)
            },
            locked_until,
        })
    }

    /// Deletes both records. Safe to call when nothing is recorded.
    pub fn clear_failed_attempts(
        &self,
        identifier: &str,
        user_type: UserType,
        ip: IpAddr,
    ) -> Result<(), StoreError> {
        for key in Self::keys(identifier, user_type, ip) {
            self.store.delete(&key.attempts())?;
            self.store.delete(&key.first())?;
            self.store.delete(&key.lock())?;
        }
        tracing::debug!(
            target: "security",
            identifier = %normalize_identifier(identifier),
            %user_type,
            %ip,
            "Failed login attempts cleared"
        );
        Ok(())
    }

    pub fn identifier_record(
        &self,
        identifier: &str,
        user_type: UserType,
    ) -> Result<Option<AttemptRecord>, StoreError> {
        let key = RecordKey::new(
            KeyKind::Identifier,
            user_type,
            &normalize_identifier(identifier),
        );
        self.read_record(&key)
    }

    pub fn ip_record(
        &self,
        ip: IpAddr,
        user_type: UserType,
    ) -> Result<Option<AttemptRecord>, StoreError> {
        let key = RecordKey::new(KeyKind::Ip, user_type, &ip.to_string());
        self.read_record(&key)
    }

    fn keys(identifier: &str, user_type: UserType, ip: IpAddr) -> [RecordKey; 2] {
        [
            RecordKey::new(
                KeyKind::Identifier,
                user_type,
                &normalize_identifier(identifier),
            ),
            RecordKey::new(KeyKind::Ip, user_type, &ip.to_string()),
        ]
    }

    fn threshold(&self, kind: KeyKind) -> u32 {
        match kind {
            KeyKind::Identifier => self.policy.max_attempts,
            KeyKind::Ip => self.policy.ip_max_attempts,
        }
    }

    fn active_lock(
        &self,
        key: &RecordKey,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self
            .store
            .get(&key.lock())?
            .and_then(DateTime::from_timestamp_millis)
            .filter(|until| *until > now))
    }

    fn engage_lock(
        &self,
        key: &RecordKey,
        count: u32,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, StoreError> {
        let ttl = self.policy.lock_duration;
        let until = now + ttl;
        self.store.set(&key.lock(), until.timestamp_millis(), ttl)?;
        // Count and first-failure live exactly as long as the lock.
        // Only the TTL moves: a concurrent incr must keep its increment.
        self.store.expire(&key.attempts(), ttl)?;
        self.store.expire(&key.first(), ttl)?;

        tracing::warn!(
            target: "security",
            key = %key.base,
            failure_count = count,
            %until,
            "Lockout engaged"
        );
        Ok(until)
    }

    fn read_record(&self, key: &RecordKey) -> Result<Option<AttemptRecord>, StoreError> {
        let Some(count) = self.store.get(&key.attempts())? else {
            return Ok(None);
        };
        let now = self.clock.now();
        Ok(Some(AttemptRecord {
            failure_count: u32::try_from(count).unwrap_or(u32::MAX),
            first_failure_at: self
                .store
                .get(&key.first())?
                .and_then(DateTime::from_timestamp_millis),
            locked_until: self.active_lock(key, now)?,
        }))
    }
}

/// Whole seconds until `until`, rounded up, never below one.
fn retry_after(until: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (until - now).num_milliseconds();
    ((millis + 999) / 1000).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicBool, Ordering};

    const EMAIL: &str = "a@x.com";

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, last))
    }

    fn governor_with(policy: LockoutPolicy) -> (Arc<ManualClock>, LoginAttemptGovernor) {
        let clock = Arc::new(ManualClock::new(
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        ));
        let store = Arc::new(MemoryStore::new(clock.clone()));
        (clock.clone(), LoginAttemptGovernor::new(store, clock, policy))
    }

    fn governor() -> (Arc<ManualClock>, LoginAttemptGovernor) {
        governor_with(LockoutPolicy::default())
    }

    fn fail(governor: &LoginAttemptGovernor, times: u32) -> FailedAttempt {
        let mut last = None;
        for _ in 0..times {
            last = Some(
                governor
                    .record_failed_attempt(EMAIL, UserType::Customer, ip(1))
                    .unwrap(),
            );
        }
        last.expect("at least one attempt")
    }

    #[test]
    fn below_threshold_never_locks() {
        let (_, governor) = governor();
        let outcome = fail(&governor, 4);
        assert!(!outcome.is_locked);
        assert_eq!(outcome.attempts_remaining, Some(1));
        assert!(
            governor
                .check_login_allowed(EMAIL, UserType::Customer, ip(1))
                .is_ok()
        );
    }

    #[test]
    fn fifth_failure_locks_customer() {
        let (clock, governor) = governor();
        let outcome = fail(&governor, 5);
        assert!(outcome.is_locked);
        assert_eq!(outcome.attempts_remaining, None);
        assert_eq!(
            outcome.locked_until,
            Some(clock.now() + Duration::minutes(15))
        );

        let err = governor
            .check_login_allowed(EMAIL, UserType::Customer, ip(1))
            .unwrap_err();
        assert!(matches!(
            err,
            GovernorError::LockedOut {
                retry_after_seconds: 900,
                ..
            }
        ));
    }

    #[test]
    fn lock_applies_from_another_ip() {
        let (_, governor) = governor();
        fail(&governor, 5);
        assert!(
            governor
                .check_login_allowed(EMAIL, UserType::Customer, ip(99))
                .is_err()
        );
    }

    #[test]
    fn clear_then_fewer_failures_does_not_lock() {
        let (_, governor) = governor();
        fail(&governor, 4);
        governor
            .clear_failed_attempts(EMAIL, UserType::Customer, ip(1))
            .unwrap();
        let outcome = fail(&governor, 4);
        assert!(!outcome.is_locked);
        assert!(
            governor
                .check_login_allowed(EMAIL, UserType::Customer, ip(1))
                .is_ok()
        );
    }

    #[test]
    fn clear_is_idempotent_and_unlocks() {
        let (_, governor) = governor();
        fail(&governor, 5);
        governor
            .clear_failed_attempts(EMAIL, UserType::Customer, ip(1))
            .unwrap();
        governor
            .clear_failed_attempts(EMAIL, UserType::Customer, ip(1))
            .unwrap();
        assert!(
            governor
                .check_login_allowed(EMAIL, UserType::Customer, ip(1))
                .is_ok()
        );
        assert_eq!(
            governor
                .identifier_record(EMAIL, UserType::Customer)
                .unwrap(),
            None
        );
    }

    #[test]
    fn user_types_are_tracked_separately() {
        let (_, governor) = governor();
        for _ in 0..5 {
            governor
                .record_failed_attempt(EMAIL, UserType::Admin, ip(1))
                .unwrap();
        }
        assert!(
            governor
                .check_login_allowed(EMAIL, UserType::Admin, ip(1))
                .is_err()
        );
        assert!(
            governor
                .check_login_allowed(EMAIL, UserType::Customer, ip(1))
                .is_ok()
        );
        assert_eq!(
            governor
                .identifier_record(EMAIL, UserType::Customer)
                .unwrap(),
            None
        );
    }

    #[test]
    fn lock_expires_passively() {
        let (clock, governor) = governor();
        fail(&governor, 5);
        clock.advance(Duration::minutes(15));
        assert!(
            governor
                .check_login_allowed(EMAIL, UserType::Customer, ip(1))
                .is_ok()
        );
        // Record expired with the lock: a fresh budget.
        let outcome = fail(&governor, 1);
        assert_eq!(outcome.attempts_remaining, Some(4));
    }

    #[test]
    fn window_expiry_resets_the_count() {
        let (clock, governor) = governor();
        fail(&governor, 4);
        clock.advance(Duration::minutes(16));
        let outcome = fail(&governor, 4);
        assert!(!outcome.is_locked);
        assert_eq!(outcome.attempts_remaining, Some(1));
    }

    #[test]
    fn identifier_is_normalized() {
        let (_, governor) = governor();
        for _ in 0..5 {
            governor
                .record_failed_attempt("  A@X.com ", UserType::Customer, ip(1))
                .unwrap();
        }
        assert!(
            governor
                .check_login_allowed(EMAIL, UserType::Customer, ip(2))
                .is_err()
        );
    }

    #[test]
    fn ip_threshold_locks_across_identifiers() {
        let (_, governor) = governor_with(LockoutPolicy {
            ip_max_attempts: 3,
            ..LockoutPolicy::default()
        });
        for n in 0..3 {
            governor
                .record_failed_attempt(&format!("user{n}@x.com"), UserType::Customer, ip(7))
                .unwrap();
        }
        assert!(
            governor
                .check_login_allowed("fresh@x.com", UserType::Customer, ip(7))
                .is_err()
        );
        assert!(
            governor
                .check_login_allowed("fresh@x.com", UserType::Customer, ip(8))
                .is_ok()
        );
        let record = governor.ip_record(ip(7), UserType::Customer).unwrap().unwrap();
        assert_eq!(record.failure_count, 3);
        assert!(record.locked_until.is_some());
    }

    #[test]
    fn attempts_remaining_uses_the_tighter_key() {
        let (_, governor) = governor_with(LockoutPolicy {
            ip_max_attempts: 6,
            ..LockoutPolicy::default()
        });
        governor
            .record_failed_attempt("other@x.com", UserType::Customer, ip(1))
            .unwrap();
        governor
            .record_failed_attempt("other@x.com", UserType::Customer, ip(1))
            .unwrap();
        governor
            .record_failed_attempt("third@x.com", UserType::Customer, ip(1))
            .unwrap();
        // Identifier budget 5-1=4, IP budget 6-4=2.
        let outcome = governor
            .record_failed_attempt(EMAIL, UserType::Customer, ip(1))
            .unwrap();
        assert_eq!(outcome.attempts_remaining, Some(2));
    }

    #[test]
    fn later_lock_wins_when_both_keys_are_locked() {
        let (clock, governor) = governor_with(LockoutPolicy {
            max_attempts: 2,
            ip_max_attempts: 3,
            ..LockoutPolicy::default()
        });
        // IP locks first via other identifiers.
        for n in 0..3 {
            governor
                .record_failed_attempt(&format!("u{n}@x.com"), UserType::Customer, ip(5))
                .unwrap();
        }
        let ip_lock = clock.now() + Duration::minutes(15);
        clock.advance(Duration::minutes(2));
        governor
            .record_failed_attempt(EMAIL, UserType::Customer, ip(6))
            .unwrap();
        let outcome = governor
            .record_failed_attempt(EMAIL, UserType::Customer, ip(6))
            .unwrap();
        let id_lock = clock.now() + Duration::minutes(15);
        assert_eq!(outcome.locked_until, Some(id_lock));

        let err = governor
            .check_login_allowed(EMAIL, UserType::Customer, ip(5))
            .unwrap_err();
        match err {
            GovernorError::LockedOut { locked_until, .. } => {
                assert!(locked_until > ip_lock);
                assert_eq!(locked_until, id_lock);
            }
            GovernorError::Store(e) => panic!("unexpected store error: {e}"),
        }
    }

    #[test]
    fn failures_while_locked_do_not_extend_the_lock() {
        let (clock, governor) = governor();
        let first = fail(&governor, 5).locked_until;
        clock.advance(Duration::minutes(1));
        let again = fail(&governor, 1);
        assert!(again.is_locked);
        assert_eq!(again.locked_until, first);
    }

    #[test]
    fn record_tracks_count_and_first_failure() {
        let (clock, governor) = governor();
        let started = clock.now();
        fail(&governor, 1);
        clock.advance(Duration::seconds(30));
        fail(&governor, 1);
        let record = governor
            .identifier_record(EMAIL, UserType::Customer)
            .unwrap()
            .unwrap();
        assert_eq!(record.failure_count, 2);
        assert_eq!(record.first_failure_at, Some(started));
        assert_eq!(record.locked_until, None);
    }

    /// Lands one extra failure on `racing_key` right after the first lock write,
    /// as a concurrent request would.
    struct RacingStore {
        inner: MemoryStore,
        racing_key: String,
        raced: AtomicBool,
    }

    impl AttemptStore for RacingStore {
        fn get(&self, key: &str) -> Result<Option<i64>, StoreError> {
            self.inner.get(key)
        }
        fn incr(&self, key: &str, ttl: Duration) -> Result<i64, StoreError> {
            self.inner.incr(key, ttl)
        }
        fn set(&self, key: &str, value: i64, ttl: Duration) -> Result<(), StoreError> {
            self.inner.set(key, value, ttl)?;
            if key.ends_with(":lock") && !self.raced.swap(true, Ordering::SeqCst) {
                self.inner.incr(&self.racing_key, Duration::minutes(15))?;
            }
            Ok(())
        }
        fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
            self.inner.expire(key, ttl)
        }
        fn delete(&self, key: &str) -> Result<(), StoreError> {
            self.inner.delete(key)
        }
    }

    #[test]
    fn failure_landing_during_lock_engagement_is_kept() {
        let clock = Arc::new(ManualClock::new(
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        ));
        let store = Arc::new(RacingStore {
            inner: MemoryStore::new(clock.clone()),
            racing_key: format!("login:customer:id:{EMAIL}:attempts"),
            raced: AtomicBool::new(false),
        });
        let governor = LoginAttemptGovernor::new(store, clock.clone(), LockoutPolicy::default());

        fail(&governor, 1);
        clock.advance(Duration::minutes(10));
        let outcome = fail(&governor, 4);
        assert!(outcome.is_locked);

        let record = governor
            .identifier_record(EMAIL, UserType::Customer)
            .unwrap()
            .unwrap();
        assert_eq!(record.failure_count, 6);

        // Past the original window, still inside the lock.
        clock.advance(Duration::minutes(14));
        let record = governor
            .identifier_record(EMAIL, UserType::Customer)
            .unwrap()
            .unwrap();
        assert_eq!(record.failure_count, 6);
        assert!(record.first_failure_at.is_some());
    }

    #[test]
    fn retry_after_rounds_up() {
        let now = DateTime::from_timestamp(1_000, 0).unwrap();
        assert_eq!(retry_after(now + Duration::milliseconds(1_001), now), 2);
        assert_eq!(retry_after(now + Duration::seconds(60), now), 60);
        assert_eq!(retry_after(now, now), 1);
    }
}
