use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Injectable "now" source. Production code uses [`SystemClock`]; tests
/// swap in a fixed clock so scenarios seeded from a literal instant are
/// reproducible.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Injectable unique-token source backing every [`crate::new_id`] call.
pub trait IdProvider: Send + Sync {
    fn token(&self) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIds;

impl IdProvider for UuidIds {
    fn token(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Deterministic test doubles for [`Clock`]/[`IdProvider`], exposed
/// unconditionally (not `#[cfg(test)]`) so downstream crates can use them
/// from their own `tests/` integration suites.
pub mod test_support {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    /// A clock that starts at a fixed instant and advances only when told
    /// to, so tests can assert exact timestamps and orderings.
    pub struct FixedClock(Mutex<DateTime<Utc>>);

    impl FixedClock {
        pub fn new(start: DateTime<Utc>) -> Self {
            Self(Mutex::new(start))
        }

        pub fn advance(&self, seconds: i64) {
            let mut guard = self.0.lock().unwrap();
            *guard += chrono::Duration::seconds(seconds);
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    /// Deterministic monotonically increasing id tokens for reproducible
    /// fixtures.
    #[derive(Default)]
    pub struct SequentialIds(AtomicU64);

    impl SequentialIds {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl IdProvider for SequentialIds {
        fn token(&self) -> String {
            let n = self.0.fetch_add(1, Ordering::Relaxed);
            format!("{n:08x}")
        }
    }
}
