use std::collections::HashMap;
use std::sync::Mutex;

/// Generic `(scope, idempotencyKey) -> result` memoization table. Each
/// subsystem owns one instance typed to its own result payload rather
/// than sharing an untyped store, so a repeat submission returns exactly
/// the structure the first call produced without a serialize/deserialize
/// round trip.
///
/// No TTL or cross-restart persistence: this in-memory table is
/// unbounded, matching the rest of the in-memory core.
pub struct IdempotencyStore<V: Clone> {
    records: Mutex<HashMap<String, V>>,
}

impl<V: Clone> Default for IdempotencyStore<V> {
    fn default() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
        }
    }
}

impl<V: Clone> IdempotencyStore<V> {
    pub fn new() -> Self {
        Self::default()
    }

    fn compound_key(scope: &str, key: &str) -> String {
        format!("{scope}\u{0}{key}")
    }

    pub fn get(&self, scope: &str, key: &str) -> Option<V> {
        self.records
            .lock()
            .unwrap()
            .get(&Self::compound_key(scope, key))
            .cloned()
    }

    pub fn put(&self, scope: &str, key: &str, value: V) {
        self.records
            .lock()
            .unwrap()
            .insert(Self::compound_key(scope, key), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scopes_do_not_collide() {
        let store: IdempotencyStore<u32> = IdempotencyStore::new();
        store.put("receipt_review", "k1", 1);
        store.put("manual_entry", "k1", 2);
        assert_eq!(store.get("receipt_review", "k1"), Some(1));
        assert_eq!(store.get("manual_entry", "k1"), Some(2));
        assert_eq!(store.get("shopping_patch", "k1"), None);
    }
}
