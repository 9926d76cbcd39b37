use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Serializes concurrent misses on the same cache key so only the first caller
/// generates; later callers wait and then find the stored value.
pub struct KeyCoalescer {
    inflight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyCoalescer {
    pub fn new() -> Self {
        Self {
            inflight: Mutex::new(HashMap::new()),
        }
    }

    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut inflight = self.inflight.lock().await;
            // Only the map holds idle locks.
            inflight.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(
                inflight
                    .entry(key.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        lock.lock_owned().await
    }

    pub async fn inflight(&self) -> usize {
        self.inflight.lock().await.len()
    }
}

impl Default for KeyCoalescer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_is_serialized() {
        let coalescer = Arc::new(KeyCoalescer::new());
        let guard = coalescer.acquire("k").await;

        let c = Arc::clone(&coalescer);
        let waiter = tokio::spawn(async move {
            let _g = c.acquire("k").await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_block() {
        let coalescer = KeyCoalescer::new();
        let _a = coalescer.acquire("a").await;
        let b = tokio::time::timeout(Duration::from_millis(100), coalescer.acquire("b")).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_idle_locks_are_pruned() {
        let coalescer = KeyCoalescer::new();
        drop(coalescer.acquire("a").await);
        drop(coalescer.acquire("b").await);
        // "a" was idle when "b" was acquired; "b" stays until the next acquire.
        assert_eq!(coalescer.inflight().await, 1);
    }
}
