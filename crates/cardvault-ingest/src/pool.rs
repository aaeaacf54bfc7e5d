//! Keyed pool of lazily created, TTL-evicted handles.
//!
//! Each key maps to at most one live handle. Concurrent requests for a key
//! that has no handle yet share a single construction. A handle idle for
//! longer than the TTL is evicted on the next pool access, unless a caller
//! still holds it.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::OnceCell;
use tokio::time::Instant;

struct Slot<S> {
    handle: OnceCell<Arc<S>>,
    last_used: Mutex<Instant>,
}

impl<S> Slot<S> {
    fn new() -> Self {
        Self {
            handle: OnceCell::new(),
            last_used: Mutex::new(Instant::now()),
        }
    }

    fn touch(&self) {
        *self.last_used.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    fn in_use(&self) -> bool {
        self.handle.get().is_some_and(|h| Arc::strong_count(h) > 1)
    }

    fn idle_for(&self) -> Duration {
        self.last_used
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .elapsed()
    }
}

/// A pool of per-key handles.
pub struct ServicePool<K, S> {
    slots: Mutex<HashMap<K, Arc<Slot<S>>>>,
    ttl: Duration,
}

impl<K, S> std::fmt::Debug for ServicePool<K, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServicePool").field("ttl", &self.ttl).finish_non_exhaustive()
    }
}

impl<K, S> ServicePool<K, S>
where
    K: Eq + Hash + Clone,
{
    /// Creates an empty pool.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Returns the handle for `key`, constructing it with `create` if needed.
    ///
    /// Concurrent callers for the same key await one construction. If the
    /// construction fails, the error is returned and the next call retries.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `create`.
    pub async fn get_or_create<F, Fut, E>(&self, key: &K, create: F) -> Result<Arc<S>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<S, E>>,
    {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            self.evict_locked(&mut slots, key);
            let slot = slots
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Slot::new()));
            slot.touch();
            Arc::clone(slot)
        };

        let handle = slot
            .handle
            .get_or_try_init(|| async { create().await.map(Arc::new) })
            .await?;
        Ok(Arc::clone(handle))
    }

    /// Removes expired, unused handles. Returns how many were removed.
    pub fn evict_expired(&self) -> usize {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let before = slots.len();
        let ttl = self.ttl;
        slots.retain(|_, slot| !is_expired(slot, ttl));
        before - slots.len()
    }

    /// Drops the handle for `key`. Returns true if one existed.
    pub fn dispose(&self, key: &K) -> bool {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .is_some()
    }

    /// Number of live handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns true if the pool holds no handles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evict_locked(&self, slots: &mut HashMap<K, Arc<Slot<S>>>, keep: &K) {
        let ttl = self.ttl;
        slots.retain(|k, slot| k == keep || !is_expired(slot, ttl));
    }
}

fn is_expired<S>(slot: &Slot<S>, ttl: Duration) -> bool {
    slot.handle.initialized() && !slot.in_use() && slot.idle_for() > ttl
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn single_flight_construction() {
        let pool: Arc<ServicePool<u32, String>> = Arc::new(ServicePool::new(Duration::from_secs(60)));
        let created = Arc::new(AtomicU32::new(0));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let pool = Arc::clone(&pool);
            let created = Arc::clone(&created);
            tasks.push(tokio::spawn(async move {
                pool.get_or_create(&7, || async move {
                    created.fetch_add(1, Ordering::SeqCst);
                    tokio::task::yield_now().await;
                    Ok::<_, Infallible>("seven".to_string())
                })
                .await
                .unwrap()
            }));
        }
        for task in tasks {
            assert_eq!(task.await.unwrap().as_str(), "seven");
        }
        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert_eq!(pool.len(), 1);
    }

    #[tokio::test]
    async fn failed_construction_is_retried() {
        let pool: ServicePool<u32, u32> = ServicePool::new(Duration::from_secs(60));
        let err = pool.get_or_create(&1, || async { Err::<u32, _>("boom") }).await;
        assert_eq!(err.unwrap_err(), "boom");
        let ok = pool.get_or_create(&1, || async { Ok::<_, &str>(5) }).await.unwrap();
        assert_eq!(*ok, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_handles_expire() {
        let pool: ServicePool<u32, u32> = ServicePool::new(Duration::from_secs(10));
        let held = pool.get_or_create(&1, || async { Ok::<_, Infallible>(1) }).await.unwrap();
        drop(pool.get_or_create(&2, || async { Ok::<_, Infallible>(2) }).await.unwrap());

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(pool.evict_expired(), 1);
        assert_eq!(pool.len(), 1);

        drop(held);
        assert_eq!(pool.evict_expired(), 1);
        assert!(pool.is_empty());
    }

    #[tokio::test]
    async fn same_handle_until_disposed() {
        let pool: ServicePool<u32, u32> = ServicePool::new(Duration::from_secs(60));
        let counter = AtomicU32::new(0);
        let counter = &counter;
        let make = move || async move { Ok::<_, Infallible>(counter.fetch_add(1, Ordering::SeqCst)) };

        let a = pool.get_or_create(&1, make).await.unwrap();
        let b = pool.get_or_create(&1, make).await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        assert!(pool.dispose(&1));
        assert!(!pool.dispose(&1));
        let c = pool.get_or_create(&1, make).await.unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
    }
}
