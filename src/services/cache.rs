/// Time-boxed response cache; concurrent callers for one key share a single fetch

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

type PendingFetch<V> = Shared<BoxFuture<'static, V>>;

struct CacheState<V> {
    entries: HashMap<String, (Instant, V)>,
    pending: HashMap<String, (u64, PendingFetch<V>)>,
    next_generation: u64,
}

impl<V> CacheState<V> {
    /// Store `value` and drop every expired entry
    fn store(&mut self, ttl: Duration, key: &str, value: V) {
        self.entries.retain(|_, (at, _)| at.elapsed() < ttl);
        self.entries.insert(key.to_string(), (Instant::now(), value));
    }

    fn release(&mut self, key: &str, generation: u64) -> bool {
        let owned = matches!(self.pending.get(key), Some((g, _)) if *g == generation);
        if owned {
            self.pending.remove(key);
        }
        owned
    }
}

/// Clears a pending fetch whose future panicked, so the key is not poisoned.
/// A cancelled waiter leaves the entry for the others still awaiting it.
struct PendingGuard<'a, V> {
    state: &'a Mutex<CacheState<V>>,
    key: &'a str,
    generation: u64,
}

impl<V> Drop for PendingGuard<'_, V> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.state.lock().release(self.key, self.generation);
        }
    }
}

pub struct RequestCache<V: Clone> {
    ttl: Duration,
    state: Mutex<CacheState<V>>,
}

impl<V> RequestCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// A zero `ttl` keeps de-duplication but retains nothing
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                pending: HashMap::new(),
                next_generation: 0,
            }),
        }
    }

    /// Fresh cached value if any
    pub fn get(&self, key: &str) -> Option<V> {
        let mut state = self.state.lock();
        let (at, value) = state.entries.get(key).cloned()?;
        if at.elapsed() < self.ttl {
            return Some(value);
        }
        state.entries.remove(key);
        None
    }

    pub fn insert(&self, key: &str, value: V) {
        if self.ttl.is_zero() {
            return;
        }
        self.state.lock().store(self.ttl, key, value);
    }

    pub async fn get_or_fetch<F, Fut>(&self, key: &str, fetch: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V> + Send + 'static,
    {
        if let Some(value) = self.get(key) {
            return value;
        }

        let (generation, pending) = {
            let mut state = self.state.lock();
            match state.pending.get(key).cloned() {
                Some(existing) => existing,
                None => {
                    let generation = state.next_generation;
                    state.next_generation += 1;
                    let pending = fetch().boxed().shared();
                    state
                        .pending
                        .insert(key.to_string(), (generation, pending.clone()));
                    (generation, pending)
                }
            }
        };

        let guard = PendingGuard {
            state: &self.state,
            key,
            generation,
        };
        let value = pending.await;

        {
            let mut state = self.state.lock();
            if state.release(key, generation) && !self.ttl.is_zero() {
                state.store(self.ttl, key, value.clone());
            }
        }
        drop(guard);
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counted_fetch(
        calls: &Arc<AtomicUsize>,
        value: u32,
    ) -> impl FnOnce() -> BoxFuture<'static, u32> {
        let calls = calls.clone();
        move || {
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                value
            }
            .boxed()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_duplicates_share_one_fetch() {
        let cache = RequestCache::new(Duration::from_secs(60));
        let calls = Arc::new(AtomicUsize::new(0));

        let (a, b) = tokio::join!(
            cache.get_or_fetch("k", counted_fetch(&calls, 1)),
            cache.get_or_fetch("k", counted_fetch(&calls, 2)),
        );

        assert_eq!((a, b), (1, 1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire() {
        let cache = RequestCache::new(Duration::from_secs(60));
        let calls = Arc::new(AtomicUsize::new(0));

        assert_eq!(cache.get_or_fetch("k", counted_fetch(&calls, 1)).await, 1);
        assert_eq!(cache.get_or_fetch("k", counted_fetch(&calls, 2)).await, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(cache.get_or_fetch("k", counted_fetch(&calls, 3)).await, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_ttl_dedupes_without_retaining() {
        let cache = RequestCache::new(Duration::ZERO);
        let calls = Arc::new(AtomicUsize::new(0));

        let (a, b) = tokio::join!(
            cache.get_or_fetch("k", counted_fetch(&calls, 1)),
            cache.get_or_fetch("k", counted_fetch(&calls, 2)),
        );
        assert_eq!((a, b), (1, 1));
        assert_eq!(cache.get_or_fetch("k", counted_fetch(&calls, 3)).await, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_distinct_keys_fetch_separately() {
        let cache = RequestCache::new(Duration::from_secs(60));
        cache.insert("a", 10u32);
        assert_eq!(cache.get("a"), Some(10));
        assert_eq!(cache.get_or_fetch("b", || async { 20u32 }).await, 20);
        assert_eq!(cache.get("b"), Some(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entries_are_pruned_on_store() {
        let cache = RequestCache::new(Duration::from_secs(300));
        for i in 0..1000u32 {
            cache.insert(&format!("city-{}", i), i);
        }
        assert_eq!(cache.state.lock().entries.len(), 1000);

        tokio::time::advance(Duration::from_secs(3600)).await;
        assert_eq!(cache.get_or_fetch("fresh", || async { 7u32 }).await, 7);

        let state = cache.state.lock();
        assert_eq!(state.entries.len(), 1);
        assert!(state.entries.contains_key("fresh"));
    }

    #[tokio::test]
    async fn test_panicking_fetch_does_not_poison_key() {
        let cache = Arc::new(RequestCache::new(Duration::from_secs(60)));

        let failing = {
            let cache = cache.clone();
            tokio::spawn(async move {
                cache
                    .get_or_fetch("k", || async {
                        if std::hint::black_box(true) {
                            panic!("upstream exploded");
                        }
                        0u32
                    })
                    .await
            })
        };
        assert!(failing.await.unwrap_err().is_panic());
        assert!(cache.state.lock().pending.is_empty());

        assert_eq!(cache.get_or_fetch("k", || async { 9u32 }).await, 9);
    }
}
