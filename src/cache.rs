//! Bounded in-process cache with tag-based invalidation.
//!
//! Entries expire after their TTL and the least recently used entry is
//! evicted once the cache is full. Each entry carries a set of tags so that
//! every entry derived from the same record can be dropped with one call.
//! Tag invalidation bumps an epoch; values computed across a bump are
//! returned but not cached.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use tokio::sync::Mutex;

struct Entry<V> {
    value: V,
    expires_at: Instant,
    tags: Vec<String>,
}

struct Inner<V> {
    entries: LruCache<String, Entry<V>>,
    tags: HashMap<String, HashSet<String>>,
    epoch: u64,
}

impl<V> Inner<V> {
    fn insert(&mut self, key: &str, value: V, ttl: Duration, tags: Vec<String>) {
        self.remove(key);
        for tag in &tags {
            self.tags
                .entry(tag.clone())
                .or_default()
                .insert(key.to_string());
        }

        let entry = Entry {
            value,
            expires_at: Instant::now() + ttl,
            tags,
        };
        if let Some((evicted_key, evicted)) = self.entries.push(key.to_string(), entry) {
            self.unlink(&evicted_key, &evicted.tags);
        }
    }

    fn unlink(&mut self, key: &str, tags: &[String]) {
        for tag in tags {
            if let Some(keys) = self.tags.get_mut(tag) {
                keys.remove(key);
                if keys.is_empty() {
                    self.tags.remove(tag);
                }
            }
        }
    }

    fn remove(&mut self, key: &str) -> bool {
        match self.entries.pop(key) {
            Some(entry) => {
                self.unlink(key, &entry.tags);
                true
            }
            None => false,
        }
    }
}

pub struct TaggedCache<V> {
    inner: Mutex<Inner<V>>,
}

impl<V: Clone + Send> TaggedCache<V> {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::new(capacity),
                tags: HashMap::new(),
                epoch: 0,
            }),
        }
    }

    /// Returns a fresh value for `key`, dropping it if it has expired.
    pub async fn get(&self, key: &str) -> Option<V> {
        let mut inner = self.inner.lock().await;
        let expired = match inner.entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            inner.remove(key);
        }
        None
    }

    pub async fn insert<I, T>(&self, key: &str, value: V, ttl: Duration, tags: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let tags = tags.into_iter().map(Into::into).collect();
        self.inner.lock().await.insert(key, value, ttl, tags);
    }

    /// Returns the cached value for `key` or runs `factory` and caches its
    /// result under the tags it returns. Errors are not cached.
    ///
    /// The lock is not held while `factory` runs, so concurrent misses for
    /// the same key may each compute; the last writer wins. A result computed
    /// while any tag was invalidated is returned but not stored.
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        key: &str,
        ttl: Duration,
        factory: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(V, Vec<String>), E>>,
    {
        let epoch = {
            let inner = self.inner.lock().await;
            inner.epoch
        };
        if let Some(value) = self.get(key).await {
            return Ok(value);
        }

        let (value, tags) = factory().await?;
        let mut inner = self.inner.lock().await;
        if inner.epoch == epoch {
            inner.insert(key, value.clone(), ttl, tags);
        }
        Ok(value)
    }

    /// Drops every entry carrying `tag`; returns how many were removed.
    pub async fn invalidate_by_tag(&self, tag: &str) -> usize {
        let mut inner = self.inner.lock().await;
        inner.epoch += 1;
        let Some(keys) = inner.tags.remove(tag) else {
            return 0;
        };

        keys.iter().filter(|key| inner.remove(key)).count()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
