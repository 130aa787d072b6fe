use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::{Mutex, Notify};

use crate::collectionresolver::CollectionResolver;
use crate::error::Error;
use crate::error::Result;

struct CollectionsFastCacheEntry {
    pub collection_id: u32,
    pub manifest_rev: u64,
}

#[derive(Default)]
struct CollectionsFastCache {
    pub collections: HashMap<String, CollectionsFastCacheEntry>,
}

#[derive(Clone)]
struct CollectionCacheEntry {
    resolve_err: Option<Error>,

    collection_id: u32,
    manifest_rev: u64,

    // Present while a resolve is in flight; later arrivals wait on it rather
    // than issuing their own request.
    pending: Option<Arc<Notify>>,
}

type CollectionResolverSlowMap = Arc<Mutex<HashMap<String, Arc<Mutex<CollectionCacheEntry>>>>>;

/// Caches (scope, collection) to id mappings over an underlying resolver,
/// coalescing concurrent lookups for the same path into one request.
pub(crate) struct CollectionResolverCached<Resolver: CollectionResolver> {
    resolver: Arc<Resolver>,

    fast_cache: Arc<ArcSwap<CollectionsFastCache>>,

    slow_map: CollectionResolverSlowMap,
}

pub(crate) struct CollectionResolverCachedOptions<Resolver: CollectionResolver> {
    pub resolver: Resolver,
}

impl<Resolver> CollectionResolverCached<Resolver>
where
    Resolver: CollectionResolver + 'static,
{
    pub fn new(opts: CollectionResolverCachedOptions<Resolver>) -> Self {
        Self {
            resolver: Arc::new(opts.resolver),
            fast_cache: Arc::new(ArcSwap::from_pointee(Default::default())),
            slow_map: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    async fn resolve_collection_id_slow(
        &self,
        scope_name: &str,
        collection_name: &str,
        full_key_path: &str,
    ) -> Result<(u32, u64)> {
        loop {
            let mut slow_map = self.slow_map.lock().await;

            let slow_entry = if let Some(entry) = slow_map.get(full_key_path) {
                entry.clone()
            } else {
                let entry = Arc::new(Mutex::new(CollectionCacheEntry {
                    resolve_err: None,
                    collection_id: 0,
                    manifest_rev: 0,
                    pending: Some(Arc::new(Notify::new())),
                }));

                slow_map.insert(full_key_path.to_string(), entry.clone());

                tokio::spawn(Self::resolve_collection(
                    entry.clone(),
                    self.slow_map.clone(),
                    self.fast_cache.clone(),
                    self.resolver.clone(),
                    scope_name.to_string(),
                    collection_name.to_string(),
                ));

                entry
            };

            let entry_guard = slow_entry.lock().await;
            if let Some(pending) = &entry_guard.pending {
                let pending = pending.clone();
                let notified = pending.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();
                drop(entry_guard);
                drop(slow_map);

                notified.await;

                continue;
            }

            if let Some(e) = &entry_guard.resolve_err {
                return Err(e.clone());
            }

            return Ok((entry_guard.collection_id, entry_guard.manifest_rev));
        }
    }

    async fn resolve_collection(
        entry: Arc<Mutex<CollectionCacheEntry>>,
        slow_map: CollectionResolverSlowMap,
        fast_cache: Arc<ArcSwap<CollectionsFastCache>>,
        resolver: Arc<Resolver>,
        scope_name: String,
        collection_name: String,
    ) {
        let res = resolver
            .resolve_collection_id(&scope_name, &collection_name)
            .await;

        let pending = {
            let mut guard = entry.lock().await;
            match res {
                Ok((id, rev)) => {
                    guard.resolve_err = None;
                    guard.collection_id = id;
                    guard.manifest_rev = rev;
                }
                Err(e) => {
                    guard.resolve_err = Some(e);
                    guard.collection_id = 0;
                    guard.manifest_rev = 0;
                }
            }

            guard.pending.take()
        };

        Self::rebuild_fast_cache(slow_map, fast_cache).await;

        if let Some(p) = pending {
            p.notify_waiters();
        }
    }

    async fn rebuild_fast_cache(
        slow_map: CollectionResolverSlowMap,
        fast_cache: Arc<ArcSwap<CollectionsFastCache>>,
    ) {
        let guard = slow_map.lock().await;

        let mut collections = HashMap::new();
        for (full_key_path, entry) in guard.iter() {
            let (collection_id, manifest_rev) = {
                let guard = entry.lock().await;
                (guard.collection_id, guard.manifest_rev)
            };

            if collection_id > 0 {
                collections.insert(
                    full_key_path.clone(),
                    CollectionsFastCacheEntry {
                        collection_id,
                        manifest_rev,
                    },
                );
            }
        }

        fast_cache.store(Arc::new(CollectionsFastCache { collections }));
    }
}

impl<Resolver> CollectionResolver for CollectionResolverCached<Resolver>
where
    Resolver: CollectionResolver + 'static,
{
    async fn resolve_collection_id(
        &self,
        scope_name: &str,
        collection_name: &str,
    ) -> Result<(u32, u64)> {
        let full_key_path = format!("{scope_name}.{collection_name}");

        let fast_cache = self.fast_cache.load();
        if let Some(entry) = fast_cache.collections.get(&full_key_path) {
            return Ok((entry.collection_id, entry.manifest_rev));
        }

        self.resolve_collection_id_slow(scope_name, collection_name, &full_key_path)
            .await
    }

    async fn invalidate_collection_id(&self, scope_name: &str, collection_name: &str) {
        self.resolver
            .invalidate_collection_id(scope_name, collection_name)
            .await;

        let full_key_path = format!("{scope_name}.{collection_name}");

        {
            let mut slow_map = self.slow_map.lock().await;
            slow_map.remove(&full_key_path);
        }

        Self::rebuild_fast_cache(self.slow_map.clone(), self.fast_cache.clone()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::{sleep, Duration};

    struct CountingResolver {
        resolves: AtomicU32,
        invalidations: AtomicU32,
    }

    impl CountingResolver {
        fn new() -> Self {
            Self {
                resolves: AtomicU32::new(0),
                invalidations: AtomicU32::new(0),
            }
        }
    }

    impl CollectionResolver for CountingResolver {
        async fn resolve_collection_id(
            &self,
            _scope_name: &str,
            _collection_name: &str,
        ) -> Result<(u32, u64)> {
            let count = self.resolves.fetch_add(1, Ordering::SeqCst);
            // Slow enough that concurrent lookups overlap the in-flight one.
            sleep(Duration::from_millis(20)).await;
            Ok((100 + count, 7))
        }

        async fn invalidate_collection_id(&self, _scope_name: &str, _collection_name: &str) {
            self.invalidations.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn concurrent_lookups_coalesce_into_one_resolve() {
        let cached = Arc::new(CollectionResolverCached::new(
            CollectionResolverCachedOptions {
                resolver: CountingResolver::new(),
            },
        ));

        let mut handles = vec![];
        for _ in 0..10 {
            let cached = cached.clone();
            handles.push(tokio::spawn(async move {
                cached.resolve_collection_id("scope", "coll").await
            }));
        }

        for handle in handles {
            let (cid, rev) = handle.await.unwrap().unwrap();
            assert_eq!(cid, 100);
            assert_eq!(rev, 7);
        }

        assert_eq!(cached.resolver.resolves.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalidation_forces_a_new_resolve() {
        let cached = CollectionResolverCached::new(CollectionResolverCachedOptions {
            resolver: CountingResolver::new(),
        });

        let (cid, _) = cached.resolve_collection_id("scope", "coll").await.unwrap();
        assert_eq!(cid, 100);

        // Cached: no new resolve.
        let (cid, _) = cached.resolve_collection_id("scope", "coll").await.unwrap();
        assert_eq!(cid, 100);
        assert_eq!(cached.resolver.resolves.load(Ordering::SeqCst), 1);

        cached.invalidate_collection_id("scope", "coll").await;
        assert_eq!(cached.resolver.invalidations.load(Ordering::SeqCst), 1);

        let (cid, _) = cached.resolve_collection_id("scope", "coll").await.unwrap();
        assert_eq!(cid, 101);
        assert_eq!(cached.resolver.resolves.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn distinct_paths_resolve_independently() {
        let cached = CollectionResolverCached::new(CollectionResolverCachedOptions {
            resolver: CountingResolver::new(),
        });

        cached.resolve_collection_id("s1", "c1").await.unwrap();
        cached.resolve_collection_id("s2", "c2").await.unwrap();

        assert_eq!(cached.resolver.resolves.load(Ordering::SeqCst), 2);
    }
}
