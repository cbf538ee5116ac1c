//! Fetch deduplication and elements map merging.
//!
//! # Responsibilities
//! - Share one in-flight fetch between identical `(path, params)` requests
//! - Shallow-merge incoming maps over the running map
//! - Memoize merges per `(base, incoming)` pair
//!
//! # Design Decisions
//! - The cache is a value owned by one router; nothing is process-wide
//! - Merge results are keyed by map identity (`Arc` address) and kept only
//!   while both inputs are alive, like a two-level weak map
//! - `_value` carries server function results and never survives a merge

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, Weak};

use futures_util::future::{BoxFuture, FutureExt, Shared};

use crate::client::transport::{ElementsTransport, FetchError, FetchRequest};
use crate::elements::{Elements, RETURN_VALUE_ID};
use crate::observability::metrics;

/// A fetch every waiter can poll; resolves once.
pub type SharedElements = Shared<BoxFuture<'static, Result<Arc<Elements>, FetchError>>>;

struct CacheEntry {
    path_key: String,
    params_key: String,
    pending: SharedElements,
}

/// Holds the most recent fetch.
#[derive(Default)]
pub struct FetchCache {
    entry: Mutex<Option<CacheEntry>>,
}

impl FetchCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the current entry, whatever it is.
    pub fn invalidate(&self) {
        if let Ok(mut entry) = self.entry.lock() {
            *entry = None;
        }
    }

    /// Drop the entry only if it is for `(path_key, params_key)`.
    pub fn forget(&self, path_key: &str, params_key: &str) {
        if let Ok(mut entry) = self.entry.lock() {
            if entry
                .as_ref()
                .is_some_and(|e| e.path_key == path_key && e.params_key == params_key)
            {
                *entry = None;
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entry.lock().map(|entry| entry.is_none()).unwrap_or(true)
    }
}

impl std::fmt::Debug for FetchCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let key = self
            .entry
            .lock()
            .ok()
            .and_then(|entry| entry.as_ref().map(|e| (e.path_key.clone(), e.params_key.clone())));
        f.debug_struct("FetchCache").field("entry", &key).finish()
    }
}

/// Fetch the elements map for `path_key`, reusing the cached fetch when it
/// is for the same `(path_key, params_key)`.
pub fn fetch_elements(
    path_key: &str,
    params_key: &str,
    skip: Vec<String>,
    transport: &Arc<dyn ElementsTransport>,
    cache: &FetchCache,
) -> SharedElements {
    let mut entry = match cache.entry.lock() {
        Ok(entry) => entry,
        Err(poisoned) => poisoned.into_inner(),
    };
    if let Some(existing) = entry.as_ref() {
        if existing.path_key == path_key && existing.params_key == params_key {
            metrics::record_fetch("shared");
            return existing.pending.clone();
        }
    }

    let request = transport.fetch(FetchRequest {
        route_key: path_key.to_string(),
        query: params_key.to_string(),
        skip,
    });
    let path = path_key.to_string();
    let pending = async move {
        match request.await {
            Ok(elements) => {
                metrics::record_fetch("ok");
                Ok(Arc::new(elements))
            }
            Err(e) => {
                metrics::record_fetch("error");
                tracing::warn!(path_key = %path, error = %e, "Elements fetch failed");
                Err(e)
            }
        }
    }
    .boxed()
    .shared();

    *entry = Some(CacheEntry {
        path_key: path_key.to_string(),
        params_key: params_key.to_string(),
        pending: pending.clone(),
    });
    pending
}

/// Incoming entries for one base map.
struct MergeRow {
    base: Weak<Elements>,
    merged: HashMap<usize, (Weak<Elements>, Arc<Elements>)>,
}

/// Memoized merge results keyed by `(base, incoming)` identity.
#[derive(Default)]
pub struct MergeCache {
    rows: Mutex<HashMap<usize, MergeRow>>,
}

impl MergeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live `(base, incoming)` pairs.
    pub fn len(&self) -> usize {
        self.rows
            .lock()
            .map(|rows| rows.values().map(|row| row.merged.len()).sum())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn prune(rows: &mut HashMap<usize, MergeRow>) {
        rows.retain(|_, row| {
            if row.base.strong_count() == 0 {
                return false;
            }
            row.merged.retain(|_, (incoming, _)| incoming.strong_count() > 0);
            !row.merged.is_empty()
        });
    }
}

impl std::fmt::Debug for MergeCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergeCache").field("pairs", &self.len()).finish()
    }
}

/// Shallow merge of `incoming` over `base`. Incoming wins key conflicts.
pub fn merge_elements(base: &Arc<Elements>, incoming: &Arc<Elements>, cache: &MergeCache) -> Arc<Elements> {
    let base_key = Arc::as_ptr(base) as usize;
    let incoming_key = Arc::as_ptr(incoming) as usize;

    let mut rows = match cache.rows.lock() {
        Ok(rows) => rows,
        Err(poisoned) => poisoned.into_inner(),
    };
    MergeCache::prune(&mut rows);

    if let Some((_, merged)) = rows
        .get(&base_key)
        .filter(|row| std::ptr::eq(row.base.as_ptr(), Arc::as_ptr(base)))
        .and_then(|row| row.merged.get(&incoming_key))
        .filter(|(weak, _)| std::ptr::eq(weak.as_ptr(), Arc::as_ptr(incoming)))
    {
        return merged.clone();
    }

    let mut merged: Elements = (**base).clone();
    merged.extend(incoming.iter().map(|(id, value)| (id.clone(), value.clone())));
    merged.remove(RETURN_VALUE_ID);
    let merged = Arc::new(merged);

    rows.entry(base_key)
        .or_insert_with(|| MergeRow {
            base: Arc::downgrade(base),
            merged: HashMap::new(),
        })
        .merged
        .insert(incoming_key, (Arc::downgrade(incoming), merged.clone()));
    merged
}

/// Await both maps, then merge them.
pub async fn merge_pending<B, I>(base: B, incoming: I, cache: &MergeCache) -> Result<Arc<Elements>, FetchError>
where
    B: Future<Output = Result<Arc<Elements>, FetchError>>,
    I: Future<Output = Result<Arc<Elements>, FetchError>>,
{
    let (base, incoming) = futures_util::future::try_join(base, incoming).await?;
    Ok(merge_elements(&base, &incoming, cache))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{Node, SlotValue};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn map(entries: &[(&str, i64)]) -> Arc<Elements> {
        Arc::new(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), SlotValue::Value(serde_json::json!(v))))
                .collect(),
        )
    }

    struct SlowTransport {
        calls: AtomicUsize,
    }

    impl ElementsTransport for SlowTransport {
        fn fetch(&self, request: FetchRequest) -> BoxFuture<'static, Result<Elements, FetchError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                let mut elements = Elements::new();
                elements.insert(request.route_key, SlotValue::Node(Node::text("fetched")));
                Ok(elements)
            })
        }
    }

    #[tokio::test]
    async fn test_identical_fetches_are_shared() {
        let counting = Arc::new(SlowTransport {
            calls: AtomicUsize::new(0),
        });
        let transport: Arc<dyn ElementsTransport> = counting.clone();
        let cache = FetchCache::new();

        let first = fetch_elements("R/a", "", Vec::new(), &transport, &cache);
        let second = fetch_elements("R/a", "", Vec::new(), &transport, &cache);
        let (first, second) = tokio::join!(first, second);

        assert_eq!(counting.calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first.unwrap(), &second.unwrap()));
    }

    #[tokio::test]
    async fn test_different_params_fetch_again() {
        let counting = Arc::new(SlowTransport {
            calls: AtomicUsize::new(0),
        });
        let transport: Arc<dyn ElementsTransport> = counting.clone();
        let cache = FetchCache::new();

        fetch_elements("R/a", "q=1", Vec::new(), &transport, &cache).await.unwrap();
        fetch_elements("R/a", "q=2", Vec::new(), &transport, &cache).await.unwrap();
        cache.invalidate();
        fetch_elements("R/a", "q=2", Vec::new(), &transport, &cache).await.unwrap();
        assert_eq!(counting.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_merge_accumulates() {
        let cache = MergeCache::new();
        let empty = Arc::new(Elements::new());
        let a = map(&[("a", 1)]);
        let b = map(&[("b", 2)]);

        let first = merge_elements(&empty, &a, &cache);
        let second = merge_elements(&first, &b, &cache);
        assert_eq!(*second, *map(&[("a", 1), ("b", 2)]));
    }

    #[test]
    fn test_incoming_wins_and_value_is_stripped() {
        let cache = MergeCache::new();
        let base = map(&[("x", 0), ("y", 2)]);
        let incoming = map(&[("x", 1), ("_value", 9)]);

        let merged = merge_elements(&base, &incoming, &cache);
        assert_eq!(*merged, *map(&[("x", 1), ("y", 2)]));
        assert!(!merged.contains_key(RETURN_VALUE_ID));
    }

    #[test]
    fn test_merge_is_memoized_per_pair() {
        let cache = MergeCache::new();
        let base = map(&[("x", 0)]);
        let incoming = map(&[("y", 1)]);

        let first = merge_elements(&base, &incoming, &cache);
        let again = merge_elements(&base, &incoming, &cache);
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(cache.len(), 1);

        drop(incoming);
        let other = map(&[("z", 1)]);
        merge_elements(&base, &other, &cache);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_merge_pending() {
        let cache = MergeCache::new();
        let base = map(&[("a", 1)]);
        let incoming = map(&[("b", 2)]);
        let merged = merge_pending(
            futures_util::future::ready(Ok(base)),
            futures_util::future::ready(Ok(incoming)),
            &cache,
        )
        .await
        .unwrap();
        assert_eq!(merged.len(), 2);

        let failed = merge_pending(
            futures_util::future::ready(Ok(map(&[]))),
            futures_util::future::ready(Err(FetchError::Status(500))),
            &cache,
        )
        .await;
        assert_eq!(failed.unwrap_err(), FetchError::Status(500));
    }
}
