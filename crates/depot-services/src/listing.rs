//! Cached per-group record listings.

use depot_core::models::ObjectRecord;
use depot_core::AppError;
use depot_db::Catalog;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

const DEFAULT_CAPACITY: usize = 256;

pub struct ListingService {
    catalog: Arc<dyn Catalog>,
    cache: Mutex<LruCache<String, Arc<Vec<ObjectRecord>>>>,
    /// Bumped on every invalidation; a load that raced an invalidation is not cached.
    generation: AtomicU64,
}

impl ListingService {
    pub fn new(catalog: Arc<dyn Catalog>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .or_else(|| NonZeroUsize::new(DEFAULT_CAPACITY))
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            catalog,
            cache: Mutex::new(LruCache::new(capacity)),
            generation: AtomicU64::new(0),
        }
    }

    fn cached(&self, group_id: &str) -> Option<Arc<Vec<ObjectRecord>>> {
        let mut cache = self.cache.lock().unwrap_or_else(|p| p.into_inner());
        cache.get(group_id).cloned()
    }

    /// Records of one group, oldest first, served from cache when possible.
    #[tracing::instrument(skip(self), fields(group_id = %group_id))]
    pub async fn list(&self, group_id: &str) -> Result<Arc<Vec<ObjectRecord>>, AppError> {
        if let Some(records) = self.cached(group_id) {
            tracing::debug!(count = records.len(), "Listing cache hit");
            return Ok(records);
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let records = Arc::new(self.catalog.list_object_records(group_id).await?);

        let mut cache = self.cache.lock().unwrap_or_else(|p| p.into_inner());
        if self.generation.load(Ordering::SeqCst) == generation {
            cache.put(group_id.to_string(), records.clone());
        }
        tracing::debug!(count = records.len(), "Listing cache miss");
        Ok(records)
    }

    /// Drop the cached listing for a group so the next read sees new writes.
    pub fn invalidate(&self, group_id: &str) {
        let mut cache = self.cache.lock().unwrap_or_else(|p| p.into_inner());
        self.generation.fetch_add(1, Ordering::SeqCst);
        cache.pop(group_id);
        tracing::debug!(group_id = %group_id, "Listing cache invalidated");
    }

    pub fn catalog(&self) -> &Arc<dyn Catalog> {
        &self.catalog
    }
}
