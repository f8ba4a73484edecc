//! Signed URL cache
//!
//! Keeps resolved signed GET URLs per object key until shortly before they
//! expire. A consumer that fails to load a URL reports it and gets a freshly
//! resolved one, a bounded number of times per key.

use crate::api::SignedUrlApi;
use crate::error::ClientError;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

/// Largest batch the server accepts.
const MAX_BATCH_SIZE: usize = 100;
const DEFAULT_MAX_REFRESHES: u32 = 3;
const REFRESH_MARGIN_SECS: i64 = 30;

#[derive(Debug, Clone)]
struct CachedUrl {
    url: String,
    expires_at: DateTime<Utc>,
}

impl CachedUrl {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > now
    }
}

#[derive(Default)]
struct CacheState {
    urls: HashMap<String, CachedUrl>,
    refreshes: HashMap<String, u32>,
}

pub struct SignedUrlCache {
    api: Arc<dyn SignedUrlApi>,
    max_refreshes: u32,
    // Never held across an await
    state: Mutex<CacheState>,
}

impl SignedUrlCache {
    pub fn new(api: Arc<dyn SignedUrlApi>) -> Self {
        Self {
            api,
            max_refreshes: DEFAULT_MAX_REFRESHES,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn with_max_refreshes(mut self, max_refreshes: u32) -> Self {
        self.max_refreshes = max_refreshes;
        self
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Fresh cached URL, without any request.
    pub fn cached(&self, object_key: &str) -> Option<String> {
        let now = Utc::now();
        self.lock()
            .urls
            .get(object_key)
            .filter(|cached| cached.is_fresh(now))
            .map(|cached| cached.url.clone())
    }

    /// URLs for `object_keys`. Cache misses are resolved in as few batch
    /// calls as possible; keys the server could not sign are left out.
    pub async fn resolve(
        &self,
        object_keys: &[String],
    ) -> Result<HashMap<String, String>, ClientError> {
        let now = Utc::now();
        let mut resolved = HashMap::with_capacity(object_keys.len());
        let mut misses = Vec::new();
        {
            let state = self.lock();
            let mut seen = HashSet::new();
            for key in object_keys {
                if !seen.insert(key.as_str()) {
                    continue;
                }
                match state.urls.get(key).filter(|cached| cached.is_fresh(now)) {
                    Some(cached) => {
                        resolved.insert(key.clone(), cached.url.clone());
                    }
                    None => misses.push(key.clone()),
                }
            }
        }

        for chunk in misses.chunks(MAX_BATCH_SIZE) {
            let response = self.api.signed_urls(chunk).await?;
            if !response.failed_keys().is_empty() {
                tracing::debug!(failed = ?response.failed_keys(), "Some object keys could not be signed");
            }

            let mut state = self.lock();
            for (key, url) in response.signed_urls {
                state.urls.insert(
                    key.clone(),
                    CachedUrl {
                        url: url.clone(),
                        expires_at: response.expires_at,
                    },
                );
                resolved.insert(key, url);
            }
        }

        Ok(resolved)
    }

    /// URL for one key, resolving it if needed.
    pub async fn get(&self, object_key: &str) -> Result<String, ClientError> {
        let key = object_key.to_string();
        self.resolve(std::slice::from_ref(&key))
            .await?
            .remove(&key)
            .ok_or_else(|| ClientError::Api {
                status: 404,
                code: "NOT_FOUND".to_string(),
                message: format!("No signed URL available for '{}'", object_key),
            })
    }

    /// A consumer failed to load the URL for `object_key`. Drops the cached
    /// URL and resolves a new one, unless the key has already been refreshed
    /// `max_refreshes` times since it last loaded.
    pub async fn report_load_error(&self, object_key: &str) -> Result<String, ClientError> {
        {
            let mut state = self.lock();
            let attempts = state.refreshes.entry(object_key.to_string()).or_insert(0);
            if *attempts >= self.max_refreshes {
                tracing::warn!(object_key = %object_key, attempts = *attempts, "Signed URL refresh limit reached");
                return Err(ClientError::RetriesExhausted {
                    key: object_key.to_string(),
                    attempts: *attempts,
                });
            }
            *attempts += 1;
            state.urls.remove(object_key);
        }
        tracing::debug!(object_key = %object_key, "Re-resolving signed URL after load error");
        self.get(object_key).await
    }

    /// The URL for `object_key` loaded; its refresh budget starts over.
    pub fn report_loaded(&self, object_key: &str) {
        self.lock().refreshes.remove(object_key);
    }

    pub fn invalidate(&self, object_key: &str) {
        let mut state = self.lock();
        state.urls.remove(object_key);
        state.refreshes.remove(object_key);
    }
}
