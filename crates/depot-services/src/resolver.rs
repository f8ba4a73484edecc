//! Signed URL resolver (read path)

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use depot_core::models::{BatchSignedUrlResponse, PresignMethod, PresignedUrl};
use depot_core::AppError;
use depot_storage::keys::is_safe_key;
use depot_storage::Storage;
use futures::future::join_all;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

pub struct SignedUrlResolver {
    storage: Arc<dyn Storage>,
    ttl: Duration,
    batch_max: usize,
}

impl SignedUrlResolver {
    pub fn new(storage: Arc<dyn Storage>, ttl: Duration, batch_max: usize) -> Self {
        Self {
            storage,
            ttl,
            batch_max,
        }
    }

    pub fn batch_max(&self) -> usize {
        self.batch_max
    }

    fn expires_at(&self) -> DateTime<Utc> {
        Utc::now() + ChronoDuration::seconds(self.ttl.as_secs() as i64)
    }

    /// Issue a GET URL for one existing object.
    #[tracing::instrument(skip(self), fields(object_key = %object_key))]
    pub async fn resolve_one(&self, object_key: &str) -> Result<PresignedUrl, AppError> {
        if !is_safe_key(object_key) {
            return Err(AppError::Validation(format!(
                "objectKey '{}' is not a valid key",
                object_key
            )));
        }
        if !self.storage.exists(object_key).await? {
            return Err(AppError::NotFound(format!("Object not found: {}", object_key)));
        }

        let expires_at = self.expires_at();
        let url = self.storage.presigned_get_url(object_key, self.ttl).await?;

        Ok(PresignedUrl {
            object_key: object_key.to_string(),
            method: PresignMethod::Get,
            url,
            expires_at,
        })
    }

    /// Resolve many keys at once. Duplicates are collapsed; each distinct key
    /// lands either in `signed_urls` or in `errors`.
    #[tracing::instrument(skip(self, object_keys), fields(requested = object_keys.len()))]
    pub async fn resolve_batch(
        &self,
        object_keys: &[String],
    ) -> Result<BatchSignedUrlResponse, AppError> {
        let mut seen = HashSet::new();
        let distinct: Vec<&String> = object_keys
            .iter()
            .filter(|key| seen.insert(key.as_str()))
            .collect();

        if distinct.len() > self.batch_max {
            return Err(AppError::Validation(format!(
                "Batch of {} keys exceeds maximum of {}",
                distinct.len(),
                self.batch_max
            )));
        }

        let expires_at = self.expires_at();
        let results = join_all(distinct.iter().map(|key| self.resolve_one(key))).await;

        let mut signed_urls = BTreeMap::new();
        let mut errors = Vec::new();
        for (key, result) in distinct.into_iter().zip(results) {
            match result {
                Ok(presigned) => {
                    signed_urls.insert(key.clone(), presigned.url);
                }
                Err(e) => {
                    tracing::warn!(object_key = %key, error = %e, "Failed to resolve signed URL");
                    errors.push(key.clone());
                }
            }
        }

        tracing::debug!(
            resolved = signed_urls.len(),
            failed = errors.len(),
            "Resolved signed URL batch"
        );

        Ok(BatchSignedUrlResponse {
            signed_urls,
            errors: if errors.is_empty() { None } else { Some(errors) },
            expires_at,
        })
    }
}
