//! Presigned URL issuer
//!
//! Mints short-lived PUT URLs scoped to a single freshly generated key. The
//! issuer never touches the catalog.

use chrono::{Duration as ChronoDuration, Utc};
use depot_core::models::{IssuePutRequest, PresignMethod, PresignedUrl};
use depot_core::validation::validate_group_id;
use depot_core::{AppError, UploadRules};
use depot_storage::{generate_object_key, Storage};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use validator::Validate;

use crate::access::Caller;

/// Millisecond timestamps that strictly increase within the process, so two
/// issuances in the same millisecond still produce distinct keys.
#[derive(Debug, Default)]
pub struct MonotonicClock {
    last: AtomicI64,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_millis(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let previous = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(now);
        now.max(previous + 1)
    }
}

pub struct PresignedUrlIssuer {
    storage: Arc<dyn Storage>,
    rules: UploadRules,
    ttl: Duration,
    clock: MonotonicClock,
}

impl PresignedUrlIssuer {
    pub fn new(storage: Arc<dyn Storage>, rules: UploadRules, ttl: Duration) -> Self {
        Self {
            storage,
            rules,
            ttl,
            clock: MonotonicClock::new(),
        }
    }

    pub fn rules(&self) -> &UploadRules {
        &self.rules
    }

    /// Issue a presigned PUT URL for one file.
    ///
    /// Fails with `Forbidden` when the caller cannot write to the group and
    /// `PayloadTooLarge` when the declared size exceeds the category ceiling.
    #[tracing::instrument(skip(self, caller, request), fields(group_id = %request.group_id, file_size = request.file_size))]
    pub async fn issue_put_url(
        &self,
        caller: &Caller,
        request: &IssuePutRequest,
    ) -> Result<PresignedUrl, AppError> {
        request.validate()?;
        validate_group_id(&request.group_id)?;
        caller.authorize_write(&request.group_id)?;

        let category =
            self.rules
                .check_upload(&request.file_type, &request.file_name, request.file_size)?;

        let object_key = generate_object_key(
            category,
            &request.group_id,
            self.clock.next_millis(),
            &request.file_name,
        );
        let expires_at = Utc::now() + ChronoDuration::seconds(self.ttl.as_secs() as i64);

        let url = self
            .storage
            .presigned_put_url(&object_key, &request.file_type, self.ttl)
            .await?;

        tracing::info!(
            object_key = %object_key,
            category = %category,
            expires_in_secs = self.ttl.as_secs(),
            "Issued presigned upload URL"
        );

        Ok(PresignedUrl {
            object_key,
            method: PresignMethod::Put,
            url,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_storage::{LocalStorage, UrlSigner};
    use std::collections::HashSet;

    async fn issuer(dir: &std::path::Path) -> PresignedUrlIssuer {
        let storage = LocalStorage::new(
            dir,
            "http://localhost:4000".to_string(),
            UrlSigner::new("test-secret"),
        )
        .await
        .unwrap();
        PresignedUrlIssuer::new(
            Arc::new(storage),
            UploadRules::default(),
            Duration::from_secs(3600),
        )
    }

    fn request(group_id: &str, name: &str, file_type: &str, size: u64) -> IssuePutRequest {
        IssuePutRequest {
            group_id: group_id.to_string(),
            file_name: name.to_string(),
            file_type: file_type.to_string(),
            file_size: size,
        }
    }

    #[test]
    fn test_monotonic_clock_strictly_increases() {
        let clock = MonotonicClock::new();
        let mut previous = clock.next_millis();
        for _ in 0..1000 {
            let next = clock.next_millis();
            assert!(next > previous);
            previous = next;
        }
    }

    #[tokio::test]
    async fn test_issue_put_url_key_layout() {
        let dir = tempfile::tempdir().unwrap();
        let issuer = issuer(dir.path()).await;
        let presigned = issuer
            .issue_put_url(
                &Caller::unrestricted("test"),
                &request("g1", "demo.png", "image/png", 2_097_152),
            )
            .await
            .unwrap();

        assert!(presigned.object_key.starts_with("images/g1/"));
        assert!(presigned.object_key.ends_with("-demo.png"));
        assert_eq!(presigned.method, PresignMethod::Put);
        assert!(presigned.url.contains("method=PUT"));
        assert!(presigned.expires_at > Utc::now());
    }

    #[tokio::test]
    async fn test_same_file_name_gets_distinct_keys() {
        let dir = tempfile::tempdir().unwrap();
        let issuer = issuer(dir.path()).await;
        let caller = Caller::unrestricted("test");
        let mut keys = HashSet::new();
        for _ in 0..50 {
            let presigned = issuer
                .issue_put_url(&caller, &request("g1", "a.txt", "text/plain", 10))
                .await
                .unwrap();
            keys.insert(presigned.object_key);
        }
        assert_eq!(keys.len(), 50);
    }

    #[tokio::test]
    async fn test_oversized_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let issuer = issuer(dir.path()).await;
        let err = issuer
            .issue_put_url(
                &Caller::unrestricted("test"),
                &request("g1", "big.png", "image/png", 11 * 1024 * 1024),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PayloadTooLarge(_)));
    }

    #[tokio::test]
    async fn test_caller_without_scope_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let issuer = issuer(dir.path()).await;
        let err = issuer
            .issue_put_url(
                &Caller::with_groups("test", ["g2"]),
                &request("g1", "demo.png", "image/png", 10),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_invalid_group_id_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let issuer = issuer(dir.path()).await;
        let err = issuer
            .issue_put_url(
                &Caller::unrestricted("test"),
                &request("../g1", "demo.png", "image/png", 10),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
