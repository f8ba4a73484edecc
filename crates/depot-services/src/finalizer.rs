//! Object record finalizer
//!
//! The only write path from "bytes landed in storage" to a catalog-visible
//! record. Safe under duplicate calls: a second finalize for the same key
//! returns the record created by the first.

use depot_core::models::{FinalizeRequest, ObjectRecord, ResourceCategory};
use depot_core::validation::validate_group_id;
use depot_core::{AppError, UploadRules};
use depot_db::RecordInsert;
use depot_storage::{parse_object_key, Storage, StorageError};
use std::sync::Arc;
use validator::Validate;

use crate::access::Caller;
use crate::listing::ListingService;

pub struct ObjectRecordFinalizer {
    listing: Arc<ListingService>,
    storage: Arc<dyn Storage>,
    rules: UploadRules,
    verify_objects: bool,
}

impl ObjectRecordFinalizer {
    pub fn new(
        listing: Arc<ListingService>,
        storage: Arc<dyn Storage>,
        rules: UploadRules,
        verify_objects: bool,
    ) -> Self {
        Self {
            listing,
            storage,
            rules,
            verify_objects,
        }
    }

    /// Check that the key was issued for this group and is within the size
    /// ceiling of its category.
    fn check_key_scope(&self, request: &FinalizeRequest) -> Result<ResourceCategory, AppError> {
        let parts = parse_object_key(&request.object_key).ok_or_else(|| {
            AppError::Validation(format!("objectKey '{}' is not an issued key", request.object_key))
        })?;
        if parts.group_id != request.group_id {
            return Err(AppError::Validation(format!(
                "objectKey '{}' does not belong to group '{}'",
                request.object_key, request.group_id
            )));
        }
        self.rules.check_size(parts.category, request.file_size)?;
        Ok(parts.category)
    }

    /// The stored object must exist and hold exactly the declared bytes, so
    /// the recorded `byteSize` is the real one.
    async fn verify_object(
        &self,
        request: &FinalizeRequest,
        category: ResourceCategory,
    ) -> Result<(), AppError> {
        match self.storage.content_length(&request.object_key).await {
            Ok(stored) if stored == request.file_size => Ok(()),
            Ok(stored) => {
                tracing::warn!(
                    object_key = %request.object_key,
                    declared = request.file_size,
                    stored,
                    "Stored object size differs from declared size"
                );
                self.rules.check_size(category, stored)?;
                Err(AppError::Validation(format!(
                    "Uploaded object is {} bytes but fileSize declares {}",
                    stored, request.file_size
                )))
            }
            Err(StorageError::NotFound(_)) => Err(AppError::NotFound(format!(
                "No uploaded object at '{}'",
                request.object_key
            ))),
            Err(e) => Err(e.into()),
        }
    }

    #[tracing::instrument(skip(self, caller, request), fields(group_id = %request.group_id, object_key = %request.object_key))]
    pub async fn finalize(
        &self,
        caller: &Caller,
        request: FinalizeRequest,
    ) -> Result<ObjectRecord, AppError> {
        request.validate()?;
        validate_group_id(&request.group_id)?;
        caller.authorize_write(&request.group_id)?;
        let category = self.check_key_scope(&request)?;

        if self.verify_objects {
            self.verify_object(&request, category).await?;
        }

        let group_id = request.group_id.clone();
        let object_key = request.object_key.clone();

        let inserted = self
            .listing
            .catalog()
            .insert_object_record(request.into_new_record())
            .await
            .map_err(|e| {
                // The uploaded bytes stay in storage without a record
                tracing::warn!(
                    object_key = %object_key,
                    error = %e,
                    "Catalog write failed, uploaded object left orphaned"
                );
                match e {
                    AppError::Validation(msg) => AppError::Validation(msg),
                    other => AppError::Catalog(other.to_string()),
                }
            })?;

        match inserted {
            RecordInsert::Created(record) => {
                self.listing.invalidate(&group_id);
                tracing::info!(
                    record_id = %record.id,
                    byte_size = record.byte_size,
                    "Object record created"
                );
                Ok(record)
            }
            RecordInsert::Existing(record) => {
                tracing::info!(record_id = %record.id, "Duplicate finalize, returning existing record");
                Ok(record)
            }
        }
    }

    /// Remove a record and its object. The manual cleanup path for uploads
    /// that should no longer be visible.
    #[tracing::instrument(skip(self, caller), fields(record_id = %id))]
    pub async fn delete(&self, caller: &Caller, id: uuid::Uuid) -> Result<ObjectRecord, AppError> {
        let catalog = self.listing.catalog();
        let record = catalog
            .get_object_record(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Record {} not found", id)))?;
        caller.authorize_write(&record.group_id)?;

        let removed = catalog
            .delete_object_record(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Record {} not found", id)))?;
        self.listing.invalidate(&removed.group_id);

        if let Err(e) = self.storage.delete(&removed.object_key).await {
            tracing::warn!(
                object_key = %removed.object_key,
                error = %e,
                "Record deleted but object removal failed"
            );
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_core::models::{NewObjectRecord, NewRepositoryFile, RepositoryFile};
    use depot_db::{Catalog, MemoryCatalog};
    use depot_storage::{LocalStorage, UrlSigner};
    use uuid::Uuid;

    const KEY: &str = "images/g1/1700000000000-demo.png";

    struct Fixture {
        _dir: tempfile::TempDir,
        catalog: Arc<MemoryCatalog>,
        storage: Arc<LocalStorage>,
        finalizer: ObjectRecordFinalizer,
    }

    async fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(
            LocalStorage::new(
                dir.path(),
                "http://localhost:4000".to_string(),
                UrlSigner::new("test-secret"),
            )
            .await
            .unwrap(),
        );
        let catalog = Arc::new(MemoryCatalog::new());
        let listing = Arc::new(ListingService::new(catalog.clone(), 16));
        let finalizer =
            ObjectRecordFinalizer::new(listing, storage.clone(), UploadRules::default(), true);
        Fixture {
            _dir: dir,
            catalog,
            storage,
            finalizer,
        }
    }

    fn request(group_id: &str, key: &str, size: u64) -> FinalizeRequest {
        FinalizeRequest {
            group_id: group_id.to_string(),
            name: "demo.png".to_string(),
            object_key: key.to_string(),
            file_size: size,
            mime_type: "image/png".to_string(),
            width: Some(640),
            height: Some(480),
            alt: None,
        }
    }

    #[tokio::test]
    async fn test_finalize_creates_record_with_declared_size() {
        let f = fixture().await;
        f.storage
            .upload_with_key(KEY, vec![0u8; 2_097_152], "image/png")
            .await
            .unwrap();

        let record = f
            .finalizer
            .finalize(&Caller::unrestricted("t"), request("g1", KEY, 2_097_152))
            .await
            .unwrap();

        assert_eq!(record.name, "demo.png");
        assert_eq!(record.byte_size, 2_097_152);
        assert_eq!(record.width, Some(640));
        assert_eq!(f.catalog.object_record_count().await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_finalize_deduplicates() {
        let f = fixture().await;
        f.storage
            .upload_with_key(KEY, vec![1, 2, 3], "image/png")
            .await
            .unwrap();
        let caller = Caller::unrestricted("t");

        let first = f.finalizer.finalize(&caller, request("g1", KEY, 3)).await.unwrap();
        let second = f.finalizer.finalize(&caller, request("g1", KEY, 3)).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(f.catalog.object_record_count().await, 1);
    }

    #[tokio::test]
    async fn test_finalize_invalidates_listing() {
        let f = fixture().await;
        let caller = Caller::unrestricted("t");
        assert!(f.finalizer.listing.list("g1").await.unwrap().is_empty());

        f.storage.upload_with_key(KEY, vec![1], "image/png").await.unwrap();
        f.finalizer.finalize(&caller, request("g1", KEY, 1)).await.unwrap();

        assert_eq!(f.finalizer.listing.list("g1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_object_is_not_found() {
        let f = fixture().await;
        let err = f
            .finalizer
            .finalize(&Caller::unrestricted("t"), request("g1", KEY, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(f.catalog.object_record_count().await, 0);
    }

    #[tokio::test]
    async fn test_size_mismatch_is_rejected() {
        let f = fixture().await;
        f.storage
            .upload_with_key(KEY, vec![0u8; 11], "image/png")
            .await
            .unwrap();

        let err = f
            .finalizer
            .finalize(&Caller::unrestricted("t"), request("g1", KEY, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m.contains("11 bytes")));
        assert_eq!(f.catalog.object_record_count().await, 0);
    }

    #[tokio::test]
    async fn test_stored_object_over_ceiling_is_too_large() {
        let f = fixture().await;
        f.storage
            .upload_with_key(KEY, vec![0u8; 10 * 1024 * 1024 + 1], "image/png")
            .await
            .unwrap();

        let err = f
            .finalizer
            .finalize(&Caller::unrestricted("t"), request("g1", KEY, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PayloadTooLarge(_)));
        assert_eq!(f.catalog.object_record_count().await, 0);
    }

    #[tokio::test]
    async fn test_key_from_other_group_rejected() {
        let f = fixture().await;
        let err = f
            .finalizer
            .finalize(&Caller::unrestricted("t"), request("g2", KEY, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_caller_scope_enforced() {
        let f = fixture().await;
        let err = f
            .finalizer
            .finalize(&Caller::with_groups("t", ["g2"]), request("g1", KEY, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    struct FailingCatalog;

    #[async_trait::async_trait]
    impl Catalog for FailingCatalog {
        async fn insert_object_record(
            &self,
            _record: NewObjectRecord,
        ) -> Result<RecordInsert, AppError> {
            Err(AppError::Internal("connection reset".to_string()))
        }
        async fn get_object_record(&self, _id: Uuid) -> Result<Option<ObjectRecord>, AppError> {
            Ok(None)
        }
        async fn get_object_record_by_key(
            &self,
            _object_key: &str,
        ) -> Result<Option<ObjectRecord>, AppError> {
            Ok(None)
        }
        async fn list_object_records(
            &self,
            _group_id: &str,
        ) -> Result<Vec<ObjectRecord>, AppError> {
            Ok(Vec::new())
        }
        async fn delete_object_record(
            &self,
            _id: Uuid,
        ) -> Result<Option<ObjectRecord>, AppError> {
            Ok(None)
        }
        async fn create_repository_file(
            &self,
            _file: NewRepositoryFile,
        ) -> Result<RepositoryFile, AppError> {
            Err(AppError::Internal("connection reset".to_string()))
        }
        async fn list_repository_files(
            &self,
            _repository_id: &str,
        ) -> Result<Vec<RepositoryFile>, AppError> {
            Ok(Vec::new())
        }
        fn kind(&self) -> &'static str {
            "failing"
        }
    }

    #[tokio::test]
    async fn test_catalog_failure_leaves_object_in_storage() {
        let f = fixture().await;
        f.storage.upload_with_key(KEY, vec![1], "image/png").await.unwrap();
        let listing = Arc::new(ListingService::new(Arc::new(FailingCatalog), 4));
        let finalizer =
            ObjectRecordFinalizer::new(listing, f.storage.clone(), UploadRules::default(), true);

        let err = finalizer
            .finalize(&Caller::unrestricted("t"), request("g1", KEY, 1))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Catalog(_)));
        assert!(f.storage.exists(KEY).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_removes_record_and_object() {
        let f = fixture().await;
        let caller = Caller::unrestricted("t");
        f.storage.upload_with_key(KEY, vec![1], "image/png").await.unwrap();
        let record = f.finalizer.finalize(&caller, request("g1", KEY, 1)).await.unwrap();

        let removed = f.finalizer.delete(&caller, record.id).await.unwrap();
        assert_eq!(removed.id, record.id);
        assert!(!f.storage.exists(KEY).await.unwrap());
        assert!(f.finalizer.listing.list("g1").await.unwrap().is_empty());

        let err = f.finalizer.delete(&caller, record.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
