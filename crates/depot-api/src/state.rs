//! Application state shared by all handlers.

use depot_core::{Config, StorageBackend};
use depot_db::Catalog;
use depot_services::{
    AccessPolicy, ArchiveIngestionService, ListingService, ObjectRecordFinalizer,
    PresignedUrlIssuer, SignedUrlResolver,
};
use depot_storage::{Storage, UrlSigner};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub storage: Arc<dyn Storage>,
    pub access: Arc<dyn AccessPolicy>,
    pub issuer: Arc<PresignedUrlIssuer>,
    pub finalizer: Arc<ObjectRecordFinalizer>,
    pub listing: Arc<ListingService>,
    pub resolver: Arc<SignedUrlResolver>,
    pub archives: Arc<ArchiveIngestionService>,
    /// Verifies `/objects` URLs. Only present for the local backend.
    pub object_signer: Option<UrlSigner>,
}

impl AppState {
    /// Wire the services over an already-constructed storage, catalog and access policy.
    pub fn new(
        config: Config,
        storage: Arc<dyn Storage>,
        catalog: Arc<dyn Catalog>,
        access: Arc<dyn AccessPolicy>,
    ) -> Self {
        let rules = config.upload_rules().clone();

        let listing = Arc::new(ListingService::new(
            catalog.clone(),
            config.listing_cache_capacity,
        ));
        let issuer = Arc::new(PresignedUrlIssuer::new(
            storage.clone(),
            rules.clone(),
            Duration::from_secs(config.upload_url_ttl_secs),
        ));
        let finalizer = Arc::new(ObjectRecordFinalizer::new(
            listing.clone(),
            storage.clone(),
            rules.clone(),
            config.verify_uploaded_objects,
        ));
        let resolver = Arc::new(SignedUrlResolver::new(
            storage.clone(),
            Duration::from_secs(config.download_url_ttl_secs),
            config.signed_url_batch_max,
        ));
        let archives = Arc::new(ArchiveIngestionService::new(
            catalog,
            rules,
            config.max_archive_entries,
            config.max_archive_total_bytes,
        ));

        let object_signer = match storage.backend_type() {
            StorageBackend::Local => Some(UrlSigner::new(config.url_signing_secret.as_bytes())),
            StorageBackend::S3 => None,
        };

        Self {
            config,
            storage,
            access,
            issuer,
            finalizer,
            listing,
            resolver,
            archives,
            object_signer,
        }
    }
}
