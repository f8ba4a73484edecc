//! Catalog trait and backend selection

mod memory;
mod postgres;

pub use memory::MemoryCatalog;
pub use postgres::PgCatalog;

use depot_core::models::{
    NewObjectRecord, NewRepositoryFile, ObjectRecord, RepositoryFile,
};
use depot_core::{AppError, Config};
use std::sync::Arc;
use uuid::Uuid;

/// Outcome of registering an object record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordInsert {
    Created(ObjectRecord),
    /// A record for the same object key already existed; nothing was written.
    Existing(ObjectRecord),
}

impl RecordInsert {
    pub fn into_record(self) -> ObjectRecord {
        match self {
            RecordInsert::Created(record) | RecordInsert::Existing(record) => record,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, RecordInsert::Created(_))
    }
}

/// Trait for catalog operations
/// This abstracts the storage engine (PostgreSQL or in-process memory)
#[async_trait::async_trait]
pub trait Catalog: Send + Sync {
    /// Register an object. At most one record exists per object key.
    async fn insert_object_record(&self, record: NewObjectRecord)
        -> Result<RecordInsert, AppError>;

    async fn get_object_record(&self, id: Uuid) -> Result<Option<ObjectRecord>, AppError>;

    async fn get_object_record_by_key(
        &self,
        object_key: &str,
    ) -> Result<Option<ObjectRecord>, AppError>;

    /// Records of one group, oldest first.
    async fn list_object_records(&self, group_id: &str) -> Result<Vec<ObjectRecord>, AppError>;

    /// Remove a record, returning it if it existed.
    async fn delete_object_record(&self, id: Uuid) -> Result<Option<ObjectRecord>, AppError>;

    async fn create_repository_file(
        &self,
        file: NewRepositoryFile,
    ) -> Result<RepositoryFile, AppError>;

    /// Files of one repository, in registration order.
    async fn list_repository_files(
        &self,
        repository_id: &str,
    ) -> Result<Vec<RepositoryFile>, AppError>;

    /// Short backend name for health reporting
    fn kind(&self) -> &'static str;
}

/// Create the catalog selected by configuration: Postgres when
/// `DATABASE_URL` is set, otherwise an in-memory catalog.
pub async fn create_catalog(config: &Config) -> Result<Arc<dyn Catalog>, AppError> {
    match config.database_url() {
        Some(url) => {
            tracing::info!("Initializing PostgreSQL catalog");
            let catalog = PgCatalog::connect(url, config.db_max_connections).await?;
            Ok(Arc::new(catalog))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory catalog (records are not durable)");
            Ok(Arc::new(MemoryCatalog::new()))
        }
    }
}
