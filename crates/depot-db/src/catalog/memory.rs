use super::{Catalog, RecordInsert};
use chrono::Utc;
use depot_core::models::{NewObjectRecord, NewRepositoryFile, ObjectRecord, RepositoryFile};
use depot_core::AppError;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct MemoryState {
    /// Insertion order doubles as creation order
    records: Vec<ObjectRecord>,
    ids_by_key: HashMap<String, Uuid>,
    files: Vec<RepositoryFile>,
}

/// In-process catalog used when no database is configured and in tests.
///
/// Every operation holds the lock for its whole read-modify-write, so the
/// check-and-insert on object keys is atomic.
#[derive(Default)]
pub struct MemoryCatalog {
    state: RwLock<MemoryState>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn object_record_count(&self) -> usize {
        self.state.read().await.records.len()
    }
}

#[async_trait::async_trait]
impl Catalog for MemoryCatalog {
    async fn insert_object_record(
        &self,
        record: NewObjectRecord,
    ) -> Result<RecordInsert, AppError> {
        let mut state = self.state.write().await;

        if let Some(id) = state.ids_by_key.get(&record.object_key) {
            let existing = state
                .records
                .iter()
                .find(|r| r.id == *id)
                .cloned()
                .ok_or_else(|| {
                    AppError::Catalog(format!("Index out of sync for {}", record.object_key))
                })?;
            return Ok(RecordInsert::Existing(existing));
        }

        let created = ObjectRecord {
            id: Uuid::new_v4(),
            group_id: record.group_id,
            name: record.name,
            object_key: record.object_key,
            byte_size: record.byte_size,
            mime_type: record.mime_type,
            width: record.width,
            height: record.height,
            alt: record.alt,
            created_at: Utc::now(),
        };
        state
            .ids_by_key
            .insert(created.object_key.clone(), created.id);
        state.records.push(created.clone());

        Ok(RecordInsert::Created(created))
    }

    async fn get_object_record(&self, id: Uuid) -> Result<Option<ObjectRecord>, AppError> {
        let state = self.state.read().await;
        Ok(state.records.iter().find(|r| r.id == id).cloned())
    }

    async fn get_object_record_by_key(
        &self,
        object_key: &str,
    ) -> Result<Option<ObjectRecord>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .ids_by_key
            .get(object_key)
            .and_then(|id| state.records.iter().find(|r| r.id == *id))
            .cloned())
    }

    async fn list_object_records(&self, group_id: &str) -> Result<Vec<ObjectRecord>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .records
            .iter()
            .filter(|r| r.group_id == group_id)
            .cloned()
            .collect())
    }

    async fn delete_object_record(&self, id: Uuid) -> Result<Option<ObjectRecord>, AppError> {
        let mut state = self.state.write().await;
        let Some(position) = state.records.iter().position(|r| r.id == id) else {
            return Ok(None);
        };
        let removed = state.records.remove(position);
        state.ids_by_key.remove(&removed.object_key);
        Ok(Some(removed))
    }

    async fn create_repository_file(
        &self,
        file: NewRepositoryFile,
    ) -> Result<RepositoryFile, AppError> {
        let created = RepositoryFile {
            id: Uuid::new_v4(),
            repository_id: file.repository_id,
            name: file.name,
            path: file.path,
            content: file.content,
            byte_size: file.byte_size,
            category: file.category,
            created_at: Utc::now(),
        };
        self.state.write().await.files.push(created.clone());
        Ok(created)
    }

    async fn list_repository_files(
        &self,
        repository_id: &str,
    ) -> Result<Vec<RepositoryFile>, AppError> {
        let state = self.state.read().await;
        Ok(state
            .files
            .iter()
            .filter(|f| f.repository_id == repository_id)
            .cloned()
            .collect())
    }

    fn kind(&self) -> &'static str {
        "memory"
    }
}
