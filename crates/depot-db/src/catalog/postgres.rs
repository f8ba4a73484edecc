use super::{Catalog, RecordInsert};
use anyhow::Context;
use chrono::{DateTime, Utc};
use depot_core::models::{
    EntryCategory, NewObjectRecord, NewRepositoryFile, ObjectRecord, RepositoryFile,
};
use depot_core::AppError;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;
use uuid::Uuid;

const OBJECT_RECORD_COLUMNS: &str =
    "id, group_id, name, object_key, byte_size, mime_type, width, height, alt, created_at";
const REPOSITORY_FILE_COLUMNS: &str =
    "id, repository_id, name, path, content, byte_size, category, created_at";

#[derive(Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect, then apply the embedded migrations.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, AppError> {
        tracing::info!("Connecting to database...");
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .connect(database_url)
            .await?;

        tracing::info!(max_connections, "Database connected successfully");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run database migrations")?;
        tracing::info!("Database migrations applied");

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn dimension_to_db(value: Option<u32>, field: &str) -> Result<Option<i32>, AppError> {
    value
        .map(|v| {
            i32::try_from(v)
                .map_err(|_| AppError::Validation(format!("{} {} is out of range", field, v)))
        })
        .transpose()
}

fn object_record_from_row(row: &PgRow) -> Result<ObjectRecord, AppError> {
    let byte_size: i64 = row.try_get("byte_size")?;
    let width: Option<i32> = row.try_get("width")?;
    let height: Option<i32> = row.try_get("height")?;
    Ok(ObjectRecord {
        id: row.try_get("id")?,
        group_id: row.try_get("group_id")?,
        name: row.try_get("name")?,
        object_key: row.try_get("object_key")?,
        byte_size: byte_size.max(0) as u64,
        mime_type: row.try_get("mime_type")?,
        width: width.map(|w| w.max(0) as u32),
        height: height.map(|h| h.max(0) as u32),
        alt: row.try_get("alt")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

fn repository_file_from_row(row: &PgRow) -> Result<RepositoryFile, AppError> {
    let byte_size: i64 = row.try_get("byte_size")?;
    let category: String = row.try_get("category")?;
    Ok(RepositoryFile {
        id: row.try_get("id")?,
        repository_id: row.try_get("repository_id")?,
        name: row.try_get("name")?,
        path: row.try_get("path")?,
        content: row.try_get("content")?,
        byte_size: byte_size.max(0) as u64,
        category: category.parse::<EntryCategory>()?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait::async_trait]
impl Catalog for PgCatalog {
    #[tracing::instrument(skip(self, record), fields(db.table = "object_records", db.operation = "insert", object_key = %record.object_key))]
    async fn insert_object_record(
        &self,
        record: NewObjectRecord,
    ) -> Result<RecordInsert, AppError> {
        let width = dimension_to_db(record.width, "width")?;
        let height = dimension_to_db(record.height, "height")?;
        let byte_size = i64::try_from(record.byte_size)
            .map_err(|_| AppError::Validation("byteSize is out of range".to_string()))?;

        let query = format!(
            r#"
            INSERT INTO object_records ({cols})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (object_key) DO NOTHING
            RETURNING {cols}
            "#,
            cols = OBJECT_RECORD_COLUMNS
        );

        let inserted = sqlx::query(&query)
            .bind(Uuid::new_v4())
            .bind(&record.group_id)
            .bind(&record.name)
            .bind(&record.object_key)
            .bind(byte_size)
            .bind(&record.mime_type)
            .bind(width)
            .bind(height)
            .bind(&record.alt)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = inserted {
            return Ok(RecordInsert::Created(object_record_from_row(&row)?));
        }

        let existing = self
            .get_object_record_by_key(&record.object_key)
            .await?
            .ok_or_else(|| {
                AppError::Catalog(format!(
                    "Conflicting record for {} disappeared",
                    record.object_key
                ))
            })?;
        Ok(RecordInsert::Existing(existing))
    }

    #[tracing::instrument(skip(self), fields(db.table = "object_records", db.operation = "select", db.record_id = %id))]
    async fn get_object_record(&self, id: Uuid) -> Result<Option<ObjectRecord>, AppError> {
        let query = format!(
            "SELECT {} FROM object_records WHERE id = $1",
            OBJECT_RECORD_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(object_record_from_row).transpose()
    }

    #[tracing::instrument(skip(self), fields(db.table = "object_records", db.operation = "select"))]
    async fn get_object_record_by_key(
        &self,
        object_key: &str,
    ) -> Result<Option<ObjectRecord>, AppError> {
        let query = format!(
            "SELECT {} FROM object_records WHERE object_key = $1",
            OBJECT_RECORD_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(object_key)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(object_record_from_row).transpose()
    }

    #[tracing::instrument(skip(self), fields(db.table = "object_records", db.operation = "select", group_id = %group_id))]
    async fn list_object_records(&self, group_id: &str) -> Result<Vec<ObjectRecord>, AppError> {
        let query = format!(
            "SELECT {} FROM object_records WHERE group_id = $1 ORDER BY created_at ASC, id ASC",
            OBJECT_RECORD_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(group_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(object_record_from_row).collect()
    }

    #[tracing::instrument(skip(self), fields(db.table = "object_records", db.operation = "delete", db.record_id = %id))]
    async fn delete_object_record(&self, id: Uuid) -> Result<Option<ObjectRecord>, AppError> {
        let query = format!(
            "DELETE FROM object_records WHERE id = $1 RETURNING {}",
            OBJECT_RECORD_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(object_record_from_row).transpose()
    }

    #[tracing::instrument(skip(self, file), fields(db.table = "repository_files", db.operation = "insert", path = %file.path))]
    async fn create_repository_file(
        &self,
        file: NewRepositoryFile,
    ) -> Result<RepositoryFile, AppError> {
        let byte_size = i64::try_from(file.byte_size)
            .map_err(|_| AppError::Validation("byteSize is out of range".to_string()))?;
        let query = format!(
            r#"
            INSERT INTO repository_files ({cols})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {cols}
            "#,
            cols = REPOSITORY_FILE_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(Uuid::new_v4())
            .bind(&file.repository_id)
            .bind(&file.name)
            .bind(&file.path)
            .bind(&file.content)
            .bind(byte_size)
            .bind(file.category.as_str())
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?;
        repository_file_from_row(&row)
    }

    #[tracing::instrument(skip(self), fields(db.table = "repository_files", db.operation = "select", repository_id = %repository_id))]
    async fn list_repository_files(
        &self,
        repository_id: &str,
    ) -> Result<Vec<RepositoryFile>, AppError> {
        let query = format!(
            "SELECT {} FROM repository_files WHERE repository_id = $1 ORDER BY created_at ASC, path ASC",
            REPOSITORY_FILE_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(repository_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(repository_file_from_row).collect()
    }

    fn kind(&self) -> &'static str {
        "postgres"
    }
}
