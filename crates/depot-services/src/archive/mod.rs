//! Archive ingestion pipeline
//!
//! Registers every text file inside one uploaded archive as its own catalog
//! record, without per-file presigning. Opening the archive is all-or-nothing;
//! each entry after that succeeds or fails on its own.

mod extract;

pub use extract::{extract_zip_entries, is_noise_path, normalize_entry_path, ExtractLimits};

use bytes::Bytes;
use depot_core::models::{ArchiveFormat, IngestSummary, NewRepositoryFile, ResourceCategory};
use depot_core::validation::validate_group_id;
use depot_core::{AppError, ErrorMetadata, UploadRules};
use depot_db::Catalog;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::access::Caller;

/// Decoded entries waiting for registration. Keeps at most this many in
/// memory besides the one being decoded and the one being registered.
const ENTRY_CHANNEL_CAPACITY: usize = 1;

pub struct ArchiveIngestionService {
    catalog: Arc<dyn Catalog>,
    rules: UploadRules,
    max_entries: usize,
    max_total_bytes: u64,
}

/// Detect the container format from the file name, then the declared type.
pub fn detect_format(file_name: &str, content_type: Option<&str>) -> Option<ArchiveFormat> {
    ArchiveFormat::from_file_name(file_name)
        .or_else(|| content_type.and_then(ArchiveFormat::from_content_type))
}

impl ArchiveIngestionService {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        rules: UploadRules,
        max_entries: usize,
        max_total_bytes: u64,
    ) -> Self {
        Self {
            catalog,
            rules,
            max_entries,
            max_total_bytes,
        }
    }

    /// Ingest one archive into `repository_id`.
    ///
    /// Always returns a summary once the archive is open, even if every entry
    /// failed.
    #[tracing::instrument(skip(self, caller, data), fields(repository_id = %repository_id, file_name = %file_name, size_bytes = data.len()))]
    pub async fn ingest(
        &self,
        caller: &Caller,
        repository_id: &str,
        file_name: &str,
        content_type: Option<&str>,
        data: Bytes,
    ) -> Result<IngestSummary, AppError> {
        validate_group_id(repository_id)?;
        caller.authorize_write(repository_id)?;

        let format = detect_format(file_name, content_type).ok_or_else(|| {
            AppError::UnsupportedFormat(format!("'{}' is not a recognized archive", file_name))
        })?;
        self.rules.check_archive_format(format)?;
        self.rules
            .check_size(ResourceCategory::Archive, data.len() as u64)?;

        let limits = ExtractLimits {
            max_entries: self.max_entries,
            max_entry_bytes: self.rules.ceiling(ResourceCategory::File),
            max_total_bytes: self.max_total_bytes,
        };
        let start = std::time::Instant::now();

        // Entries are registered while later ones are still being decoded
        let (tx, mut rx) = mpsc::channel(ENTRY_CHANNEL_CAPACITY);
        let extraction = tokio::task::spawn_blocking(move || {
            extract_zip_entries(data, limits, |entry| tx.blocking_send(entry).is_ok())
        });

        let mut summary = IngestSummary::default();
        while let Some(entry) = rx.recv().await {
            match entry {
                Ok(entry) => {
                    let path = entry.path.clone();
                    match self
                        .catalog
                        .create_repository_file(NewRepositoryFile::from_entry(repository_id, entry))
                        .await
                    {
                        Ok(_) => summary.record_success(),
                        Err(e) => {
                            tracing::warn!(path = %path, error = %e, "Failed to register archive entry");
                            summary.record_failure(path, e.client_message());
                        }
                    }
                }
                Err(failure) => {
                    tracing::debug!(path = %failure.path, reason = %failure.message, "Skipped archive entry");
                    summary.record_failure(failure.path, failure.message);
                }
            }
        }

        let extracted = extraction
            .await
            .map_err(|e| AppError::Internal(format!("Archive extraction task failed: {}", e)))?;
        if let Err(e) = extracted {
            if summary.success_count > 0 {
                tracing::warn!(
                    registered = summary.success_count,
                    error = %e,
                    "Archive ingestion aborted after registering some entries"
                );
            }
            return Err(e);
        }

        tracing::info!(
            success_count = summary.success_count,
            failed_count = summary.failed_count,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Archive ingestion finished"
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_db::MemoryCatalog;
    use std::io::{Cursor, Write};
    use zip::write::{FileOptions, ZipWriter};

    fn build_zip(entries: &[(&str, &[u8])]) -> Bytes {
        let mut buffer = Vec::new();
        {
            let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
            for (name, data) in entries {
                zip.start_file(*name, FileOptions::default()).unwrap();
                zip.write_all(data).unwrap();
            }
            zip.finish().unwrap();
        }
        Bytes::from(buffer)
    }

    fn service(catalog: Arc<MemoryCatalog>) -> ArchiveIngestionService {
        ArchiveIngestionService::new(catalog, UploadRules::default(), 100, 1024 * 1024)
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format("site.zip", None), Some(ArchiveFormat::Zip));
        assert_eq!(
            detect_format("upload", Some("application/zip")),
            Some(ArchiveFormat::Zip)
        );
        assert_eq!(detect_format("site.tar.gz", None), Some(ArchiveFormat::TarGz));
        assert_eq!(detect_format("notes.txt", Some("text/plain")), None);
    }

    #[tokio::test]
    async fn test_valid_and_undecodable_entries_are_counted() {
        let catalog = Arc::new(MemoryCatalog::new());
        let data = build_zip(&[
            ("src/lib.rs", b"pub fn demo() {}".as_slice()),
            ("docs/guide.md", b"# Guide".as_slice()),
            ("Cargo.toml", b"[package]".as_slice()),
            ("assets/logo.bin", [0xff, 0xfe, 0x00].as_slice()),
            ("assets/icon.bin", [0xc3, 0x28].as_slice()),
        ]);

        let summary = service(catalog.clone())
            .ingest(&Caller::unrestricted("t"), "repo-1", "repo.zip", None, data)
            .await
            .unwrap();

        assert_eq!(summary.success_count, 3);
        assert_eq!(summary.failed_count, 2);
        assert_eq!(summary.errors.len(), 2);
        assert!(summary.is_partial());
        assert_eq!(catalog.list_repository_files("repo-1").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_unsupported_format_fails_fast() {
        let catalog = Arc::new(MemoryCatalog::new());
        let err = service(catalog.clone())
            .ingest(
                &Caller::unrestricted("t"),
                "repo-1",
                "repo.tar.gz",
                Some("application/gzip"),
                Bytes::from_static(b"anything"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnsupportedFormat(_)));

        let err = service(catalog)
            .ingest(
                &Caller::unrestricted("t"),
                "repo-1",
                "notes.txt",
                Some("text/plain"),
                Bytes::from_static(b"anything"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn test_corrupt_archive_registers_nothing() {
        let catalog = Arc::new(MemoryCatalog::new());
        let err = service(catalog.clone())
            .ingest(
                &Caller::unrestricted("t"),
                "repo-1",
                "repo.zip",
                None,
                Bytes::from_static(b"PK but not really"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(catalog.list_repository_files("repo-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_repository_scope_enforced() {
        let catalog = Arc::new(MemoryCatalog::new());
        let data = build_zip(&[("a.txt", b"a".as_slice())]);
        let err = service(catalog)
            .ingest(&Caller::with_groups("t", ["other"]), "repo-1", "repo.zip", None, data)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_oversized_expansion_registers_nothing() {
        let catalog = Arc::new(MemoryCatalog::new());
        let block = vec![b'x'; 256 * 1024];
        let data = build_zip(&[
            ("a.txt", block.as_slice()),
            ("b.txt", block.as_slice()),
            ("c.txt", block.as_slice()),
            ("d.txt", block.as_slice()),
            ("e.txt", block.as_slice()),
        ]);

        let err = service(catalog.clone())
            .ingest(&Caller::unrestricted("t"), "repo-1", "repo.zip", None, data)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(catalog.list_repository_files("repo-1").await.unwrap().is_empty());
    }
}
