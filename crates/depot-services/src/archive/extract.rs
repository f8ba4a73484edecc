//! Zip decoding for ingestion. Synchronous; callers run it on the blocking pool.

use bytes::Bytes;
use depot_core::models::{ArchiveEntry, EntryCategory, IngestFailure};
use depot_core::AppError;
use std::io::{Cursor, Read};
use zip::read::ZipFile;
use zip::ZipArchive;

/// OS metadata files and folders that are never user content.
const NOISE_NAMES: &[&str] = &["__MACOSX", "Thumbs.db", "desktop.ini"];

/// Outcome of decoding one archive member.
pub type ExtractedEntry = Result<ArchiveEntry, IngestFailure>;

#[derive(Debug, Clone, Copy)]
pub struct ExtractLimits {
    pub max_entries: usize,
    pub max_entry_bytes: u64,
    /// Decompressed bytes allowed across all entries of one archive.
    pub max_total_bytes: u64,
}

/// Backslashes become `/`; leading `./` and `/` are dropped.
pub fn normalize_entry_path(raw: &str) -> String {
    let unified = raw.replace('\\', "/");
    let mut path = unified.as_str();
    loop {
        if let Some(rest) = path.strip_prefix("./") {
            path = rest;
        } else if let Some(rest) = path.strip_prefix('/') {
            path = rest;
        } else {
            break;
        }
    }
    path.to_string()
}

/// Hidden files or folders (including `.git`) and OS metadata.
pub fn is_noise_path(path: &str) -> bool {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .any(|segment| {
            (segment.starts_with('.') && segment != "." && segment != "..")
                || NOISE_NAMES.iter().any(|noise| noise.eq_ignore_ascii_case(segment))
        })
}

fn escapes_root(path: &str) -> bool {
    path.split('/').any(|segment| segment == "..")
}

fn failure(path: &str, message: impl Into<String>) -> IngestFailure {
    IngestFailure {
        path: path.to_string(),
        message: message.into(),
    }
}

fn total_exceeded(limit: u64) -> AppError {
    AppError::Validation(format!(
        "Archive expands to more than the maximum of {} bytes",
        limit
    ))
}

/// Decode every file member of a zip archive, handing each one to `emit` as
/// soon as it is read. Extraction stops early when `emit` returns `false`.
///
/// Fails as a whole when the archive cannot be opened, has more members than
/// allowed, or expands beyond `max_total_bytes`. Everything else is reported
/// per entry.
pub fn extract_zip_entries<F>(data: Bytes, limits: ExtractLimits, mut emit: F) -> Result<(), AppError>
where
    F: FnMut(ExtractedEntry) -> bool,
{
    let mut archive = ZipArchive::new(Cursor::new(data))
        .map_err(|e| AppError::Validation(format!("Failed to open archive: {}", e)))?;

    if archive.len() > limits.max_entries {
        return Err(AppError::Validation(format!(
            "Archive has {} entries, maximum is {}",
            archive.len(),
            limits.max_entries
        )));
    }

    // Declared sizes first, so an obvious bomb registers nothing
    let mut declared_total = 0u64;
    for index in 0..archive.len() {
        if let Ok(file) = archive.by_index_raw(index) {
            declared_total = declared_total.saturating_add(file.size());
        }
    }
    if declared_total > limits.max_total_bytes {
        return Err(total_exceeded(limits.max_total_bytes));
    }

    let mut total = 0u64;
    for index in 0..archive.len() {
        let mut file = match archive.by_index(index) {
            Ok(file) => file,
            Err(e) => {
                if !emit(Err(failure(&format!("#{}", index), e.to_string()))) {
                    return Ok(());
                }
                continue;
            }
        };

        if file.is_dir() {
            continue;
        }

        let path = normalize_entry_path(file.name());
        if path.is_empty() || path.ends_with('/') || is_noise_path(&path) {
            continue;
        }

        let entry = decode_entry(&mut file, path, limits, &mut total)?;
        if !emit(entry) {
            return Ok(());
        }
    }

    Ok(())
}

/// Read one member. `total` counts decompressed bytes across the archive and
/// is checked against the real output, not the declared sizes.
fn decode_entry(
    file: &mut ZipFile<'_>,
    path: String,
    limits: ExtractLimits,
    total: &mut u64,
) -> Result<ExtractedEntry, AppError> {
    if escapes_root(&path) {
        return Ok(Err(failure(&path, "Entry path escapes the archive root")));
    }

    if file.size() > limits.max_entry_bytes {
        return Ok(Err(failure(
            &path,
            format!(
                "Entry size {} bytes exceeds maximum of {} bytes",
                file.size(),
                limits.max_entry_bytes
            ),
        )));
    }

    // Bound the read by the limits, not by the declared size
    let remaining = limits.max_total_bytes.saturating_sub(*total);
    let budget = limits.max_entry_bytes.min(remaining);
    let mut raw = Vec::with_capacity(file.size().min(budget) as usize);
    if let Err(e) = file.by_ref().take(budget + 1).read_to_end(&mut raw) {
        return Ok(Err(failure(&path, format!("Failed to read entry: {}", e))));
    }

    *total = total.saturating_add(raw.len() as u64);
    if *total > limits.max_total_bytes {
        return Err(total_exceeded(limits.max_total_bytes));
    }
    if raw.len() as u64 > limits.max_entry_bytes {
        return Ok(Err(failure(&path, "Entry exceeds size limit after decompression")));
    }

    let byte_size = raw.len() as u64;
    let content = match String::from_utf8(raw) {
        Ok(content) => content,
        Err(_) => return Ok(Err(failure(&path, "Entry is not valid UTF-8 text"))),
    };

    let name = path.rsplit('/').next().unwrap_or(&path).to_string();
    let category = EntryCategory::from_path(&path);
    Ok(Ok(ArchiveEntry {
        path,
        name,
        content,
        byte_size,
        category,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::{FileOptions, ZipWriter};

    const LIMITS: ExtractLimits = ExtractLimits {
        max_entries: 100,
        max_entry_bytes: 1024,
        max_total_bytes: 64 * 1024,
    };

    fn extract_all(data: Bytes, limits: ExtractLimits) -> Result<Vec<ExtractedEntry>, AppError> {
        let mut entries = Vec::new();
        extract_zip_entries(data, limits, |entry| {
            entries.push(entry);
            true
        })?;
        Ok(entries)
    }

    fn build_zip(entries: &[(&str, &[u8])]) -> Bytes {
        let mut buffer = Vec::new();
        {
            let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
            let options = FileOptions::default();
            for (name, data) in entries {
                if name.ends_with('/') {
                    zip.add_directory(*name, options).unwrap();
                } else {
                    zip.start_file(*name, options).unwrap();
                    zip.write_all(data).unwrap();
                }
            }
            zip.finish().unwrap();
        }
        Bytes::from(buffer)
    }

    #[test]
    fn test_normalize_entry_path() {
        assert_eq!(normalize_entry_path("src\\lib\\mod.rs"), "src/lib/mod.rs");
        assert_eq!(normalize_entry_path("./README.md"), "README.md");
        assert_eq!(normalize_entry_path("/abs/file.txt"), "abs/file.txt");
    }

    #[test]
    fn test_is_noise_path() {
        assert!(is_noise_path(".git/config"));
        assert!(is_noise_path("src/.DS_Store"));
        assert!(is_noise_path("__MACOSX/._main.rs"));
        assert!(is_noise_path("assets/thumbs.db"));
        assert!(!is_noise_path("src/main.rs"));
        assert!(!is_noise_path("../escape.txt"));
    }

    #[test]
    fn test_extracts_text_entries() {
        let data = build_zip(&[
            ("src/", b"".as_slice()),
            ("src/main.rs", b"fn main() {}".as_slice()),
            ("README.md", b"# demo".as_slice()),
            (".env", b"SECRET=1".as_slice()),
            ("__MACOSX/src/._main.rs", b"\x00\x05".as_slice()),
        ]);

        let entries = extract_all(data, LIMITS).unwrap();
        let ok: Vec<&ArchiveEntry> = entries.iter().filter_map(|e| e.as_ref().ok()).collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(ok[0].path, "src/main.rs");
        assert_eq!(ok[0].name, "main.rs");
        assert_eq!(ok[0].category, EntryCategory::Source);
        assert_eq!(ok[0].byte_size, 12);
        assert_eq!(ok[1].category, EntryCategory::Documentation);
    }

    #[test]
    fn test_per_entry_failures() {
        let big = vec![b'a'; 2048];
        let data = build_zip(&[
            ("ok.txt", b"fine".as_slice()),
            ("logo.png", [0x89, 0x50, 0x4e, 0x47, 0xff, 0xfe].as_slice()),
            ("../escape.txt", b"nope".as_slice()),
            ("big.txt", big.as_slice()),
        ]);

        let entries = extract_all(data, LIMITS).unwrap();
        let failures: Vec<&IngestFailure> =
            entries.iter().filter_map(|e| e.as_ref().err()).collect();
        assert_eq!(entries.len(), 4);
        assert_eq!(failures.len(), 3);
        assert_eq!(failures[0].path, "logo.png");
        assert!(failures[0].message.contains("UTF-8"));
        assert_eq!(failures[1].path, "../escape.txt");
        assert_eq!(failures[2].path, "big.txt");
    }

    #[test]
    fn test_corrupt_archive_is_fatal() {
        let err = extract_all(Bytes::from_static(b"not a zip"), LIMITS).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_entry_count_limit() {
        let data = build_zip(&[
            ("a.txt", b"a".as_slice()),
            ("b.txt", b"b".as_slice()),
            ("c.txt", b"c".as_slice()),
        ]);
        let limits = ExtractLimits {
            max_entries: 2,
            ..LIMITS
        };
        assert!(matches!(
            extract_all(data, limits),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_highly_compressed_archive_hits_total_limit() {
        // 320 KiB of text deflates to a few KiB
        let block = vec![b'a'; 8 * 1024];
        let names: Vec<String> = (0..40).map(|i| format!("pad/{}.txt", i)).collect();
        let members: Vec<(&str, &[u8])> = names
            .iter()
            .map(|name| (name.as_str(), block.as_slice()))
            .collect();
        let data = build_zip(&members);
        assert!((data.len() as u64) < LIMITS.max_total_bytes / 4);

        let limits = ExtractLimits {
            max_entry_bytes: 16 * 1024,
            ..LIMITS
        };
        let mut emitted = 0;
        let err = extract_zip_entries(data, limits, |_| {
            emitted += 1;
            true
        })
        .unwrap_err();

        assert!(matches!(err, AppError::Validation(ref m) if m.contains("expands")));
        assert_eq!(emitted, 0);
    }

    #[test]
    fn test_total_limit_is_inclusive() {
        let data = build_zip(&[
            ("a.txt", [b'a'; 600].as_slice()),
            ("b.txt", [b'b'; 600].as_slice()),
        ]);
        let limits = ExtractLimits {
            max_total_bytes: 1200,
            ..LIMITS
        };
        assert_eq!(extract_all(data.clone(), limits).unwrap().len(), 2);

        let limits = ExtractLimits {
            max_total_bytes: 1199,
            ..LIMITS
        };
        assert!(matches!(
            extract_all(data, limits),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_emit_can_stop_extraction() {
        let data = build_zip(&[
            ("a.txt", b"a".as_slice()),
            ("b.txt", b"b".as_slice()),
            ("c.txt", b"c".as_slice()),
        ]);
        let mut seen = Vec::new();
        extract_zip_entries(data, LIMITS, |entry| {
            seen.push(entry.map(|e| e.path).unwrap_or_default());
            seen.len() < 2
        })
        .unwrap();
        assert_eq!(seen, vec!["a.txt".to_string(), "b.txt".to_string()]);
    }
}
