use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::Path;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Archive container formats recognised at the ingestion boundary.
///
/// Only `Zip` is decoded end-to-end; the others are recognised so they can be
/// rejected explicitly instead of being mishandled as opaque bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveFormat {
    Zip,
    Tar,
    TarGz,
    SevenZip,
    Rar,
}

impl ArchiveFormat {
    /// Whether the ingestion pipeline can decode this format.
    pub fn is_supported(&self) -> bool {
        matches!(self, ArchiveFormat::Zip)
    }

    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let lower = file_name.to_lowercase();
        if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            return Some(ArchiveFormat::TarGz);
        }
        let extension = Path::new(&lower).extension()?.to_str()?.to_string();
        match extension.as_str() {
            "zip" => Some(ArchiveFormat::Zip),
            "tar" => Some(ArchiveFormat::Tar),
            "7z" => Some(ArchiveFormat::SevenZip),
            "rar" => Some(ArchiveFormat::Rar),
            _ => None,
        }
    }

    pub fn from_content_type(content_type: &str) -> Option<Self> {
        match content_type.trim().to_lowercase().as_str() {
            "application/zip" | "application/x-zip-compressed" | "application/x-zip" => {
                Some(ArchiveFormat::Zip)
            }
            "application/x-tar" => Some(ArchiveFormat::Tar),
            "application/gzip" | "application/x-gzip" | "application/x-compressed-tar" => {
                Some(ArchiveFormat::TarGz)
            }
            "application/x-7z-compressed" => Some(ArchiveFormat::SevenZip),
            "application/vnd.rar" | "application/x-rar-compressed" => Some(ArchiveFormat::Rar),
            _ => None,
        }
    }
}

impl FromStr for ArchiveFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "zip" => Ok(ArchiveFormat::Zip),
            "tar" => Ok(ArchiveFormat::Tar),
            "tar.gz" | "tgz" | "targz" => Ok(ArchiveFormat::TarGz),
            "7z" => Ok(ArchiveFormat::SevenZip),
            "rar" => Ok(ArchiveFormat::Rar),
            _ => Err(anyhow::anyhow!("Unknown archive format: {}", s)),
        }
    }
}

impl Display for ArchiveFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ArchiveFormat::Zip => write!(f, "zip"),
            ArchiveFormat::Tar => write!(f, "tar"),
            ArchiveFormat::TarGz => write!(f, "tar.gz"),
            ArchiveFormat::SevenZip => write!(f, "7z"),
            ArchiveFormat::Rar => write!(f, "rar"),
        }
    }
}

/// Category of a file found inside an ingested archive, derived from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EntryCategory {
    Source,
    Script,
    Markup,
    Stylesheet,
    Config,
    Documentation,
    Data,
    Other,
}

/// Static extension table. Lookups are case-insensitive.
const EXTENSION_CATEGORIES: &[(&str, EntryCategory)] = &[
    ("rs", EntryCategory::Source),
    ("go", EntryCategory::Source),
    ("c", EntryCategory::Source),
    ("h", EntryCategory::Source),
    ("cpp", EntryCategory::Source),
    ("hpp", EntryCategory::Source),
    ("java", EntryCategory::Source),
    ("kt", EntryCategory::Source),
    ("swift", EntryCategory::Source),
    ("cs", EntryCategory::Source),
    ("ts", EntryCategory::Source),
    ("tsx", EntryCategory::Source),
    ("js", EntryCategory::Source),
    ("jsx", EntryCategory::Source),
    ("mjs", EntryCategory::Source),
    ("vue", EntryCategory::Source),
    ("svelte", EntryCategory::Source),
    ("py", EntryCategory::Script),
    ("rb", EntryCategory::Script),
    ("php", EntryCategory::Script),
    ("sh", EntryCategory::Script),
    ("bash", EntryCategory::Script),
    ("ps1", EntryCategory::Script),
    ("lua", EntryCategory::Script),
    ("html", EntryCategory::Markup),
    ("htm", EntryCategory::Markup),
    ("xml", EntryCategory::Markup),
    ("svg", EntryCategory::Markup),
    ("css", EntryCategory::Stylesheet),
    ("scss", EntryCategory::Stylesheet),
    ("sass", EntryCategory::Stylesheet),
    ("less", EntryCategory::Stylesheet),
    ("json", EntryCategory::Config),
    ("toml", EntryCategory::Config),
    ("yaml", EntryCategory::Config),
    ("yml", EntryCategory::Config),
    ("ini", EntryCategory::Config),
    ("env", EntryCategory::Config),
    ("lock", EntryCategory::Config),
    ("md", EntryCategory::Documentation),
    ("mdx", EntryCategory::Documentation),
    ("rst", EntryCategory::Documentation),
    ("txt", EntryCategory::Documentation),
    ("adoc", EntryCategory::Documentation),
    ("csv", EntryCategory::Data),
    ("tsv", EntryCategory::Data),
    ("sql", EntryCategory::Data),
    ("graphql", EntryCategory::Data),
    ("proto", EntryCategory::Data),
];

/// Well-known extensionless file names.
const NAME_CATEGORIES: &[(&str, EntryCategory)] = &[
    ("dockerfile", EntryCategory::Config),
    ("makefile", EntryCategory::Script),
    ("license", EntryCategory::Documentation),
    ("readme", EntryCategory::Documentation),
];

impl EntryCategory {
    pub fn from_path(path: &str) -> Self {
        let name = path.rsplit('/').next().unwrap_or(path).to_lowercase();
        if let Some((_, category)) = NAME_CATEGORIES.iter().find(|(n, _)| *n == name) {
            return *category;
        }
        let extension = match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => ext,
            _ => return EntryCategory::Other,
        };
        EXTENSION_CATEGORIES
            .iter()
            .find(|(ext, _)| *ext == extension)
            .map(|(_, category)| *category)
            .unwrap_or(EntryCategory::Other)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryCategory::Source => "source",
            EntryCategory::Script => "script",
            EntryCategory::Markup => "markup",
            EntryCategory::Stylesheet => "stylesheet",
            EntryCategory::Config => "config",
            EntryCategory::Documentation => "documentation",
            EntryCategory::Data => "data",
            EntryCategory::Other => "other",
        }
    }
}

impl FromStr for EntryCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "source" => Ok(EntryCategory::Source),
            "script" => Ok(EntryCategory::Script),
            "markup" => Ok(EntryCategory::Markup),
            "stylesheet" => Ok(EntryCategory::Stylesheet),
            "config" => Ok(EntryCategory::Config),
            "documentation" => Ok(EntryCategory::Documentation),
            "data" => Ok(EntryCategory::Data),
            "other" => Ok(EntryCategory::Other),
            _ => Err(anyhow::anyhow!("Invalid entry category: {}", s)),
        }
    }
}

/// One decoded file from an archive. Never persisted as-is.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub path: String,
    pub name: String,
    pub content: String,
    pub byte_size: u64,
    pub category: EntryCategory,
}

/// Catalog record created for each ingested archive entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryFile {
    pub id: Uuid,
    pub repository_id: String,
    pub name: String,
    pub path: String,
    pub content: String,
    pub byte_size: u64,
    pub category: EntryCategory,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewRepositoryFile {
    pub repository_id: String,
    pub name: String,
    pub path: String,
    pub content: String,
    pub byte_size: u64,
    pub category: EntryCategory,
}

impl NewRepositoryFile {
    pub fn from_entry(repository_id: &str, entry: ArchiveEntry) -> Self {
        Self {
            repository_id: repository_id.to_string(),
            name: entry.name,
            path: entry.path,
            content: entry.content,
            byte_size: entry.byte_size,
            category: entry.category,
        }
    }
}

/// A single entry that could not be decoded or registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct IngestFailure {
    pub path: String,
    pub message: String,
}

/// Result of ingesting one archive. Returned even under heavy partial failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IngestSummary {
    pub success_count: usize,
    pub failed_count: usize,
    pub errors: Vec<IngestFailure>,
}

impl IngestSummary {
    pub fn record_success(&mut self) {
        self.success_count += 1;
    }

    pub fn record_failure(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.failed_count += 1;
        self.errors.push(IngestFailure {
            path: path.into(),
            message: message.into(),
        });
    }

    /// True when at least one entry failed while others may have succeeded.
    pub fn is_partial(&self) -> bool {
        self.failed_count > 0
    }
}
