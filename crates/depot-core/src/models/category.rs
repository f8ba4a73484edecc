use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;

use super::archive::ArchiveFormat;

/// Resource category of an uploaded object.
///
/// The category selects the size ceiling from the rules table and the first
/// segment of the object key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ResourceCategory {
    Image,
    Audio,
    Video,
    Archive,
    File,
}

impl ResourceCategory {
    pub const ALL: [ResourceCategory; 5] = [
        ResourceCategory::Image,
        ResourceCategory::Audio,
        ResourceCategory::Video,
        ResourceCategory::Archive,
        ResourceCategory::File,
    ];

    /// First segment of every object key in this category.
    pub fn key_prefix(&self) -> &'static str {
        match self {
            ResourceCategory::Image => "images",
            ResourceCategory::Audio => "audio",
            ResourceCategory::Video => "videos",
            ResourceCategory::Archive => "archives",
            ResourceCategory::File => "files",
        }
    }

    pub fn from_key_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.key_prefix() == prefix)
    }

    /// Classify an upload from its declared MIME type, falling back to the
    /// file extension for archives sent as `application/octet-stream`.
    pub fn classify(content_type: &str, file_name: &str) -> Self {
        let content_type = content_type.trim().to_lowercase();
        if content_type.starts_with("image/") {
            ResourceCategory::Image
        } else if content_type.starts_with("audio/") {
            ResourceCategory::Audio
        } else if content_type.starts_with("video/") {
            ResourceCategory::Video
        } else if ArchiveFormat::from_content_type(&content_type).is_some()
            || ArchiveFormat::from_file_name(file_name).is_some()
        {
            ResourceCategory::Archive
        } else {
            ResourceCategory::File
        }
    }
}

impl Display for ResourceCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ResourceCategory::Image => write!(f, "image"),
            ResourceCategory::Audio => write!(f, "audio"),
            ResourceCategory::Video => write!(f, "video"),
            ResourceCategory::Archive => write!(f, "archive"),
            ResourceCategory::File => write!(f, "file"),
        }
    }
}

impl FromStr for ResourceCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "image" => Ok(ResourceCategory::Image),
            "audio" => Ok(ResourceCategory::Audio),
            "video" => Ok(ResourceCategory::Video),
            "archive" => Ok(ResourceCategory::Archive),
            "file" => Ok(ResourceCategory::File),
            _ => Err(anyhow::anyhow!("Invalid resource category: {}", s)),
        }
    }
}
