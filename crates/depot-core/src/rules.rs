//! Per-category upload rules
//!
//! Size ceilings and the archive-format whitelist live in one table keyed by
//! [`ResourceCategory`]. The task store, the issuer and the ingestion pipeline
//! all consult it instead of carrying their own limits.

use std::collections::HashMap;

use crate::error::AppError;
use crate::models::{ArchiveFormat, ResourceCategory};

const MB: u64 = 1024 * 1024;

pub const DEFAULT_MAX_IMAGE_SIZE_MB: u64 = 10;
pub const DEFAULT_MAX_AUDIO_SIZE_MB: u64 = 100;
pub const DEFAULT_MAX_VIDEO_SIZE_MB: u64 = 500;
pub const DEFAULT_MAX_ARCHIVE_SIZE_MB: u64 = 100;
pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryRule {
    pub max_bytes: u64,
}

impl CategoryRule {
    pub fn from_megabytes(mb: u64) -> Self {
        Self {
            max_bytes: mb.saturating_mul(MB),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadRules {
    categories: HashMap<ResourceCategory, CategoryRule>,
    archive_formats: Vec<ArchiveFormat>,
}

impl Default for UploadRules {
    fn default() -> Self {
        Self::new(
            [
                (ResourceCategory::Image, DEFAULT_MAX_IMAGE_SIZE_MB),
                (ResourceCategory::Audio, DEFAULT_MAX_AUDIO_SIZE_MB),
                (ResourceCategory::Video, DEFAULT_MAX_VIDEO_SIZE_MB),
                (ResourceCategory::Archive, DEFAULT_MAX_ARCHIVE_SIZE_MB),
                (ResourceCategory::File, DEFAULT_MAX_FILE_SIZE_MB),
            ]
            .into_iter()
            .map(|(category, mb)| (category, CategoryRule::from_megabytes(mb)))
            .collect(),
            vec![ArchiveFormat::Zip],
        )
    }
}

impl UploadRules {
    pub fn new(
        categories: HashMap<ResourceCategory, CategoryRule>,
        archive_formats: Vec<ArchiveFormat>,
    ) -> Self {
        Self {
            categories,
            archive_formats,
        }
    }

    /// Replace the rule for one category.
    pub fn with_rule(mut self, category: ResourceCategory, rule: CategoryRule) -> Self {
        self.categories.insert(category, rule);
        self
    }

    /// Byte ceiling for the category. A category missing from the table falls
    /// back to the generic File ceiling.
    pub fn ceiling(&self, category: ResourceCategory) -> u64 {
        self.categories
            .get(&category)
            .or_else(|| self.categories.get(&ResourceCategory::File))
            .map(|rule| rule.max_bytes)
            .unwrap_or(DEFAULT_MAX_FILE_SIZE_MB * MB)
    }

    pub fn archive_formats(&self) -> &[ArchiveFormat] {
        &self.archive_formats
    }

    pub fn check_size(&self, category: ResourceCategory, size: u64) -> Result<(), AppError> {
        let max = self.ceiling(category);
        if size > max {
            return Err(AppError::PayloadTooLarge(format!(
                "{} size {} bytes exceeds maximum of {} bytes",
                category, size, max
            )));
        }
        Ok(())
    }

    /// Classify an upload and check it against its category ceiling.
    pub fn check_upload(
        &self,
        content_type: &str,
        file_name: &str,
        size: u64,
    ) -> Result<ResourceCategory, AppError> {
        let category = ResourceCategory::classify(content_type, file_name);
        self.check_size(category, size)?;
        Ok(category)
    }

    /// Accept only formats that are both whitelisted and decodable.
    pub fn check_archive_format(&self, format: ArchiveFormat) -> Result<(), AppError> {
        if !format.is_supported() || !self.archive_formats.contains(&format) {
            return Err(AppError::UnsupportedFormat(format!(
                "Archive format '{}' is not supported. Allowed: {}",
                format,
                self.archive_formats
                    .iter()
                    .map(|f| f.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        }
        Ok(())
    }
}
