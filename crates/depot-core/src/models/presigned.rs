use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};
use utoipa::ToSchema;
use validator::Validate;

/// HTTP verb a presigned URL authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum PresignMethod {
    Put,
    Get,
}

impl PresignMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PresignMethod::Put => "PUT",
            PresignMethod::Get => "GET",
        }
    }
}

impl Display for PresignMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// A short-lived URL scoped to one key and one verb. Regenerated per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresignedUrl {
    pub object_key: String,
    pub method: PresignMethod,
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// Request to generate a presigned PUT URL for direct upload
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct IssuePutRequest {
    #[validate(length(min = 1, max = 128, message = "groupId must be between 1 and 128 characters"))]
    pub group_id: String,
    /// Original filename
    #[validate(length(min = 1, max = 255, message = "fileName must be between 1 and 255 characters"))]
    pub file_name: String,
    /// Content type (MIME type)
    #[validate(length(min = 1, max = 255, message = "fileType must be between 1 and 255 characters"))]
    pub file_type: String,
    /// File size in bytes
    #[validate(range(min = 1, message = "fileSize must be at least 1 byte"))]
    pub file_size: u64,
}

/// Response containing the presigned URL and the key the object will live under
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssuePutResponse {
    pub upload_url: String,
    pub object_key: String,
    pub expires_at: DateTime<Utc>,
}

impl From<PresignedUrl> for IssuePutResponse {
    fn from(presigned: PresignedUrl) -> Self {
        Self {
            upload_url: presigned.url,
            object_key: presigned.object_key,
            expires_at: presigned.expires_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignedUrlRequest {
    #[validate(length(min = 1, max = 1024, message = "objectKey must be between 1 and 1024 characters"))]
    pub object_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignedUrlResponse {
    pub signed_url: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchSignedUrlRequest {
    pub object_keys: Vec<String>,
}

/// Batch resolution result. Every distinct requested key appears either in
/// `signed_urls` or in `errors`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchSignedUrlResponse {
    pub signed_urls: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
    pub expires_at: DateTime<Utc>,
}

impl BatchSignedUrlResponse {
    pub fn failed_keys(&self) -> &[String] {
        self.errors.as_deref().unwrap_or(&[])
    }
}
