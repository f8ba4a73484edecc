use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Catalog-visible record for one object that landed in storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRecord {
    pub id: Uuid,
    pub group_id: String,
    pub name: String,
    pub object_key: String,
    pub byte_size: u64,
    pub mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for the catalog; ids and timestamps are assigned on write.
#[derive(Debug, Clone)]
pub struct NewObjectRecord {
    pub group_id: String,
    pub name: String,
    pub object_key: String,
    pub byte_size: u64,
    pub mime_type: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub alt: Option<String>,
}

/// Request to register an uploaded object
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeRequest {
    #[validate(length(min = 1, max = 128, message = "groupId must be between 1 and 128 characters"))]
    pub group_id: String,
    /// Display name, usually the original file name
    #[validate(length(min = 1, max = 255, message = "name must be between 1 and 255 characters"))]
    pub name: String,
    /// Key returned by the presign call
    #[validate(length(min = 1, max = 1024, message = "objectKey must be between 1 and 1024 characters"))]
    pub object_key: String,
    /// Declared size in bytes; becomes the record's byteSize
    #[validate(range(min = 1, message = "fileSize must be at least 1 byte"))]
    pub file_size: u64,
    #[validate(length(min = 1, max = 255, message = "mimeType must be between 1 and 255 characters"))]
    pub mime_type: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    #[validate(length(max = 1000, message = "alt must be at most 1000 characters"))]
    pub alt: Option<String>,
}

impl FinalizeRequest {
    pub fn into_new_record(self) -> NewObjectRecord {
        NewObjectRecord {
            group_id: self.group_id,
            name: self.name,
            object_key: self.object_key,
            byte_size: self.file_size,
            mime_type: self.mime_type,
            width: self.width,
            height: self.height,
            alt: self.alt,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finalize_request_camel_case() {
        let json = serde_json::json!({
            "groupId": "g1",
            "name": "demo.png",
            "objectKey": "images/g1/1700000000000-demo.png",
            "fileSize": 2097152,
            "mimeType": "image/png",
            "width": 640,
            "height": 480
        });
        let request: FinalizeRequest = serde_json::from_value(json).unwrap();
        assert!(request.validate().is_ok());
        let record = request.into_new_record();
        assert_eq!(record.byte_size, 2_097_152);
        assert_eq!(record.width, Some(640));
        assert_eq!(record.alt, None);
    }

    #[test]
    fn test_finalize_request_rejects_zero_size() {
        let request = FinalizeRequest {
            group_id: "g1".to_string(),
            name: "empty.txt".to_string(),
            object_key: "files/g1/1-empty.txt".to_string(),
            file_size: 0,
            mime_type: "text/plain".to_string(),
            width: None,
            height: None,
            alt: None,
        };
        assert!(request.validate().is_err());
    }
}
