use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use uuid::Uuid;

pub type TaskId = Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Pending,
    Uploading,
    Succeeded,
    Failed,
}

impl UploadStatus {
    /// Succeeded and Failed never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadStatus::Succeeded | UploadStatus::Failed)
    }

    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Pending may start Uploading; any active task may finish.
    pub fn can_move_to(&self, next: UploadStatus) -> bool {
        match (self, next) {
            (UploadStatus::Pending, UploadStatus::Uploading) => true,
            (current, UploadStatus::Succeeded | UploadStatus::Failed) => current.is_active(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_moves_forward_only() {
        use UploadStatus::*;
        assert!(Pending.can_move_to(Uploading));
        assert!(Pending.can_move_to(Failed));
        assert!(Uploading.can_move_to(Succeeded));
        assert!(!Uploading.can_move_to(Pending));
        assert!(!Uploading.can_move_to(Uploading));
        assert!(!Pending.can_move_to(Pending));
        assert!(!Failed.can_move_to(Succeeded));
    }
}

impl Display for UploadStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            UploadStatus::Pending => write!(f, "pending"),
            UploadStatus::Uploading => write!(f, "uploading"),
            UploadStatus::Succeeded => write!(f, "succeeded"),
            UploadStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Client-side state of one file's upload lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UploadTask {
    pub id: TaskId,
    pub group_id: String,
    pub file_name: String,
    pub file_size: u64,
    pub object_key: Option<String>,
    pub status: UploadStatus,
    /// 0..=100
    pub progress: u8,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UploadTask {
    pub fn new(group_id: impl Into<String>, file_name: impl Into<String>, file_size: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            group_id: group_id.into(),
            file_name: file_name.into(),
            file_size,
            object_key: None,
            status: UploadStatus::Pending,
            progress: 0,
            error_message: None,
            created_at: Utc::now(),
        }
    }
}
