//! Input validation helpers shared by the issuer, finalizer and HTTP layer.

use crate::error::AppError;

pub const MAX_GROUP_ID_LENGTH: usize = 128;

fn is_key_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}

/// Group ids become a path segment of every object key.
pub fn validate_group_id(group_id: &str) -> Result<(), AppError> {
    if group_id.is_empty() || group_id.len() > MAX_GROUP_ID_LENGTH {
        return Err(AppError::Validation(format!(
            "groupId must be between 1 and {} characters",
            MAX_GROUP_ID_LENGTH
        )));
    }
    if group_id == "." || group_id == ".." {
        return Err(AppError::Validation(
            "groupId cannot be a relative path segment".to_string(),
        ));
    }
    if !group_id.chars().all(is_key_safe) {
        return Err(AppError::Validation(format!(
            "groupId '{}' may only contain letters, digits, '.', '_' and '-'",
            group_id
        )));
    }
    Ok(())
}

/// Strip every character outside `[A-Za-z0-9._-]`.
///
/// Returns `"file"` when nothing survives so keys never end in a bare separator.
pub fn sanitize_file_name(file_name: &str) -> String {
    let sanitized: String = file_name.chars().filter(|c| is_key_safe(*c)).collect();
    let trimmed = sanitized.trim_start_matches('.');
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.to_string()
    }
}
