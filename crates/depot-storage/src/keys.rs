//! Shared object key generation.
//!
//! Key format: `<category prefix>/<groupId>/<timestamp>-<sanitizedFileName>`.

use depot_core::models::ResourceCategory;
use depot_core::validation::sanitize_file_name;

/// Generate the object key for one upload.
///
/// The caller supplies a timestamp that is unique per issuance; the file name
/// is reduced to `[A-Za-z0-9._-]` so the key is always URL and path safe.
pub fn generate_object_key(
    category: ResourceCategory,
    group_id: &str,
    timestamp_ms: i64,
    file_name: &str,
) -> String {
    format!(
        "{}/{}/{}-{}",
        category.key_prefix(),
        group_id,
        timestamp_ms,
        sanitize_file_name(file_name)
    )
}

/// Decomposed object key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectKeyParts<'a> {
    pub category: ResourceCategory,
    pub group_id: &'a str,
    pub file_name: &'a str,
}

/// Split a key produced by [`generate_object_key`]. Returns `None` for keys
/// that do not follow the layout.
pub fn parse_object_key(key: &str) -> Option<ObjectKeyParts<'_>> {
    let mut segments = key.splitn(3, '/');
    let category = ResourceCategory::from_key_prefix(segments.next()?)?;
    let group_id = segments.next().filter(|g| !g.is_empty())?;
    let leaf = segments.next()?;
    if leaf.contains('/') {
        return None;
    }
    let (timestamp, file_name) = leaf.split_once('-')?;
    if timestamp.is_empty() || !timestamp.bytes().all(|b| b.is_ascii_digit()) || file_name.is_empty()
    {
        return None;
    }
    Some(ObjectKeyParts {
        category,
        group_id,
        file_name,
    })
}

/// Reject keys that could escape a backend's namespace.
pub fn is_safe_key(key: &str) -> bool {
    !key.is_empty()
        && !key.starts_with('/')
        && !key.split('/').any(|segment| segment.is_empty() || segment == "." || segment == "..")
}
