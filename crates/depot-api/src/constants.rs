//! API constants
//!
//! Every JSON route lives under [`API_PREFIX`]. Signed object URLs, health and
//! the OpenAPI document are served outside the versioned prefix.

/// API version segment
pub const API_VERSION: &str = "v0";

/// Versioned prefix for all JSON routes
pub const API_PREFIX: &str = "/api/v0";

/// Path of the generated OpenAPI document
pub const OPENAPI_PATH: &str = "/api-docs/openapi.json";

/// Multipart field carrying the archive bytes
pub const ARCHIVE_FILE_FIELD: &str = "file";

/// Multipart field naming the target repository
pub const ARCHIVE_REPOSITORY_FIELD: &str = "repositoryId";
