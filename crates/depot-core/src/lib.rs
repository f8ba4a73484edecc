//! Depot Core Library
//!
//! This crate provides the domain models, error taxonomy, configuration and
//! per-category upload rules shared by the depot server and client crates.

pub mod config;
pub mod error;
pub mod models;
pub mod rules;
pub mod storage_types;
pub mod validation;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use rules::{CategoryRule, UploadRules};
pub use storage_types::StorageBackend;
// Note: Storage, StorageError, StorageResult live in depot-storage
