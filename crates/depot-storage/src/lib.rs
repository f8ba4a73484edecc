//! Depot Storage Library
//!
//! This crate provides the storage abstraction and its S3 and local filesystem
//! implementations.
//!
//! # Object key format
//!
//! Every backend stores objects under the same key layout:
//!
//! `<category prefix>/<groupId>/<timestamp>-<sanitizedFileName>`
//!
//! e.g. `images/g1/1700000000000-demo.png`. Keys must not contain `..` or a
//! leading `/`. Key generation is centralized in the `keys` module so all
//! backends and the issuer stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod signing;
pub mod traits;

// Re-export commonly used types
pub use depot_core::StorageBackend;
pub use factory::create_storage;
pub use keys::{generate_object_key, parse_object_key, ObjectKeyParts};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use signing::{SignatureError, UrlSigner};
pub use traits::{Storage, StorageError, StorageResult};
