//! Depot catalog
//!
//! The catalog is the durable metadata store mapping object keys to
//! application-visible records. Each individual write is atomic; no
//! cross-request locking is assumed.

pub mod catalog;

pub use catalog::{create_catalog, Catalog, MemoryCatalog, PgCatalog, RecordInsert};
