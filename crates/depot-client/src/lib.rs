//! Client-side half of the depot ingestion pipeline.
//!
//! - [`ApiClient`]: HTTP client for the depot API with bearer auth.
//! - [`UploadTaskStore`]: process-wide registry of upload tasks, observable
//!   through a broadcast channel.
//! - [`UploadOrchestrator`]: drives each task through URL issuance, direct
//!   transfer to object storage and finalization.
//! - [`SignedUrlCache`]: caches signed GET URLs and re-resolves them when a
//!   load fails.

pub mod api;
pub mod dimensions;
pub mod error;
pub mod orchestrator;
pub mod store;
pub mod transport;
pub mod url_cache;

pub use api::{api_prefix, ApiClient, Auth, SignedUrlApi, UploadApi};
pub use error::ClientError;
pub use orchestrator::{BatchHandle, UploadFile, UploadOrchestrator, UploadOutcome};
pub use store::{FileDescriptor, TaskEvent, UploadTaskStore};
pub use transport::{HttpTransport, ObjectTransport, TransferEvent, TransferStream};
pub use url_cache::SignedUrlCache;

pub use depot_core::models::{ObjectRecord, TaskId, UploadStatus, UploadTask};
