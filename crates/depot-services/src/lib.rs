//! Depot Services Layer
//!
//! Server-side halves of the ingestion pipeline: presigned URL issuance,
//! object record finalization, cached listings, signed URL resolution and
//! archive ingestion. Handlers in depot-api stay thin and delegate here.

pub mod access;
pub mod archive;
pub mod finalizer;
pub mod issuer;
pub mod listing;
pub mod resolver;

pub use access::{create_access_policy, AccessPolicy, AllowAll, Caller, StaticTokens};
pub use archive::ArchiveIngestionService;
pub use finalizer::ObjectRecordFinalizer;
pub use issuer::{MonotonicClock, PresignedUrlIssuer};
pub use listing::ListingService;
pub use resolver::SignedUrlResolver;
