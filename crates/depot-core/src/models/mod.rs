pub mod archive;
pub mod category;
pub mod object_record;
pub mod presigned;
pub mod upload_task;

pub use archive::{
    ArchiveEntry, ArchiveFormat, EntryCategory, IngestFailure, IngestSummary, NewRepositoryFile,
    RepositoryFile,
};
pub use category::ResourceCategory;
pub use object_record::{FinalizeRequest, NewObjectRecord, ObjectRecord};
pub use presigned::{
    BatchSignedUrlRequest, BatchSignedUrlResponse, IssuePutRequest, IssuePutResponse,
    PresignMethod, PresignedUrl, SignedUrlRequest, SignedUrlResponse,
};
pub use upload_task::{TaskId, UploadStatus, UploadTask};
