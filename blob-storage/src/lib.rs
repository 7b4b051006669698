//! Chunked uploads to block blob stores.
//!
//! A byte source is split into fixed-size blocks, each block is staged with an
//! MD5 content checksum, and the blob is then committed from the ordered block
//! list in a single call. [`BlobHandle`] reads a stored blob back, caching its
//! properties and content after the first fetch.

pub mod block;
pub mod chunks;
pub mod config;
pub mod errors;
pub mod handle;
pub mod local_store;
pub mod storage;
pub mod store;
pub mod uploader;

#[cfg(test)]
mod testing;

pub use block::{BlockDescriptor, BlockId, BlockList, BlockStatus, MAX_BLOCKS};
pub use chunks::{content_md5, ChunkReader, DEFAULT_CHUNK_SIZE};
pub use config::StorageConfig;
pub use errors::{RemoteError, StorageError};
pub use handle::{BlobHandle, FetchFailure, FetchState};
pub use local_store::LocalFileBlobService;
pub use storage::BlobStorage;
pub use store::{BlobProperties, BlobService, StageOptions};
pub use uploader::BlockUploader;
