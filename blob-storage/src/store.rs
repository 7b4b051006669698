use std::time::Duration;

use async_trait::async_trait;

use crate::block::{BlockId, BlockList};
use crate::errors::RemoteError;

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Per-block request options sent with every stage call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOptions {
    /// Base64 MD5 of the block bytes.
    pub content_md5: String,
    pub timeout: Duration,
}

/// Properties returned alongside a blob's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobProperties {
    pub content_type: Option<String>,
    pub content_length: u64,
}

/// Remote block blob service: stage blocks, commit block lists, read and
/// delete committed blobs.
#[async_trait]
pub trait BlobService: Send + Sync {
    /// Uploads one block without making it visible to readers.
    async fn stage_block(
        &self,
        container: &str,
        path: &str,
        block_id: &BlockId,
        data: Vec<u8>,
        options: StageOptions,
    ) -> RemoteResult<()>;

    /// Atomically replaces the blob at `path` with the listed blocks, in order.
    async fn commit_blocks(
        &self,
        container: &str,
        path: &str,
        blocks: &BlockList,
    ) -> RemoteResult<()>;

    /// Fetches properties and content. A missing blob is `RemoteError::NotFound`.
    async fn get_blob(
        &self,
        container: &str,
        path: &str,
    ) -> RemoteResult<(BlobProperties, Vec<u8>)>;

    async fn delete_blob(&self, container: &str, path: &str) -> RemoteResult<()>;

    /// Fully qualified access URI for `container/path`. Never touches the network.
    fn resolve_uri(&self, container_and_path: &str) -> String;
}
