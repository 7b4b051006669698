use std::time::Duration;
use thiserror::Error;

use crate::block::BlockId;

pub type Result<T> = std::result::Result<T, StorageError>;

/// Failures reported by a `BlobService` implementation.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("blob {container}/{path} not found")]
    NotFound { container: String, path: String },

    #[error("content checksum mismatch for block {block_id}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        block_id: String,
        expected: String,
        actual: String,
    },

    #[error("block list references unstaged block {0}")]
    InvalidBlockList(String),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error")]
    Io(#[from] std::io::Error),
}

impl RemoteError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::NotFound { .. })
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,

    #[error("upload exceeds the maximum of {max} blocks")]
    TooManyBlocks { max: u32 },

    #[error("failed to read from byte source")]
    Io(#[from] std::io::Error),

    #[error("failed to stage block {block_id}")]
    ChunkTransfer {
        block_id: BlockId,
        #[source]
        source: RemoteError,
    },

    #[error("failed to commit block list of {blocks} blocks")]
    Commit {
        blocks: usize,
        #[source]
        source: RemoteError,
    },

    #[error("failed to delete blob {path}")]
    Delete {
        path: String,
        #[source]
        source: RemoteError,
    },

    #[error("invalid storage configuration: {0}")]
    Config(String),

    #[error("failed to parse storage configuration")]
    ConfigParse(#[from] serde_json::Error),
}
