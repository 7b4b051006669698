use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncRead;

use crate::block::BlockList;
use crate::chunks::{content_md5, ChunkReader, DEFAULT_CHUNK_SIZE};
use crate::config::DEFAULT_STAGE_TIMEOUT_SECS;
use crate::errors::{Result, StorageError};
use crate::store::{BlobService, StageOptions};

/// Uploads a byte source as a sequence of staged blocks followed by a single
/// commit of the ordered block list.
///
/// Readers of the remote blob only ever see the previous version or the fully
/// committed new one. Blocks staged before a failure are left uncommitted for
/// the service to garbage-collect.
pub struct BlockUploader {
    service: Arc<dyn BlobService>,
    container: String,
    path: String,
    chunk_size: usize,
    stage_timeout: Duration,
}

/// State of one `store` call. Never outlives it.
struct UploadSession<'a> {
    container: &'a str,
    path: &'a str,
    block_list: BlockList,
}

impl BlockUploader {
    pub fn new(
        service: Arc<dyn BlobService>,
        container: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            service,
            container: container.into(),
            path: path.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            stage_timeout: Duration::from_secs(DEFAULT_STAGE_TIMEOUT_SECS),
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(StorageError::InvalidChunkSize);
        }
        self.chunk_size = chunk_size;
        Ok(self)
    }

    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = timeout;
        self
    }

    /// Stages every chunk of `source` in order, then commits them.
    ///
    /// An empty source commits an empty block list; whether that produces an
    /// empty blob is up to the service.
    pub async fn store<R: AsyncRead + Unpin>(&self, source: R) -> Result<BlockList> {
        let mut session = UploadSession {
            container: &self.container,
            path: &self.path,
            block_list: BlockList::new(),
        };
        let mut chunks = ChunkReader::new(source, self.chunk_size);

        while let Some(chunk) = chunks.next_chunk().await? {
            let block_id = session.block_list.next_block()?;
            let options = StageOptions {
                content_md5: content_md5(&chunk),
                timeout: self.stage_timeout,
            };
            tracing::info!(
                "staging block {} of {}/{} ({} bytes)",
                block_id,
                session.container,
                session.path,
                chunk.len()
            );
            if let Err(source) = self
                .service
                .stage_block(session.container, session.path, &block_id, chunk, options)
                .await
            {
                tracing::error!(
                    "failed to stage block {} of {}/{}: {}",
                    block_id,
                    session.container,
                    session.path,
                    source
                );
                return Err(StorageError::ChunkTransfer { block_id, source });
            }
        }

        let blocks = session.block_list.len();
        tracing::info!(
            "committing {} blocks to {}/{}",
            blocks,
            session.container,
            session.path
        );
        self.service
            .commit_blocks(session.container, session.path, &session.block_list)
            .await
            .map_err(|source| {
                tracing::error!(
                    "failed to commit {}/{}: {}",
                    session.container,
                    session.path,
                    source
                );
                StorageError::Commit { blocks, source }
            })?;

        session.block_list.mark_committed();
        Ok(session.block_list)
    }
}
