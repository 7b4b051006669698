use std::sync::Arc;

use tokio::io::AsyncRead;

use crate::config::StorageConfig;
use crate::errors::Result;
use crate::handle::BlobHandle;
use crate::local_store::LocalFileBlobService;
use crate::store::BlobService;

/// Entry point for callers: hands out handles bound to one container, all
/// sharing a single service connection.
#[derive(Clone)]
pub struct BlobStorage {
    config: StorageConfig,
    service: Arc<dyn BlobService>,
}

impl BlobStorage {
    pub fn new(config: StorageConfig, service: Arc<dyn BlobService>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, service })
    }

    /// Storage backed by [`LocalFileBlobService`], built from `config.credentials`.
    pub fn local(config: StorageConfig) -> Result<Self> {
        let service = LocalFileBlobService::connect(&config.credentials)?;
        Self::new(config, Arc::new(service))
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Uploads `source` to `path` and returns a handle to the new blob.
    pub async fn store<R: AsyncRead + Unpin>(&self, path: &str, source: R) -> Result<BlobHandle> {
        let handle = self.retrieve(path);
        let blocks = handle.store(source).await?;
        tracing::info!("stored {}/{} in {} blocks", self.config.container, path, blocks.len());
        Ok(handle)
    }

    /// Handle for an existing blob. Does not touch the service.
    pub fn retrieve(&self, path: &str) -> BlobHandle {
        BlobHandle::new(self.service.clone(), &self.config, path)
    }
}
