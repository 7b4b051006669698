use std::sync::Arc;
use std::time::Duration;

use percent_encoding::percent_decode_str;
use tokio::io::AsyncRead;
use tokio::sync::OnceCell;

use crate::block::BlockList;
use crate::config::StorageConfig;
use crate::errors::{RemoteError, Result, StorageError};
use crate::store::{BlobProperties, BlobService};
use crate::uploader::BlockUploader;

/// Why a fetch left the handle without content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    /// The service reported that no blob exists at the path.
    NotFound,
    /// Any other failure; the blob may or may not exist.
    Unavailable(String),
}

/// Outcome of the single fetch a handle performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchState {
    Populated {
        properties: BlobProperties,
        content: Vec<u8>,
    },
    Absent(FetchFailure),
}

impl From<RemoteError> for FetchFailure {
    fn from(err: RemoteError) -> Self {
        if err.is_not_found() {
            FetchFailure::NotFound
        } else {
            FetchFailure::Unavailable(err.to_string())
        }
    }
}

/// A blob at a fixed path, whether or not it currently exists.
///
/// Properties and content are fetched together on first access and kept for
/// the life of the handle. The cache is never refreshed, so a long-lived
/// handle can observe stale data if the blob is changed elsewhere. Fetch
/// errors do not propagate: they leave the handle in the
/// [`FetchState::Absent`] state, and accessors report a missing blob.
pub struct BlobHandle {
    service: Arc<dyn BlobService>,
    container: String,
    host: Option<String>,
    path: String,
    chunk_size: usize,
    stage_timeout: Duration,
    cache: OnceCell<FetchState>,
    content_type: Option<String>,
}

impl BlobHandle {
    pub fn new(
        service: Arc<dyn BlobService>,
        config: &StorageConfig,
        path: impl Into<String>,
    ) -> Self {
        Self {
            service,
            container: config.container.clone(),
            host: config.host.clone(),
            path: path.into(),
            chunk_size: config.chunk_size,
            stage_timeout: config.stage_timeout(),
            cache: OnceCell::new(),
            content_type: None,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    /// Uploads `source` to this handle's path in blocks.
    pub async fn store<R: AsyncRead + Unpin>(&self, source: R) -> Result<BlockList> {
        BlockUploader::new(self.service.clone(), self.container.as_str(), self.path.as_str())
            .with_chunk_size(self.chunk_size)?
            .with_stage_timeout(self.stage_timeout)
            .store(source)
            .await
    }

    /// Result of the one-time fetch, performing it if needed.
    pub async fn fetch_state(&self) -> &FetchState {
        self.cache
            .get_or_init(|| async {
                tracing::debug!("fetching blob {}/{}", self.container, self.path);
                match self.service.get_blob(&self.container, &self.path).await {
                    Ok((properties, content)) => FetchState::Populated { properties, content },
                    Err(err) => {
                        tracing::debug!(
                            "blob {}/{} unavailable: {}",
                            self.container,
                            self.path,
                            err
                        );
                        FetchState::Absent(err.into())
                    }
                }
            })
            .await
    }

    async fn properties(&self) -> Option<&BlobProperties> {
        match self.fetch_state().await {
            FetchState::Populated { properties, .. } => Some(properties),
            FetchState::Absent(_) => None,
        }
    }

    pub async fn read(&self) -> Option<&[u8]> {
        match self.fetch_state().await {
            FetchState::Populated { content, .. } => Some(content.as_slice()),
            FetchState::Absent(_) => None,
        }
    }

    pub async fn size(&self) -> Option<u64> {
        self.properties().await.map(|p| p.content_length)
    }

    /// Locally set content type if any, otherwise the stored one.
    pub async fn content_type(&self) -> Option<String> {
        if let Some(content_type) = &self.content_type {
            return Some(content_type.clone());
        }
        self.properties().await.and_then(|p| p.content_type.clone())
    }

    /// Overrides the content type reported by this handle. Not sent to the service.
    pub fn set_content_type(&mut self, content_type: impl Into<String>) {
        self.content_type = Some(content_type.into());
    }

    /// True iff the fetch found the blob.
    pub async fn exists(&self) -> bool {
        matches!(self.fetch_state().await, FetchState::Populated { .. })
    }

    pub fn url(&self) -> String {
        let container_and_path = format!("{}/{}", self.container, self.path);
        match &self.host {
            Some(host) => format!("{}/{}", host.trim_end_matches('/'), container_and_path),
            None => self.service.resolve_uri(&container_and_path),
        }
    }

    /// Last segment of the decoded url.
    pub fn filename(&self) -> String {
        let url = self.url();
        let decoded = percent_decode_str(&url).decode_utf8_lossy();
        decoded.rsplit('/').next().unwrap_or_default().to_string()
    }

    pub fn extension(&self) -> Option<&str> {
        self.path.rsplit_once('.').map(|(_, ext)| ext)
    }

    pub async fn try_delete(&self) -> Result<()> {
        self.service
            .delete_blob(&self.container, &self.path)
            .await
            .map_err(|source| StorageError::Delete {
                path: self.path.clone(),
                source,
            })
    }

    /// Deletes the blob, reporting only success. See [`BlobHandle::try_delete`] for the cause.
    pub async fn delete(&self) -> bool {
        match self.try_delete().await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!("delete of {}/{} failed: {:?}", self.container, self.path, err);
                false
            }
        }
    }
}
