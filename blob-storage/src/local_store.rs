use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::block::{BlockId, BlockList};
use crate::chunks::content_md5;
use crate::errors::{RemoteError, StorageError};
use crate::store::{BlobProperties, BlobService, RemoteResult, StageOptions};

/// Credential key naming the directory blobs are kept under.
pub const STORAGE_ROOT_KEY: &str = "storage_root";

const STAGING_DIR: &str = ".staging";
const COMMIT_FILE: &str = ".commit";
const CONTENT_TYPE: &str = "application/octet-stream";

fn is_plain(path: &Path) -> bool {
    path.components().next().is_some()
        && path.components().all(|c| matches!(c, Component::Normal(_)))
}

/// A `BlobService` that keeps blobs on the local filesystem.
///
/// Committed blobs live at `<root>/<container>/<path>`. Staged blocks are
/// written under `<root>/.staging/<container>/<encoded path>/` and are only
/// assembled into the blob on commit, which replaces it with a rename.
#[derive(Clone, Debug)]
pub struct LocalFileBlobService {
    root: PathBuf,
    reject_empty_commits: bool,
}

impl LocalFileBlobService {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            reject_empty_commits: false,
        }
    }

    /// Builds the service from a credential map, as handed over in `StorageConfig`.
    pub fn connect(credentials: &BTreeMap<String, String>) -> Result<Self, StorageError> {
        let root = credentials.get(STORAGE_ROOT_KEY).ok_or_else(|| {
            StorageError::Config(format!("missing credential {}", STORAGE_ROOT_KEY))
        })?;
        Ok(Self::new(root))
    }

    /// Refuse to commit an empty block list instead of creating an empty blob.
    pub fn reject_empty_commits(mut self, reject: bool) -> Self {
        self.reject_empty_commits = reject;
        self
    }

    /// Resolves `container/path` under the root. Every component of both must
    /// be a plain name, and the container a single one.
    fn object_path(&self, container: &str, path: &str) -> RemoteResult<PathBuf> {
        let container_dir = Path::new(container);
        let relative = Path::new(path);
        let valid = is_plain(relative)
            && is_plain(container_dir)
            && container_dir.components().count() == 1;
        if !valid {
            return Err(RemoteError::Rejected(format!(
                "invalid blob path {}/{}",
                container, path
            )));
        }
        Ok(self.root.join(container_dir).join(relative))
    }

    fn staging_path(&self, container: &str, path: &str) -> PathBuf {
        let encoded = utf8_percent_encode(path, NON_ALPHANUMERIC).to_string();
        self.root.join(STAGING_DIR).join(container).join(encoded)
    }

    /// Concatenates the listed staged blocks into `assembled`, in order.
    async fn assemble(dir: &Path, assembled: &Path, blocks: &BlockList) -> RemoteResult<()> {
        let mut out = fs::File::create(assembled).await?;
        for id in blocks.ids() {
            let block = match fs::read(dir.join(&id)).await {
                Ok(block) => block,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    return Err(RemoteError::InvalidBlockList(id))
                }
                Err(e) => return Err(e.into()),
            };
            out.write_all(&block).await?;
        }
        out.sync_all().await?;
        Ok(())
    }

    fn not_found(container: &str, path: &str) -> RemoteError {
        RemoteError::NotFound {
            container: container.to_string(),
            path: path.to_string(),
        }
    }
}

#[async_trait]
impl BlobService for LocalFileBlobService {
    async fn stage_block(
        &self,
        container: &str,
        path: &str,
        block_id: &BlockId,
        data: Vec<u8>,
        options: StageOptions,
    ) -> RemoteResult<()> {
        self.object_path(container, path)?;
        let actual = content_md5(&data);
        if actual != options.content_md5 {
            return Err(RemoteError::ChecksumMismatch {
                block_id: block_id.to_string(),
                expected: options.content_md5,
                actual,
            });
        }

        let dir = self.staging_path(container, path);
        let block_path = dir.join(block_id.to_string());
        let write = async {
            fs::create_dir_all(&dir).await?;
            fs::write(&block_path, &data).await
        };
        match tokio::time::timeout(options.timeout, write).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(RemoteError::Timeout(options.timeout)),
        }
    }

    async fn commit_blocks(
        &self,
        container: &str,
        path: &str,
        blocks: &BlockList,
    ) -> RemoteResult<()> {
        let object = self.object_path(container, path)?;
        if blocks.is_empty() && self.reject_empty_commits {
            return Err(RemoteError::Rejected("block list is empty".to_string()));
        }

        let dir = self.staging_path(container, path);
        fs::create_dir_all(&dir).await?;
        let assembled = dir.join(COMMIT_FILE);
        let published = async {
            Self::assemble(&dir, &assembled, blocks).await?;
            if let Some(parent) = object.parent() {
                fs::create_dir_all(parent).await?;
            }
            fs::rename(&assembled, &object).await?;
            Ok::<(), RemoteError>(())
        };
        if let Err(err) = published.await {
            if let Err(e) = fs::remove_file(&assembled).await {
                if e.kind() != ErrorKind::NotFound {
                    tracing::warn!("failed to remove {}: {}", assembled.display(), e);
                }
            }
            return Err(err);
        }

        // The blob is visible from here on; staging leftovers do not fail the commit.
        if let Err(e) = fs::remove_dir_all(&dir).await {
            tracing::warn!("failed to clean staging for {}/{}: {}", container, path, e);
        }
        Ok(())
    }

    async fn get_blob(
        &self,
        container: &str,
        path: &str,
    ) -> RemoteResult<(BlobProperties, Vec<u8>)> {
        let object = self.object_path(container, path)?;
        match fs::read(&object).await {
            Ok(content) => {
                let properties = BlobProperties {
                    content_type: Some(CONTENT_TYPE.to_string()),
                    content_length: content.len() as u64,
                };
                Ok((properties, content))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Self::not_found(container, path)),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_blob(&self, container: &str, path: &str) -> RemoteResult<()> {
        let object = self.object_path(container, path)?;
        match fs::remove_file(&object).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Self::not_found(container, path)),
            Err(e) => Err(e.into()),
        }
    }

    fn resolve_uri(&self, container_and_path: &str) -> String {
        let full = self.root.join(container_and_path);
        match url::Url::from_file_path(&full) {
            Ok(url) => url.to_string(),
            Err(()) => format!("file://{}", full.display()),
        }
    }
}
