//! In-memory `BlobService` that records every call, for protocol tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::block::{BlockId, BlockList};
use crate::errors::RemoteError;
use crate::store::{BlobProperties, BlobService, RemoteResult, StageOptions};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Stage {
        path: String,
        block_id: String,
        len: usize,
        content_md5: String,
    },
    Commit {
        path: String,
        block_ids: Vec<String>,
    },
}

#[derive(Default)]
pub struct RecordingBlobService {
    pub calls: Mutex<Vec<Call>>,
    pub(crate) staged: Mutex<HashMap<(String, String), Vec<u8>>>,
    pub(crate) blobs: Mutex<HashMap<String, Vec<u8>>>,
    pub fail_stage_at: Option<u32>,
    pub fail_commit: bool,
    pub reject_empty_commits: bool,
    pub fail_delete: bool,
    pub unavailable: bool,
    pub get_count: AtomicUsize,
    pub resolve_count: AtomicUsize,
}

impl RecordingBlobService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blob(self, path: &str, content: &[u8]) -> Self {
        self.blobs.lock().unwrap().insert(path.to_string(), content.to_vec());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn commits(&self) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Commit { block_ids, .. } => Some(block_ids),
                _ => None,
            })
            .collect()
    }

    pub fn staged_bytes(&self, path: &str, block_id: &str) -> Option<Vec<u8>> {
        self.staged
            .lock()
            .unwrap()
            .get(&(path.to_string(), block_id.to_string()))
            .cloned()
    }

    pub fn blob(&self, path: &str) -> Option<Vec<u8>> {
        self.blobs.lock().unwrap().get(path).cloned()
    }

    pub fn get_calls(&self) -> usize {
        self.get_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobService for RecordingBlobService {
    async fn stage_block(
        &self,
        _container: &str,
        path: &str,
        block_id: &BlockId,
        data: Vec<u8>,
        options: StageOptions,
    ) -> RemoteResult<()> {
        self.calls.lock().unwrap().push(Call::Stage {
            path: path.to_string(),
            block_id: block_id.to_string(),
            len: data.len(),
            content_md5: options.content_md5,
        });
        if self.fail_stage_at == Some(block_id.sequence()) {
            return Err(RemoteError::Rejected("injected stage failure".to_string()));
        }
        self.staged
            .lock()
            .unwrap()
            .insert((path.to_string(), block_id.to_string()), data);
        Ok(())
    }

    async fn commit_blocks(
        &self,
        _container: &str,
        path: &str,
        blocks: &BlockList,
    ) -> RemoteResult<()> {
        self.calls.lock().unwrap().push(Call::Commit {
            path: path.to_string(),
            block_ids: blocks.ids(),
        });
        if self.fail_commit {
            return Err(RemoteError::Rejected("injected commit failure".to_string()));
        }
        if self.reject_empty_commits && blocks.is_empty() {
            return Err(RemoteError::Rejected("empty block list".to_string()));
        }
        let staged = self.staged.lock().unwrap();
        let mut content = Vec::new();
        for id in blocks.ids() {
            let block = staged
                .get(&(path.to_string(), id.clone()))
                .ok_or(RemoteError::InvalidBlockList(id))?;
            content.extend_from_slice(block);
        }
        self.blobs.lock().unwrap().insert(path.to_string(), content);
        Ok(())
    }

    async fn get_blob(
        &self,
        container: &str,
        path: &str,
    ) -> RemoteResult<(BlobProperties, Vec<u8>)> {
        self.get_count.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(RemoteError::Timeout(std::time::Duration::from_secs(1)));
        }
        let content = self.blob(path).ok_or_else(|| RemoteError::NotFound {
            container: container.to_string(),
            path: path.to_string(),
        })?;
        let properties = BlobProperties {
            content_type: Some("image/png".to_string()),
            content_length: content.len() as u64,
        };
        Ok((properties, content))
    }

    async fn delete_blob(&self, container: &str, path: &str) -> RemoteResult<()> {
        if self.fail_delete {
            return Err(RemoteError::Rejected("permission denied".to_string()));
        }
        match self.blobs.lock().unwrap().remove(path) {
            Some(_) => Ok(()),
            None => Err(RemoteError::NotFound {
                container: container.to_string(),
                path: path.to_string(),
            }),
        }
    }

    fn resolve_uri(&self, container_and_path: &str) -> String {
        self.resolve_count.fetch_add(1, Ordering::SeqCst);
        format!("https://account.blob.example/{}", container_and_path)
    }
}
