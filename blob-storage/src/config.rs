use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::chunks::DEFAULT_CHUNK_SIZE;
use crate::errors::{Result, StorageError};

/// Stage calls are given five minutes by default.
pub const DEFAULT_STAGE_TIMEOUT_SECS: u64 = 300;

/// Settings for one storage backend.
///
/// `credentials` is opaque to this crate and is handed verbatim to the
/// `BlobService` when it is constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    pub container: String,

    /// Static host that serves blobs directly, e.g. a CDN.
    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub credentials: BTreeMap<String, String>,

    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_stage_timeout_secs")]
    pub stage_timeout_secs: u64,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_stage_timeout_secs() -> u64 {
    DEFAULT_STAGE_TIMEOUT_SECS
}

impl StorageConfig {
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            host: None,
            credentials: BTreeMap::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            stage_timeout_secs: DEFAULT_STAGE_TIMEOUT_SECS,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_credential(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.credentials.insert(key.into(), value.into());
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: StorageConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.container.trim().is_empty() {
            return Err(StorageError::Config("container must not be empty".to_string()));
        }
        if self.chunk_size == 0 {
            return Err(StorageError::InvalidChunkSize);
        }
        if self.stage_timeout_secs == 0 {
            return Err(StorageError::Config("stage timeout must be positive".to_string()));
        }
        Ok(())
    }

    pub fn stage_timeout(&self) -> Duration {
        Duration::from_secs(self.stage_timeout_secs)
    }
}
