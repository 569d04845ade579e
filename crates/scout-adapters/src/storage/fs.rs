use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use scout_core::evidence::{content_hash, validate_file_name};
use scout_ports::error::PortError;
use scout_ports::outbound::ArtifactStore;
use scout_ports::types::StoredArtifact;

fn storage(e: std::io::Error) -> PortError {
    PortError::Storage(e.to_string())
}

/// Content-addressed directory: every file is named after its SHA-256.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self, PortError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await.map_err(storage)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, name: &str) -> Result<PathBuf, PortError> {
        validate_file_name(name).map_err(|e| PortError::Storage(e.to_string()))?;
        Ok(self.root.join(name))
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn put(&self, bytes: &[u8], extension: &str) -> Result<StoredArtifact, PortError> {
        let file_hash = content_hash(bytes);
        let file_name = format!("{file_hash}{extension}");
        let path = self.path_of(&file_name)?;

        // same name means same content
        if !tokio::fs::try_exists(&path).await.map_err(storage)? {
            tokio::fs::write(&path, bytes).await.map_err(storage)?;
            debug!(file = %file_name, size = bytes.len(), "artifact stored");
        }
        Ok(StoredArtifact {
            file_name,
            file_hash,
            size: bytes.len() as u64,
        })
    }

    async fn get(&self, name: &str) -> Result<Option<Vec<u8>>, PortError> {
        let path = self.path_of(name)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage(e)),
        }
    }

    async fn remove(&self, name: &str) -> Result<bool, PortError> {
        let path = self.path_of(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(storage(e)),
        }
    }
}
