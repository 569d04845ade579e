use scout_core::evidence::{validate_file_name, Evidence};
use scout_ports::outbound::{ArtifactStore, EvidenceRepository};
use scout_ports::types::Page;

use crate::error::AppError;

pub struct EvidenceService<V, F>
where
    V: EvidenceRepository,
    F: ArtifactStore,
{
    evidences: V,
    files: F,
}

impl<V, F> EvidenceService<V, F>
where
    V: EvidenceRepository,
    F: ArtifactStore,
{
    pub fn new(evidences: V, files: F) -> Self {
        Self { evidences, files }
    }

    /// Newest captures first.
    pub async fn list(&self, page: Page) -> Result<Vec<Evidence>, AppError> {
        Ok(self.evidences.list(page).await?)
    }

    /// Bytes of a stored capture. Only plain names are served.
    pub async fn file(&self, name: &str) -> Result<Vec<u8>, AppError> {
        validate_file_name(name)?;
        self.files
            .get(name)
            .await?
            .ok_or(AppError::NotFound("evidence file"))
    }
}
