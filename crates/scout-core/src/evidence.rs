use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::DomainError;
use crate::ids::{AlertId, EvidenceId};
use crate::vocabulary::define_vocabulary;

pub const SCREENSHOT: &str = "SCREENSHOT";
pub const ATTACHMENT: &str = "ATTACHMENT";
const PREVIEW_CHARS: usize = 500;

define_vocabulary!(
    /// SEALED evidence is frozen by a forensic report.
    EvidenceStatus, "evidence status" {
        Active => "ACTIVE",
        Sealed => "SEALED",
    }
);

/// Lowercase SHA-256 hex digest, the identity of stored content.
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Reject names that could escape the evidence directory.
pub fn validate_file_name(name: &str) -> Result<(), DomainError> {
    if name.is_empty() || name.contains("..") || name.contains('/') || name.contains('\\') {
        return Err(DomainError::invalid_field("file_name", "is not a plain file name"));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    id: EvidenceId,
    alert_id: AlertId,
    kind: String,
    file_path: String,
    file_hash: String,
    content_preview: Option<String>,
    metadata: serde_json::Value,
    status: EvidenceStatus,
    captured_at: DateTime<Utc>,
    sealed_at: Option<DateTime<Utc>>,
}

impl Evidence {
    pub fn new(
        alert_id: AlertId,
        kind: &str,
        file_path: String,
        file_hash: String,
        content_preview: Option<&str>,
        metadata: serde_json::Value,
        captured_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EvidenceId::new(),
            alert_id,
            kind: kind.to_string(),
            file_path,
            file_hash,
            content_preview: content_preview.map(|p| p.chars().take(PREVIEW_CHARS).collect()),
            metadata,
            status: EvidenceStatus::Active,
            captured_at,
            sealed_at: None,
        }
    }

    /// Freeze the evidence. Returns false when it was already sealed.
    pub fn seal(&mut self, now: DateTime<Utc>) -> bool {
        if self.status == EvidenceStatus::Sealed {
            return false;
        }
        self.status = EvidenceStatus::Sealed;
        self.sealed_at = Some(now);
        true
    }

    /// Name of the stored file, without any directory part.
    pub fn file_name(&self) -> &str {
        self.file_path
            .rsplit(|c| c == '/' || c == '\\')
            .next()
            .unwrap_or(&self.file_path)
    }

    pub fn id(&self) -> &EvidenceId {
        &self.id
    }

    pub fn alert_id(&self) -> &AlertId {
        &self.alert_id
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    pub fn file_hash(&self) -> &str {
        &self.file_hash
    }

    pub fn content_preview(&self) -> Option<&str> {
        self.content_preview.as_deref()
    }

    pub fn metadata(&self) -> &serde_json::Value {
        &self.metadata
    }

    pub fn status(&self) -> EvidenceStatus {
        self.status
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn sealed_at(&self) -> Option<DateTime<Utc>> {
        self.sealed_at
    }
}
