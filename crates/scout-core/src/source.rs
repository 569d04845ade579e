use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ids::{RunId, SourceId, UserId};
use crate::vocabulary::define_vocabulary;

pub const DEFAULT_FREQUENCY_MINUTES: u32 = 1440;
pub const DEFAULT_SOURCE_TYPE: &str = "WEB";
const MAX_LOG_CHARS: usize = 1000;

define_vocabulary!(
    /// Outcome of the most recent scan of a source.
    SourceStatus, "source status" {
        NeverRun => "NEVER_RUN",
        Clean => "CLEAN",
        Alert => "ALERT",
        Error => "ERROR",
    }
);

define_vocabulary!(
    RunStatus, "run status" {
        Pending => "PENDING",
        Running => "RUNNING",
        Completed => "COMPLETED",
        Failed => "FAILED",
    }
);

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewSource {
    pub name: String,
    pub url: String,
    #[serde(default = "default_source_type")]
    pub source_type: String,
    #[serde(default = "default_frequency")]
    pub frequency_minutes: u32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SourcePatch {
    pub name: Option<String>,
    pub url: Option<String>,
    pub source_type: Option<String>,
    pub frequency_minutes: Option<u32>,
    pub is_active: Option<bool>,
}

fn default_source_type() -> String {
    DEFAULT_SOURCE_TYPE.to_string()
}

fn default_frequency() -> u32 {
    DEFAULT_FREQUENCY_MINUTES
}

fn default_active() -> bool {
    true
}

fn require_text(field: &'static str, value: &str) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::invalid_field(field, "must not be empty"));
    }
    Ok(trimmed.to_string())
}

fn require_frequency(minutes: u32) -> Result<u32, DomainError> {
    if minutes == 0 {
        return Err(DomainError::invalid_field(
            "frequency_minutes",
            "must be at least 1",
        ));
    }
    Ok(minutes)
}

/// A site or search the scheduler scans periodically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringSource {
    id: SourceId,
    name: String,
    url: String,
    source_type: String,
    frequency_minutes: u32,
    is_active: bool,
    last_run_at: Option<DateTime<Utc>>,
    last_status: SourceStatus,
    next_run_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    /// Account that registered the source, set for SME accounts only.
    #[serde(default)]
    owner_user_id: Option<UserId>,
}

impl MonitoringSource {
    pub fn new(input: NewSource, now: DateTime<Utc>) -> Result<Self, DomainError> {
        Ok(Self {
            id: SourceId::new(),
            name: require_text("name", &input.name)?,
            url: require_text("url", &input.url)?,
            source_type: require_text("source_type", &input.source_type)?,
            frequency_minutes: require_frequency(input.frequency_minutes)?,
            is_active: input.is_active,
            last_run_at: None,
            last_status: SourceStatus::NeverRun,
            next_run_at: None,
            created_at: now,
            owner_user_id: None,
        })
    }

    pub fn assign_owner(&mut self, owner: UserId) {
        self.owner_user_id = Some(owner);
    }

    /// Apply a partial update. Nothing changes if any field is invalid.
    pub fn apply(&mut self, patch: SourcePatch) -> Result<(), DomainError> {
        let name = patch.name.as_deref().map(|v| require_text("name", v)).transpose()?;
        let url = patch.url.as_deref().map(|v| require_text("url", v)).transpose()?;
        let source_type = patch
            .source_type
            .as_deref()
            .map(|v| require_text("source_type", v))
            .transpose()?;
        let frequency = patch.frequency_minutes.map(require_frequency).transpose()?;

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(url) = url {
            self.url = url;
        }
        if let Some(source_type) = source_type {
            self.source_type = source_type;
        }
        if let Some(frequency) = frequency {
            self.frequency_minutes = frequency;
            self.next_run_at = self
                .last_run_at
                .map(|t| t + Duration::minutes(i64::from(frequency)));
        }
        if let Some(active) = patch.is_active {
            self.is_active = active;
        }
        Ok(())
    }

    /// Flip the active flag and return the new value.
    pub fn toggle(&mut self) -> bool {
        self.is_active = !self.is_active;
        self.is_active
    }

    /// Active and either never scanned or its period has elapsed.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        if !self.is_active {
            return false;
        }
        match self.last_run_at {
            None => true,
            Some(last) => last + Duration::minutes(i64::from(self.frequency_minutes)) <= now,
        }
    }

    pub fn mark_scheduled(&mut self, now: DateTime<Utc>) {
        self.last_run_at = Some(now);
        self.next_run_at = Some(now + Duration::minutes(i64::from(self.frequency_minutes)));
    }

    pub fn record_outcome(&mut self, status: SourceStatus) {
        self.last_status = status;
    }

    pub fn id(&self) -> &SourceId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn source_type(&self) -> &str {
        &self.source_type
    }

    pub fn frequency_minutes(&self) -> u32 {
        self.frequency_minutes
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn last_run_at(&self) -> Option<DateTime<Utc>> {
        self.last_run_at
    }

    pub fn last_status(&self) -> SourceStatus {
        self.last_status
    }

    pub fn next_run_at(&self) -> Option<DateTime<Utc>> {
        self.next_run_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn owner_user_id(&self) -> Option<&UserId> {
        self.owner_user_id.as_ref()
    }
}

/// One scheduled scan of a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapingRun {
    id: RunId,
    source_id: SourceId,
    status: RunStatus,
    alerts_generated_count: u32,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    log_message: Option<String>,
}

impl ScrapingRun {
    pub fn pending(source_id: SourceId, now: DateTime<Utc>) -> Self {
        Self {
            id: RunId::new(),
            source_id,
            status: RunStatus::Pending,
            alerts_generated_count: 0,
            started_at: now,
            completed_at: None,
            log_message: None,
        }
    }

    pub fn complete(&mut self, message: &str, threat_found: bool, now: DateTime<Utc>) {
        self.status = RunStatus::Completed;
        if threat_found {
            self.alerts_generated_count += 1;
        }
        self.finish(message, now);
    }

    pub fn fail(&mut self, message: &str, now: DateTime<Utc>) {
        self.status = RunStatus::Failed;
        self.finish(message, now);
    }

    fn finish(&mut self, message: &str, now: DateTime<Utc>) {
        self.completed_at = Some(now);
        self.log_message = Some(message.chars().take(MAX_LOG_CHARS).collect());
    }

    pub fn id(&self) -> &RunId {
        &self.id
    }

    pub fn source_id(&self) -> &SourceId {
        &self.source_id
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn alerts_generated_count(&self) -> u32 {
        self.alerts_generated_count
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn log_message(&self) -> Option<&str> {
        self.log_message.as_deref()
    }
}
