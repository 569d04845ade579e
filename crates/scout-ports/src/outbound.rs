use async_trait::async_trait;
use chrono::{DateTime, Utc};

use scout_core::alert::{Alert, AlertStatus};
use scout_core::events::DomainEvent;
use scout_core::evidence::Evidence;
use scout_core::ids::UserId;
use scout_core::report::Report;
use scout_core::shield::ShieldDispatch;
use scout_core::source::{MonitoringSource, ScrapingRun};
use scout_core::stats::{AlertTotals, BandCounts, DayCount};
use scout_core::user::{Session, User};

use crate::error::PortError;
use crate::types::{AlertFilter, Page, PurgedRows, ScanTask, StoredArtifact};

#[async_trait]
pub trait AlertRepository: Send + Sync {
    async fn save(&self, alert: &Alert) -> Result<(), PortError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Alert>, PortError>;
    /// Newest first.
    async fn find_by_filter(&self, filter: &AlertFilter) -> Result<Vec<Alert>, PortError>;
    /// Number of alerts matching the filter, ignoring its page.
    async fn count_by_filter(&self, filter: &AlertFilter) -> Result<u64, PortError>;
    /// Citizen alerts reported for this phone number, newest first.
    async fn find_by_phone(&self, phone: &str) -> Result<Vec<Alert>, PortError>;
}

/// Removes an alert together with everything that references it.
#[async_trait]
pub trait IncidentPurge: Send + Sync {
    /// Delete the alert, its reports, evidence and dispatches as one unit:
    /// on error nothing is removed. `None` when the alert does not exist.
    async fn purge(&self, alert_id: &str) -> Result<Option<PurgedRows>, PortError>;
}

/// Counting queries behind the analysis centre and the dashboard.
#[async_trait]
pub trait AlertMetrics: Send + Sync {
    async fn totals(&self) -> Result<AlertTotals, PortError>;
    /// Alerts below `medium_from`, below `high_from`, and the rest.
    async fn count_by_risk_band(
        &self,
        medium_from: u8,
        high_from: u8,
    ) -> Result<BandCounts, PortError>;
    /// Only statuses with at least one alert.
    async fn count_by_status(&self) -> Result<Vec<(AlertStatus, u64)>, PortError>;
    async fn count_created_since(&self, since: DateTime<Utc>) -> Result<u64, PortError>;
    /// Per UTC calendar day, oldest first. Days without alerts are absent.
    async fn count_by_day(&self, since: DateTime<Utc>) -> Result<Vec<DayCount>, PortError>;
    /// How many alerts in `status` score at least `min_risk`, and the
    /// `limit` riskiest of them (newest first among equals).
    async fn riskiest(
        &self,
        status: AlertStatus,
        min_risk: u8,
        limit: usize,
    ) -> Result<(u64, Vec<Alert>), PortError>;
}

#[async_trait]
pub trait EvidenceRepository: Send + Sync {
    /// Fails with [`PortError::Conflict`] when the file hash is already stored.
    async fn insert(&self, evidence: &Evidence) -> Result<(), PortError>;
    async fn save(&self, evidence: &Evidence) -> Result<(), PortError>;
    async fn find_by_hash(&self, hash: &str) -> Result<Option<Evidence>, PortError>;
    async fn find_by_file_name(&self, name: &str) -> Result<Option<Evidence>, PortError>;
    async fn list_for_alert(&self, alert_id: &str) -> Result<Vec<Evidence>, PortError>;
    async fn list(&self, page: Page) -> Result<Vec<Evidence>, PortError>;
}

#[async_trait]
pub trait ReportRepository: Send + Sync {
    async fn save(&self, report: &Report) -> Result<(), PortError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Report>, PortError>;
    /// Newest first. With `owner`, only reports on alerts that account raised.
    async fn list(&self, owner: Option<&UserId>, page: Page) -> Result<Vec<Report>, PortError>;
    async fn list_for_alert(&self, alert_id: &str) -> Result<Vec<Report>, PortError>;
    async fn count(&self) -> Result<u64, PortError>;
}

#[async_trait]
pub trait DispatchRepository: Send + Sync {
    async fn save(&self, dispatch: &ShieldDispatch) -> Result<(), PortError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<ShieldDispatch>, PortError>;
    /// Newest first, at most `limit` entries.
    async fn list_for_incident(
        &self,
        incident_id: &str,
        limit: usize,
    ) -> Result<Vec<ShieldDispatch>, PortError>;
}

#[async_trait]
pub trait SourceRepository: Send + Sync {
    async fn save(&self, source: &MonitoringSource) -> Result<(), PortError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<MonitoringSource>, PortError>;
    /// Newest first. With `owner`, only sources that account registered.
    async fn list(
        &self,
        owner: Option<&UserId>,
        page: Page,
    ) -> Result<Vec<MonitoringSource>, PortError>;
    async fn list_active(&self) -> Result<Vec<MonitoringSource>, PortError>;
    async fn count_active(&self) -> Result<u64, PortError>;
    async fn delete(&self, id: &str) -> Result<bool, PortError>;
}

#[async_trait]
pub trait RunRepository: Send + Sync {
    async fn save(&self, run: &ScrapingRun) -> Result<(), PortError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<ScrapingRun>, PortError>;
    /// Most recently started first.
    async fn list_for_source(
        &self,
        source_id: &str,
        page: Page,
    ) -> Result<Vec<ScrapingRun>, PortError>;
    async fn list(&self, page: Page) -> Result<Vec<ScrapingRun>, PortError>;
    async fn delete_for_source(&self, source_id: &str) -> Result<u64, PortError>;
}

/// FIFO of work for the external crawler.
#[async_trait]
pub trait ScanQueue: Send + Sync {
    async fn enqueue(&self, task: ScanTask) -> Result<(), PortError>;
    /// Remove and return up to `limit` of the oldest pending tasks.
    async fn claim(&self, limit: usize) -> Result<Vec<ScanTask>, PortError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn save(&self, user: &User) -> Result<(), PortError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, PortError>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn save(&self, session: &Session) -> Result<(), PortError>;
    async fn find(&self, token: &str) -> Result<Option<Session>, PortError>;
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, PortError>;
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, events: Vec<DomainEvent>) -> Result<(), PortError>;
}

/// Flat file store addressed by name. Names never contain directories.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Write content under `<sha256><extension>` and return its identity.
    async fn put(&self, bytes: &[u8], extension: &str) -> Result<StoredArtifact, PortError>;
    async fn get(&self, name: &str) -> Result<Option<Vec<u8>>, PortError>;
    /// True when a file was removed.
    async fn remove(&self, name: &str) -> Result<bool, PortError>;
}
