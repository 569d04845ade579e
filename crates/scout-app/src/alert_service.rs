use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use scout_core::alert::{Alert, AlertPatch};
use scout_core::events::{AlertDeleted, DomainEvent};
use scout_core::evidence::Evidence;
use scout_core::ids::AlertId;
use scout_core::presentation::is_http_url;
use scout_core::source::DEFAULT_SOURCE_TYPE;
use scout_ports::outbound::{
    AlertRepository, ArtifactStore, EventPublisher, EvidenceRepository, IncidentPurge,
    ReportRepository, ScanQueue,
};
use scout_ports::types::{AlertFilter, ScanTask};

use crate::error::AppError;

pub const DEFAULT_CLAIM_LIMIT: usize = 10;
pub const MAX_CLAIM_LIMIT: usize = 100;

/// What a cascading delete removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertDeletion {
    pub alert_uuid: AlertId,
    pub deleted_reports_count: u64,
    pub deleted_evidences_count: u64,
    pub deleted_analysis_results_count: u64,
    pub deleted_files_count: u64,
    pub missing_files_count: u64,
    pub deleted_shield_actions_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertDetail {
    pub alert: Alert,
    pub evidences: Vec<Evidence>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ManualIngestion {
    pub alert: Alert,
    pub queued_for_osint: bool,
}

#[derive(Default)]
struct FileTally {
    deleted: u64,
    missing: u64,
}

pub struct AlertService<A, V, R, D, F, Q, P>
where
    A: AlertRepository,
    V: EvidenceRepository,
    R: ReportRepository,
    D: IncidentPurge,
    F: ArtifactStore,
    Q: ScanQueue,
    P: EventPublisher,
{
    alerts: A,
    evidences: V,
    reports: R,
    purge: D,
    evidence_files: F,
    report_files: F,
    scans: Q,
    events: P,
}

impl<A, V, R, D, F, Q, P> AlertService<A, V, R, D, F, Q, P>
where
    A: AlertRepository,
    V: EvidenceRepository,
    R: ReportRepository,
    D: IncidentPurge,
    F: ArtifactStore,
    Q: ScanQueue,
    P: EventPublisher,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        alerts: A,
        evidences: V,
        reports: R,
        purge: D,
        evidence_files: F,
        report_files: F,
        scans: Q,
        events: P,
    ) -> Self {
        Self {
            alerts,
            evidences,
            reports,
            purge,
            evidence_files,
            report_files,
            scans,
            events,
        }
    }

    pub async fn list(&self, filter: &AlertFilter) -> Result<Vec<Alert>, AppError> {
        Ok(self.alerts.find_by_filter(filter).await?)
    }

    pub async fn get(&self, id: &str) -> Result<Alert, AppError> {
        let id = AlertId::parse(id)?;
        self.alerts
            .find_by_id(&id.to_string())
            .await?
            .ok_or(AppError::NotFound("alert"))
    }

    pub async fn detail(&self, id: &str) -> Result<AlertDetail, AppError> {
        let alert = self.get(id).await?;
        let evidences = self
            .evidences
            .list_for_alert(&alert.id().to_string())
            .await?;
        Ok(AlertDetail { alert, evidences })
    }

    pub async fn update(
        &self,
        id: &str,
        patch: AlertPatch,
        now: DateTime<Utc>,
    ) -> Result<Alert, AppError> {
        let mut alert = self.get(id).await?;
        let events = alert.update(patch, now)?;
        self.alerts.save(&alert).await?;
        self.events.publish(events).await?;
        Ok(alert)
    }

    /// Register a URL by hand and ask the crawler to scan it. A queue
    /// outage leaves the alert in place with `queued_for_osint = false`.
    pub async fn ingest_manual(
        &self,
        url: Option<&str>,
        source_type: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ManualIngestion, AppError> {
        let url = url.map(str::trim).unwrap_or("");
        if url.is_empty() {
            return Err(AppError::validation("Une URL est requise pour l'ingestion."));
        }
        if !is_http_url(url) {
            return Err(AppError::validation("url must start with http:// or https://"));
        }
        let source_type = source_type
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SOURCE_TYPE);

        let (alert, events) = Alert::new(url.to_string(), source_type.to_string(), 0, now);
        self.alerts.save(&alert).await?;
        self.events.publish(events).await?;

        let queued_for_osint = match self.scans.enqueue(ScanTask::targeted(&alert, now)).await {
            Ok(()) => true,
            Err(e) => {
                warn!(alert_id = %alert.id(), error = %e, "failed to enqueue manual ingestion");
                false
            }
        };
        Ok(ManualIngestion {
            alert,
            queued_for_osint,
        })
    }

    /// Hand queued scan tasks to the crawler. Claimed tasks leave the queue.
    pub async fn claim_tasks(&self, limit: Option<usize>) -> Result<Vec<ScanTask>, AppError> {
        let limit = limit
            .unwrap_or(DEFAULT_CLAIM_LIMIT)
            .clamp(1, MAX_CLAIM_LIMIT);
        let tasks = self.scans.claim(limit).await?;
        if !tasks.is_empty() {
            info!(count = tasks.len(), "scan tasks claimed");
        }
        Ok(tasks)
    }

    /// Remove an alert with its reports, evidence, dispatches and stored
    /// files. With `citizen_only`, non-citizen alerts are reported missing.
    /// Files are only touched once the rows are gone.
    pub async fn delete(
        &self,
        id: &str,
        citizen_only: bool,
        now: DateTime<Utc>,
    ) -> Result<AlertDeletion, AppError> {
        let alert = self.get(id).await?;
        if citizen_only && !alert.is_citizen() {
            return Err(AppError::NotFound("citizen incident"));
        }
        let key = alert.id().to_string();

        let evidence_files: BTreeSet<String> = self
            .evidences
            .list_for_alert(&key)
            .await?
            .iter()
            .map(|e| e.file_name().to_string())
            .filter(|name| !name.is_empty())
            .collect();
        let report_files: BTreeSet<String> = self
            .reports
            .list_for_alert(&key)
            .await?
            .iter()
            .filter_map(|r| r.pdf_path().map(str::to_string))
            .collect();

        let rows = self
            .purge
            .purge(&key)
            .await?
            .ok_or(AppError::NotFound("alert"))?;

        let mut tally = FileTally::default();
        remove_files(&self.evidence_files, &evidence_files, &mut tally).await;
        remove_files(&self.report_files, &report_files, &mut tally).await;

        let deletion = AlertDeletion {
            alert_uuid: alert.id().clone(),
            deleted_reports_count: rows.reports,
            deleted_evidences_count: rows.evidences,
            deleted_analysis_results_count: u64::from(alert.analysis().is_some()),
            deleted_files_count: tally.deleted,
            missing_files_count: tally.missing,
            deleted_shield_actions_count: rows.dispatches,
        };
        self.events
            .publish(vec![DomainEvent::AlertDeleted(AlertDeleted {
                alert_id: alert.id().clone(),
                deleted_reports: rows.reports,
                deleted_evidences: rows.evidences,
                occurred_at: now,
            })])
            .await?;
        info!(alert_id = %key, files = tally.deleted, missing = tally.missing, "alert deleted");
        Ok(deletion)
    }
}

async fn remove_files<F: ArtifactStore>(store: &F, names: &BTreeSet<String>, tally: &mut FileTally) {
    for name in names {
        match store.remove(name).await {
            Ok(true) => tally.deleted += 1,
            Ok(false) => tally.missing += 1,
            Err(e) => warn!(file = %name, error = %e, "unable to delete artifact file"),
        }
    }
}
