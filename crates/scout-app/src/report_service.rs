use chrono::{DateTime, Utc};
use tracing::info;

use scout_core::alert::Alert;
use scout_core::ids::{AlertId, ReportId, UserId};
use scout_core::report::Report;
use scout_ports::outbound::{
    AlertRepository, ArtifactStore, EventPublisher, EvidenceRepository, ReportRepository,
};
use scout_ports::types::Page;

use crate::error::AppError;

pub struct ReportService<A, V, R, F, P>
where
    A: AlertRepository,
    V: EvidenceRepository,
    R: ReportRepository,
    F: ArtifactStore,
    P: EventPublisher,
{
    alerts: A,
    evidences: V,
    reports: R,
    files: F,
    events: P,
}

impl<A, V, R, F, P> ReportService<A, V, R, F, P>
where
    A: AlertRepository,
    V: EvidenceRepository,
    R: ReportRepository,
    F: ArtifactStore,
    P: EventPublisher,
{
    pub fn new(alerts: A, evidences: V, reports: R, files: F, events: P) -> Self {
        Self {
            alerts,
            evidences,
            reports,
            files,
            events,
        }
    }

    /// Snapshot the alert with its evidence, store the hashed report and
    /// seal every evidence it references.
    pub async fn generate(
        &self,
        alert_id: &str,
        generated_by: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Report, AppError> {
        let alert = self.find_alert(alert_id).await?;
        let mut evidences = self
            .evidences
            .list_for_alert(&alert.id().to_string())
            .await?;

        let (report, events) = Report::generate(&alert, &evidences, generated_by, now);
        self.reports.save(&report).await?;

        let mut sealed = 0;
        for evidence in evidences.iter_mut() {
            if evidence.seal(now) {
                self.evidences.save(evidence).await?;
                sealed += 1;
            }
        }
        self.events.publish(events).await?;
        info!(
            report_id = %report.id(),
            alert_id = %alert.id(),
            hash = %report.report_hash(),
            sealed,
            "forensic report generated"
        );
        Ok(report)
    }

    /// With `owner`, only reports on alerts that account raised.
    pub async fn list(&self, owner: Option<&UserId>, page: Page) -> Result<Vec<Report>, AppError> {
        Ok(self.reports.list(owner, page).await?)
    }

    pub async fn get(&self, id: &str) -> Result<Report, AppError> {
        let id = ReportId::parse(id)?;
        self.reports
            .find_by_id(&id.to_string())
            .await?
            .ok_or(AppError::NotFound("report"))
    }

    /// Rendered PDF, if one was ever placed in the report store.
    pub async fn pdf(&self, id: &str) -> Result<(String, Vec<u8>), AppError> {
        let report = self.get(id).await?;
        let name = report
            .pdf_path()
            .ok_or(AppError::NotFound("report pdf"))?
            .to_string();
        let bytes = self
            .files
            .get(&name)
            .await?
            .ok_or(AppError::NotFound("report pdf"))?;
        Ok((name, bytes))
    }

    async fn find_alert(&self, id: &str) -> Result<Alert, AppError> {
        let id = AlertId::parse(id)?;
        self.alerts
            .find_by_id(&id.to_string())
            .await?
            .ok_or(AppError::NotFound("alert"))
    }
}
