use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use scout_core::alert::{Alert, AnalysisResult};
use scout_core::evidence::{Evidence, SCREENSHOT};
use scout_core::ids::{AlertId, RunId};
use scout_core::source::{ScrapingRun, SourceStatus};
use scout_ports::error::PortError;
use scout_ports::outbound::{
    AlertRepository, EventPublisher, EvidenceRepository, RunRepository, SourceRepository,
};
use scout_ports::types::{ScanResult, DISCOVERY_SOURCE_TYPE};

use crate::error::AppError;

const HASH_PREFIX_CHARS: usize = 16;
const NO_THREAT: &str = "No threat detected";
const NO_EVIDENCE_NOTE: &str = "OSINT completed without evidence hash.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultDisposition {
    Failed,
    NoThreat,
    AlertCreated,
    AlertUpdated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultOutcome {
    pub disposition: ResultDisposition,
    pub alert_id: Option<AlertId>,
    pub run_id: Option<RunId>,
    pub evidence_inserted: bool,
}

/// Applies crawler results to alerts, evidence, runs and sources.
pub struct ResultService<A, V, S, U, P>
where
    A: AlertRepository,
    V: EvidenceRepository,
    S: SourceRepository,
    U: RunRepository,
    P: EventPublisher,
{
    alerts: A,
    evidences: V,
    sources: S,
    runs: U,
    events: P,
}

impl<A, V, S, U, P> ResultService<A, V, S, U, P>
where
    A: AlertRepository,
    V: EvidenceRepository,
    S: SourceRepository,
    U: RunRepository,
    P: EventPublisher,
{
    pub fn new(alerts: A, evidences: V, sources: S, runs: U, events: P) -> Self {
        Self {
            alerts,
            evidences,
            sources,
            runs,
            events,
        }
    }

    /// `task_id` names either the alert of a targeted scan or the run of a
    /// discovery scan.
    pub async fn process(
        &self,
        result: ScanResult,
        now: DateTime<Utc>,
    ) -> Result<ResultOutcome, AppError> {
        let task_id = Uuid::parse_str(result.task_id.trim())
            .map_err(|_| AppError::validation(format!("invalid task_id: {}", result.task_id)))?
            .to_string();

        let alert = self.alerts.find_by_id(&task_id).await?;
        let run = self.runs.find_by_id(&task_id).await?;

        if !result.is_completed() {
            return self.record_failure(&result, alert, run, now).await;
        }

        if alert.is_none() && !result.is_alert {
            if let Some(mut run) = run {
                run.complete(NO_THREAT, false, now);
                self.finish_run(&run, SourceStatus::Clean).await?;
                return Ok(ResultOutcome {
                    disposition: ResultDisposition::NoThreat,
                    alert_id: None,
                    run_id: Some(run.id().clone()),
                    evidence_inserted: false,
                });
            }
        }

        let target_url = result.target_url().to_string();
        let risk_score = i64::from(result.clamped_risk_score());
        let (mut alert, disposition) = match alert {
            Some(mut alert) => {
                alert.set_risk_score(risk_score, now);
                if !target_url.is_empty() {
                    alert.set_url(target_url.clone(), now);
                }
                (alert, ResultDisposition::AlertUpdated)
            }
            None => {
                let source_type = result
                    .source_type
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .unwrap_or(DISCOVERY_SOURCE_TYPE);
                let (alert, events) =
                    Alert::new(target_url.clone(), source_type.to_string(), risk_score, now);
                self.events.publish(events).await?;
                (alert, ResultDisposition::AlertCreated)
            }
        };
        // evidence references the alert, so it must exist first
        self.alerts.save(&alert).await?;

        let evidence_inserted = self.attach_evidence(&mut alert, &result, now).await?;
        alert.set_analysis(
            AnalysisResult {
                categories: result.categories(),
                entities: result.entities(),
            },
            now,
        );
        self.alerts.save(&alert).await?;

        let run_id = match run {
            Some(mut run) => {
                if result.is_alert {
                    run.complete(&format!("Threat detected on {target_url}"), true, now);
                    self.finish_run(&run, SourceStatus::Alert).await?;
                } else {
                    run.complete(NO_THREAT, false, now);
                    self.finish_run(&run, SourceStatus::Clean).await?;
                }
                Some(run.id().clone())
            }
            None => None,
        };

        info!(
            task_id = %task_id,
            alert_id = %alert.id(),
            risk_score = alert.risk_score(),
            is_alert = result.is_alert,
            "scan result processed"
        );
        Ok(ResultOutcome {
            disposition,
            alert_id: Some(alert.id().clone()),
            run_id,
            evidence_inserted,
        })
    }

    async fn record_failure(
        &self,
        result: &ScanResult,
        alert: Option<Alert>,
        run: Option<ScrapingRun>,
        now: DateTime<Utc>,
    ) -> Result<ResultOutcome, AppError> {
        let message = result.failure_message();
        let alert_id = match alert {
            Some(mut alert) => {
                alert.append_note(&message, now);
                self.alerts.save(&alert).await?;
                Some(alert.id().clone())
            }
            None => None,
        };
        let run_id = match run {
            Some(mut run) => {
                run.fail(&message, now);
                self.finish_run(&run, SourceStatus::Error).await?;
                Some(run.id().clone())
            }
            None => None,
        };
        warn!(
            task_id = %result.task_id,
            status = %result.normalized_status(),
            error_code = result.error_code.as_deref().unwrap_or(""),
            "scan result processed as failure"
        );
        Ok(ResultOutcome {
            disposition: ResultDisposition::Failed,
            alert_id,
            run_id,
            evidence_inserted: false,
        })
    }

    /// Insert the capture unless its hash is already on file; either way
    /// leave a trace in the analysis note when nothing was inserted.
    async fn attach_evidence(
        &self,
        alert: &mut Alert,
        result: &ScanResult,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let Some(hash) = result.evidence_hash() else {
            alert.append_note(NO_EVIDENCE_NOTE, now);
            return Ok(false);
        };
        let prefix: String = hash.chars().take(HASH_PREFIX_CHARS).collect();
        let duplicate_note =
            format!("Evidence hash already exists ({prefix}...), skipped duplicate insert.");

        if self.evidences.find_by_hash(hash).await?.is_some() {
            alert.append_note(&duplicate_note, now);
            return Ok(false);
        }

        let file_path = result
            .evidence_file_path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("screenshots/evidence_{prefix}.png"));
        let summary = result.summary();
        let evidence = Evidence::new(
            alert.id().clone(),
            SCREENSHOT,
            file_path,
            hash.to_string(),
            Some(summary.as_str()),
            result.evidence_metadata(),
            result.captured_at(now),
        );
        match self.evidences.insert(&evidence).await {
            Ok(()) => Ok(true),
            Err(PortError::Conflict(_)) => {
                alert.append_note(&duplicate_note, now);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn finish_run(&self, run: &ScrapingRun, outcome: SourceStatus) -> Result<(), AppError> {
        self.runs.save(run).await?;
        let source = self
            .sources
            .find_by_id(&run.source_id().to_string())
            .await?;
        if let Some(mut source) = source {
            source.record_outcome(outcome);
            self.sources.save(&source).await?;
        }
        Ok(())
    }
}
