use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use scout_core::alert::{Alert, AlertStatus, CitizenReport};
use scout_core::error::DomainError;
use scout_core::evidence::{Evidence, ATTACHMENT};
use scout_core::ids::{AlertId, UserId};
use scout_core::incident::{Decision, DecisionStatus};
use scout_core::presentation::is_http_url;
use scout_core::signal::{RiskLevel, SignalChannel, SignalInput};
use scout_ports::outbound::{
    AlertRepository, ArtifactStore, EventPublisher, EvidenceRepository, ScanQueue,
};
use scout_ports::types::{AlertFilter, Page, ScanTask};

use crate::error::AppError;

pub const MAX_ATTACHMENTS: usize = 5;
pub const MAX_ATTACHMENT_BYTES: usize = 10 * 1024 * 1024;
const MESSAGE_PREVIEW_CHARS: usize = 160;
const RELATED_LIMIT: usize = 10;

/// Client-side scoring result sent back with the report so the alert keeps
/// the score the citizen saw.
#[derive(Debug, Clone, Deserialize)]
pub struct VerificationSnapshot {
    pub risk_score: i64,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub should_report: bool,
    #[serde(default)]
    pub matched_rules: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncidentReport {
    #[serde(flatten)]
    pub signal: SignalInput,
    #[serde(default)]
    pub verification: Option<VerificationSnapshot>,
}

/// An uploaded file accompanying a report.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IncidentReceipt {
    pub alert_uuid: AlertId,
    pub status: AlertStatus,
    pub risk_score_initial: u8,
    pub queued_for_osint: bool,
    pub attachments_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CitizenIncidentItem {
    pub alert_uuid: AlertId,
    pub phone_number: String,
    pub channel: SignalChannel,
    pub message_preview: String,
    pub risk_score: u8,
    pub status: AlertStatus,
    pub created_at: DateTime<Utc>,
    pub attachments_count: u64,
    pub reports_for_phone: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CitizenIncidentPage {
    pub items: Vec<CitizenIncidentItem>,
    pub total: u64,
    pub skip: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PhoneStats {
    pub reports_for_phone: u64,
    pub open_reports_for_phone: u64,
    pub confirmed_reports_for_phone: u64,
    pub blocked_reports_for_phone: u64,
}

impl PhoneStats {
    fn from_alerts(alerts: &[Alert]) -> Self {
        let count = |pred: &dyn Fn(AlertStatus) -> bool| {
            alerts.iter().filter(|a| pred(a.status())).count() as u64
        };
        Self {
            reports_for_phone: alerts.len() as u64,
            open_reports_for_phone: count(&|s: AlertStatus| s.is_open()),
            confirmed_reports_for_phone: count(&|s: AlertStatus| s == AlertStatus::Confirmed),
            blocked_reports_for_phone: count(&|s: AlertStatus| s == AlertStatus::BlockedSimulated),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RelatedIncident {
    pub alert_uuid: AlertId,
    pub status: AlertStatus,
    pub risk_score: u8,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CitizenIncidentDetail {
    pub alert: Alert,
    pub attachments: Vec<Evidence>,
    pub stats: PhoneStats,
    pub related_incidents: Vec<RelatedIncident>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DecisionOutcome {
    pub incident_id: AlertId,
    pub alert_status: AlertStatus,
    pub decision_status: DecisionStatus,
    pub comment: Option<String>,
}

pub struct IncidentService<A, V, F, Q, P>
where
    A: AlertRepository,
    V: EvidenceRepository,
    F: ArtifactStore,
    Q: ScanQueue,
    P: EventPublisher,
{
    alerts: A,
    evidences: V,
    files: F,
    scans: Q,
    events: P,
}

impl<A, V, F, Q, P> IncidentService<A, V, F, Q, P>
where
    A: AlertRepository,
    V: EvidenceRepository,
    F: ArtifactStore,
    Q: ScanQueue,
    P: EventPublisher,
{
    pub fn new(alerts: A, evidences: V, files: F, scans: Q, events: P) -> Self {
        Self {
            alerts,
            evidences,
            files,
            scans,
            events,
        }
    }

    /// Turn a citizen report into a NEW alert, store its attachments as
    /// evidence and queue crawlable URLs for an OSINT scan. `owner` is the
    /// signed-in account the alert is attributed to, if any.
    pub async fn report(
        &self,
        report: IncidentReport,
        attachments: Vec<Attachment>,
        owner: Option<UserId>,
        now: DateTime<Utc>,
    ) -> Result<IncidentReceipt, AppError> {
        report.signal.validate()?;
        if let Some(v) = &report.verification {
            if !(0..=100).contains(&v.risk_score) {
                return Err(DomainError::invalid_field(
                    "verification.risk_score",
                    "must be between 0 and 100",
                )
                .into());
            }
        }
        let attachments: Vec<Attachment> =
            attachments.into_iter().filter(|a| !a.bytes.is_empty()).collect();
        check_attachments(&attachments)?;

        let risk_score = match &report.verification {
            Some(v) => v.risk_score,
            None => i64::from(report.signal.score().risk_score),
        };
        let IncidentReport { signal, .. } = report;
        let citizen = CitizenReport {
            phone_number: signal.phone.trim().to_string(),
            message: signal.message,
            channel: signal.channel,
        };
        let (mut alert, events) =
            Alert::from_citizen_report(citizen, signal.url.as_deref(), risk_score, now);
        if let Some(owner) = owner {
            alert.assign_owner(owner);
        }
        self.alerts.save(&alert).await?;
        self.events.publish(events).await?;

        let mut attachments_count = 0;
        for attachment in &attachments {
            if self.store_attachment(&alert, attachment, now).await? {
                attachments_count += 1;
            }
        }

        let queued_for_osint = match signal.url.as_deref().map(str::trim) {
            Some(url) if is_http_url(url) => {
                match self.scans.enqueue(ScanTask::targeted(&alert, now)).await {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(alert_id = %alert.id(), error = %e, "failed to enqueue incident report task");
                        false
                    }
                }
            }
            _ => false,
        };

        info!(
            alert_id = %alert.id(),
            risk_score = alert.risk_score(),
            queued_for_osint,
            attachments_count,
            "citizen incident reported"
        );
        Ok(IncidentReceipt {
            alert_uuid: alert.id().clone(),
            status: alert.status(),
            risk_score_initial: alert.risk_score(),
            queued_for_osint,
            attachments_count,
        })
    }

    /// Returns false when identical content is already on file.
    async fn store_attachment(
        &self,
        alert: &Alert,
        attachment: &Attachment,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let stored = self
            .files
            .put(&attachment.bytes, &attachment_extension(attachment))
            .await?;
        if self.evidences.find_by_hash(&stored.file_hash).await?.is_some() {
            warn!(alert_id = %alert.id(), hash = %stored.file_hash, "attachment already on file, skipped");
            return Ok(false);
        }
        let metadata = serde_json::json!({
            "original_name": attachment.file_name,
            "content_type": attachment.content_type,
            "size": stored.size,
        });
        let evidence = Evidence::new(
            alert.id().clone(),
            ATTACHMENT,
            stored.file_name,
            stored.file_hash,
            None,
            metadata,
            now,
        );
        self.evidences.insert(&evidence).await?;
        Ok(true)
    }

    pub async fn list(
        &self,
        status: Option<AlertStatus>,
        search: Option<String>,
        owner: Option<UserId>,
        page: Page,
    ) -> Result<CitizenIncidentPage, AppError> {
        let filter = AlertFilter {
            status,
            citizen_only: true,
            search: search.filter(|q| !q.trim().is_empty()),
            owner,
            page,
        };
        let total = self.alerts.count_by_filter(&filter).await?;
        let alerts = self.alerts.find_by_filter(&filter).await?;

        let mut items = Vec::with_capacity(alerts.len());
        for alert in alerts {
            let Some(citizen) = alert.citizen() else {
                continue;
            };
            let attachments_count = self
                .evidences
                .list_for_alert(&alert.id().to_string())
                .await?
                .len() as u64;
            let reports_for_phone = self
                .alerts
                .find_by_phone(&citizen.phone_number)
                .await?
                .len() as u64;
            items.push(CitizenIncidentItem {
                alert_uuid: alert.id().clone(),
                phone_number: citizen.phone_number.clone(),
                channel: citizen.channel,
                message_preview: citizen.message.chars().take(MESSAGE_PREVIEW_CHARS).collect(),
                risk_score: alert.risk_score(),
                status: alert.status(),
                created_at: alert.created_at(),
                attachments_count,
                reports_for_phone,
            });
        }
        Ok(CitizenIncidentPage {
            items,
            total,
            skip: page.skip,
            limit: page.limit,
        })
    }

    pub async fn detail(&self, id: &str) -> Result<CitizenIncidentDetail, AppError> {
        let alert = self.find(id).await?;
        let Some(citizen) = alert.citizen() else {
            return Err(AppError::NotFound("citizen incident"));
        };

        let same_phone = self.alerts.find_by_phone(&citizen.phone_number).await?;
        let stats = PhoneStats::from_alerts(&same_phone);
        let related_incidents = same_phone
            .iter()
            .filter(|a| a.id() != alert.id())
            .take(RELATED_LIMIT)
            .map(|a| RelatedIncident {
                alert_uuid: a.id().clone(),
                status: a.status(),
                risk_score: a.risk_score(),
                created_at: a.created_at(),
            })
            .collect();
        let attachments = self
            .evidences
            .list_for_alert(&alert.id().to_string())
            .await?;

        Ok(CitizenIncidentDetail {
            alert,
            attachments,
            stats,
            related_incidents,
        })
    }

    pub async fn decide(
        &self,
        id: &str,
        decision: Decision,
        now: DateTime<Utc>,
    ) -> Result<DecisionOutcome, AppError> {
        let mut alert = self.find(id).await?;
        let (decision_status, events) = alert.decide(&decision, now)?;
        self.alerts.save(&alert).await?;
        self.events.publish(events).await?;
        info!(
            incident_id = %alert.id(),
            action = %decision.action,
            decision_status = %decision_status,
            "incident decision applied"
        );
        Ok(DecisionOutcome {
            incident_id: alert.id().clone(),
            alert_status: alert.status(),
            decision_status,
            comment: decision.comment,
        })
    }

    async fn find(&self, id: &str) -> Result<Alert, AppError> {
        let id = AlertId::parse(id)?;
        self.alerts
            .find_by_id(&id.to_string())
            .await?
            .ok_or(AppError::NotFound("incident"))
    }
}

fn check_attachments(attachments: &[Attachment]) -> Result<(), AppError> {
    if attachments.len() > MAX_ATTACHMENTS {
        return Err(AppError::validation(format!(
            "at most {MAX_ATTACHMENTS} attachments are accepted"
        )));
    }
    for attachment in attachments {
        if attachment.bytes.len() > MAX_ATTACHMENT_BYTES {
            return Err(AppError::validation("attachment exceeds 10 MiB"));
        }
        let is_image = attachment
            .content_type
            .as_deref()
            .is_some_and(|t| t.starts_with("image/"));
        if !is_image {
            return Err(AppError::validation("attachments must be images"));
        }
    }
    Ok(())
}

/// `.png`, `.jpg`... taken from the file name, falling back to the MIME type.
fn attachment_extension(attachment: &Attachment) -> String {
    let from_name = attachment
        .file_name
        .as_deref()
        .and_then(|n| n.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()));
    let ext = from_name.or_else(|| {
        attachment
            .content_type
            .as_deref()
            .and_then(|t| t.strip_prefix("image/"))
            .map(|sub| match sub {
                "jpeg" => "jpg".to_string(),
                other => other.chars().filter(char::is_ascii_alphanumeric).collect(),
            })
            .filter(|ext: &String| !ext.is_empty())
    });
    format!(".{}", ext.unwrap_or_else(|| "bin".to_string()))
}
