pub mod risk;
pub mod status;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::events::{AlertCreated, AlertStatusChanged, DomainEvent, IncidentDecided};
use crate::ids::{AlertId, UserId};
use crate::incident::{Decision, DecisionStatus};
use crate::signal::SignalChannel;

pub use risk::{clamp_risk_score, risk_severity, RiskSeverity};
pub use status::AlertStatus;

/// Placeholder target for citizen reports that carry no crawlable URL.
pub const CITIZEN_TEXT_TARGET: &str = "citizen://text-signal";
pub const CITIZEN_SOURCE_PREFIX: &str = "CITIZEN_";
const CITIZEN_NOTE_PREVIEW_CHARS: usize = 250;

/// What a citizen submitted alongside the alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitizenReport {
    pub phone_number: String,
    pub message: String,
    pub channel: SignalChannel,
}

/// Categories and entities extracted by the OSINT analyzer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub categories: Vec<serde_json::Value>,
    pub entities: Vec<serde_json::Value>,
}

/// Partial update requested by an analyst.
#[derive(Debug, Clone, Default)]
pub struct AlertPatch {
    pub status: Option<AlertStatus>,
    pub analysis_note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "uuid")]
    id: AlertId,
    url: String,
    source_type: String,
    risk_score: u8,
    status: AlertStatus,
    analysis_note: Option<String>,
    citizen: Option<CitizenReport>,
    analysis: Option<AnalysisResult>,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
    /// Account that raised the alert, set for SME accounts only.
    #[serde(default)]
    owner_user_id: Option<UserId>,
}

impl Alert {
    pub fn new(
        url: String,
        source_type: String,
        risk_score: i64,
        now: DateTime<Utc>,
    ) -> (Self, Vec<DomainEvent>) {
        let alert = Self {
            id: AlertId::new(),
            url,
            source_type,
            risk_score: clamp_risk_score(risk_score),
            status: AlertStatus::New,
            analysis_note: None,
            citizen: None,
            analysis: None,
            created_at: now,
            updated_at: None,
            owner_user_id: None,
        };
        let events = vec![DomainEvent::AlertCreated(AlertCreated {
            alert_id: alert.id.clone(),
            source_type: alert.source_type.clone(),
            risk_score: alert.risk_score,
            occurred_at: now,
        })];
        (alert, events)
    }

    /// Alert raised from a citizen report. URL-less reports point at
    /// [`CITIZEN_TEXT_TARGET`].
    pub fn from_citizen_report(
        report: CitizenReport,
        url: Option<&str>,
        risk_score: i64,
        now: DateTime<Utc>,
    ) -> (Self, Vec<DomainEvent>) {
        let target = url
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(CITIZEN_TEXT_TARGET)
            .to_string();
        let (mut alert, events) = Self::new(target, report.channel.source_type(), risk_score, now);
        let preview: String = report
            .message
            .chars()
            .take(CITIZEN_NOTE_PREVIEW_CHARS)
            .collect();
        alert.analysis_note = Some(format!("[{}] {preview}", report.channel));
        alert.citizen = Some(report);
        (alert, events)
    }

    /// Apply a SOC decision. Every decision needs a written justification.
    pub fn decide(
        &mut self,
        decision: &Decision,
        now: DateTime<Utc>,
    ) -> Result<(DecisionStatus, Vec<DomainEvent>), DomainError> {
        decision.validate()?;
        let (target, decision_status) = decision.action.outcome();

        let mut events = Vec::new();
        events.extend(self.transition(target, now));
        self.append_note(&decision.note_line(), now);
        events.push(DomainEvent::IncidentDecided(IncidentDecided {
            alert_id: self.id.clone(),
            action: decision.action,
            decision_status,
            decided_by: decision.author().to_string(),
            occurred_at: now,
        }));
        Ok((decision_status, events))
    }

    /// Analyst edit. Moving to CONFIRMED or DISMISSED needs a non-blank note,
    /// either supplied with the patch or already present.
    pub fn update(
        &mut self,
        patch: AlertPatch,
        now: DateTime<Utc>,
    ) -> Result<Vec<DomainEvent>, DomainError> {
        if let Some(status) = patch.status {
            if status.requires_note() {
                let resulting = patch
                    .analysis_note
                    .as_deref()
                    .or(self.analysis_note.as_deref());
                if resulting.map_or(true, |n| n.trim().is_empty()) {
                    return Err(DomainError::NoteRequired(status.as_str()));
                }
            }
        }

        if let Some(note) = patch.analysis_note {
            self.analysis_note = Some(note);
            self.updated_at = Some(now);
        }
        Ok(patch
            .status
            .and_then(|status| self.transition(status, now))
            .into_iter()
            .collect())
    }

    pub fn ensure_dispatchable(&self) -> Result<(), DomainError> {
        if self.status.is_dispatchable() {
            Ok(())
        } else {
            Err(DomainError::NotDispatchable)
        }
    }

    /// Append one line to the analysis log. Blank lines are ignored.
    pub fn append_note(&mut self, line: &str, now: DateTime<Utc>) {
        let addition = line.trim();
        if addition.is_empty() {
            return;
        }
        let current = self.analysis_note.as_deref().unwrap_or("").trim();
        self.analysis_note = Some(if current.is_empty() {
            addition.to_string()
        } else {
            format!("{current}\n{addition}")
        });
        self.updated_at = Some(now);
    }

    pub fn set_risk_score(&mut self, score: i64, now: DateTime<Utc>) {
        self.risk_score = clamp_risk_score(score);
        self.updated_at = Some(now);
    }

    pub fn set_url(&mut self, url: String, now: DateTime<Utc>) {
        self.url = url;
        self.updated_at = Some(now);
    }

    pub fn set_analysis(&mut self, analysis: AnalysisResult, now: DateTime<Utc>) {
        self.analysis = Some(analysis);
        self.updated_at = Some(now);
    }

    pub fn assign_owner(&mut self, owner: UserId) {
        self.owner_user_id = Some(owner);
    }

    pub(crate) fn transition(
        &mut self,
        to: AlertStatus,
        now: DateTime<Utc>,
    ) -> Option<DomainEvent> {
        if self.status == to {
            return None;
        }
        let from = self.status;
        self.status = to;
        self.updated_at = Some(now);
        Some(DomainEvent::AlertStatusChanged(AlertStatusChanged {
            alert_id: self.id.clone(),
            from,
            to,
            occurred_at: now,
        }))
    }

    pub fn is_citizen(&self) -> bool {
        self.source_type.starts_with(CITIZEN_SOURCE_PREFIX)
    }

    pub fn id(&self) -> &AlertId {
        &self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn source_type(&self) -> &str {
        &self.source_type
    }

    pub fn risk_score(&self) -> u8 {
        self.risk_score
    }

    pub fn status(&self) -> AlertStatus {
        self.status
    }

    pub fn analysis_note(&self) -> Option<&str> {
        self.analysis_note.as_deref()
    }

    pub fn citizen(&self) -> Option<&CitizenReport> {
        self.citizen.as_ref()
    }

    pub fn analysis(&self) -> Option<&AnalysisResult> {
        self.analysis.as_ref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn owner_user_id(&self) -> Option<&UserId> {
        self.owner_user_id.as_ref()
    }
}
