use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::alert::{Alert, AlertStatus};
use crate::error::DomainError;
use crate::events::{DomainEvent, OperatorReported, ShieldDispatched};
use crate::ids::{AlertId, DispatchId};
use crate::incident::{DecisionStatus, DEFAULT_AUTHOR};
use crate::vocabulary::define_vocabulary;

/// Dispatches kept in an incident's timeline, newest first.
pub const TIMELINE_LIMIT: usize = 100;
pub const SHIELD_DISPATCH_TAG: &str = "[SHIELD_DISPATCH]";
pub const OPERATOR_CALLBACK_TAG: &str = "[OPERATOR_CALLBACK]";
pub const SIMULATED_EXECUTION_NOTE: &str = "Simulation automatique operateur";

define_vocabulary!(
    PlaybookActionType, "playbook action" {
        BlockNumber => "BLOCK_NUMBER",
        SuspendWallet => "SUSPEND_WALLET",
        EnforceMfa => "ENFORCE_MFA",
        BlacklistAdd => "BLACKLIST_ADD",
        UserNotify => "USER_NOTIFY",
    }
);

define_vocabulary!(
    OperatorStatus, "operator status" {
        Sent => "SENT",
        Received => "RECEIVED",
        Executed => "EXECUTED",
        Failed => "FAILED",
    }
);

impl PlaybookActionType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::BlockNumber => "Blocage du numero",
            Self::SuspendWallet => "Suspension du wallet",
            Self::EnforceMfa => "Renforcement MFA",
            Self::BlacklistAdd => "Ajout en liste noire",
            Self::UserNotify => "Notification utilisateur",
        }
    }

    /// Executing these actions neutralises the reported subject itself.
    pub fn blocks_subject(&self) -> bool {
        matches!(self, Self::BlockNumber | Self::SuspendWallet)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRequest {
    pub action_type: PlaybookActionType,
    pub reason: Option<String>,
    pub requested_by: Option<String>,
}

/// Status report pushed by the (simulated) telecom operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorCallback {
    pub dispatch_id: DispatchId,
    pub incident_id: AlertId,
    pub operator_status: OperatorStatus,
    pub execution_note: Option<String>,
    pub external_ref: Option<String>,
}

impl OperatorCallback {
    /// Immediate EXECUTED report used when the caller asked for auto callback.
    pub fn simulated(dispatch: &ShieldDispatch) -> Self {
        Self {
            dispatch_id: dispatch.id.clone(),
            incident_id: dispatch.incident_id.clone(),
            operator_status: OperatorStatus::Executed,
            execution_note: Some(SIMULATED_EXECUTION_NOTE.to_string()),
            external_ref: Some(format!("SIM-{}", dispatch.id.short())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShieldDispatch {
    id: DispatchId,
    incident_id: AlertId,
    action_type: PlaybookActionType,
    operator_status: OperatorStatus,
    decision_status: DecisionStatus,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl ShieldDispatch {
    /// Send an action to the operator for a confirmed incident.
    pub fn open(
        alert: &mut Alert,
        request: &DispatchRequest,
        now: DateTime<Utc>,
    ) -> Result<(Self, Vec<DomainEvent>), DomainError> {
        alert.ensure_dispatchable()?;

        let dispatch = Self {
            id: DispatchId::new(),
            incident_id: alert.id().clone(),
            action_type: request.action_type,
            operator_status: OperatorStatus::Sent,
            decision_status: DecisionStatus::Pending,
            created_at: now,
            updated_at: None,
        };

        let requested_by = non_blank(request.requested_by.as_deref()).unwrap_or(DEFAULT_AUTHOR);
        let mut line = format!(
            "{SHIELD_DISPATCH_TAG} action={} by {requested_by} dispatch={}",
            dispatch.action_type, dispatch.id
        );
        if let Some(reason) = non_blank(request.reason.as_deref()) {
            line.push_str(&format!(" | {reason}"));
        }
        alert.append_note(&line, now);

        let events = vec![DomainEvent::ShieldDispatched(ShieldDispatched {
            dispatch_id: dispatch.id.clone(),
            alert_id: dispatch.incident_id.clone(),
            action_type: dispatch.action_type,
            occurred_at: now,
        })];
        Ok((dispatch, events))
    }

    /// Record an operator status report against this dispatch and its alert.
    pub fn apply_callback(
        &mut self,
        alert: &mut Alert,
        callback: &OperatorCallback,
        now: DateTime<Utc>,
    ) -> Result<Vec<DomainEvent>, DomainError> {
        if callback.incident_id != self.incident_id || alert.id() != &self.incident_id {
            return Err(DomainError::DispatchMismatch);
        }

        let mut events = Vec::new();
        let mut blocked = false;
        let decision_status = match callback.operator_status {
            OperatorStatus::Sent => {
                return Err(DomainError::InvalidOperatorStatus(OperatorStatus::Sent.as_str()))
            }
            OperatorStatus::Executed => {
                if self.action_type.blocks_subject() {
                    blocked = true;
                    events.extend(alert.transition(AlertStatus::BlockedSimulated, now));
                }
                DecisionStatus::Executed
            }
            OperatorStatus::Failed => {
                events.extend(alert.transition(AlertStatus::InReview, now));
                DecisionStatus::Escalated
            }
            OperatorStatus::Received => DecisionStatus::Pending,
        };

        let mut line = format!(
            "{OPERATOR_CALLBACK_TAG} status={} dispatch={} action={}",
            callback.operator_status, self.id, self.action_type
        );
        if let Some(note) = non_blank(callback.execution_note.as_deref()) {
            line.push_str(&format!(" | {note}"));
        }
        if let Some(reference) = non_blank(callback.external_ref.as_deref()) {
            line.push_str(&format!(" | ref={reference}"));
        }
        if blocked {
            line.push_str(" | blocked_simulated=true");
        }
        alert.append_note(&line, now);

        self.operator_status = callback.operator_status;
        self.decision_status = decision_status;
        self.updated_at = Some(now);

        events.push(DomainEvent::OperatorReported(OperatorReported {
            dispatch_id: self.id.clone(),
            alert_id: self.incident_id.clone(),
            operator_status: self.operator_status,
            decision_status,
            occurred_at: now,
        }));
        Ok(events)
    }

    pub fn id(&self) -> &DispatchId {
        &self.id
    }

    pub fn incident_id(&self) -> &AlertId {
        &self.incident_id
    }

    pub fn action_type(&self) -> PlaybookActionType {
        self.action_type
    }

    pub fn operator_status(&self) -> OperatorStatus {
        self.operator_status
    }

    pub fn decision_status(&self) -> DecisionStatus {
        self.decision_status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
