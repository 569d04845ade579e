use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::alert::AlertStatus;
use crate::ids::{AlertId, DispatchId, ReportId};
use crate::incident::{DecisionAction, DecisionStatus};
use crate::shield::{OperatorStatus, PlaybookActionType};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DomainEvent {
    AlertCreated(AlertCreated),
    AlertStatusChanged(AlertStatusChanged),
    AlertDeleted(AlertDeleted),
    IncidentDecided(IncidentDecided),
    ShieldDispatched(ShieldDispatched),
    OperatorReported(OperatorReported),
    ReportGenerated(ReportGenerated),
}

impl DomainEvent {
    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            Self::AlertCreated(e) => e.occurred_at,
            Self::AlertStatusChanged(e) => e.occurred_at,
            Self::AlertDeleted(e) => e.occurred_at,
            Self::IncidentDecided(e) => e.occurred_at,
            Self::ShieldDispatched(e) => e.occurred_at,
            Self::OperatorReported(e) => e.occurred_at,
            Self::ReportGenerated(e) => e.occurred_at,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::AlertCreated(_) => "alert.created",
            Self::AlertStatusChanged(_) => "alert.status_changed",
            Self::AlertDeleted(_) => "alert.deleted",
            Self::IncidentDecided(_) => "incident.decided",
            Self::ShieldDispatched(_) => "shield.dispatched",
            Self::OperatorReported(_) => "shield.operator_reported",
            Self::ReportGenerated(_) => "report.generated",
        }
    }

    pub fn alert_id(&self) -> &AlertId {
        match self {
            Self::AlertCreated(e) => &e.alert_id,
            Self::AlertStatusChanged(e) => &e.alert_id,
            Self::AlertDeleted(e) => &e.alert_id,
            Self::IncidentDecided(e) => &e.alert_id,
            Self::ShieldDispatched(e) => &e.alert_id,
            Self::OperatorReported(e) => &e.alert_id,
            Self::ReportGenerated(e) => &e.alert_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertCreated {
    pub alert_id: AlertId,
    pub source_type: String,
    pub risk_score: u8,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertStatusChanged {
    pub alert_id: AlertId,
    pub from: AlertStatus,
    pub to: AlertStatus,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertDeleted {
    pub alert_id: AlertId,
    pub deleted_reports: u64,
    pub deleted_evidences: u64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncidentDecided {
    pub alert_id: AlertId,
    pub action: DecisionAction,
    pub decision_status: DecisionStatus,
    pub decided_by: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShieldDispatched {
    pub dispatch_id: DispatchId,
    pub alert_id: AlertId,
    pub action_type: PlaybookActionType,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperatorReported {
    pub dispatch_id: DispatchId,
    pub alert_id: AlertId,
    pub operator_status: OperatorStatus,
    pub decision_status: DecisionStatus,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportGenerated {
    pub report_id: ReportId,
    pub alert_id: AlertId,
    pub report_hash: String,
    pub occurred_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        chrono::DateTime::parse_from_rfc3339("2025-01-15T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn event_types_are_unique_strings() {
        let types = [
            "alert.created",
            "alert.status_changed",
            "alert.deleted",
            "incident.decided",
            "shield.dispatched",
            "shield.operator_reported",
            "report.generated",
        ];
        let mut unique = std::collections::HashSet::new();
        for t in &types {
            assert!(unique.insert(t), "duplicate event type: {t}");
        }
    }

    #[test]
    fn events_carry_sufficient_context() {
        let alert_id = AlertId::new();
        let event = DomainEvent::AlertStatusChanged(AlertStatusChanged {
            alert_id: alert_id.clone(),
            from: AlertStatus::New,
            to: AlertStatus::Confirmed,
            occurred_at: now(),
        });
        assert_eq!(event.event_type(), "alert.status_changed");
        assert_eq!(event.occurred_at(), now());
        assert_eq!(event.alert_id(), &alert_id);
    }

    #[test]
    fn operator_event_serializes_wire_statuses() {
        let event = DomainEvent::OperatorReported(OperatorReported {
            dispatch_id: DispatchId::new(),
            alert_id: AlertId::new(),
            operator_status: OperatorStatus::Executed,
            decision_status: DecisionStatus::Executed,
            occurred_at: now(),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["OperatorReported"]["operator_status"], "EXECUTED");
    }
}
