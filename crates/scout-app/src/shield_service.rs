use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use scout_core::alert::{Alert, AlertStatus};
use scout_core::ids::AlertId;
use scout_core::shield::{DispatchRequest, OperatorCallback, ShieldDispatch, TIMELINE_LIMIT};
use scout_ports::outbound::{AlertRepository, DispatchRepository, EventPublisher};

use crate::error::AppError;

#[derive(Debug, Clone, Serialize)]
pub struct DispatchOutcome {
    pub dispatch: ShieldDispatch,
    pub alert_status: AlertStatus,
    pub callback_required: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CallbackOutcome {
    pub dispatch: ShieldDispatch,
    pub alert_status: AlertStatus,
}

pub struct ShieldService<A, D, P>
where
    A: AlertRepository,
    D: DispatchRepository,
    P: EventPublisher,
{
    alerts: A,
    dispatches: D,
    events: P,
}

impl<A, D, P> ShieldService<A, D, P>
where
    A: AlertRepository,
    D: DispatchRepository,
    P: EventPublisher,
{
    pub fn new(alerts: A, dispatches: D, events: P) -> Self {
        Self {
            alerts,
            dispatches,
            events,
        }
    }

    /// Send a playbook action for a confirmed incident. With `auto_callback`
    /// the simulated operator reports execution straight away.
    pub async fn dispatch(
        &self,
        incident_id: &str,
        request: &DispatchRequest,
        auto_callback: bool,
        now: DateTime<Utc>,
    ) -> Result<DispatchOutcome, AppError> {
        let mut alert = self.find_alert(incident_id).await?;
        let (mut dispatch, mut events) = ShieldDispatch::open(&mut alert, request, now)?;

        if auto_callback {
            let callback = OperatorCallback::simulated(&dispatch);
            events.extend(dispatch.apply_callback(&mut alert, &callback, now)?);
        }

        self.dispatches.save(&dispatch).await?;
        self.alerts.save(&alert).await?;
        self.events.publish(events).await?;
        info!(
            dispatch_id = %dispatch.id(),
            incident_id = %alert.id(),
            action = %dispatch.action_type(),
            operator_status = %dispatch.operator_status(),
            "shield action dispatched"
        );
        Ok(DispatchOutcome {
            alert_status: alert.status(),
            dispatch,
            callback_required: !auto_callback,
        })
    }

    /// Apply an operator status report.
    pub async fn callback(
        &self,
        callback: &OperatorCallback,
        now: DateTime<Utc>,
    ) -> Result<CallbackOutcome, AppError> {
        let mut dispatch = self
            .dispatches
            .find_by_id(&callback.dispatch_id.to_string())
            .await?
            .ok_or(AppError::NotFound("dispatch"))?;
        if dispatch.incident_id() != &callback.incident_id {
            return Err(AppError::Conflict("Dispatch does not match incident".into()));
        }
        let mut alert = self.find_alert(&callback.incident_id.to_string()).await?;

        let events = dispatch.apply_callback(&mut alert, callback, now)?;
        self.dispatches.save(&dispatch).await?;
        self.alerts.save(&alert).await?;
        self.events.publish(events).await?;
        info!(
            dispatch_id = %dispatch.id(),
            operator_status = %dispatch.operator_status(),
            decision_status = %dispatch.decision_status(),
            "operator callback applied"
        );
        Ok(CallbackOutcome {
            alert_status: alert.status(),
            dispatch,
        })
    }

    /// Dispatches for an incident, newest first.
    pub async fn timeline(&self, incident_id: &str) -> Result<Vec<ShieldDispatch>, AppError> {
        let alert = self.find_alert(incident_id).await?;
        Ok(self
            .dispatches
            .list_for_incident(&alert.id().to_string(), TIMELINE_LIMIT)
            .await?)
    }

    async fn find_alert(&self, id: &str) -> Result<Alert, AppError> {
        let id = AlertId::parse(id)?;
        self.alerts
            .find_by_id(&id.to_string())
            .await?
            .ok_or(AppError::NotFound("incident"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use scout_core::alert::AlertPatch;
    use scout_core::error::DomainError;
    use scout_core::ids::DispatchId;
    use scout_core::incident::DecisionStatus;
    use scout_core::shield::{OperatorStatus, PlaybookActionType};

    type Service = ShieldService<MockAlertRepo, MockDispatchRepo, MockEventPublisher>;

    fn alert_with(status: AlertStatus) -> Alert {
        let (mut alert, _) = Alert::new("https://x.bj".into(), "WEB".into(), 90, now());
        alert
            .update(
                AlertPatch {
                    status: Some(status),
                    analysis_note: Some("verifie".into()),
                },
                now(),
            )
            .unwrap();
        alert
    }

    fn service(alert: &Alert) -> Service {
        ShieldService::new(
            MockAlertRepo::with(vec![alert.clone()]),
            MockDispatchRepo::default(),
            MockEventPublisher::default(),
        )
    }

    fn request(action_type: PlaybookActionType) -> DispatchRequest {
        DispatchRequest {
            action_type,
            reason: Some("numero frauduleux".into()),
            requested_by: Some("soc@scout.bj".into()),
        }
    }

    #[tokio::test]
    async fn dispatch_on_unconfirmed_incident_is_refused() {
        let alert = alert_with(AlertStatus::InReview);
        let svc = service(&alert);
        let err = svc
            .dispatch(&alert.id().to_string(), &request(PlaybookActionType::BlockNumber), true, now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Domain(DomainError::NotDispatchable)));
        assert!(svc.dispatches.dispatches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn auto_callback_blocks_subject() {
        let alert = alert_with(AlertStatus::Confirmed);
        let id = alert.id().to_string();
        let svc = service(&alert);

        let outcome = svc
            .dispatch(&id, &request(PlaybookActionType::BlockNumber), true, now())
            .await
            .unwrap();
        assert!(!outcome.callback_required);
        assert_eq!(outcome.dispatch.operator_status(), OperatorStatus::Executed);
        assert_eq!(outcome.dispatch.decision_status(), DecisionStatus::Executed);
        assert_eq!(outcome.alert_status, AlertStatus::BlockedSimulated);

        let note = svc.alerts.get(&id).analysis_note().unwrap().to_string();
        assert!(note.contains("[SHIELD_DISPATCH] action=BLOCK_NUMBER by soc@scout.bj"));
        assert!(note.contains("ref=SIM-"));
        assert!(note.ends_with("blocked_simulated=true"));
    }

    #[tokio::test]
    async fn manual_callback_flow() {
        let alert = alert_with(AlertStatus::Confirmed);
        let id = alert.id().to_string();
        let svc = service(&alert);

        let outcome = svc
            .dispatch(&id, &request(PlaybookActionType::UserNotify), false, now())
            .await
            .unwrap();
        assert!(outcome.callback_required);
        assert_eq!(outcome.dispatch.operator_status(), OperatorStatus::Sent);

        let callback = OperatorCallback {
            dispatch_id: outcome.dispatch.id().clone(),
            incident_id: alert.id().clone(),
            operator_status: OperatorStatus::Failed,
            execution_note: Some("operateur injoignable".into()),
            external_ref: None,
        };
        let result = svc.callback(&callback, now()).await.unwrap();
        assert_eq!(result.dispatch.decision_status(), DecisionStatus::Escalated);
        assert_eq!(result.alert_status, AlertStatus::InReview);
        assert_eq!(
            svc.events.types().last().copied(),
            Some("shield.operator_reported")
        );
    }

    #[tokio::test]
    async fn callback_for_unknown_or_foreign_dispatch() {
        let alert = alert_with(AlertStatus::Confirmed);
        let svc = service(&alert);
        let outcome = svc
            .dispatch(&alert.id().to_string(), &request(PlaybookActionType::EnforceMfa), false, now())
            .await
            .unwrap();

        let unknown = OperatorCallback {
            dispatch_id: DispatchId::new(),
            incident_id: alert.id().clone(),
            operator_status: OperatorStatus::Received,
            execution_note: None,
            external_ref: None,
        };
        let err = svc.callback(&unknown, now()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound("dispatch")));

        let foreign = OperatorCallback {
            dispatch_id: outcome.dispatch.id().clone(),
            incident_id: AlertId::new(),
            ..unknown
        };
        let err = svc.callback(&foreign, now()).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn timeline_is_newest_first() {
        let alert = alert_with(AlertStatus::Confirmed);
        let id = alert.id().to_string();
        let svc = service(&alert);
        let first = svc
            .dispatch(&id, &request(PlaybookActionType::BlacklistAdd), false, now())
            .await
            .unwrap();
        let second = svc
            .dispatch(&id, &request(PlaybookActionType::UserNotify), false, now())
            .await
            .unwrap();

        let timeline = svc.timeline(&id).await.unwrap();
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline[0].id(), second.dispatch.id());
        assert_eq!(timeline[1].id(), first.dispatch.id());
    }
}
