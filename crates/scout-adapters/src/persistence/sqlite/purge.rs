use async_trait::async_trait;

use scout_ports::error::PortError;
use scout_ports::outbound::IncidentPurge;
use scout_ports::types::PurgedRows;

use super::{persistence, SqliteDb};

#[async_trait]
impl IncidentPurge for SqliteDb {
    async fn purge(&self, alert_id: &str) -> Result<Option<PurgedRows>, PortError> {
        let mut tx = self.pool.begin().await.map_err(persistence)?;

        let reports = sqlx::query("DELETE FROM reports WHERE alert_id = ?")
            .bind(alert_id)
            .execute(&mut *tx)
            .await
            .map_err(persistence)?
            .rows_affected();
        let evidences = sqlx::query("DELETE FROM evidences WHERE alert_id = ?")
            .bind(alert_id)
            .execute(&mut *tx)
            .await
            .map_err(persistence)?
            .rows_affected();
        let dispatches = sqlx::query("DELETE FROM shield_dispatches WHERE incident_id = ?")
            .bind(alert_id)
            .execute(&mut *tx)
            .await
            .map_err(persistence)?
            .rows_affected();
        let alerts = sqlx::query("DELETE FROM alerts WHERE id = ?")
            .bind(alert_id)
            .execute(&mut *tx)
            .await
            .map_err(persistence)?
            .rows_affected();

        if alerts == 0 {
            tx.rollback().await.map_err(persistence)?;
            return Ok(None);
        }
        tx.commit().await.map_err(persistence)?;

        Ok(Some(PurgedRows {
            reports,
            evidences,
            dispatches,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::sqlite::test_support::{db, ts};
    use scout_core::alert::{Alert, AlertPatch, AlertStatus};
    use scout_core::evidence::{Evidence, SCREENSHOT};
    use scout_core::report::Report;
    use scout_core::shield::{DispatchRequest, PlaybookActionType, ShieldDispatch};
    use scout_ports::outbound::{
        AlertRepository, DispatchRepository, EvidenceRepository, ReportRepository,
    };

    fn confirmed_alert() -> Alert {
        let at = ts("2025-01-15T09:00:00Z");
        let (mut alert, _) = Alert::new("https://x.bj".into(), "WEB".into(), 90, at);
        alert
            .update(
                AlertPatch {
                    status: Some(AlertStatus::Confirmed),
                    analysis_note: Some("verifie".into()),
                },
                at,
            )
            .unwrap();
        alert
    }

    async fn seed(db: &SqliteDb, alert: &mut Alert, hash: &str) {
        AlertRepository::save(db, alert).await.unwrap();
        EvidenceRepository::insert(
            db,
            &Evidence::new(
                alert.id().clone(),
                SCREENSHOT,
                format!("screenshots/{hash}.png"),
                hash.to_string(),
                None,
                serde_json::json!({}),
                ts("2025-01-15T09:30:00Z"),
            ),
        )
        .await
        .unwrap();
        let report = Report::generate(alert, &[], None, ts("2025-01-15T09:40:00Z")).0;
        ReportRepository::save(db, &report).await.unwrap();
        let request = DispatchRequest {
            action_type: PlaybookActionType::UserNotify,
            reason: None,
            requested_by: None,
        };
        let dispatch = ShieldDispatch::open(alert, &request, ts("2025-01-15T10:00:00Z"))
            .unwrap()
            .0;
        DispatchRepository::save(db, &dispatch).await.unwrap();
    }

    #[tokio::test]
    async fn removes_the_alert_and_its_rows_only() {
        let db = db().await;
        let mut doomed = confirmed_alert();
        let mut kept = confirmed_alert();
        seed(&db, &mut doomed, "aaa").await;
        seed(&db, &mut kept, "bbb").await;

        let id = doomed.id().to_string();
        let rows = db.purge(&id).await.unwrap().unwrap();
        assert_eq!(
            rows,
            PurgedRows {
                reports: 1,
                evidences: 1,
                dispatches: 1
            }
        );

        assert!(AlertRepository::find_by_id(&db, &id).await.unwrap().is_none());
        assert!(EvidenceRepository::list_for_alert(&db, &id).await.unwrap().is_empty());
        assert!(ReportRepository::list_for_alert(&db, &id).await.unwrap().is_empty());
        assert!(db.list_for_incident(&id, 10).await.unwrap().is_empty());

        let other = kept.id().to_string();
        assert!(AlertRepository::find_by_id(&db, &other).await.unwrap().is_some());
        assert_eq!(EvidenceRepository::list_for_alert(&db, &other).await.unwrap().len(), 1);
        assert_eq!(ReportRepository::count(&db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unknown_alert_is_none_and_keeps_orphans() {
        let db = db().await;
        let mut alert = confirmed_alert();
        seed(&db, &mut alert, "ccc").await;

        let missing = "00000000-0000-0000-0000-000000000000";
        assert_eq!(db.purge(missing).await.unwrap(), None);
        assert_eq!(ReportRepository::count(&db).await.unwrap(), 1);
    }
}
