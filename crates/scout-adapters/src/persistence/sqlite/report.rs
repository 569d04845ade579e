use async_trait::async_trait;

use scout_core::ids::UserId;
use scout_core::report::Report;
use scout_ports::error::PortError;
use scout_ports::outbound::ReportRepository;
use scout_ports::types::Page;

use super::{decode, decode_rows, encode, persistence, timestamp, SqliteDb};

#[async_trait]
impl ReportRepository for SqliteDb {
    async fn save(&self, report: &Report) -> Result<(), PortError> {
        let data = encode(report)?;

        sqlx::query(
            "INSERT INTO reports (id, alert_id, data, generated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET data = excluded.data",
        )
        .bind(report.id().to_string())
        .bind(report.alert_id().to_string())
        .bind(&data)
        .bind(timestamp(report.generated_at()))
        .execute(&self.pool)
        .await
        .map_err(persistence)?;

        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Report>, PortError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT data FROM reports WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(persistence)?;
        row.map(|(data,)| decode(&data)).transpose()
    }

    async fn list(&self, owner: Option<&UserId>, page: Page) -> Result<Vec<Report>, PortError> {
        let scope = if owner.is_some() {
            " WHERE alert_id IN (SELECT id FROM alerts WHERE owner_user_id = ?)"
        } else {
            ""
        };
        let sql = format!(
            "SELECT data FROM reports{scope} ORDER BY generated_at DESC, rowid DESC LIMIT {} OFFSET {}",
            page.limit, page.skip
        );
        let mut query = sqlx::query_as::<_, (String,)>(&sql);
        if let Some(owner) = owner {
            query = query.bind(owner.to_string());
        }
        let rows = query.fetch_all(&self.pool).await.map_err(persistence)?;
        decode_rows(rows)
    }

    async fn list_for_alert(&self, alert_id: &str) -> Result<Vec<Report>, PortError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT data FROM reports WHERE alert_id = ? ORDER BY generated_at DESC, rowid DESC",
        )
        .bind(alert_id)
        .fetch_all(&self.pool)
        .await
        .map_err(persistence)?;
        decode_rows(rows)
    }

    async fn count(&self) -> Result<u64, PortError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM reports")
            .fetch_one(&self.pool)
            .await
            .map_err(persistence)?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::sqlite::test_support::{db, ts};
    use scout_core::alert::Alert;
    use scout_ports::outbound::AlertRepository;

    fn report_at(alert: &Alert, at: &str) -> Report {
        Report::generate(alert, &[], Some("analyst@scout.bj".into()), ts(at)).0
    }

    #[tokio::test]
    async fn stored_report_still_verifies() {
        let db = db().await;
        let (alert, _) = Alert::new("https://x.bj".into(), "WEB".into(), 70, ts("2025-01-15T09:00:00Z"));
        let report = report_at(&alert, "2025-01-15T10:00:00Z");
        ReportRepository::save(&db, &report).await.unwrap();

        let found = ReportRepository::find_by_id(&db, &report.id().to_string())
            .await
            .unwrap()
            .unwrap();
        assert!(found.verify());
        assert_eq!(found.report_hash(), report.report_hash());
        assert_eq!(found.generated_by(), Some("analyst@scout.bj"));
    }

    #[tokio::test]
    async fn listing_and_counting() {
        let db = db().await;
        let (first, _) = Alert::new("https://a.bj".into(), "WEB".into(), 70, ts("2025-01-15T09:00:00Z"));
        let (second, _) = Alert::new("https://b.bj".into(), "WEB".into(), 70, ts("2025-01-15T09:00:00Z"));
        ReportRepository::save(&db, &report_at(&first, "2025-01-15T10:00:00Z")).await.unwrap();
        ReportRepository::save(&db, &report_at(&first, "2025-01-15T12:00:00Z")).await.unwrap();
        let latest = report_at(&second, "2025-01-15T13:00:00Z");
        ReportRepository::save(&db, &latest).await.unwrap();

        let listed = db.list(None, Page::default()).await.unwrap();
        assert_eq!(listed[0].id(), latest.id());
        assert_eq!(db.count().await.unwrap(), 3);
        assert_eq!(db.list_for_alert(&first.id().to_string()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn owner_scope_follows_the_alert() {
        let db = db().await;
        let owner = UserId::new();
        let (mut owned, _) = Alert::new("https://a.bj".into(), "WEB".into(), 70, ts("2025-01-15T09:00:00Z"));
        owned.assign_owner(owner.clone());
        let (other, _) = Alert::new("https://b.bj".into(), "WEB".into(), 70, ts("2025-01-15T09:00:00Z"));
        AlertRepository::save(&db, &owned).await.unwrap();
        AlertRepository::save(&db, &other).await.unwrap();
        let mine = report_at(&owned, "2025-01-15T10:00:00Z");
        ReportRepository::save(&db, &mine).await.unwrap();
        ReportRepository::save(&db, &report_at(&other, "2025-01-15T11:00:00Z")).await.unwrap();

        let scoped = db.list(Some(&owner), Page::default()).await.unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].id(), mine.id());
        assert!(db.list(Some(&UserId::new()), Page::default()).await.unwrap().is_empty());
        assert_eq!(db.list(None, Page::default()).await.unwrap().len(), 2);
    }
}
