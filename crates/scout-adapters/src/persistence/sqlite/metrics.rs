use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use scout_core::alert::{Alert, AlertStatus};
use scout_core::stats::{AlertTotals, BandCounts, DayCount};
use scout_ports::error::PortError;
use scout_ports::outbound::AlertMetrics;

use super::{decode_rows, persistence, timestamp, SqliteDb};

#[async_trait]
impl AlertMetrics for SqliteDb {
    async fn totals(&self) -> Result<AlertTotals, PortError> {
        let (count, analyzed, average): (i64, i64, f64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(status <> 'NEW'), 0), COALESCE(AVG(risk_score), 0.0)
             FROM alerts",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(persistence)?;

        Ok(AlertTotals {
            count: count as u64,
            analyzed: analyzed as u64,
            average_risk: average,
        })
    }

    async fn count_by_risk_band(
        &self,
        medium_from: u8,
        high_from: u8,
    ) -> Result<BandCounts, PortError> {
        let (low, medium, high): (i64, i64, i64) = sqlx::query_as(
            "SELECT COALESCE(SUM(risk_score < ?1), 0),
                    COALESCE(SUM(risk_score >= ?1 AND risk_score < ?2), 0),
                    COALESCE(SUM(risk_score >= ?2), 0)
             FROM alerts",
        )
        .bind(i64::from(medium_from))
        .bind(i64::from(high_from))
        .fetch_one(&self.pool)
        .await
        .map_err(persistence)?;

        Ok(BandCounts {
            low: low as u64,
            medium: medium as u64,
            high: high as u64,
        })
    }

    async fn count_by_status(&self) -> Result<Vec<(AlertStatus, u64)>, PortError> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM alerts GROUP BY status ORDER BY status")
                .fetch_all(&self.pool)
                .await
                .map_err(persistence)?;

        rows.into_iter()
            .map(|(status, count)| {
                let status = status
                    .parse::<AlertStatus>()
                    .map_err(|e| PortError::Persistence(e.to_string()))?;
                Ok((status, count as u64))
            })
            .collect()
    }

    async fn count_created_since(&self, since: DateTime<Utc>) -> Result<u64, PortError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM alerts WHERE created_at >= ?")
            .bind(timestamp(since))
            .fetch_one(&self.pool)
            .await
            .map_err(persistence)?;
        Ok(count as u64)
    }

    async fn count_by_day(&self, since: DateTime<Utc>) -> Result<Vec<DayCount>, PortError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT substr(created_at, 1, 10) AS day, COUNT(*) FROM alerts
             WHERE created_at >= ? GROUP BY day ORDER BY day",
        )
        .bind(timestamp(since))
        .fetch_all(&self.pool)
        .await
        .map_err(persistence)?;

        rows.into_iter()
            .map(|(day, count)| {
                let date = NaiveDate::parse_from_str(&day, "%Y-%m-%d")
                    .map_err(|e| PortError::Persistence(format!("bad day `{day}`: {e}")))?;
                Ok(DayCount {
                    date,
                    count: count as u64,
                })
            })
            .collect()
    }

    async fn riskiest(
        &self,
        status: AlertStatus,
        min_risk: u8,
        limit: usize,
    ) -> Result<(u64, Vec<Alert>), PortError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM alerts WHERE status = ? AND risk_score >= ?")
                .bind(status.as_str())
                .bind(i64::from(min_risk))
                .fetch_one(&self.pool)
                .await
                .map_err(persistence)?;

        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT data FROM alerts WHERE status = ? AND risk_score >= ?
             ORDER BY risk_score DESC, created_at DESC, rowid DESC LIMIT ?",
        )
        .bind(status.as_str())
        .bind(i64::from(min_risk))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(persistence)?;

        Ok((count as u64, decode_rows(rows)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::sqlite::test_support::{db, ts};
    use scout_core::alert::AlertPatch;
    use scout_ports::outbound::AlertRepository;

    fn alert(score: i64, created: &str) -> Alert {
        Alert::new("https://x.bj".into(), "WEB".into(), score, ts(created)).0
    }

    fn confirmed(score: i64, created: &str) -> Alert {
        let mut alert = alert(score, created);
        alert
            .update(
                AlertPatch {
                    status: Some(AlertStatus::Confirmed),
                    analysis_note: Some("verifie".into()),
                },
                ts(created),
            )
            .unwrap();
        alert
    }

    async fn seeded() -> SqliteDb {
        let db = db().await;
        for a in [
            alert(10, "2025-01-05T12:00:00Z"),
            alert(34, "2025-01-09T00:00:00Z"),
            confirmed(35, "2025-01-14T08:00:00Z"),
            confirmed(90, "2025-01-15T09:00:00Z"),
            confirmed(95, "2025-01-15T10:00:00Z"),
        ] {
            db.save(&a).await.unwrap();
        }
        db
    }

    #[tokio::test]
    async fn empty_store_totals_are_zero() {
        let db = db().await;
        assert_eq!(db.totals().await.unwrap(), AlertTotals::default());
        assert_eq!(db.count_by_risk_band(30, 70).await.unwrap(), BandCounts::default());
        assert!(db.count_by_status().await.unwrap().is_empty());
        let (count, top) = db.riskiest(AlertStatus::Confirmed, 0, 3).await.unwrap();
        assert_eq!(count, 0);
        assert!(top.is_empty());
    }

    #[tokio::test]
    async fn totals_and_bands() {
        let db = seeded().await;
        let totals = db.totals().await.unwrap();
        assert_eq!(totals.count, 5);
        assert_eq!(totals.analyzed, 3);
        assert!((totals.average_risk - 52.8).abs() < 1e-9);

        let bands = db.count_by_risk_band(35, 65).await.unwrap();
        assert_eq!(
            bands,
            BandCounts {
                low: 2,
                medium: 1,
                high: 2
            }
        );
    }

    #[tokio::test]
    async fn counts_by_status_and_time() {
        let db = seeded().await;
        assert_eq!(
            db.count_by_status().await.unwrap(),
            vec![(AlertStatus::Confirmed, 3), (AlertStatus::New, 2)]
        );
        assert_eq!(db.count_created_since(ts("2025-01-09T00:00:00Z")).await.unwrap(), 4);

        let days = db.count_by_day(ts("2025-01-09T00:00:00Z")).await.unwrap();
        let shape: Vec<(String, u64)> =
            days.iter().map(|d| (d.date.to_string(), d.count)).collect();
        assert_eq!(
            shape,
            vec![
                ("2025-01-09".to_string(), 1),
                ("2025-01-14".to_string(), 1),
                ("2025-01-15".to_string(), 2),
            ]
        );
    }

    #[tokio::test]
    async fn riskiest_confirmed_first() {
        let db = seeded().await;
        let (count, top) = db.riskiest(AlertStatus::Confirmed, 85, 1).await.unwrap();
        assert_eq!(count, 2);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].risk_score(), 95);
        let (count, _) = db.riskiest(AlertStatus::New, 85, 3).await.unwrap();
        assert_eq!(count, 0);
    }
}
