use async_trait::async_trait;

use scout_core::alert::Alert;
use scout_core::ids::UserId;
use scout_ports::error::PortError;
use scout_ports::outbound::AlertRepository;
use scout_ports::types::AlertFilter;

use super::{decode, decode_rows, encode, persistence, timestamp, SqliteDb};

/// Lowercased phone and message, matched by substring.
fn search_text(alert: &Alert) -> String {
    alert
        .citizen()
        .map(|c| format!("{}\n{}", c.phone_number, c.message).to_lowercase())
        .unwrap_or_default()
}

fn where_clause(filter: &AlertFilter) -> (String, Vec<String>) {
    let mut sql = String::from(" WHERE 1=1");
    let mut binds: Vec<String> = Vec::new();

    if let Some(status) = &filter.status {
        sql.push_str(" AND status = ?");
        binds.push(status.as_str().to_string());
    }
    if filter.citizen_only {
        sql.push_str(" AND is_citizen = 1");
    }
    if let Some(owner) = &filter.owner {
        sql.push_str(" AND owner_user_id = ?");
        binds.push(owner.to_string());
    }
    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        sql.push_str(" AND instr(search_text, ?) > 0");
        binds.push(search.to_lowercase());
    }
    (sql, binds)
}

#[async_trait]
impl AlertRepository for SqliteDb {
    async fn save(&self, alert: &Alert) -> Result<(), PortError> {
        let data = encode(alert)?;
        let phone = alert.citizen().map(|c| c.phone_number.clone());

        sqlx::query(
            "INSERT INTO alerts (id, status, source_type, is_citizen, phone, search_text,
                                 risk_score, owner_user_id, data, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                status = excluded.status,
                source_type = excluded.source_type,
                is_citizen = excluded.is_citizen,
                phone = excluded.phone,
                search_text = excluded.search_text,
                risk_score = excluded.risk_score,
                owner_user_id = excluded.owner_user_id,
                data = excluded.data",
        )
        .bind(alert.id().to_string())
        .bind(alert.status().as_str())
        .bind(alert.source_type())
        .bind(alert.is_citizen())
        .bind(phone)
        .bind(search_text(alert))
        .bind(i64::from(alert.risk_score()))
        .bind(alert.owner_user_id().map(UserId::to_string))
        .bind(&data)
        .bind(timestamp(alert.created_at()))
        .execute(&self.pool)
        .await
        .map_err(persistence)?;

        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Alert>, PortError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT data FROM alerts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(persistence)?;

        row.map(|(data,)| decode(&data)).transpose()
    }

    async fn find_by_filter(&self, filter: &AlertFilter) -> Result<Vec<Alert>, PortError> {
        let (clause, binds) = where_clause(filter);
        let sql = format!(
            "SELECT data FROM alerts{clause} ORDER BY created_at DESC, rowid DESC LIMIT {} OFFSET {}",
            filter.page.limit, filter.page.skip
        );

        let mut query = sqlx::query_as::<_, (String,)>(&sql);
        for b in &binds {
            query = query.bind(b);
        }
        let rows = query.fetch_all(&self.pool).await.map_err(persistence)?;
        decode_rows(rows)
    }

    async fn count_by_filter(&self, filter: &AlertFilter) -> Result<u64, PortError> {
        let (clause, binds) = where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM alerts{clause}");

        let mut query = sqlx::query_as::<_, (i64,)>(&sql);
        for b in &binds {
            query = query.bind(b);
        }
        let (count,) = query.fetch_one(&self.pool).await.map_err(persistence)?;
        Ok(count as u64)
    }

    async fn find_by_phone(&self, phone: &str) -> Result<Vec<Alert>, PortError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT data FROM alerts WHERE phone = ? ORDER BY created_at DESC, rowid DESC",
        )
        .bind(phone)
        .fetch_all(&self.pool)
        .await
        .map_err(persistence)?;
        decode_rows(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::sqlite::test_support::{db, ts};
    use scout_core::alert::{AlertPatch, AlertStatus, CitizenReport};
    use scout_core::signal::SignalChannel;
    use scout_ports::types::Page;

    fn web_alert(created: &str) -> Alert {
        Alert::new("https://scam.bj".into(), "WEB".into(), 60, ts(created)).0
    }

    fn citizen_alert(phone: &str, message: &str, created: &str) -> Alert {
        let report = CitizenReport {
            phone_number: phone.into(),
            message: message.into(),
            channel: SignalChannel::MobileApp,
        };
        Alert::from_citizen_report(report, None, 40, ts(created)).0
    }

    #[tokio::test]
    async fn save_and_find_by_id() {
        let db = db().await;
        let alert = citizen_alert("+22990000001", "Code OTP urgent", "2025-01-15T10:00:00Z");
        let id = alert.id().to_string();

        db.save(&alert).await.unwrap();

        let found = db.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(found.id(), alert.id());
        assert_eq!(found.citizen(), alert.citizen());
        assert_eq!(found.source_type(), "CITIZEN_MOBILE_APP");
    }

    #[tokio::test]
    async fn find_by_id_returns_none() {
        let db = db().await;
        let found = db
            .find_by_id("00000000-0000-0000-0000-000000000000")
            .await
            .unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn save_updates_existing() {
        let db = db().await;
        let mut alert = web_alert("2025-01-15T10:00:00Z");
        let id = alert.id().to_string();
        db.save(&alert).await.unwrap();

        alert
            .update(
                AlertPatch {
                    status: Some(AlertStatus::InReview),
                    analysis_note: None,
                },
                ts("2025-01-15T10:01:00Z"),
            )
            .unwrap();
        db.save(&alert).await.unwrap();

        let found = db.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(found.status(), AlertStatus::InReview);
        assert_eq!(db.count_by_filter(&AlertFilter::default()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn filter_by_status_citizen_and_search() {
        let db = db().await;
        let web = web_alert("2025-01-15T09:00:00Z");
        let first = citizen_alert("+22990000001", "Votre compte MTN est bloque", "2025-01-15T10:00:00Z");
        let second = citizen_alert("+22997000002", "Envoyez le code", "2025-01-15T11:00:00Z");
        for a in [&web, &first, &second] {
            db.save(a).await.unwrap();
        }

        let all = db.find_by_filter(&AlertFilter::default()).await.unwrap();
        assert_eq!(all[0].id(), second.id());
        assert_eq!(all[2].id(), web.id());

        let citizen = AlertFilter {
            citizen_only: true,
            ..Default::default()
        };
        assert_eq!(db.count_by_filter(&citizen).await.unwrap(), 2);

        let search = AlertFilter {
            search: Some("mtn".into()),
            ..Default::default()
        };
        let found = db.find_by_filter(&search).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id(), first.id());

        let by_phone = AlertFilter {
            search: Some("97000".into()),
            ..Default::default()
        };
        assert_eq!(db.count_by_filter(&by_phone).await.unwrap(), 1);

        let wildcard = AlertFilter {
            search: Some("%".into()),
            ..Default::default()
        };
        assert_eq!(db.count_by_filter(&wildcard).await.unwrap(), 0);

        let confirmed = AlertFilter {
            status: Some(AlertStatus::Confirmed),
            ..Default::default()
        };
        assert!(db.find_by_filter(&confirmed).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn filter_paginates() {
        let db = db().await;
        for hour in 10..15 {
            db.save(&web_alert(&format!("2025-01-15T{hour}:00:00Z")))
                .await
                .unwrap();
        }
        let filter = AlertFilter {
            page: Page { skip: 1, limit: 2 },
            ..Default::default()
        };
        let page = db.find_by_filter(&filter).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].created_at(), ts("2025-01-15T13:00:00Z"));
        assert_eq!(db.count_by_filter(&filter).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn find_by_phone_newest_first() {
        let db = db().await;
        let a = citizen_alert("+22990000001", "premier message", "2025-01-15T10:00:00Z");
        let b = citizen_alert("+22990000001", "second message", "2025-01-16T10:00:00Z");
        let c = citizen_alert("+22990000009", "autre numero", "2025-01-16T10:00:00Z");
        for alert in [&a, &b, &c] {
            db.save(alert).await.unwrap();
        }

        let same = db.find_by_phone("+22990000001").await.unwrap();
        assert_eq!(same.len(), 2);
        assert_eq!(same[0].id(), b.id());
        assert_eq!(same[1].id(), a.id());
        assert!(db.find_by_phone("+22990000002").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn filter_by_owner() {
        let db = db().await;
        let owner = UserId::new();
        let mut owned = citizen_alert("+22990000011", "signalement PME", "2025-01-15T10:00:00Z");
        owned.assign_owner(owner.clone());
        let public = citizen_alert("+22990000010", "signalement public", "2025-01-15T11:00:00Z");
        db.save(&owned).await.unwrap();
        db.save(&public).await.unwrap();

        let mine = AlertFilter {
            owner: Some(owner),
            ..Default::default()
        };
        let found = db.find_by_filter(&mine).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id(), owned.id());
        assert_eq!(db.count_by_filter(&mine).await.unwrap(), 1);

        let stranger = AlertFilter {
            owner: Some(UserId::new()),
            citizen_only: true,
            ..Default::default()
        };
        assert_eq!(db.count_by_filter(&stranger).await.unwrap(), 0);
    }
}
