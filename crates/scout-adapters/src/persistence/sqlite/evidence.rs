use async_trait::async_trait;

use scout_core::evidence::Evidence;
use scout_ports::error::PortError;
use scout_ports::outbound::EvidenceRepository;
use scout_ports::types::Page;

use super::{decode, decode_rows, encode, persistence, timestamp, SqliteDb};

#[async_trait]
impl EvidenceRepository for SqliteDb {
    async fn insert(&self, evidence: &Evidence) -> Result<(), PortError> {
        let data = encode(evidence)?;

        sqlx::query(
            "INSERT INTO evidences (id, alert_id, file_hash, file_name, data, captured_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(evidence.id().to_string())
        .bind(evidence.alert_id().to_string())
        .bind(evidence.file_hash())
        .bind(evidence.file_name())
        .bind(&data)
        .bind(timestamp(evidence.captured_at()))
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                PortError::Conflict(format!("evidence hash {} already stored", evidence.file_hash()))
            }
            other => persistence(other),
        })?;

        Ok(())
    }

    async fn save(&self, evidence: &Evidence) -> Result<(), PortError> {
        let data = encode(evidence)?;

        sqlx::query(
            "INSERT INTO evidences (id, alert_id, file_hash, file_name, data, captured_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET data = excluded.data",
        )
        .bind(evidence.id().to_string())
        .bind(evidence.alert_id().to_string())
        .bind(evidence.file_hash())
        .bind(evidence.file_name())
        .bind(&data)
        .bind(timestamp(evidence.captured_at()))
        .execute(&self.pool)
        .await
        .map_err(persistence)?;

        Ok(())
    }

    async fn find_by_hash(&self, hash: &str) -> Result<Option<Evidence>, PortError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT data FROM evidences WHERE file_hash = ?")
                .bind(hash)
                .fetch_optional(&self.pool)
                .await
                .map_err(persistence)?;
        row.map(|(data,)| decode(&data)).transpose()
    }

    async fn find_by_file_name(&self, name: &str) -> Result<Option<Evidence>, PortError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT data FROM evidences WHERE file_name = ? LIMIT 1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await
                .map_err(persistence)?;
        row.map(|(data,)| decode(&data)).transpose()
    }

    async fn list_for_alert(&self, alert_id: &str) -> Result<Vec<Evidence>, PortError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT data FROM evidences WHERE alert_id = ? ORDER BY captured_at DESC, rowid DESC",
        )
        .bind(alert_id)
        .fetch_all(&self.pool)
        .await
        .map_err(persistence)?;
        decode_rows(rows)
    }

    async fn list(&self, page: Page) -> Result<Vec<Evidence>, PortError> {
        let sql = format!(
            "SELECT data FROM evidences ORDER BY captured_at DESC, rowid DESC LIMIT {} OFFSET {}",
            page.limit, page.skip
        );
        let rows: Vec<(String,)> = sqlx::query_as(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(persistence)?;
        decode_rows(rows)
    }
}
