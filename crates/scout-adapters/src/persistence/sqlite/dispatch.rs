use async_trait::async_trait;

use scout_core::shield::ShieldDispatch;
use scout_ports::error::PortError;
use scout_ports::outbound::DispatchRepository;

use super::{decode, decode_rows, encode, persistence, timestamp, SqliteDb};

#[async_trait]
impl DispatchRepository for SqliteDb {
    async fn save(&self, dispatch: &ShieldDispatch) -> Result<(), PortError> {
        let data = encode(dispatch)?;

        sqlx::query(
            "INSERT INTO shield_dispatches (id, incident_id, data, created_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET data = excluded.data",
        )
        .bind(dispatch.id().to_string())
        .bind(dispatch.incident_id().to_string())
        .bind(&data)
        .bind(timestamp(dispatch.created_at()))
        .execute(&self.pool)
        .await
        .map_err(persistence)?;

        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<ShieldDispatch>, PortError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT data FROM shield_dispatches WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(persistence)?;
        row.map(|(data,)| decode(&data)).transpose()
    }

    async fn list_for_incident(
        &self,
        incident_id: &str,
        limit: usize,
    ) -> Result<Vec<ShieldDispatch>, PortError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT data FROM shield_dispatches WHERE incident_id = ?
             ORDER BY created_at DESC, seq DESC LIMIT ?",
        )
        .bind(incident_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(persistence)?;
        decode_rows(rows)
    }
}
