use async_trait::async_trait;
use tracing::debug;

use scout_ports::error::PortError;
use scout_ports::outbound::ScanQueue;
use scout_ports::types::ScanTask;

use super::{decode, encode, persistence, timestamp, SqliteDb};

#[async_trait]
impl ScanQueue for SqliteDb {
    async fn enqueue(&self, task: ScanTask) -> Result<(), PortError> {
        let data = encode(&task)?;

        sqlx::query("INSERT INTO scan_tasks (id, data, enqueued_at) VALUES (?, ?, ?)")
            .bind(&task.id)
            .bind(&data)
            .bind(timestamp(task.enqueued_at))
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Connection(e.to_string()))?;

        debug!(task_id = %task.id, mode = ?task.mode, "scan task queued");
        Ok(())
    }

    async fn claim(&self, limit: usize) -> Result<Vec<ScanTask>, PortError> {
        // single statement so two claimers never receive the same task
        let mut rows: Vec<(i64, String)> = sqlx::query_as(
            "DELETE FROM scan_tasks
             WHERE seq IN (SELECT seq FROM scan_tasks ORDER BY seq LIMIT ?)
             RETURNING seq, data",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(persistence)?;

        rows.sort_by_key(|(seq, _)| *seq);
        rows.iter().map(|(_, data)| decode(data)).collect()
    }
}
