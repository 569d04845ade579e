use async_trait::async_trait;

use scout_core::ids::UserId;
use scout_core::source::{MonitoringSource, ScrapingRun};
use scout_ports::error::PortError;
use scout_ports::outbound::{RunRepository, SourceRepository};
use scout_ports::types::Page;

use super::{decode, decode_rows, encode, persistence, timestamp, SqliteDb};

#[async_trait]
impl SourceRepository for SqliteDb {
    async fn save(&self, source: &MonitoringSource) -> Result<(), PortError> {
        let data = encode(source)?;

        sqlx::query(
            "INSERT INTO monitoring_sources (id, is_active, owner_user_id, data, created_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                is_active = excluded.is_active,
                owner_user_id = excluded.owner_user_id,
                data = excluded.data",
        )
        .bind(source.id().to_string())
        .bind(source.is_active())
        .bind(source.owner_user_id().map(UserId::to_string))
        .bind(&data)
        .bind(timestamp(source.created_at()))
        .execute(&self.pool)
        .await
        .map_err(persistence)?;

        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<MonitoringSource>, PortError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT data FROM monitoring_sources WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(persistence)?;
        row.map(|(data,)| decode(&data)).transpose()
    }

    async fn list(
        &self,
        owner: Option<&UserId>,
        page: Page,
    ) -> Result<Vec<MonitoringSource>, PortError> {
        let scope = if owner.is_some() { " WHERE owner_user_id = ?" } else { "" };
        let sql = format!(
            "SELECT data FROM monitoring_sources{scope}
             ORDER BY created_at DESC, rowid DESC LIMIT {} OFFSET {}",
            page.limit, page.skip
        );
        let mut query = sqlx::query_as::<_, (String,)>(&sql);
        if let Some(owner) = owner {
            query = query.bind(owner.to_string());
        }
        let rows = query.fetch_all(&self.pool).await.map_err(persistence)?;
        decode_rows(rows)
    }

    async fn list_active(&self) -> Result<Vec<MonitoringSource>, PortError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT data FROM monitoring_sources WHERE is_active = 1 ORDER BY created_at, rowid",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(persistence)?;
        decode_rows(rows)
    }

    async fn count_active(&self) -> Result<u64, PortError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM monitoring_sources WHERE is_active = 1")
                .fetch_one(&self.pool)
                .await
                .map_err(persistence)?;
        Ok(count as u64)
    }

    async fn delete(&self, id: &str) -> Result<bool, PortError> {
        let result = sqlx::query("DELETE FROM monitoring_sources WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(persistence)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl RunRepository for SqliteDb {
    async fn save(&self, run: &ScrapingRun) -> Result<(), PortError> {
        let data = encode(run)?;

        sqlx::query(
            "INSERT INTO scraping_runs (id, source_id, data, started_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET data = excluded.data",
        )
        .bind(run.id().to_string())
        .bind(run.source_id().to_string())
        .bind(&data)
        .bind(timestamp(run.started_at()))
        .execute(&self.pool)
        .await
        .map_err(persistence)?;

        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<ScrapingRun>, PortError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT data FROM scraping_runs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(persistence)?;
        row.map(|(data,)| decode(&data)).transpose()
    }

    async fn list_for_source(
        &self,
        source_id: &str,
        page: Page,
    ) -> Result<Vec<ScrapingRun>, PortError> {
        let sql = format!(
            "SELECT data FROM scraping_runs WHERE source_id = ?
             ORDER BY started_at DESC, rowid DESC LIMIT {} OFFSET {}",
            page.limit, page.skip
        );
        let rows: Vec<(String,)> = sqlx::query_as(&sql)
            .bind(source_id)
            .fetch_all(&self.pool)
            .await
            .map_err(persistence)?;
        decode_rows(rows)
    }

    async fn list(&self, page: Page) -> Result<Vec<ScrapingRun>, PortError> {
        let sql = format!(
            "SELECT data FROM scraping_runs ORDER BY started_at DESC, rowid DESC LIMIT {} OFFSET {}",
            page.limit, page.skip
        );
        let rows: Vec<(String,)> = sqlx::query_as(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(persistence)?;
        decode_rows(rows)
    }

    async fn delete_for_source(&self, source_id: &str) -> Result<u64, PortError> {
        let result = sqlx::query("DELETE FROM scraping_runs WHERE source_id = ?")
            .bind(source_id)
            .execute(&self.pool)
            .await
            .map_err(persistence)?;
        Ok(result.rows_affected())
    }
}
