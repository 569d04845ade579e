use async_trait::async_trait;
use chrono::{DateTime, Utc};

use scout_core::user::{Session, User};
use scout_ports::error::PortError;
use scout_ports::outbound::{SessionRepository, UserRepository};

use super::{decode, encode, persistence, timestamp, SqliteDb};

#[async_trait]
impl UserRepository for SqliteDb {
    async fn save(&self, user: &User) -> Result<(), PortError> {
        let data = encode(user)?;

        sqlx::query(
            "INSERT INTO users (email, data) VALUES (?, ?)
             ON CONFLICT(email) DO UPDATE SET data = excluded.data",
        )
        .bind(user.email())
        .bind(&data)
        .execute(&self.pool)
        .await
        .map_err(persistence)?;

        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, PortError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT data FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(persistence)?;
        row.map(|(data,)| decode(&data)).transpose()
    }
}

#[async_trait]
impl SessionRepository for SqliteDb {
    async fn save(&self, session: &Session) -> Result<(), PortError> {
        let data = encode(session)?;

        sqlx::query("INSERT INTO sessions (token, data, expires_at) VALUES (?, ?, ?)")
            .bind(session.token())
            .bind(&data)
            .bind(timestamp(session.expires_at()))
            .execute(&self.pool)
            .await
            .map_err(persistence)?;

        Ok(())
    }

    async fn find(&self, token: &str) -> Result<Option<Session>, PortError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT data FROM sessions WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await
            .map_err(persistence)?;
        row.map(|(data,)| decode(&data)).transpose()
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, PortError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(timestamp(now))
            .execute(&self.pool)
            .await
            .map_err(persistence)?;
        Ok(result.rows_affected())
    }
}
