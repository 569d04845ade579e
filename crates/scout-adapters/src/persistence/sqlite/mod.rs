mod alert;
mod dispatch;
mod event;
mod evidence;
mod metrics;
mod purge;
mod report;
mod scan_queue;
mod source;
mod user;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use scout_ports::error::PortError;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS alerts (
        id TEXT PRIMARY KEY,
        status TEXT NOT NULL,
        source_type TEXT NOT NULL,
        is_citizen INTEGER NOT NULL DEFAULT 0,
        phone TEXT,
        search_text TEXT NOT NULL DEFAULT '',
        risk_score INTEGER NOT NULL DEFAULT 0,
        owner_user_id TEXT,
        data TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_alerts_created ON alerts(created_at)",
    "CREATE INDEX IF NOT EXISTS idx_alerts_phone ON alerts(phone)",
    "CREATE INDEX IF NOT EXISTS idx_alerts_owner ON alerts(owner_user_id)",
    "CREATE INDEX IF NOT EXISTS idx_alerts_risk ON alerts(status, risk_score)",
    "CREATE TABLE IF NOT EXISTS evidences (
        id TEXT PRIMARY KEY,
        alert_id TEXT NOT NULL,
        file_hash TEXT NOT NULL UNIQUE,
        file_name TEXT NOT NULL,
        data TEXT NOT NULL,
        captured_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_evidences_alert ON evidences(alert_id)",
    "CREATE TABLE IF NOT EXISTS reports (
        id TEXT PRIMARY KEY,
        alert_id TEXT NOT NULL,
        data TEXT NOT NULL,
        generated_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_reports_alert ON reports(alert_id)",
    "CREATE TABLE IF NOT EXISTS shield_dispatches (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        incident_id TEXT NOT NULL,
        data TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_dispatches_incident ON shield_dispatches(incident_id)",
    "CREATE TABLE IF NOT EXISTS monitoring_sources (
        id TEXT PRIMARY KEY,
        is_active INTEGER NOT NULL,
        owner_user_id TEXT,
        data TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_sources_owner ON monitoring_sources(owner_user_id)",
    "CREATE TABLE IF NOT EXISTS scraping_runs (
        id TEXT PRIMARY KEY,
        source_id TEXT NOT NULL,
        data TEXT NOT NULL,
        started_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_runs_source ON scraping_runs(source_id)",
    "CREATE TABLE IF NOT EXISTS scan_tasks (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL,
        data TEXT NOT NULL,
        enqueued_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS users (
        email TEXT PRIMARY KEY,
        data TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS sessions (
        token TEXT PRIMARY KEY,
        data TEXT NOT NULL,
        expires_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS events (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        event_type TEXT NOT NULL,
        data TEXT NOT NULL,
        occurred_at TEXT NOT NULL
    )",
];

/// One pool implementing every repository port.
#[derive(Clone)]
pub struct SqliteDb {
    pool: SqlitePool,
}

impl SqliteDb {
    pub async fn new(url: &str) -> Result<Self, PortError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| PortError::Connection(e.to_string()))?;

        let db = Self { pool };
        db.init_schema().await?;
        Ok(db)
    }

    async fn init_schema(&self) -> Result<(), PortError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(persistence)?;
        }
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

pub(crate) fn persistence(e: sqlx::Error) -> PortError {
    PortError::Persistence(e.to_string())
}

/// Fixed-width UTC timestamp so that text ordering is time ordering.
pub(crate) fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<String, PortError> {
    serde_json::to_string(value).map_err(|e| PortError::Persistence(e.to_string()))
}

pub(crate) fn decode<T: DeserializeOwned>(data: &str) -> Result<T, PortError> {
    serde_json::from_str(data).map_err(|e| PortError::Persistence(e.to_string()))
}

pub(crate) fn decode_rows<T: DeserializeOwned>(rows: Vec<(String,)>) -> Result<Vec<T>, PortError> {
    rows.iter().map(|(data,)| decode(data)).collect()
}
