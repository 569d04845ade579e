use async_trait::async_trait;
use tracing::debug;

use scout_core::events::DomainEvent;
use scout_ports::error::PortError;
use scout_ports::outbound::EventPublisher;

use super::{encode, persistence, timestamp, SqliteDb};

/// Domain events are appended to an audit table.
#[async_trait]
impl EventPublisher for SqliteDb {
    async fn publish(&self, events: Vec<DomainEvent>) -> Result<(), PortError> {
        for event in &events {
            let event_type = event.event_type();
            let data = encode(event)?;

            sqlx::query("INSERT INTO events (event_type, data, occurred_at) VALUES (?, ?, ?)")
                .bind(event_type)
                .bind(&data)
                .bind(timestamp(event.occurred_at()))
                .execute(&self.pool)
                .await
                .map_err(persistence)?;
            debug!(event_type, alert_id = %event.alert_id(), "domain event recorded");
        }
        Ok(())
    }
}
