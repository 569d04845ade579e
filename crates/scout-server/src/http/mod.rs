//! REST API mounted under `/api/v1`.

mod alerts;
mod auth;
mod evidence;
mod extract;
mod incidents;
mod ingestion;
mod reports;
mod response;
mod shield;
mod signals;
mod sources;
mod stats;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use scout_app::incident_service::{MAX_ATTACHMENTS, MAX_ATTACHMENT_BYTES};

use crate::state::AppState;

pub use extract::OPERATOR_SECRET_HEADER;

/// Room for every attachment plus the text fields.
const MEDIA_BODY_LIMIT: usize = MAX_ATTACHMENTS * MAX_ATTACHMENT_BYTES + 1024 * 1024;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/auth/login/access-token", post(auth::login_form))
        .route("/auth/login", post(auth::login_json))
        .route("/alerts", get(alerts::list))
        .route(
            "/alerts/{id}",
            get(alerts::get).patch(alerts::update).delete(alerts::delete),
        )
        .route("/analysis/stats", get(stats::analysis))
        .route("/dashboard/stats", get(stats::dashboard))
        .route("/dashboard/stats/weekly", get(stats::weekly))
        .route("/dashboard/stats/critical-threats", get(stats::critical_threats))
        .route("/dashboard/stats/sources-active", get(stats::sources_active))
        .route("/dashboard/stats/reports-count", get(stats::reports_count))
        .route("/incidents/citizen", get(incidents::list))
        .route(
            "/incidents/citizen/{id}",
            get(incidents::get).delete(incidents::delete),
        )
        .route("/incidents/{id}/decision", patch(incidents::decide))
        .route("/incidents/report", post(incidents::report))
        .route(
            "/incidents/report-with-media",
            post(incidents::report_with_media).layer(DefaultBodyLimit::max(MEDIA_BODY_LIMIT)),
        )
        .route("/shield/actions/dispatch", post(shield::dispatch))
        .route("/shield/incidents/{id}/actions", get(shield::timeline))
        .route(
            "/operators/callbacks/action-status",
            post(shield::operator_callback),
        )
        .route("/sources", get(sources::list).post(sources::create))
        .route("/sources/runs/all", get(sources::all_runs))
        .route(
            "/sources/{id}",
            get(sources::get).patch(sources::update).delete(sources::delete),
        )
        .route("/sources/{id}/toggle", patch(sources::toggle))
        .route("/sources/{id}/runs", get(sources::runs))
        .route("/ingestion/manual", post(ingestion::manual))
        .route("/ingestion/tasks", get(ingestion::claim_tasks))
        .route("/ingestion/results", post(ingestion::submit_result))
        .route("/evidence", get(evidence::list))
        .route("/evidence/file/{name}", get(evidence::file))
        .route("/reports", get(reports::list))
        .route("/reports/generate/{id}", post(reports::generate))
        .route("/reports/{id}/download/{format}", get(reports::download))
        .route("/signals/verify", post(signals::verify))
        .route("/health", get(health));

    Router::new().nest("/api/v1", api).with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}
