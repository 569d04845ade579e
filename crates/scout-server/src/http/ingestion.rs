use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use scout_app::alert_service::ManualIngestion;
use scout_app::result_service::ResultOutcome;
use scout_ports::types::{ScanResult, ScanTask};

use super::extract::{CurrentUser, Operator};
use super::response::{ok, ApiError, ApiJson, ApiResult, Envelope};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ManualBody {
    pub url: Option<String>,
    pub source_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ClaimQuery {
    pub limit: Option<usize>,
}

pub async fn manual(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(body): ApiJson<ManualBody>,
) -> Result<(StatusCode, Json<Envelope<ManualIngestion>>), ApiError> {
    user.require_admin()?;
    let ingestion = state
        .alerts
        .ingest_manual(body.url.as_deref(), body.source_type.as_deref(), Utc::now())
        .await?;
    let message = if ingestion.queued_for_osint {
        "Cible ajoutee avec succes. Analyse en cours."
    } else {
        "Cible ajoutee, file d'analyse indisponible."
    };
    Ok((StatusCode::CREATED, ok(message, ingestion)?))
}

/// Crawler pull: claimed tasks leave the queue.
pub async fn claim_tasks(
    State(state): State<AppState>,
    _operator: Operator,
    Query(query): Query<ClaimQuery>,
) -> ApiResult<Vec<ScanTask>> {
    let tasks = state.alerts.claim_tasks(query.limit).await?;
    ok(format!("{} taches", tasks.len()), tasks)
}

pub async fn submit_result(
    State(state): State<AppState>,
    _operator: Operator,
    ApiJson(result): ApiJson<ScanResult>,
) -> ApiResult<ResultOutcome> {
    let outcome = state.results.process(result, Utc::now()).await?;
    ok("Resultat OSINT traite.", outcome)
}
