use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use scout_core::stats::{
    AnalysisStats, CriticalThreats, DashboardStats, WeeklyStats, DEFAULT_CRITICAL_THRESHOLD,
};

use super::extract::CurrentUser;
use super::response::{ok, ApiResult, JsonResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Count {
    pub count: u64,
}

#[derive(Debug, Deserialize)]
pub struct ThresholdQuery {
    pub threshold: Option<u8>,
}

pub async fn analysis(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> JsonResult<AnalysisStats> {
    Ok(Json(state.stats.analysis().await?))
}

pub async fn dashboard(State(state): State<AppState>, _user: CurrentUser) -> ApiResult<DashboardStats> {
    ok("Statistiques du tableau de bord", state.stats.dashboard(Utc::now()).await?)
}

pub async fn weekly(State(state): State<AppState>, user: CurrentUser) -> ApiResult<WeeklyStats> {
    user.require_admin()?;
    ok("Tendance hebdomadaire", state.stats.weekly(Utc::now()).await?)
}

pub async fn critical_threats(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ThresholdQuery>,
) -> ApiResult<CriticalThreats> {
    user.require_admin()?;
    let threshold = query.threshold.unwrap_or(DEFAULT_CRITICAL_THRESHOLD).min(100);
    ok("Menaces critiques", state.stats.critical_threats(threshold).await?)
}

pub async fn sources_active(State(state): State<AppState>, user: CurrentUser) -> ApiResult<Count> {
    user.require_admin()?;
    let count = state.stats.sources_active().await?;
    ok("Sources actives", Count { count })
}

pub async fn reports_count(State(state): State<AppState>, user: CurrentUser) -> ApiResult<Count> {
    user.require_admin()?;
    let count = state.stats.reports_count().await?;
    ok("Rapports generes", Count { count })
}
