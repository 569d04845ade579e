use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;

use scout_app::source_service::SourceDeletion;
use scout_core::source::{MonitoringSource, NewSource, ScrapingRun, SourcePatch};

use super::extract::{CurrentUser, PageQuery, ScopedPageQuery};
use super::response::{ok, ApiError, ApiJson, ApiResult, Envelope};
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ScopedPageQuery>,
) -> ApiResult<Vec<MonitoringSource>> {
    let owner = user.scope(query.scope.as_deref())?;
    let sources = state.sources.list(owner.as_ref(), query.page()).await?;
    ok("Sources recuperees avec succes", sources)
}

pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(input): ApiJson<NewSource>,
) -> Result<(StatusCode, Json<Envelope<MonitoringSource>>), ApiError> {
    let source = state.sources.create(input, user.owner(), Utc::now()).await?;
    let body = ok("Source creee avec succes", source)?;
    Ok((StatusCode::CREATED, body))
}

pub async fn get(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<MonitoringSource> {
    let source = state.sources.get(&id).await?;
    ok("Source trouvee", source)
}

pub async fn update(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<SourcePatch>,
) -> ApiResult<MonitoringSource> {
    let source = state.sources.update(&id, patch).await?;
    ok("Source mise a jour avec succes", source)
}

pub async fn toggle(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<MonitoringSource> {
    let source = state.sources.toggle(&id).await?;
    let verb = if source.is_active() { "activee" } else { "desactivee" };
    ok(format!("Source {verb} avec succes"), source)
}

pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<SourceDeletion> {
    user.require_admin()?;
    let deletion = state.sources.delete(&id).await?;
    ok("Source supprimee avec succes", deletion)
}

pub async fn runs(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Vec<ScrapingRun>> {
    let runs = state.sources.runs(&id, query.page_or(50)).await?;
    ok(format!("Historique recupere ({} runs)", runs.len()), runs)
}

pub async fn all_runs(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<PageQuery>,
) -> ApiResult<Vec<ScrapingRun>> {
    let runs = state.sources.all_runs(query.page_or(50)).await?;
    ok(format!("Historique global recupere ({} runs)", runs.len()), runs)
}
