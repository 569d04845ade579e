use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use scout_app::alert_service::{AlertDeletion, AlertDetail};
use scout_core::alert::{risk_severity, Alert, AlertPatch, AlertStatus, RiskSeverity};
use scout_core::evidence::Evidence;
use scout_core::notes::{parse_notes, NoteEntry};
use scout_core::presentation::{present_status, StatusPresentation};
use scout_ports::types::{AlertFilter, Page, DEFAULT_PAGE_LIMIT};

use super::extract::CurrentUser;
use super::response::{ok, ApiError, ApiJson, ApiResult, JsonResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AlertListQuery {
    pub skip: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<String>,
    pub scope: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AlertPatchBody {
    pub status: Option<String>,
    pub analysis_note: Option<String>,
}

/// Alert as shown to analysts, with its console presentation and parsed notes.
#[derive(Debug, Serialize)]
pub struct AlertView {
    #[serde(flatten)]
    pub alert: Alert,
    pub severity: RiskSeverity,
    pub presentation: StatusPresentation,
    pub notes: Vec<NoteEntry>,
}

impl From<Alert> for AlertView {
    fn from(alert: Alert) -> Self {
        Self {
            severity: risk_severity(i64::from(alert.risk_score())),
            presentation: present_status(alert.status()),
            notes: parse_notes(alert.analysis_note()),
            alert,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AlertDetailView {
    #[serde(flatten)]
    pub alert: AlertView,
    pub evidences: Vec<Evidence>,
}

impl From<AlertDetail> for AlertDetailView {
    fn from(detail: AlertDetail) -> Self {
        Self {
            alert: detail.alert.into(),
            evidences: detail.evidences,
        }
    }
}

pub(crate) fn parse_status(raw: Option<&str>) -> Result<Option<AlertStatus>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => Ok(Some(s.to_uppercase().parse()?)),
        None => Ok(None),
    }
}

pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<AlertListQuery>,
) -> JsonResult<Vec<Alert>> {
    let filter = AlertFilter {
        status: parse_status(query.status.as_deref())?,
        owner: user.scope(query.scope.as_deref())?,
        page: Page::new(query.skip, query.limit, DEFAULT_PAGE_LIMIT),
        ..AlertFilter::default()
    };
    Ok(Json(state.alerts.list(&filter).await?))
}

pub async fn get(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> JsonResult<AlertDetailView> {
    let detail = state.alerts.detail(&id).await?;
    Ok(Json(detail.into()))
}

pub async fn update(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<AlertPatchBody>,
) -> ApiResult<AlertView> {
    let patch = AlertPatch {
        status: parse_status(body.status.as_deref())?,
        analysis_note: body.analysis_note,
    };
    let alert = state.alerts.update(&id, patch, Utc::now()).await?;
    ok("Alerte mise a jour avec succes", alert.into())
}

pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<AlertDeletion> {
    user.require_admin()?;
    let deletion = state.alerts.delete(&id, false, Utc::now()).await?;
    ok("Alerte supprimee avec nettoyage des artefacts associes.", deletion)
}
