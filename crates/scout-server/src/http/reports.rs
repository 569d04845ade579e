use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;

use scout_core::report::Report;

use super::evidence::content_type_for;
use super::extract::{CurrentUser, ScopedPageQuery};
use super::response::{ok, ApiError, ApiResult};
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ScopedPageQuery>,
) -> ApiResult<Vec<Report>> {
    let owner = user.scope(query.scope.as_deref())?;
    let reports = state.reports.list(owner.as_ref(), query.page()).await?;
    ok(format!("{} rapports", reports.len()), reports)
}

pub async fn generate(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(alert_id): Path<String>,
) -> ApiResult<Report> {
    let report = state
        .reports
        .generate(&alert_id, Some(user.email().to_string()), Utc::now())
        .await?;
    ok("Rapport forensique genere.", report)
}

fn attachment(mut response: Response, file_name: &str) -> Response {
    if let Ok(value) = HeaderValue::from_str(&format!("attachment; filename=\"{file_name}\"")) {
        response.headers_mut().insert(header::CONTENT_DISPOSITION, value);
    }
    response
}

pub async fn download(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path((id, format)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    match format.as_str() {
        "json" => {
            let report = state.reports.get(&id).await?;
            let name = format!("report_{}.json", report.id());
            Ok(attachment(Json(report.snapshot().clone()).into_response(), &name))
        }
        "pdf" => {
            let (name, bytes) = state.reports.pdf(&id).await?;
            let response = ([(header::CONTENT_TYPE, content_type_for(&name))], bytes).into_response();
            Ok(attachment(response, &name))
        }
        other => Err(ApiError::unprocessable(format!("unsupported format `{other}`, expected pdf or json"))),
    }
}
