use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;

use scout_core::evidence::Evidence;

use super::extract::{CurrentUser, PageQuery};
use super::response::{ok, ApiError, ApiResult};
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<PageQuery>,
) -> ApiResult<Vec<Evidence>> {
    user.require_admin()?;
    let evidences = state.evidences.list(query.page()).await?;
    ok(format!("{} preuves", evidences.len()), evidences)
}

pub(crate) fn content_type_for(name: &str) -> &'static str {
    let extension = name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("pdf") => "application/pdf",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

pub async fn file(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let bytes = state.evidences.file(&name).await?;
    Ok(([(header::CONTENT_TYPE, content_type_for(&name))], bytes))
}
