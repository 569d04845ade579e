use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, Query, State};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use scout_app::alert_service::AlertDeletion;
use scout_app::incident_service::{
    Attachment, CitizenIncidentDetail, CitizenIncidentPage, DecisionOutcome, IncidentReceipt,
    IncidentReport, VerificationSnapshot,
};
use scout_core::incident::{Decision, DecisionAction};
use scout_core::notes::{parse_notes, NoteEntry};
use scout_core::presentation::{channel_label, present_status, StatusPresentation};
use scout_core::signal::{SignalChannel, SignalInput};
use scout_ports::types::Page;

use super::alerts::parse_status;
use super::extract::{CurrentUser, MaybeUser};
use super::response::{ok, ApiError, ApiJson, ApiResult};
use crate::state::AppState;

const CITIZEN_PAGE_LIMIT: u32 = 50;
const ATTACHMENT_FIELDS: &[&str] = &["screenshots", "files", "attachments"];

#[derive(Debug, Deserialize)]
pub struct CitizenListQuery {
    pub skip: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<String>,
    pub q: Option<String>,
    pub scope: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DecisionBody {
    pub decision: String,
    pub comment: Option<String>,
    pub decided_by: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CitizenIncidentView {
    #[serde(flatten)]
    pub detail: CitizenIncidentDetail,
    pub channel_label: Option<&'static str>,
    pub presentation: StatusPresentation,
    pub notes: Vec<NoteEntry>,
}

impl From<CitizenIncidentDetail> for CitizenIncidentView {
    fn from(detail: CitizenIncidentDetail) -> Self {
        Self {
            channel_label: detail.alert.citizen().map(|c| channel_label(c.channel)),
            presentation: present_status(detail.alert.status()),
            notes: parse_notes(detail.alert.analysis_note()),
            detail,
        }
    }
}

pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<CitizenListQuery>,
) -> ApiResult<CitizenIncidentPage> {
    let status = parse_status(query.status.as_deref())?;
    let owner = user.scope(query.scope.as_deref())?;
    let page = Page::new(query.skip, query.limit, CITIZEN_PAGE_LIMIT);
    let incidents = state.incidents.list(status, query.q, owner, page).await?;
    ok(format!("{} incidents citoyens", incidents.total), incidents)
}

pub async fn get(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<CitizenIncidentView> {
    let detail = state.incidents.detail(&id).await?;
    ok("Incident citoyen trouve", detail.into())
}

pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<AlertDeletion> {
    user.require_admin()?;
    let deletion = state.alerts.delete(&id, true, Utc::now()).await?;
    ok("Incident citoyen supprime.", deletion)
}

pub async fn decide(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<DecisionBody>,
) -> ApiResult<DecisionOutcome> {
    user.require_admin()?;
    let action: DecisionAction = body.decision.trim().to_uppercase().parse()?;
    let decision = Decision {
        action,
        comment: body.comment,
        decided_by: body.decided_by.or_else(|| Some(user.email().to_string())),
    };
    let outcome = state.incidents.decide(&id, decision, Utc::now()).await?;
    ok("Decision SOC enregistree.", outcome)
}

/// Open to anonymous citizens. SME sessions own what they report.
pub async fn report(
    State(state): State<AppState>,
    user: MaybeUser,
    ApiJson(report): ApiJson<IncidentReport>,
) -> ApiResult<IncidentReceipt> {
    let receipt = state
        .incidents
        .report(report, Vec::new(), user.owner(), Utc::now())
        .await?;
    ok("Incident cree avec succes.", receipt)
}

fn bad_multipart(e: MultipartError) -> ApiError {
    ApiError::new(e.status(), e.body_text())
}

/// Multipart variant: text fields plus image uploads.
pub async fn report_with_media(
    State(state): State<AppState>,
    user: MaybeUser,
    mut multipart: Multipart,
) -> ApiResult<IncidentReceipt> {
    let mut message = None;
    let mut phone = None;
    let mut channel = None;
    let mut url = None;
    let mut verification = None;
    let mut attachments = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        if field.file_name().is_some() || ATTACHMENT_FIELDS.contains(&name.as_str()) {
            attachments.push(Attachment {
                file_name: field.file_name().map(str::to_string),
                content_type: field.content_type().map(str::to_string),
                bytes: field.bytes().await.map_err(bad_multipart)?.to_vec(),
            });
            continue;
        }
        let value = field.text().await.map_err(bad_multipart)?;
        match name.as_str() {
            "message" => message = Some(value),
            "phone" => phone = Some(value),
            "channel" => channel = Some(value),
            "url" => url = Some(value),
            "verification" => verification = Some(value),
            _ => {}
        }
    }

    let channel = match channel.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        Some(raw) => raw.to_uppercase().parse()?,
        None => SignalChannel::default(),
    };
    let verification = match verification.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        Some(raw) => Some(
            serde_json::from_str::<VerificationSnapshot>(raw)
                .map_err(|e| ApiError::unprocessable(format!("verification is not valid JSON: {e}")))?,
        ),
        None => None,
    };
    let report = IncidentReport {
        signal: SignalInput {
            message: message.ok_or_else(|| ApiError::unprocessable("message is required"))?,
            channel,
            url: url.filter(|u| !u.trim().is_empty()),
            phone: phone.ok_or_else(|| ApiError::unprocessable("phone is required"))?,
        },
        verification,
    };

    let receipt = state
        .incidents
        .report(report, attachments, user.owner(), Utc::now())
        .await?;
    ok("Incident cree avec succes.", receipt)
}
