use axum::extract::{Path, State};
use chrono::Utc;
use serde::Deserialize;

use scout_app::shield_service::{CallbackOutcome, DispatchOutcome};
use scout_core::ids::{AlertId, DispatchId};
use scout_core::shield::{DispatchRequest, OperatorCallback, ShieldDispatch};

use super::extract::{CurrentUser, Operator};
use super::response::{ok, ApiJson, ApiResult};
use crate::state::AppState;

fn yes() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct DispatchBody {
    pub incident_id: String,
    pub action_type: String,
    pub reason: Option<String>,
    pub requested_by: Option<String>,
    #[serde(default = "yes")]
    pub auto_callback: bool,
}

#[derive(Debug, Deserialize)]
pub struct CallbackBody {
    pub dispatch_id: String,
    pub incident_id: String,
    pub operator_status: String,
    pub execution_note: Option<String>,
    pub external_ref: Option<String>,
}

pub async fn dispatch(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(body): ApiJson<DispatchBody>,
) -> ApiResult<DispatchOutcome> {
    user.require_admin()?;
    let request = DispatchRequest {
        action_type: body.action_type.trim().to_uppercase().parse()?,
        reason: body.reason,
        requested_by: body.requested_by.or_else(|| Some(user.email().to_string())),
    };
    let outcome = state
        .shield
        .dispatch(&body.incident_id, &request, body.auto_callback, Utc::now())
        .await?;
    ok("Action SHIELD envoyee a l operateur simule.", outcome)
}

pub async fn timeline(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Vec<ShieldDispatch>> {
    let dispatches = state.shield.timeline(&id).await?;
    ok(format!("{} actions SHIELD", dispatches.len()), dispatches)
}

pub async fn operator_callback(
    State(state): State<AppState>,
    _operator: Operator,
    ApiJson(body): ApiJson<CallbackBody>,
) -> ApiResult<CallbackOutcome> {
    let callback = OperatorCallback {
        dispatch_id: DispatchId::parse(&body.dispatch_id)?,
        incident_id: AlertId::parse(&body.incident_id)?,
        operator_status: body.operator_status.trim().to_uppercase().parse()?,
        execution_note: body.execution_note,
        external_ref: body.external_ref,
    };
    let outcome = state.shield.callback(&callback, Utc::now()).await?;
    ok("Callback operateur traite avec succes.", outcome)
}
