use axum::extract::State;
use axum::{Form, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use scout_core::user::{Session, UserRole};

use super::response::{ApiError, ApiJson};
use crate::state::AppState;

/// OAuth2 password-grant fields.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    #[serde(alias = "email")]
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthUser {
    pub email: String,
    pub role: UserRole,
}

/// Token response in the OAuth2 shape, outside the usual envelope.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
    pub user: AuthUser,
}

impl From<Session> for LoginResponse {
    fn from(session: Session) -> Self {
        Self {
            access_token: session.token().to_string(),
            token_type: "bearer",
            expires_at: session.expires_at(),
            user: AuthUser {
                email: session.email().to_string(),
                role: session.role(),
            },
        }
    }
}

pub async fn login_form(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<LoginResponse>, ApiError> {
    let session = state.auth.login(&form.username, &form.password, Utc::now()).await?;
    Ok(Json(session.into()))
}

pub async fn login_json(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginBody>,
) -> Result<Json<LoginResponse>, ApiError> {
    let session = state.auth.login(&body.username, &body.password, Utc::now()).await?;
    Ok(Json(session.into()))
}
