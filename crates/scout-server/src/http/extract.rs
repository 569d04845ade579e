use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::StatusCode;
use chrono::Utc;
use serde::Deserialize;

use scout_app::auth_service::{ensure_can_administer, owner_scope, record_owner};
use scout_core::ids::UserId;
use scout_core::user::{secrets_match, Session};
use scout_ports::types::{Page, DEFAULT_PAGE_LIMIT};

use super::response::ApiError;
use crate::state::AppState;

pub const OPERATOR_SECRET_HEADER: &str = "x-operator-secret";

/// Session behind a valid `Authorization: Bearer` header.
pub struct CurrentUser(pub Session);

impl CurrentUser {
    /// Fails with 403 for read-only roles.
    pub fn require_admin(&self) -> Result<(), ApiError> {
        Ok(ensure_can_administer(&self.0)?)
    }

    pub fn email(&self) -> &str {
        self.0.email()
    }

    /// Owner filter for a listing, from the optional `scope` parameter.
    pub fn scope(&self, scope: Option<&str>) -> Result<Option<UserId>, ApiError> {
        Ok(owner_scope(&self.0, scope)?)
    }

    pub fn owner(&self) -> Option<UserId> {
        record_owner(&self.0)
    }
}

fn bearer_token(parts: &Parts) -> &str {
    authorization(parts)
        .and_then(|v| {
            let (scheme, token) = v.trim().split_once(' ')?;
            scheme.eq_ignore_ascii_case("bearer").then_some(token)
        })
        .unwrap_or("")
}

fn authorization(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let session = state.auth.authenticate(bearer_token(parts), Utc::now()).await?;
        Ok(Self(session))
    }
}

/// Session when an `Authorization` header is sent, `None` for anonymous
/// callers. A header carrying a bad token is still rejected.
pub struct MaybeUser(pub Option<Session>);

impl MaybeUser {
    pub fn owner(&self) -> Option<UserId> {
        self.0.as_ref().and_then(record_owner)
    }
}

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if authorization(parts).is_none() {
            return Ok(Self(None));
        }
        let CurrentUser(session) = CurrentUser::from_request_parts(parts, state).await?;
        Ok(Self(Some(session)))
    }
}

/// Caller presented the shared operator secret.
pub struct Operator;

impl FromRequestParts<AppState> for Operator {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let given = parts
            .headers
            .get(OPERATOR_SECRET_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if given.is_empty() || !secrets_match(given, &state.operator_secret) {
            return Err(ApiError::new(StatusCode::UNAUTHORIZED, "Invalid operator secret"));
        }
        Ok(Self)
    }
}

/// `skip` / `limit` plus the `scope=me` owner filter.
#[derive(Debug, Default, Deserialize)]
pub struct ScopedPageQuery {
    pub skip: Option<u32>,
    pub limit: Option<u32>,
    pub scope: Option<String>,
}

impl ScopedPageQuery {
    pub fn page(&self) -> Page {
        Page::new(self.skip, self.limit, DEFAULT_PAGE_LIMIT)
    }
}

/// `skip` / `limit` query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub skip: Option<u32>,
    pub limit: Option<u32>,
}

impl PageQuery {
    pub fn page(&self) -> Page {
        self.page_or(DEFAULT_PAGE_LIMIT)
    }

    pub fn page_or(&self, default_limit: u32) -> Page {
        Page::new(self.skip, self.limit, default_limit)
    }
}
