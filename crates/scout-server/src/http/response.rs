use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tracing::error;

use scout_app::error::AppError;
use scout_core::error::DomainError;
use scout_ports::error::PortError;

/// Success body shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

pub type ApiResult<T> = Result<Json<Envelope<T>>, ApiError>;

/// Unwrapped body for the read endpoints the analyst console consumes directly.
pub type JsonResult<T> = Result<Json<T>, ApiError>;

pub fn ok<T: Serialize>(message: impl Into<String>, data: T) -> ApiResult<T> {
    Ok(Json(Envelope {
        success: true,
        message: message.into(),
        data: Some(data),
    }))
}

/// Failure rendered as `{success: false, message, detail}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    fn internal(e: &dyn std::fmt::Display) -> Self {
        error!(error = %e, "request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    }
}

impl From<AppError> for ApiError {
    fn from(e: AppError) -> Self {
        match &e {
            AppError::NotFound(what) => {
                Self::new(StatusCode::NOT_FOUND, capitalize(&format!("{what} not found")))
            }
            AppError::Conflict(message) => Self::new(StatusCode::CONFLICT, message.clone()),
            AppError::Validation(message) => Self::unprocessable(message.clone()),
            AppError::Unauthorized(message) => Self::new(StatusCode::UNAUTHORIZED, *message),
            AppError::Forbidden(message) => Self::new(StatusCode::FORBIDDEN, *message),
            AppError::Domain(
                domain @ (DomainError::NotDispatchable | DomainError::DispatchMismatch),
            ) => Self::new(StatusCode::CONFLICT, domain.to_string()),
            AppError::Domain(domain) => Self::unprocessable(domain.to_string()),
            AppError::Port(PortError::NotFound) => Self::new(StatusCode::NOT_FOUND, "Not found"),
            AppError::Port(PortError::Conflict(message)) => {
                Self::new(StatusCode::CONFLICT, message.clone())
            }
            AppError::Port(port) => Self::internal(port),
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        AppError::from(e).into()
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "success": false,
            "message": self.message,
            "detail": self.message,
        }));
        let mut response = (self.status, body).into_response();
        if self.status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

/// `Json` whose rejections use the error envelope.
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(rejection_error(rejection)),
        }
    }
}

fn rejection_error(rejection: JsonRejection) -> ApiError {
    ApiError::new(rejection.status(), rejection.body_text())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_application_errors_to_statuses() {
        let cases = [
            (AppError::NotFound("alert"), StatusCode::NOT_FOUND),
            (AppError::Conflict("dup".into()), StatusCode::CONFLICT),
            (AppError::validation("bad"), StatusCode::UNPROCESSABLE_ENTITY),
            (AppError::Unauthorized("Not authenticated"), StatusCode::UNAUTHORIZED),
            (AppError::Forbidden("nope"), StatusCode::FORBIDDEN),
            (AppError::Domain(DomainError::NotDispatchable), StatusCode::CONFLICT),
            (
                AppError::Domain(DomainError::JustificationRequired("confirm")),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                AppError::Port(PortError::Persistence("disk".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(ApiError::from(error).status, status);
        }
    }

    #[test]
    fn internal_details_are_hidden() {
        let e = ApiError::from(AppError::Port(PortError::Persistence("secret path".into())));
        assert_eq!(e.message, "Internal server error");
        assert_eq!(ApiError::from(AppError::NotFound("alert")).message, "Alert not found");
    }

    #[test]
    fn unauthorized_carries_bearer_challenge() {
        let response = ApiError::from(AppError::Unauthorized("Not authenticated")).into_response();
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
    }
}
