use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::users::repo::RepoError;

/// Every failure a handler can surface. Converted to a `{message}` body in one place.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Email exists please sign in")]
    EmailTaken,

    #[error("{0}")]
    BadRequest(String),

    #[error("Not authorized, please login")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::InvalidCredentials
            | Self::EmailTaken
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RepoError> for ApiError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::DuplicateEmail => Self::EmailTaken,
            RepoError::Other(e) => Self::Internal(e),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            Self::Internal(e) => {
                error!(error = ?e, "request failed");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}

/// `Json` whose rejection goes through [`ApiError`] so bad bodies get the same shape.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn internal_errors_hide_detail() {
        let resp = ApiError::Internal(anyhow::anyhow!("db password is hunter2")).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(resp).await;
        assert_eq!(body["message"], "Internal server error");
    }

    #[tokio::test]
    async fn taxonomy_maps_to_status_and_message() {
        let cases = [
            (ApiError::validation("Please enter all the required fields"), 400),
            (ApiError::InvalidCredentials, 400),
            (ApiError::EmailTaken, 400),
            (ApiError::Unauthorized, 401),
            (ApiError::NotFound("User not found".into()), 404),
            (ApiError::MethodNotAllowed, 405),
        ];
        for (err, status) in cases {
            let expected = err.to_string();
            let resp = err.into_response();
            assert_eq!(resp.status().as_u16(), status);
            assert_eq!(body_json(resp).await["message"], expected.as_str());
        }
    }

    #[test]
    fn duplicate_email_from_store_becomes_email_taken() {
        let err: ApiError = RepoError::DuplicateEmail.into();
        assert!(matches!(err, ApiError::EmailTaken));
        assert_eq!(err.to_string(), "Email exists please sign in");
    }
}
