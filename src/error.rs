use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::auth::errors::AuthError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

const INTERNAL: &str = "Internal server error";

impl ApiError {
    fn status_and_detail(&self) -> (StatusCode, String) {
        match self {
            ApiError::Auth(e) => match e {
                AuthError::InvalidCredentials | AuthError::TokenInvalid => {
                    (StatusCode::UNAUTHORIZED, e.to_string())
                }
                AuthError::InactiveAccount => (StatusCode::BAD_REQUEST, e.to_string()),
                AuthError::ResourceNotFoundOrForbidden(_) => {
                    (StatusCode::NOT_FOUND, e.to_string())
                }
                AuthError::StoreUnavailable(_) | AuthError::Signing(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.into())
                }
            },
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Auth(AuthError::StoreUnavailable(e)) | ApiError::Internal(e) => {
                error!(error = ?e, "request failed");
            }
            ApiError::Auth(AuthError::Signing(e)) => {
                error!(error = %e, "jwt sign failed");
            }
            _ => {}
        }

        let (status, detail) = self.status_and_detail();
        let mut res = (status, Json(ErrorBody { detail })).into_response();
        if status == StatusCode::UNAUTHORIZED {
            res.headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{auth::jwt::IssueError, authz::Resource};

    #[test]
    fn unauthorized_carries_bearer_challenge() {
        let res = ApiError::from(AuthError::TokenInvalid).into_response();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(res.headers()[header::WWW_AUTHENTICATE], "Bearer");
    }

    #[test]
    fn inactive_account_is_bad_request() {
        let res = ApiError::from(AuthError::InactiveAccount).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(res.headers().get(header::WWW_AUTHENTICATE).is_none());
    }

    #[test]
    fn forbidden_resource_is_not_found() {
        let err = ApiError::from(AuthError::ResourceNotFoundOrForbidden(Resource::Comment));
        let (status, detail) = err.status_and_detail();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(detail, "Comment not found");
    }

    #[test]
    fn store_failures_hide_their_cause() {
        let err = ApiError::from(AuthError::StoreUnavailable(anyhow::anyhow!(
            "connection refused to 10.0.0.3:5432"
        )));
        let (status, detail) = err.status_and_detail();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(detail, INTERNAL);
    }

    #[test]
    fn unissuable_token_is_internal_error() {
        let err = ApiError::from(AuthError::Signing(IssueError::LifetimeOutOfRange));
        let (status, detail) = err.status_and_detail();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(detail, INTERNAL);
    }
}
