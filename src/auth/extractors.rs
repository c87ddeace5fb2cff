use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use super::{errors::AuthError, repo_types::Identity, services::Authenticator};
use crate::error::ApiError;

/// Resolves the bearer token to a live, enabled identity.
pub struct CurrentUser(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    Authenticator: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AuthError::TokenInvalid)?;

        let authenticator = Authenticator::from_ref(state);
        let identity = authenticator
            .resolve_identity(token)
            .await
            .map_err(|e| match e {
                // a token whose subject vanished is reported like any bad token
                AuthError::InvalidCredentials => AuthError::TokenInvalid,
                other => other,
            })?;

        Ok(CurrentUser(identity))
    }
}

/// Extracts `<token>` from `Authorization: Bearer <token>`; the scheme is case-insensitive.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
