use thiserror::Error;

use crate::{auth::jwt::IssueError, authz::Resource};

/// Failures of the authentication and authorization core.
///
/// Messages are the user-visible text; causes of `StoreUnavailable` and
/// `Signing` are only ever logged.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown username or wrong password. The two are never told apart.
    #[error("Incorrect username or password")]
    InvalidCredentials,

    #[error("Inactive user")]
    InactiveAccount,

    /// Bad signature, expired or malformed token.
    #[error("Could not validate credentials")]
    TokenInvalid,

    /// The resource is absent or owned by someone else.
    #[error("{0} not found")]
    ResourceNotFoundOrForbidden(Resource),

    #[error("store unavailable")]
    StoreUnavailable(#[from] anyhow::Error),

    #[error("token signing failed")]
    Signing(#[from] IssueError),
}
