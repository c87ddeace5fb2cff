use std::sync::Arc;

use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, error, info, warn};

use crate::{
    auth::{
        errors::AuthError,
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        repo::IdentityStore,
        repo_types::Identity,
    },
    state::AppState,
};

lazy_static! {
    static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_.-]{3,20}$").unwrap();

    // Verified against when the username is unknown, so that path costs the
    // same as a wrong password.
    static ref DUMMY_HASH: String = hash_password("postboard-timing-equaliser")
        .expect("argon2 with default params hashes a fixed input");
}

pub(crate) fn is_valid_username(username: &str) -> bool {
    USERNAME_RE.is_match(username)
}

/// Login and per-request identity resolution.
#[derive(Clone)]
pub struct Authenticator {
    identities: Arc<dyn IdentityStore>,
    keys: JwtKeys,
}

impl FromRef<AppState> for Authenticator {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.identities.clone(), JwtKeys::from_ref(state))
    }
}

impl Authenticator {
    pub fn new(identities: Arc<dyn IdentityStore>, keys: JwtKeys) -> Self {
        Self { identities, keys }
    }

    /// Checks credentials and issues an access token for `username`.
    ///
    /// Unknown usernames, wrong passwords and unreadable stored hashes all
    /// come back as [`AuthError::InvalidCredentials`]. The enabled flag is not
    /// consulted here; [`Authenticator::resolve_identity`] refuses the token.
    pub async fn login(&self, username: &str, password: &str) -> Result<String, AuthError> {
        let identity = self.identities.find_by_username(username).await?;

        let Some(identity) = identity else {
            let _ = verify_password(password, &DUMMY_HASH);
            warn!(%username, "login unknown username");
            return Err(AuthError::InvalidCredentials);
        };

        let ok = match verify_password(password, &identity.password_hash) {
            Ok(ok) => ok,
            Err(e) => {
                error!(error = %e, %username, "stored password hash unusable");
                false
            }
        };
        if !ok {
            warn!(%username, "login invalid password");
            return Err(AuthError::InvalidCredentials);
        }

        let access_token = self.keys.issue(&identity.username)?;
        info!(%username, "user logged in");
        Ok(access_token)
    }

    /// Verifies `token` and loads the live identity it names.
    ///
    /// The account is re-read on every call, so disabling or deleting it
    /// takes effect for tokens already handed out.
    pub async fn resolve_identity(&self, token: &str) -> Result<Identity, AuthError> {
        let claims = self.keys.verify(token).map_err(|reason| {
            warn!(%reason, "token rejected");
            AuthError::TokenInvalid
        })?;

        let identity = self
            .identities
            .find_by_username(&claims.sub)
            .await?
            .ok_or_else(|| {
                warn!(subject = %claims.sub, "token subject no longer exists");
                AuthError::InvalidCredentials
            })?;

        if !identity.is_enabled() {
            warn!(username = %identity.username, "inactive user presented token");
            return Err(AuthError::InactiveAccount);
        }

        debug!(username = %identity.username, "identity resolved");
        Ok(identity)
    }
}
