use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Form, Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginForm, Message, PublicUser, RegisterRequest, TokenResponse, UpdateProfileRequest},
        extractors::CurrentUser,
        password::hash_password,
        repo_types::Removal,
        services::{is_valid_username, Authenticator},
    },
    error::ApiError,
    state::AppState,
};

const MIN_PASSWORD_LEN: usize = 8;

pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/token", post(login))
}

pub fn user_routes() -> Router<AppState> {
    Router::new().route("/users", post(register)).route(
        "/users/me",
        get(get_me).put(update_me).delete(delete_me),
    )
}

#[instrument(skip(auth, form), fields(username = %form.username))]
pub async fn login(
    State(auth): State<Authenticator>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>, ApiError> {
    let access_token = auth.login(form.username.trim(), &form.password).await?;
    Ok(Json(TokenResponse::bearer(access_token)))
}

fn check_password(password: &str) -> Result<(), ApiError> {
    if password.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(ApiError::BadRequest("Password too short".into()));
    }
    Ok(())
}

#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let username = payload.username.trim();
    if !is_valid_username(username) {
        warn!("invalid username");
        return Err(ApiError::BadRequest("Invalid username".into()));
    }
    check_password(&payload.password)?;

    let hash = hash_password(&payload.password).map_err(anyhow::Error::from)?;

    match state.identities.create(username, payload.dob, &hash).await? {
        Some(user) => {
            info!(user_id = %user.id, username = %user.username, "user registered");
            Ok((
                StatusCode::CREATED,
                Json(Message::new("User created successfully!")),
            ))
        }
        None => {
            warn!("username already taken");
            Err(ApiError::Conflict("Username already taken!".into()))
        }
    }
}

#[instrument(skip_all, fields(username = %user.username))]
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<PublicUser> {
    Json(user.into())
}

#[instrument(skip_all, fields(username = %user.username))]
pub async fn update_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<Message>, ApiError> {
    check_password(&payload.password)?;
    let hash = hash_password(&payload.password).map_err(anyhow::Error::from)?;

    if !state
        .identities
        .update_profile(&user.username, payload.dob, &hash)
        .await?
    {
        return Err(ApiError::NotFound("User not found".into()));
    }
    info!("user updated");
    Ok(Json(Message::new("User updated.")))
}

#[instrument(skip_all, fields(username = %user.username))]
pub async fn delete_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Message>, ApiError> {
    let msg = match state.identities.remove(&user.username).await? {
        Removal::Deleted => "User deleted.",
        Removal::Deactivated => "User deactivated.",
    };
    info!(outcome = msg, "user removed");
    Ok(Json(Message::new(msg)))
}
