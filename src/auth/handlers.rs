use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, UserInfoResponse},
        extractors::AuthUser,
        jwt::JwtKeys,
        services::{self, DEFAULT_AVATAR},
    },
    error::ApiResult,
    response::Envelope,
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user/register", post(register))
        .route("/user/login", post(login))
        .route("/user/logout", post(logout))
        .route("/user/info", get(user_info))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<Envelope<RegisterResponse>> {
    let Json(payload) = payload?;
    let user = services::register(state.users.as_ref(), &payload.username, &payload.password).await?;
    Ok(Envelope::ok(
        "registered",
        RegisterResponse {
            user_id: user.id,
            username: user.username,
        },
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Envelope<LoginResponse>> {
    let Json(payload) = payload?;
    let keys = JwtKeys::from_ref(&state);
    let (token, user_info) =
        services::login(state.users.as_ref(), &keys, &payload.username, &payload.password).await?;
    Ok(Envelope::ok("logged in", LoginResponse { token, user_info }))
}

/// Tokens are stateless; the client drops its copy.
#[instrument(skip_all)]
pub async fn logout(AuthUser(principal): AuthUser) -> Envelope<()> {
    info!(user_id = principal.user_id, "user logged out");
    Envelope::ok_empty("logged out")
}

#[instrument(skip_all)]
pub async fn user_info(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
) -> ApiResult<Envelope<UserInfoResponse>> {
    let user = services::current_user(state.users.as_ref(), &principal).await?;
    Ok(Envelope::ok(
        "ok",
        UserInfoResponse {
            user_id: user.id,
            username: user.username,
            avatar: user.avatar.unwrap_or_else(|| DEFAULT_AVATAR.to_string()),
            create_time: user.created_at,
        },
    ))
}
