use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, ProfileResponse, RegisterRequest, UpdateProfileRequest},
        extractors::AuthUser,
        jwt::JwtKeys,
        services,
    },
    error::{AppJson, AppResult},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/profile", get(get_profile).put(update_profile))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let keys = JwtKeys::from_ref(&state);
    let (user, token) = services::register(state.users.as_ref(), &keys, payload).await?;
    Ok((StatusCode::CREATED, Json(AuthResponse::new(user, token))))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let keys = JwtKeys::from_ref(&state);
    let (user, token) = services::login(state.users.as_ref(), &keys, payload).await?;
    Ok(Json(AuthResponse::new(user, token)))
}

#[instrument(skip(state, me), fields(user_id = %me.id))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
) -> AppResult<Json<ProfileResponse>> {
    let user = services::profile(state.users.as_ref(), me.id).await?;
    Ok(Json(ProfileResponse { success: true, user }))
}

#[instrument(skip(state, me, payload), fields(user_id = %me.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
    AppJson(payload): AppJson<UpdateProfileRequest>,
) -> AppResult<Json<AuthResponse>> {
    let keys = JwtKeys::from_ref(&state);
    let (user, token) = services::update_profile(state.users.as_ref(), &keys, me.id, payload).await?;
    Ok(Json(
        AuthResponse::new(user, token).with_message("Profile updated successfully"),
    ))
}
