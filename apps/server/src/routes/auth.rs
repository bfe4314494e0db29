//! Authentication endpoints: login (public) and whoami (protected).

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use pharma_core::User;

use crate::auth::{verify_password, CurrentUser};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    token: String,
    user: User,
}

/// POST /api/auth/login
///
/// Verifies credentials and returns a bearer token. The response never
/// distinguishes "no such user" from "wrong password".
async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let user = state
        .db
        .users()
        .get_by_username(&req.username)
        .await?
        .filter(|u| verify_password(&req.password, &u.password_hash))
        .ok_or_else(|| ApiError::unauthorized("Invalid username or password"))?;

    let token = state.jwt.generate_token(&user.id, &user.username, user.role)?;

    info!(username = %user.username, "User logged in");

    Ok(Json(LoginResponse { token, user }))
}

/// GET /api/auth/me
async fn me(
    State(state): State<AppState>,
    Extension(CurrentUser(claims)): Extension<CurrentUser>,
) -> ApiResult<Json<User>> {
    let user = state
        .db
        .users()
        .get_by_id(&claims.sub)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Account no longer exists"))?;

    Ok(Json(user))
}

pub fn public_router() -> Router<AppState> {
    Router::new().route("/api/auth/login", post(login))
}

pub fn protected_router() -> Router<AppState> {
    Router::new().route("/api/auth/me", get(me))
}
