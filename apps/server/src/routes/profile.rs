//! Current-user profile endpoints.

use axum::extract::State;
use axum::routing::{get, patch};
use axum::{Extension, Json, Router};
use serde::Deserialize;

use pharma_core::validation::validate_name;
use pharma_core::User;

use crate::auth::{hash_password, verify_password, CurrentUser};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct ProfileBody {
    full_name: String,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChangePasswordBody {
    current_password: String,
    new_password: String,
}

/// GET /api/profile
async fn get_profile(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Json<User>> {
    let user = load_user(&state, &current.0.sub).await?;
    Ok(Json(user))
}

/// PATCH /api/profile
async fn update_profile(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(body): Json<ProfileBody>,
) -> ApiResult<Json<User>> {
    validate_name("full_name", &body.full_name)?;

    state
        .db
        .users()
        .update_profile(&current.0.sub, &body.full_name, body.email.as_deref())
        .await?;

    let user = load_user(&state, &current.0.sub).await?;
    Ok(Json(user))
}

/// PATCH /api/profile/change-password
///
/// The current password must verify before the new one is accepted.
async fn change_password(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(body): Json<ChangePasswordBody>,
) -> ApiResult<Json<serde_json::Value>> {
    if body.new_password.len() < 8 {
        return Err(ApiError::bad_request(
            "New password must be at least 8 characters",
        ));
    }

    let user = load_user(&state, &current.0.sub).await?;
    if !verify_password(&body.current_password, &user.password_hash) {
        return Err(ApiError::unauthorized("Current password is incorrect"));
    }

    let hash = hash_password(&body.new_password)
        .map_err(|err| ApiError::internal(format!("Password hashing failed: {}", err)))?;
    state
        .db
        .users()
        .update_password_hash(&user.id, &hash)
        .await?;

    Ok(Json(serde_json::json!({ "message": "Password updated" })))
}

async fn load_user(state: &AppState, id: &str) -> ApiResult<User> {
    state
        .db
        .users()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/profile", get(get_profile).patch(update_profile))
        .route("/api/profile/change-password", patch(change_password))
}
