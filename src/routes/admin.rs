//! Admin session endpoints (`/api/admin`).

use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::form::FormBody;
use super::validate_form;
use crate::auth::{verify_password, Identity};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Validate)]
struct LoginForm {
    #[validate(length(min = 1))]
    email: String,
    #[validate(length(min = 1))]
    password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub admin: Identity,
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid credentials".to_string())
}

/// POST /api/admin/login
pub async fn login(State(state): State<AppState>, body: FormBody) -> AppResult<Json<LoginResponse>> {
    let form = LoginForm {
        email: body.text("email").unwrap_or_default(),
        password: body.raw("password").unwrap_or_default(),
    };
    validate_form(&form, Vec::new())?;

    let Some(admin) = state.store.find_admin_by_email(&form.email).await? else {
        tracing::warn!(email = %form.email, "login for unknown admin");
        return Err(invalid_credentials());
    };

    if !verify_password(form.password, admin.password_hash).await {
        tracing::warn!(email = %admin.email, "failed login attempt");
        return Err(invalid_credentials());
    }

    let identity = Identity {
        id: admin.id,
        email: admin.email,
    };
    let token = state.auth.issue_token(&identity)?;
    tracing::info!(admin_id = %identity.id, "admin logged in");

    Ok(Json(LoginResponse {
        token,
        admin: identity,
    }))
}

/// GET /api/admin/me
pub async fn me(Extension(identity): Extension<Identity>) -> Json<Identity> {
    Json(identity)
}
