use axum::Json;
use axum::extract::{FromRequestParts, State};
use axum::http::{header, request::Parts};
use serde::Serialize;
use tracing::info;

use crate::error::AppError;
use crate::models::{LoginRequest, User, UserKind};
use crate::services::SharedContext;
use crate::state::AppState;

/// The caller's workspace, resolved from `Authorization: Bearer <token>`.
pub struct CurrentSession {
    pub token: String,
    pub context: SharedContext,
}

impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AppError::Unauthorized)?
            .to_string();

        let context = state.sessions.get(&token).await?;
        Ok(Self { token, context })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let user = match req.kind {
        UserKind::Local => User::local(req.id.as_deref().unwrap_or(&req.display_name)),
        UserKind::Federated => User::federated(req.id.as_deref().unwrap_or_default(), &req.display_name),
    }
    .ok_or_else(|| AppError::bad_request("a non-empty user id is required"))?;

    let (token, _) = state.sessions.login(user.clone()).await?;
    info!("{} logged in", user.storage_key());
    Ok(Json(LoginResponse { token, user }))
}

pub async fn logout(State(state): State<AppState>, session: CurrentSession) -> Result<Json<User>, AppError> {
    let user = state.sessions.logout(&session.token).await?;
    Ok(Json(user))
}

pub async fn me(session: CurrentSession) -> Json<User> {
    let ctx = session.context.lock().await;
    Json(ctx.user().clone())
}
