// src/handlers/auth.rs

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use utoipa::IntoParams;
use validator::Validate;

use crate::{
    common::{
        error::AppError,
        extract::{AppJson, AppQuery},
    },
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::auth::{AuthResponse, LoginUserPayload, RegisterUserPayload, User, UserRole},
};

// POST /api/auth/register
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterUserPayload,
    responses(
        (status = 201, description = "Usuário criado", body = AuthResponse),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "Username já existe")
    )
)]
pub async fn register(
    State(app_state): State<AppState>,
    AppJson(payload): AppJson<RegisterUserPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let (token, user) = app_state
        .auth_service
        .register_user(payload.username.trim(), payload.email.trim(), payload.role)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            token,
            user,
        }),
    ))
}

// POST /api/auth/login
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginUserPayload,
    responses(
        (status = 200, description = "Login efetuado", body = AuthResponse),
        (status = 404, description = "Usuário não encontrado")
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    AppJson(payload): AppJson<LoginUserPayload>,
) -> Result<Json<AuthResponse>, AppError> {
    payload.validate()?;

    let (token, user) = app_state.auth_service.login_user(payload.username.trim()).await?;

    Ok(Json(AuthResponse {
        success: true,
        token,
        user,
    }))
}

// GET /api/auth/me
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Usuário do token", body = User),
        (status = 401, description = "Token ausente ou inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_me(AuthenticatedUser(user): AuthenticatedUser) -> impl IntoResponse {
    Json(json!({ "success": true, "user": user }))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct UserListQuery {
    /// Filtra por papel (ex: `supervisor`)
    pub role: Option<String>,
}

// GET /api/users
#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Auth",
    params(UserListQuery),
    responses(
        (status = 200, description = "Usuários cadastrados", body = Vec<User>),
        (status = 400, description = "Papel inválido")
    )
)]
pub async fn list_users(
    State(app_state): State<AppState>,
    AppQuery(query): AppQuery<UserListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let role = query
        .role
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::parse::<UserRole>)
        .transpose()?;

    let users = app_state.auth_service.list_users(role).await?;

    Ok(Json(json!({ "success": true, "users": users })))
}
