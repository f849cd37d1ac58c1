// src/handlers/clients.rs

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use utoipa::IntoParams;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        error::AppError,
        extract::{AppJson, AppPath, AppQuery},
    },
    config::AppState,
    models::client::{Client, CreateClientPayload, OwnerPayload, UpdateClientPayload},
};

#[derive(Debug, Deserialize, IntoParams)]
pub struct ClientListQuery {
    /// Dono dos clientes
    pub username: Option<String>,
    /// Busca em nome, empresa, contato, e-mail, telefone, endereço e país
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ClientOwnerQuery {
    pub username: Option<String>,
}

fn required_username(username: Option<&str>) -> Result<&str, AppError> {
    username
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| AppError::Validation("Username is required".into()))
}

// POST /api/clients/create
#[utoipa::path(
    post,
    path = "/api/clients/create",
    tag = "Clients",
    request_body = CreateClientPayload,
    responses(
        (status = 201, description = "Cliente criado", body = Client),
        (status = 400, description = "Dados inválidos"),
        (status = 404, description = "Usuário não encontrado")
    )
)]
pub async fn create_client(
    State(app_state): State<AppState>,
    AppJson(payload): AppJson<CreateClientPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let client = app_state
        .client_service
        .create_client(payload.username.trim(), &payload.name, &payload.fields)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Client created successfully",
            "client": client,
        })),
    ))
}

// GET /api/clients/list
#[utoipa::path(
    get,
    path = "/api/clients/list",
    tag = "Clients",
    params(ClientListQuery),
    responses(
        (status = 200, description = "Clientes do vendedor", body = Vec<Client>),
        (status = 400, description = "Username ausente")
    )
)]
pub async fn list_clients(
    State(app_state): State<AppState>,
    AppQuery(query): AppQuery<ClientListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let username = required_username(query.username.as_deref())?;

    let clients = app_state
        .client_service
        .list_clients(username, query.search.as_deref())
        .await?;

    Ok(Json(json!({
        "success": true,
        "count": clients.len(),
        "clients": clients,
    })))
}

// GET /api/clients/details/{id}
#[utoipa::path(
    get,
    path = "/api/clients/details/{id}",
    tag = "Clients",
    params(
        ("id" = Uuid, Path, description = "ID do cliente"),
        ClientOwnerQuery
    ),
    responses(
        (status = 200, description = "Cliente", body = Client),
        (status = 404, description = "Cliente não encontrado ou de outro dono")
    )
)]
pub async fn client_details(
    State(app_state): State<AppState>,
    AppPath(client_id): AppPath<Uuid>,
    AppQuery(query): AppQuery<ClientOwnerQuery>,
) -> Result<impl IntoResponse, AppError> {
    let username = required_username(query.username.as_deref())?;
    let client = app_state.client_service.client_details(client_id, username).await?;

    Ok(Json(json!({ "success": true, "client": client })))
}

// POST /api/clients/update/{id}
#[utoipa::path(
    post,
    path = "/api/clients/update/{id}",
    tag = "Clients",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    request_body = UpdateClientPayload,
    responses(
        (status = 200, description = "Cliente atualizado", body = Client),
        (status = 404, description = "Cliente não encontrado ou de outro dono")
    )
)]
pub async fn update_client(
    State(app_state): State<AppState>,
    AppPath(client_id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateClientPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let client = app_state
        .client_service
        .update_client(client_id, payload.username.trim(), payload.name, payload.fields)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Client updated successfully",
        "client": client,
    })))
}

// POST /api/clients/delete/{id}
#[utoipa::path(
    post,
    path = "/api/clients/delete/{id}",
    tag = "Clients",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    request_body = OwnerPayload,
    responses(
        (status = 200, description = "Cliente removido"),
        (status = 404, description = "Cliente não encontrado ou de outro dono")
    )
)]
pub async fn delete_client(
    State(app_state): State<AppState>,
    AppPath(client_id): AppPath<Uuid>,
    AppJson(payload): AppJson<OwnerPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    app_state
        .client_service
        .delete_client(client_id, payload.username.trim())
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Client deleted successfully",
    })))
}
