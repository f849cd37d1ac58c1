// src/handlers/projects.rs

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        extract::{parse_optional_body, AppJson, AppPath, AppQuery, FormData},
    },
    config::AppState,
    models::project::{
        parse_date, Project, ProjectFile, ProjectListItem, ProjectStatus,
        UpdateProjectStatusPayload,
    },
    services::project_service::CreateProjectInput,
};

// Formulários multipart, só para a documentação OpenAPI
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct CreateProjectForm {
    deal_id: Uuid,
    name: String,
    supervisor: String,
    description: Option<String>,
    #[schema(example = "2025-03-01")]
    deadline: Option<String>,
    /// Obrigatória (positiva) quando o deal já está verificado
    additional_fee: Option<f64>,
    assigned_by: Option<String>,
    #[schema(value_type = Option<String>, format = Binary)]
    receipt: Option<Vec<u8>>,
    #[schema(value_type = Vec<String>, format = Binary)]
    files: Vec<Vec<u8>>,
}

#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadProjectFilesForm {
    project_id: Uuid,
    uploaded_by: String,
    #[schema(value_type = Vec<String>, format = Binary)]
    files: Vec<Vec<u8>>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ProjectListQuery {
    pub deal_id: Option<String>,
    pub supervisor: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ProjectFilesQuery {
    pub project_id: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct DeleteFilePayload {
    #[schema(example = "sam.supervisor")]
    pub username: Option<String>,
}

fn parse_id(raw: &str, field: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::Validation(format!("Invalid {field}")))
}

fn create_input_from_form(form: &mut FormData) -> Result<CreateProjectInput, AppError> {
    if !form.missing(&["deal_id", "name", "supervisor"]).is_empty() {
        return Err(AppError::Validation(
            "Missing required fields: deal_id, name, supervisor".into(),
        ));
    }

    let deal_id = parse_id(&form.text_or_default("deal_id"), "deal_id")?;
    let deadline = form
        .text("deadline")
        .map(|raw| parse_date(raw, "deadline"))
        .transpose()?;

    Ok(CreateProjectInput {
        deal_id,
        name: form.text_or_default("name"),
        supervisor: form.text_or_default("supervisor"),
        description: form.text_or_default("description"),
        deadline,
        additional_fee: form.text("additional_fee").map(str::to_string),
        assigned_by: form.text("assigned_by").map(str::to_string),
        receipt: form.take_file("receipt"),
        files: form.take_files("files"),
    })
}

// POST /api/projects/create
#[utoipa::path(
    post,
    path = "/api/projects/create",
    tag = "Projects",
    request_body(content = CreateProjectForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Projeto criado"),
        (status = 400, description = "Campos ausentes, taxa/recibo exigidos ou deal em status inválido"),
        (status = 404, description = "Deal não encontrado")
    )
)]
pub async fn create_project(
    State(app_state): State<AppState>,
    mut form: FormData,
) -> Result<impl IntoResponse, AppError> {
    let input = create_input_from_form(&mut form)?;
    let project = app_state.project_service.create_project(input).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Project created successfully",
            "project_id": project.id,
            "project": project,
        })),
    ))
}

// GET /api/projects
#[utoipa::path(
    get,
    path = "/api/projects",
    tag = "Projects",
    params(ProjectListQuery),
    responses(
        (status = 200, description = "Projetos com o título do deal", body = Vec<ProjectListItem>),
        (status = 400, description = "Informe deal_id ou supervisor")
    )
)]
pub async fn list_projects(
    State(app_state): State<AppState>,
    AppQuery(query): AppQuery<ProjectListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let deal_id = query
        .deal_id
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .map(|d| parse_id(d, "deal_id"))
        .transpose()?;
    let supervisor = query.supervisor.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let projects = app_state.project_service.list_projects(deal_id, supervisor).await?;

    Ok(Json(json!({ "success": true, "projects": projects })))
}

// POST /api/projects/{id}/update-status
#[utoipa::path(
    post,
    path = "/api/projects/{id}/update-status",
    tag = "Projects",
    params(("id" = Uuid, Path, description = "ID do projeto")),
    request_body = UpdateProjectStatusPayload,
    responses(
        (status = 200, description = "Status atualizado", body = Project),
        (status = 400, description = "Status inválido ou supervisor ausente"),
        (status = 403, description = "Não é o supervisor do projeto"),
        (status = 404, description = "Projeto não encontrado")
    )
)]
pub async fn update_project_status(
    State(app_state): State<AppState>,
    AppPath(project_id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateProjectStatusPayload>,
) -> Result<impl IntoResponse, AppError> {
    let status: ProjectStatus = payload.status.as_deref().unwrap_or_default().parse()?;
    let supervisor = payload
        .supervisor
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Validation("Supervisor username is required".into()))?;

    let project = app_state
        .project_service
        .update_status(project_id, status, supervisor)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Project status updated to {}", project.status),
        "project_id": project.id,
        "status": project.status,
        "updated_at": project.updated_at,
    })))
}

// POST /api/projects/files/upload
#[utoipa::path(
    post,
    path = "/api/projects/files/upload",
    tag = "Projects",
    request_body(content = UploadProjectFilesForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Arquivos anexados", body = Vec<ProjectFile>),
        (status = 400, description = "Campos ou arquivos ausentes"),
        (status = 403, description = "Não é o supervisor do projeto"),
        (status = 404, description = "Projeto não encontrado")
    )
)]
pub async fn upload_project_files(
    State(app_state): State<AppState>,
    mut form: FormData,
) -> Result<impl IntoResponse, AppError> {
    if !form.missing(&["project_id", "uploaded_by"]).is_empty() {
        return Err(AppError::Validation(
            "Missing required fields: project_id, uploaded_by".into(),
        ));
    }
    let project_id = parse_id(&form.text_or_default("project_id"), "project_id")?;
    let uploaded_by = form.text_or_default("uploaded_by");
    let files = form.take_files("files");

    let stored = app_state
        .project_service
        .upload_files(project_id, &uploaded_by, files)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": format!("{} file(s) uploaded successfully", stored.len()),
            "files": stored,
        })),
    ))
}

// GET /api/projects/files
#[utoipa::path(
    get,
    path = "/api/projects/files",
    tag = "Projects",
    params(ProjectFilesQuery),
    responses(
        (status = 200, description = "Arquivos do projeto, mais recentes primeiro", body = Vec<ProjectFile>),
        (status = 400, description = "project_id ausente ou inválido")
    )
)]
pub async fn list_project_files(
    State(app_state): State<AppState>,
    AppQuery(query): AppQuery<ProjectFilesQuery>,
) -> Result<impl IntoResponse, AppError> {
    let raw = query
        .project_id
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Project ID is required".into()))?;
    let project_id = parse_id(raw, "project_id")?;

    let files = app_state.project_service.list_files(project_id).await?;

    Ok(Json(json!({ "success": true, "files": files })))
}

// POST /api/projects/files/{id}/delete
#[utoipa::path(
    post,
    path = "/api/projects/files/{id}/delete",
    tag = "Projects",
    params(("id" = Uuid, Path, description = "ID do arquivo")),
    request_body = DeleteFilePayload,
    responses(
        (status = 200, description = "Arquivo removido"),
        (status = 400, description = "Username ausente"),
        (status = 403, description = "Nem supervisor nem quem enviou"),
        (status = 404, description = "Arquivo não encontrado")
    )
)]
pub async fn delete_project_file(
    State(app_state): State<AppState>,
    AppPath(file_id): AppPath<Uuid>,
    body: axum::body::Bytes,
) -> Result<impl IntoResponse, AppError> {
    let payload: DeleteFilePayload = parse_optional_body(&body)?;
    let username = payload
        .username
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| AppError::Validation("Username is required".into()))?;

    app_state.project_service.delete_file(file_id, username).await?;

    Ok(Json(json!({
        "success": true,
        "message": "File deleted successfully",
    })))
}
