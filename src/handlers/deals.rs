// src/handlers/deals.rs

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
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
    models::{
        deal::{Deal, DealChanges, DealDetail, DealFilter, DealStatus, VerificationDecision},
        project::parse_date,
    },
    services::deal_service::{ClientChoice, CreateDealInput},
};

const REQUIRED_DEAL_FIELDS: [&str; 6] = [
    "title",
    "client_name",
    "contact_info",
    "budget",
    "created_by",
    "initiation_date",
];

// =============================================================================
//  PAYLOADS
// =============================================================================

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct SubmitDealPayload {
    /// Quem está enviando. Padrão: o criador do deal.
    #[schema(example = "ana.vendas")]
    pub username: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyDealPayload {
    #[schema(example = "approve")]
    pub action: Option<String>,
    #[schema(example = "vera.verifier")]
    pub verifier: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct DeleteDealPayload {
    #[schema(example = "ana.vendas")]
    pub username: Option<String>,
}

// Formulários multipart, só para a documentação OpenAPI
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct CreateDealForm {
    title: String,
    client_id: Option<Uuid>,
    client_name_manual: Option<String>,
    client_name: String,
    contact_info: String,
    budget: f64,
    advance_payment: Option<f64>,
    created_by: String,
    #[schema(example = "2025-01-15")]
    initiation_date: String,
    requirements: Option<String>,
    description: Option<String>,
    is_multiproject: Option<bool>,
    /// Array JSON de `{name, supervisor, deadline, description}`
    projects_data: Option<String>,
    #[schema(value_type = Option<String>, format = Binary)]
    receipt: Option<Vec<u8>>,
}

#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UpdateDealForm {
    username: String,
    title: Option<String>,
    client_name: Option<String>,
    contact_info: Option<String>,
    budget: Option<f64>,
    advance_payment: Option<f64>,
    requirements: Option<String>,
    description: Option<String>,
    initiation_date: Option<String>,
    is_multiproject: Option<bool>,
    /// Só `draft` tem efeito (reabre um deal rejeitado)
    status: Option<String>,
    #[schema(value_type = Option<String>, format = Binary)]
    receipt: Option<Vec<u8>>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct DealListQuery {
    pub username: Option<String>,
    /// salesperson, verifier, supervisor...
    pub role: Option<String>,
    /// Status explícito ou `all`
    pub status: Option<String>,
}

// =============================================================================
//  FORMULÁRIOS
// =============================================================================

fn parse_amount(raw: &str, label: &str) -> Result<Decimal, AppError> {
    raw.trim()
        .parse::<Decimal>()
        .map_err(|_| AppError::Validation(format!("Invalid {label} amount")))
}

fn create_input_from_form(form: &mut FormData) -> Result<CreateDealInput, AppError> {
    let missing = form.missing(&REQUIRED_DEAL_FIELDS);
    if !missing.is_empty() {
        return Err(AppError::Validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )));
    }

    let budget = parse_amount(&form.text_or_default("budget"), "budget")?;
    let advance_payment = match form.text("advance_payment") {
        Some(raw) => parse_amount(raw, "advance payment")?,
        None => Decimal::ZERO,
    };
    let initiation_date = parse_date(&form.text_or_default("initiation_date"), "initiation_date")?;

    // client_id tem prioridade; sem ele, client_name_manual cria um cliente novo
    let client = match (form.text("client_id"), form.text("client_name_manual")) {
        (Some(id), _) => ClientChoice::Existing(Uuid::parse_str(id).map_err(|_| {
            AppError::Validation(
                "Selected client not found. Please refresh the client list and try again.".into(),
            )
        })?),
        (None, Some(name)) => ClientChoice::New(name.to_string()),
        (None, None) => {
            return Err(AppError::Validation(
                "No client selected or created. Please select an existing client or enter a new client name."
                    .into(),
            ))
        }
    };

    Ok(CreateDealInput {
        title: form.text_or_default("title"),
        client,
        client_name: form.text_or_default("client_name"),
        contact_info: form.text_or_default("contact_info"),
        requirements: form.text_or_default("requirements"),
        description: form.text_or_default("description"),
        budget,
        advance_payment,
        is_multiproject: form.flag("is_multiproject"),
        initiation_date,
        created_by: form.text_or_default("created_by"),
        receipt: form.take_file("receipt"),
        projects_data: form.text("projects_data").map(str::to_string),
    })
}

fn changes_from_form(form: &FormData) -> Result<DealChanges, AppError> {
    let initiation_date = match form.text("initiation_date") {
        Some(raw) => Some(parse_date(raw, "initiation_date")?),
        None if form.contains("initiation_date") => {
            return Err(AppError::Validation(
                "Initiation date cannot be empty if provided.".into(),
            ))
        }
        None => None,
    };

    Ok(DealChanges {
        title: form.text("title").map(str::to_string),
        client_name: form.text("client_name").map(str::to_string),
        contact_info: form.text("contact_info").map(str::to_string),
        budget: form.text("budget").map(|b| parse_amount(b, "budget")).transpose()?,
        requirements: form.text("requirements").map(str::to_string),
        advance_payment: form
            .text("advance_payment")
            .map(|a| parse_amount(a, "advance payment"))
            .transpose()?,
        description: form.text("description").map(str::to_string),
        is_multiproject: form.flag("is_multiproject"),
        initiation_date,
        requested_status: form.text("status").map(str::to_string),
    })
}

// =============================================================================
//  HANDLERS
// =============================================================================

// POST /api/deals/create
#[utoipa::path(
    post,
    path = "/api/deals/create",
    tag = "Deals",
    request_body(content = CreateDealForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Deal criado (projetos com erro listados em project_errors)"),
        (status = 400, description = "Campos ausentes, vendedor ou cliente inválido")
    )
)]
pub async fn create_deal(
    State(app_state): State<AppState>,
    mut form: FormData,
) -> Result<impl IntoResponse, AppError> {
    let input = create_input_from_form(&mut form)?;
    let created = app_state.deal_service.create_deal(input).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Deal created successfully!",
            "deal_id": created.deal.id,
            "receipt_path": created.deal.receipt_file,
            "projects_count": created.projects.len(),
            "projects": created.projects,
            "project_errors": created.project_errors,
        })),
    ))
}

// GET /api/deals
#[utoipa::path(
    get,
    path = "/api/deals",
    tag = "Deals",
    params(DealListQuery),
    responses(
        (status = 200, description = "Deals visíveis para o papel, mais recentes primeiro", body = Vec<Deal>),
        (status = 400, description = "Username e role são obrigatórios")
    )
)]
pub async fn list_deals(
    State(app_state): State<AppState>,
    AppQuery(query): AppQuery<DealListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (Some(username), Some(role)) = (
        query.username.as_deref().filter(|u| !u.is_empty()),
        query.role.as_deref().filter(|r| !r.is_empty()),
    ) else {
        return Err(AppError::Validation("Username and role are required".into()));
    };

    let filter = DealFilter::for_caller(username, role, query.status.as_deref())?;
    let deals = app_state.deal_service.list_deals(&filter).await?;

    Ok(Json(json!({ "success": true, "deals": deals })))
}

// GET /api/deals/{id}
#[utoipa::path(
    get,
    path = "/api/deals/{id}",
    tag = "Deals",
    params(("id" = Uuid, Path, description = "ID do deal")),
    responses(
        (status = 200, description = "Deal com seus projetos", body = DealDetail),
        (status = 404, description = "Deal não encontrado")
    )
)]
pub async fn get_deal(
    State(app_state): State<AppState>,
    AppPath(deal_id): AppPath<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let deal = app_state.deal_service.get_deal(deal_id).await?;
    Ok(Json(json!({ "success": true, "deal": deal })))
}

// POST /api/deals/{id}/submit
#[utoipa::path(
    post,
    path = "/api/deals/{id}/submit",
    tag = "Deals",
    params(("id" = Uuid, Path, description = "ID do deal")),
    request_body(content = SubmitDealPayload, description = "Corpo opcional"),
    responses(
        (status = 200, description = "Deal enviado; verificadores e supervisores notificados"),
        (status = 400, description = "Deal não está em rascunho ou não tem recibo"),
        (status = 404, description = "Deal não encontrado")
    )
)]
pub async fn submit_deal(
    State(app_state): State<AppState>,
    AppPath(deal_id): AppPath<Uuid>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let payload: SubmitDealPayload = parse_optional_body(&body)?;
    let submitted_by = payload.username.as_deref().map(str::trim).filter(|u| !u.is_empty());

    let deal = app_state
        .deal_service
        .submit_for_verification(deal_id, submitted_by)
        .await?;

    Ok(Json(json!({
        "success": true,
        "status": deal.status,
        "message": "Deal submitted for verification. Verifiers and supervisors have been notified.",
    })))
}

// POST /api/deals/{id}/verify
#[utoipa::path(
    post,
    path = "/api/deals/{id}/verify",
    tag = "Deals",
    params(("id" = Uuid, Path, description = "ID do deal")),
    request_body = VerifyDealPayload,
    responses(
        (status = 200, description = "Deal aprovado ou rejeitado"),
        (status = 400, description = "Ação, verificador ou motivo inválidos; deal fora de verificação"),
        (status = 404, description = "Deal não encontrado")
    )
)]
pub async fn verify_deal(
    State(app_state): State<AppState>,
    AppPath(deal_id): AppPath<Uuid>,
    AppJson(payload): AppJson<VerifyDealPayload>,
) -> Result<impl IntoResponse, AppError> {
    let (Some(action), Some(verifier)) = (
        payload.action.as_deref().map(str::trim).filter(|a| !a.is_empty()),
        payload.verifier.as_deref().map(str::trim).filter(|v| !v.is_empty()),
    ) else {
        return Err(AppError::Validation(
            "Missing required fields: action, verifier".into(),
        ));
    };

    // Payload validado antes de qualquer consulta
    let decision = VerificationDecision::parse(action, payload.reason.as_deref())?;

    let deal = app_state
        .deal_service
        .verify_deal(deal_id, verifier, &decision)
        .await?;

    let message = match deal.status {
        DealStatus::Verified => "Deal verified successfully",
        _ => "Deal rejected with reason",
    };

    Ok(Json(json!({
        "success": true,
        "status": deal.status,
        "message": message,
        "verified_by": deal.verified_by,
        "verified_at": deal.verified_at,
        "rejection_reason": deal.rejection_reason,
    })))
}

// POST /api/deals/{id}/update
#[utoipa::path(
    post,
    path = "/api/deals/{id}/update",
    tag = "Deals",
    params(("id" = Uuid, Path, description = "ID do deal")),
    request_body(content = UpdateDealForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Deal atualizado"),
        (status = 403, description = "Não é o criador ou status não editável"),
        (status = 404, description = "Deal não encontrado")
    )
)]
pub async fn update_deal(
    State(app_state): State<AppState>,
    AppPath(deal_id): AppPath<Uuid>,
    mut form: FormData,
) -> Result<impl IntoResponse, AppError> {
    let username = form.text("username").map(str::to_string).ok_or_else(|| {
        AppError::Forbidden("Unauthorized: You can only update your own deals".into())
    })?;
    // Dono e status antes dos campos: quem não pode editar recebe 403, não 400
    app_state.deal_service.editable_deal(deal_id, &username).await?;

    let changes = changes_from_form(&form)?;
    let receipt = form.take_file("receipt");

    let deal = app_state
        .deal_service
        .update_deal(deal_id, &username, changes, receipt)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Deal updated successfully",
        "deal_id": deal.id,
        "deal": deal,
    })))
}

// POST /api/deals/{id}/delete
#[utoipa::path(
    post,
    path = "/api/deals/{id}/delete",
    tag = "Deals",
    params(("id" = Uuid, Path, description = "ID do deal")),
    request_body = DeleteDealPayload,
    responses(
        (status = 200, description = "Deal e projetos removidos"),
        (status = 400, description = "Username ausente ou status não permite remoção"),
        (status = 403, description = "Não é o criador"),
        (status = 404, description = "Deal não encontrado")
    )
)]
pub async fn delete_deal(
    State(app_state): State<AppState>,
    AppPath(deal_id): AppPath<Uuid>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let payload: DeleteDealPayload = parse_optional_body(&body)?;
    let username = payload
        .username
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| AppError::Validation("Username is required".into()))?;

    app_state.deal_service.delete_deal(deal_id, username).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Deal and related projects deleted successfully",
    })))
}
