// src/models/deal.rs

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{auth::UserRole, project::Project},
};

// =============================================================================
//  MÁQUINA DE ESTADOS DO DEAL
// =============================================================================

// Mapeia o CREATE TYPE deal_status do banco
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "deal_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DealStatus {
    Draft,
    PendingVerification,
    Verified,
    Rejected,
    // Nenhuma transição leva até aqui
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DealTransition {
    Submit,
    Approve,
    Reject,
    // Deal rejeitado editado e devolvido para rascunho
    Reopen,
}

/// Tabela completa de transições legais: (origem, transição, destino).
pub const DEAL_TRANSITIONS: &[(DealStatus, DealTransition, DealStatus)] = &[
    (DealStatus::Draft, DealTransition::Submit, DealStatus::PendingVerification),
    (DealStatus::PendingVerification, DealTransition::Approve, DealStatus::Verified),
    (DealStatus::PendingVerification, DealTransition::Reject, DealStatus::Rejected),
    (DealStatus::Rejected, DealTransition::Reopen, DealStatus::Draft),
];

impl DealStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DealStatus::Draft => "draft",
            DealStatus::PendingVerification => "pending_verification",
            DealStatus::Verified => "verified",
            DealStatus::Rejected => "rejected",
            DealStatus::Completed => "completed",
        }
    }

    /// Destino de `transition` a partir deste status, se for legal.
    pub fn next(self, transition: DealTransition) -> Option<DealStatus> {
        DEAL_TRANSITIONS
            .iter()
            .find(|(from, t, _)| *from == self && *t == transition)
            .map(|(_, _, to)| *to)
    }

    /// Só rascunhos e rejeitados podem ser editados ou apagados.
    pub fn is_editable(self) -> bool {
        matches!(self, DealStatus::Draft | DealStatus::Rejected)
    }
}

impl fmt::Display for DealStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DealStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(DealStatus::Draft),
            "pending_verification" => Ok(DealStatus::PendingVerification),
            "verified" => Ok(DealStatus::Verified),
            "rejected" => Ok(DealStatus::Rejected),
            "completed" => Ok(DealStatus::Completed),
            other => Err(AppError::Validation(format!("Invalid status: {other}"))),
        }
    }
}

// =============================================================================
//  DECISÃO DO VERIFICADOR
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationDecision {
    Approve,
    Reject { reason: String },
}

impl VerificationDecision {
    /// Valida `action` + `reason` antes de qualquer acesso ao banco.
    pub fn parse(action: &str, reason: Option<&str>) -> Result<Self, AppError> {
        match action {
            "approve" => Ok(VerificationDecision::Approve),
            "reject" => match reason.map(str::trim).filter(|r| !r.is_empty()) {
                Some(reason) => Ok(VerificationDecision::Reject {
                    reason: reason.to_string(),
                }),
                None => Err(AppError::Validation("Rejection reason is required".into())),
            },
            _ => Err(AppError::Validation("Invalid action".into())),
        }
    }

    pub fn transition(&self) -> DealTransition {
        match self {
            VerificationDecision::Approve => DealTransition::Approve,
            VerificationDecision::Reject { .. } => DealTransition::Reject,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            VerificationDecision::Approve => None,
            VerificationDecision::Reject { reason } => Some(reason),
        }
    }
}

// =============================================================================
//  ENTIDADE
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Deal {
    pub id: Uuid,
    #[schema(example = "Website revamp")]
    pub title: String,
    pub client_id: Option<Uuid>,
    #[schema(example = "Acme Ltda")]
    pub client_name: String,
    #[schema(example = "contato@acme.com")]
    pub contact_info: String,
    pub requirements: String,
    pub description: String,
    #[schema(value_type = f64, example = 15000.0)]
    pub budget: Decimal,
    #[schema(value_type = f64, example = 5000.0)]
    pub advance_payment: Decimal,
    #[schema(example = "receipts/20250101_120000_paid.pdf")]
    pub receipt_file: Option<String>,
    pub is_multiproject: bool,
    #[schema(value_type = String, format = Date, example = "2025-01-15")]
    pub initiation_date: NaiveDate,
    pub status: DealStatus,
    #[schema(example = "ana.vendas")]
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub verified_by: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

impl Deal {
    pub fn has_receipt(&self) -> bool {
        self.receipt_file.as_deref().is_some_and(|r| !r.is_empty())
    }

    /// Status resultante de `submit_for_verification`.
    pub fn submission_status(&self) -> Result<DealStatus, AppError> {
        let next = self
            .status
            .next(DealTransition::Submit)
            .ok_or_else(|| AppError::StateConflict("Only draft deals can be submitted".into()))?;

        if !self.has_receipt() {
            return Err(AppError::Validation(
                "Receipt file is required for verification".into(),
            ));
        }
        Ok(next)
    }

    /// Status resultante de aprovar/rejeitar.
    pub fn verification_status(&self, decision: &VerificationDecision) -> Result<DealStatus, AppError> {
        let next = self
            .status
            .next(decision.transition())
            .ok_or_else(|| AppError::StateConflict("Deal is not pending verification".into()))?;

        if !self.has_receipt() {
            return Err(AppError::Validation("Deal has no receipt attached".into()));
        }
        Ok(next)
    }

    pub fn authorize_update(&self, username: &str) -> Result<(), AppError> {
        if self.created_by != username {
            return Err(AppError::Forbidden(
                "Unauthorized: You can only update your own deals".into(),
            ));
        }
        if !self.status.is_editable() {
            return Err(AppError::Forbidden(format!(
                "Cannot update a deal with status: {}. Only draft or rejected deals can be updated.",
                self.status
            )));
        }
        Ok(())
    }

    pub fn authorize_delete(&self, username: &str) -> Result<(), AppError> {
        if self.created_by != username {
            return Err(AppError::Forbidden("You can only delete deals you created".into()));
        }
        if !self.status.is_editable() {
            return Err(AppError::StateConflict(format!(
                "Cannot delete deals in {} status",
                self.status
            )));
        }
        Ok(())
    }

    /// Status após uma edição. Só `draft` é aceito como pedido explícito.
    pub fn status_after_edit(&self, requested: Option<&str>) -> DealStatus {
        match requested {
            Some("draft") => self.status.next(DealTransition::Reopen).unwrap_or(self.status),
            _ => self.status,
        }
    }
}

/// Deal + lista ordenada dos seus projetos.
#[derive(Debug, Serialize, ToSchema)]
pub struct DealDetail {
    #[serde(flatten)]
    pub deal: Deal,
    pub projects: Vec<Project>,
}

// =============================================================================
//  ESCRITA
// =============================================================================

/// Campos de um deal novo, já validados.
#[derive(Debug, Clone)]
pub struct NewDeal {
    pub title: String,
    pub client_id: Option<Uuid>,
    pub client_name: String,
    pub contact_info: String,
    pub requirements: String,
    pub description: String,
    pub budget: Decimal,
    pub advance_payment: Decimal,
    pub receipt_file: Option<String>,
    pub is_multiproject: bool,
    pub initiation_date: NaiveDate,
    pub created_by: String,
}

/// Edição parcial. `None` mantém o valor gravado.
#[derive(Debug, Clone, Default)]
pub struct DealChanges {
    pub title: Option<String>,
    pub client_name: Option<String>,
    pub contact_info: Option<String>,
    pub budget: Option<Decimal>,
    pub requirements: Option<String>,
    pub advance_payment: Option<Decimal>,
    pub description: Option<String>,
    pub is_multiproject: bool,
    pub initiation_date: Option<NaiveDate>,
    pub requested_status: Option<String>,
}

impl Deal {
    /// Aplica `changes` em memória; o repositório grava o resultado inteiro.
    pub fn apply_changes(&mut self, changes: DealChanges) {
        self.status = self.status_after_edit(changes.requested_status.as_deref());
        if let Some(title) = changes.title {
            self.title = title;
        }
        if let Some(client_name) = changes.client_name {
            self.client_name = client_name;
        }
        if let Some(contact_info) = changes.contact_info {
            self.contact_info = contact_info;
        }
        if let Some(budget) = changes.budget {
            self.budget = budget;
        }
        if let Some(requirements) = changes.requirements {
            self.requirements = requirements;
        }
        if let Some(advance_payment) = changes.advance_payment {
            self.advance_payment = advance_payment;
        }
        if let Some(description) = changes.description {
            self.description = description;
        }
        if let Some(initiation_date) = changes.initiation_date {
            self.initiation_date = initiation_date;
        }
        self.is_multiproject = changes.is_multiproject;
    }
}

// =============================================================================
//  LISTAGEM
// =============================================================================

/// Filtro de `GET /deals` derivado de quem pergunta.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DealFilter {
    pub created_by: Option<String>,
    pub status: Option<DealStatus>,
}

impl DealFilter {
    /// Vendedor vê os próprios deals; verificador vê os pendentes, a não ser
    /// que peça `status=all`. Um status explícito sempre prevalece.
    pub fn for_caller(username: &str, role: &str, status: Option<&str>) -> Result<Self, AppError> {
        let mut filter = DealFilter::default();

        match role.parse::<UserRole>() {
            Ok(UserRole::Salesperson) => filter.created_by = Some(username.to_string()),
            Ok(UserRole::Verifier) if status != Some("all") => {
                filter.status = Some(DealStatus::PendingVerification)
            }
            _ => {}
        }

        if let Some(status) = status.filter(|s| *s != "all") {
            filter.status = Some(status.parse()?);
        }

        Ok(filter)
    }
}
