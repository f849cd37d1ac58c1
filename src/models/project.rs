// src/models/project.rs

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{common::error::AppError, models::deal::DealStatus};

// --- ENUMS ---

// Sem ordem imposta: o supervisor pode ir de qualquer status para qualquer outro.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "project_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Pending,
    InProgress,
    Completed,
}

impl ProjectStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectStatus::Pending => "pending",
            ProjectStatus::InProgress => "in_progress",
            ProjectStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ProjectStatus::Pending),
            "in_progress" => Ok(ProjectStatus::InProgress),
            "completed" => Ok(ProjectStatus::Completed),
            _ => Err(AppError::Validation("Invalid or missing status parameter".into())),
        }
    }
}

// --- ENTIDADES ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Project {
    pub id: Uuid,
    pub deal_id: Uuid,
    #[schema(example = "Landing page")]
    pub name: String,
    pub description: String,
    #[schema(example = "sam.supervisor")]
    pub supervisor: String,
    pub assigned_by: Option<String>,
    #[schema(value_type = Option<String>, format = Date, example = "2025-03-01")]
    pub deadline: Option<NaiveDate>,
    #[schema(value_type = f64, example = 0.0)]
    pub additional_fee: Decimal,
    pub receipt_file: Option<String>,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn authorize_status_update(&self, supervisor: &str) -> Result<(), AppError> {
        if self.supervisor != supervisor {
            return Err(AppError::Forbidden(
                "Only the assigned supervisor can update this project".into(),
            ));
        }
        Ok(())
    }

    pub fn authorize_upload(&self, username: &str) -> Result<(), AppError> {
        if self.supervisor != username {
            return Err(AppError::Forbidden(
                "Only the assigned supervisor can upload files to this project".into(),
            ));
        }
        Ok(())
    }
}

// Projeto + título do deal pai, para listagens
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct ProjectListItem {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub project: Project,
    pub deal_title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ProjectFile {
    pub id: Uuid,
    pub project_id: Uuid,
    #[schema(example = "briefing.pdf")]
    pub file_name: String,
    #[schema(example = "project_files/6f1c.../20250101_120000_briefing.pdf")]
    pub file_path: String,
    pub content_type: Option<String>,
    pub size_bytes: i64,
    pub uploaded_by: String,
    pub uploaded_at: DateTime<Utc>,
}

impl ProjectFile {
    /// Supervisor do projeto ou quem enviou o arquivo.
    pub fn authorize_delete(&self, project: &Project, username: &str) -> Result<(), AppError> {
        if project.supervisor != username && self.uploaded_by != username {
            return Err(AppError::Forbidden(
                "Only the project supervisor or the uploader can delete this file".into(),
            ));
        }
        Ok(())
    }
}

// --- ESCRITA ---

// `id` gerado antes do INSERT: os arquivos já são gravados sob o diretório do projeto
#[derive(Debug, Clone)]
pub struct NewProject {
    pub id: Uuid,
    pub deal_id: Uuid,
    pub name: String,
    pub description: String,
    pub supervisor: String,
    pub assigned_by: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub additional_fee: Decimal,
    pub receipt_file: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewProjectFile {
    pub project_id: Uuid,
    pub file_name: String,
    pub file_path: String,
    pub content_type: Option<String>,
    pub size_bytes: i64,
    pub uploaded_by: String,
}

// Item de `projects_data` no formulário de criação do deal
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ProjectDraft {
    pub name: Option<String>,
    pub supervisor: Option<String>,
    #[schema(example = "2025-03-01")]
    pub deadline: Option<String>,
    #[serde(default)]
    pub description: String,
}

impl ProjectDraft {
    fn label(&self) -> &str {
        self.name.as_deref().filter(|n| !n.is_empty()).unwrap_or("Unnamed")
    }

    /// Projeto pronto para gravar sob um deal recém-criado (taxa zero, sem
    /// recibo). O erro é a mensagem que entra em `project_errors`.
    pub fn into_new_project(self, deal_id: Uuid, assigned_by: &str) -> Result<NewProject, String> {
        let (Some(name), Some(supervisor), Some(deadline)) = (
            self.name.as_deref().map(str::trim).filter(|v| !v.is_empty()),
            self.supervisor.as_deref().map(str::trim).filter(|v| !v.is_empty()),
            self.deadline.as_deref().map(str::trim).filter(|v| !v.is_empty()),
        ) else {
            return Err(format!(
                "Missing required fields (name, supervisor, deadline) for project: {}",
                self.label()
            ));
        };

        let deadline = NaiveDate::parse_from_str(deadline, "%Y-%m-%d").map_err(|_| {
            format!("Invalid deadline format for project {name}. Use YYYY-MM-DD.")
        })?;

        Ok(NewProject {
            id: Uuid::new_v4(),
            deal_id,
            name: name.to_string(),
            description: self.description,
            supervisor: supervisor.to_string(),
            assigned_by: Some(assigned_by.to_string()),
            deadline: Some(deadline),
            additional_fee: Decimal::ZERO,
            receipt_file: None,
        })
    }
}

/// Lê o campo `projects_data` (array JSON). Ausente ou vazio também é erro,
/// mas um erro que não impede a criação do deal.
pub fn parse_projects_data(raw: Option<&str>) -> Result<Vec<ProjectDraft>, String> {
    let drafts: Vec<ProjectDraft> = match raw.map(str::trim).filter(|r| !r.is_empty()) {
        Some(raw) => serde_json::from_str(raw)
            .map_err(|e| format!("Invalid project data format: {e}"))?,
        None => Vec::new(),
    };

    if drafts.is_empty() {
        return Err("No project data was provided. At least one project is required.".into());
    }
    Ok(drafts)
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProjectStatusPayload {
    #[schema(example = "in_progress")]
    pub status: Option<String>,
    #[schema(example = "sam.supervisor")]
    pub supervisor: Option<String>,
}

// --- REGRAS ---

/// Taxa adicional de um projeto novo, conforme o status do deal pai.
///
/// Deal verificado: taxa positiva e recibo obrigatórios.
/// Deal em rascunho: taxa sempre zero, recibo ignorado.
/// Outros status não aceitam projetos novos.
pub fn additional_fee_for(
    deal_status: DealStatus,
    raw_fee: Option<&str>,
    has_receipt: bool,
) -> Result<Decimal, AppError> {
    match deal_status {
        DealStatus::Draft => Ok(Decimal::ZERO),
        DealStatus::Verified => {
            let raw_fee = raw_fee.map(str::trim).filter(|f| !f.is_empty()).ok_or_else(|| {
                AppError::Validation(
                    "Additional fee is required for projects added to verified deals".into(),
                )
            })?;
            let fee: Decimal = raw_fee
                .parse()
                .map_err(|_| AppError::Validation("Invalid additional fee amount".into()))?;
            if fee <= Decimal::ZERO {
                return Err(AppError::Validation(
                    "Additional fee must be greater than zero".into(),
                ));
            }
            if !has_receipt {
                return Err(AppError::Validation(
                    "Receipt is required for projects added to verified deals".into(),
                ));
            }
            Ok(fee)
        }
        other => Err(AppError::StateConflict(format!(
            "Projects can only be added to draft or verified deals (deal is {other})"
        ))),
    }
}

/// Data no formato `YYYY-MM-DD`.
pub fn parse_date(raw: &str, field: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("Invalid {field} format. Use YYYY-MM-DD.")))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use assert_matches::assert_matches;

    pub(crate) fn sample_project(deal_id: Uuid, supervisor: &str) -> Project {
        let now = Utc::now();
        Project {
            id: Uuid::new_v4(),
            deal_id,
            name: "Landing page".into(),
            description: String::new(),
            supervisor: supervisor.into(),
            assigned_by: Some("ana".into()),
            deadline: None,
            additional_fee: Decimal::ZERO,
            receipt_file: None,
            status: ProjectStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn verified_deal_requires_fee_and_receipt() {
        assert_matches!(
            additional_fee_for(DealStatus::Verified, None, true),
            Err(AppError::Validation(msg)) if msg.starts_with("Additional fee is required")
        );
        assert_matches!(
            additional_fee_for(DealStatus::Verified, Some("abc"), true),
            Err(AppError::Validation(msg)) if msg == "Invalid additional fee amount"
        );
        for non_positive in ["0", "0.00", "-5"] {
            assert_matches!(
                additional_fee_for(DealStatus::Verified, Some(non_positive), true),
                Err(AppError::Validation(msg)) if msg == "Additional fee must be greater than zero"
            );
        }
        assert_matches!(
            additional_fee_for(DealStatus::Verified, Some("250.00"), false),
            Err(AppError::Validation(msg)) if msg.starts_with("Receipt is required")
        );
        assert_eq!(
            additional_fee_for(DealStatus::Verified, Some("250.50"), true).unwrap(),
            Decimal::new(25050, 2)
        );
    }

    #[test]
    fn draft_deal_gets_zero_fee() {
        assert_eq!(additional_fee_for(DealStatus::Draft, None, false).unwrap(), Decimal::ZERO);
        assert_eq!(
            additional_fee_for(DealStatus::Draft, Some("999"), true).unwrap(),
            Decimal::ZERO
        );
    }

    #[test]
    fn other_deal_statuses_refuse_new_projects() {
        for status in [
            DealStatus::PendingVerification,
            DealStatus::Rejected,
            DealStatus::Completed,
        ] {
            assert_matches!(
                additional_fee_for(status, Some("10"), true),
                Err(AppError::StateConflict(_))
            );
        }
    }

    #[test]
    fn only_assigned_supervisor_updates_status() {
        let project = sample_project(Uuid::new_v4(), "sam");
        assert!(project.authorize_status_update("sam").is_ok());
        assert_matches!(
            project.authorize_status_update("ana"),
            Err(AppError::Forbidden(msg)) if msg == "Only the assigned supervisor can update this project"
        );
    }

    #[test]
    fn status_parsing_rejects_unknown_values() {
        assert_eq!("in_progress".parse::<ProjectStatus>().unwrap(), ProjectStatus::InProgress);
        assert_matches!(
            "done".parse::<ProjectStatus>(),
            Err(AppError::Validation(msg)) if msg == "Invalid or missing status parameter"
        );
    }

    #[test]
    fn file_delete_allowed_for_supervisor_or_uploader() {
        let project = sample_project(Uuid::new_v4(), "sam");
        let file = ProjectFile {
            id: Uuid::new_v4(),
            project_id: project.id,
            file_name: "a.pdf".into(),
            file_path: "project_files/x/t_a.pdf".into(),
            content_type: None,
            size_bytes: 3,
            uploaded_by: "rita".into(),
            uploaded_at: Utc::now(),
        };

        assert!(file.authorize_delete(&project, "sam").is_ok());
        assert!(file.authorize_delete(&project, "rita").is_ok());
        assert_matches!(file.authorize_delete(&project, "ana"), Err(AppError::Forbidden(_)));
    }

    #[test]
    fn projects_data_must_be_a_non_empty_array() {
        assert_matches!(
            parse_projects_data(None),
            Err(msg) if msg.starts_with("No project data was provided")
        );
        assert_matches!(parse_projects_data(Some("[]")), Err(_));
        assert_matches!(
            parse_projects_data(Some("{not json")),
            Err(msg) if msg.starts_with("Invalid project data format")
        );

        let drafts = parse_projects_data(Some(
            r#"[{"name": "App", "supervisor": "sam", "deadline": "2025-04-01"}]"#,
        ))
        .unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].description, "");
    }

    #[test]
    fn draft_needs_name_supervisor_and_deadline() {
        let deal_id = Uuid::new_v4();
        let draft = |name: Option<&str>, supervisor: Option<&str>, deadline: Option<&str>| ProjectDraft {
            name: name.map(str::to_string),
            supervisor: supervisor.map(str::to_string),
            deadline: deadline.map(str::to_string),
            description: "Site".into(),
        };

        assert_matches!(
            draft(None, Some("sam"), Some("2025-04-01")).into_new_project(deal_id, "ana"),
            Err(msg) if msg.ends_with("for project: Unnamed")
        );
        assert_matches!(
            draft(Some("App"), Some("sam"), Some("04/01/2025")).into_new_project(deal_id, "ana"),
            Err(msg) if msg == "Invalid deadline format for project App. Use YYYY-MM-DD."
        );

        let project = draft(Some("App"), Some("sam"), Some("2025-04-01"))
            .into_new_project(deal_id, "ana")
            .unwrap();
        assert_eq!(project.deal_id, deal_id);
        assert_eq!(project.assigned_by.as_deref(), Some("ana"));
        assert_eq!(project.additional_fee, Decimal::ZERO);
        assert_eq!(project.deadline, NaiveDate::from_ymd_opt(2025, 4, 1));
    }

    #[test]
    fn dates_use_iso_format() {
        assert_eq!(
            parse_date("2025-03-01", "deadline").unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
        );
        assert_matches!(
            parse_date("01/03/2025", "deadline"),
            Err(AppError::Validation(msg)) if msg == "Invalid deadline format. Use YYYY-MM-DD."
        );
    }
}
