// src/services/deal_service.rs

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{error::AppError, extract::UploadedFile, storage::FileStorage},
    db::{ClientRepository, DealRepository, ProjectRepository, UserRepository},
    models::{
        auth::UserRole,
        client::ClientFields,
        deal::{Deal, DealChanges, DealDetail, DealFilter, NewDeal, VerificationDecision},
        project::{parse_projects_data, Project},
    },
    services::notification_service::{
        assignment_notice, submission_notices, verification_notice, NotificationOutbox,
    },
};

pub const RECEIPTS_DIR: &str = "receipts";

/// Como o deal se liga a um cliente.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientChoice {
    Existing(Uuid),
    // Cliente novo, criado junto com o deal e pertencente ao vendedor
    New(String),
}

#[derive(Debug)]
pub struct CreateDealInput {
    pub title: String,
    pub client: ClientChoice,
    pub client_name: String,
    pub contact_info: String,
    pub requirements: String,
    pub description: String,
    pub budget: rust_decimal::Decimal,
    pub advance_payment: rust_decimal::Decimal,
    pub is_multiproject: bool,
    pub initiation_date: chrono::NaiveDate,
    pub created_by: String,
    pub receipt: Option<UploadedFile>,
    pub projects_data: Option<String>,
}

/// Resultado parcial: o deal existe mesmo que alguns projetos tenham falhado.
#[derive(Debug)]
pub struct DealCreated {
    pub deal: Deal,
    pub projects: Vec<Project>,
    pub project_errors: Vec<String>,
}

#[derive(Clone)]
pub struct DealService {
    repo: DealRepository,
    project_repo: ProjectRepository,
    client_repo: ClientRepository,
    user_repo: UserRepository,
    storage: FileStorage,
    outbox: NotificationOutbox,
    pool: PgPool,
}

impl DealService {
    pub fn new(
        repo: DealRepository,
        project_repo: ProjectRepository,
        client_repo: ClientRepository,
        user_repo: UserRepository,
        storage: FileStorage,
        outbox: NotificationOutbox,
        pool: PgPool,
    ) -> Self {
        Self {
            repo,
            project_repo,
            client_repo,
            user_repo,
            storage,
            outbox,
            pool,
        }
    }

    async fn find(&self, deal_id: Uuid) -> Result<Deal, AppError> {
        self.repo
            .find_by_id(deal_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Deal not found".into()))
    }

    // =========================================================================
    //  CRIAÇÃO
    // =========================================================================

    pub async fn create_deal(&self, input: CreateDealInput) -> Result<DealCreated, AppError> {
        let salesperson = self
            .user_repo
            .find_with_role(&input.created_by, UserRole::Salesperson)
            .await?
            .ok_or_else(|| AppError::Validation("Invalid salesperson".into()))?;

        let mut client_name = input.client_name;
        let mut client_id = None;

        if let ClientChoice::Existing(id) = &input.client {
            let client = self.client_repo.find_by_id(*id).await?.ok_or_else(|| {
                AppError::Validation(
                    "Selected client not found. Please refresh the client list and try again.".into(),
                )
            })?;
            client_name = client.name;
            client_id = Some(client.id);
        }

        let receipt_file = match &input.receipt {
            Some(file) => Some(self.storage.save(RECEIPTS_DIR, &file.file_name, &file.data).await?),
            None => None,
        };

        // Cliente novo + deal na mesma transação
        let mut tx = self.pool.begin().await?;

        if let ClientChoice::New(name) = &input.client {
            let fields = ClientFields {
                contact_info: Some(input.contact_info.clone()),
                ..Default::default()
            };
            let client = self
                .client_repo
                .create(&mut *tx, salesperson.id, name, &fields)
                .await?;
            client_name = client.name;
            client_id = Some(client.id);
        }

        let deal = self
            .repo
            .create(
                &mut *tx,
                &NewDeal {
                    title: input.title,
                    client_id,
                    client_name,
                    contact_info: input.contact_info,
                    requirements: input.requirements,
                    description: input.description,
                    budget: input.budget,
                    advance_payment: input.advance_payment,
                    receipt_file,
                    is_multiproject: input.is_multiproject,
                    initiation_date: input.initiation_date,
                    created_by: salesperson.username.clone(),
                },
            )
            .await?;

        tx.commit().await?;
        tracing::info!(deal_id = %deal.id, created_by = %deal.created_by, "Deal criado");

        // Cada projeto é independente: uma falha não desfaz o deal
        let mut projects = Vec::new();
        let mut project_errors = Vec::new();

        match parse_projects_data(input.projects_data.as_deref()) {
            Err(msg) => project_errors.push(msg),
            Ok(drafts) => {
                for draft in drafts {
                    let label = draft.name.clone().unwrap_or_else(|| "Unnamed".into());
                    let new_project = match draft.into_new_project(deal.id, &salesperson.username) {
                        Ok(p) => p,
                        Err(msg) => {
                            project_errors.push(msg);
                            continue;
                        }
                    };

                    match self.project_repo.create(&self.pool, &new_project).await {
                        Ok(project) => {
                            self.outbox.enqueue(assignment_notice(&deal, &project));
                            projects.push(project);
                        }
                        Err(e) => {
                            project_errors.push(format!("Error creating project '{label}': {e}"))
                        }
                    }
                }
            }
        }

        if !project_errors.is_empty() {
            tracing::warn!(deal_id = %deal.id, errors = ?project_errors, "Projetos do deal com erro");
        }

        Ok(DealCreated {
            deal,
            projects,
            project_errors,
        })
    }

    // =========================================================================
    //  CONSULTA
    // =========================================================================

    pub async fn list_deals(&self, filter: &DealFilter) -> Result<Vec<Deal>, AppError> {
        self.repo.list(filter).await
    }

    pub async fn get_deal(&self, deal_id: Uuid) -> Result<DealDetail, AppError> {
        let deal = self.find(deal_id).await?;
        let projects = self.project_repo.list_for_deal(deal.id).await?;
        Ok(DealDetail { deal, projects })
    }

    // =========================================================================
    //  TRANSIÇÕES
    // =========================================================================

    pub async fn submit_for_verification(
        &self,
        deal_id: Uuid,
        submitted_by: Option<&str>,
    ) -> Result<Deal, AppError> {
        let deal = self.find(deal_id).await?;
        let next = deal.submission_status()?;
        let deal = self.repo.update_status(deal.id, next).await?;

        tracing::info!(deal_id = %deal.id, status = %deal.status, "Deal enviado para verificação");

        // Daqui em diante nada pode falhar a transição
        let submitted_by = submitted_by.unwrap_or(deal.created_by.as_str());
        let verifiers = match self.user_repo.list(Some(UserRole::Verifier)).await {
            Ok(users) => users.into_iter().map(|u| u.username).collect(),
            Err(e) => {
                tracing::warn!("Falha ao buscar verificadores: {}", e);
                Vec::new()
            }
        };
        let projects = match self.project_repo.list_for_deal(deal.id).await {
            Ok(projects) => projects,
            Err(e) => {
                tracing::warn!("Falha ao buscar projetos do deal: {}", e);
                Vec::new()
            }
        };

        self.outbox
            .enqueue_all(submission_notices(&deal, submitted_by, &verifiers, &projects));

        Ok(deal)
    }

    pub async fn verify_deal(
        &self,
        deal_id: Uuid,
        verifier: &str,
        decision: &VerificationDecision,
    ) -> Result<Deal, AppError> {
        let verifier = self
            .user_repo
            .find_with_role(verifier, UserRole::Verifier)
            .await?
            .ok_or_else(|| AppError::Validation("Invalid verifier".into()))?;

        let deal = self.find(deal_id).await?;
        let next = deal.verification_status(decision)?;

        let deal = self
            .repo
            .record_verification(deal.id, next, &verifier.username, Utc::now(), decision.reason())
            .await?;

        tracing::info!(
            deal_id = %deal.id,
            status = %deal.status,
            verifier = %verifier.username,
            "Deal verificado"
        );

        self.outbox
            .enqueue(verification_notice(&deal, next, decision.reason()));

        Ok(deal)
    }

    // =========================================================================
    //  EDIÇÃO E REMOÇÃO
    // =========================================================================

    /// Deal que `username` pode editar agora (criador, rascunho ou rejeitado).
    pub async fn editable_deal(&self, deal_id: Uuid, username: &str) -> Result<Deal, AppError> {
        let deal = self.find(deal_id).await?;
        deal.authorize_update(username)?;
        Ok(deal)
    }

    pub async fn update_deal(
        &self,
        deal_id: Uuid,
        username: &str,
        changes: DealChanges,
        receipt: Option<UploadedFile>,
    ) -> Result<Deal, AppError> {
        let mut deal = self.editable_deal(deal_id, username).await?;
        deal.apply_changes(changes);

        let mut replaced = None;
        if let Some(file) = receipt {
            let path = self.storage.save(RECEIPTS_DIR, &file.file_name, &file.data).await?;
            replaced = deal.receipt_file.replace(path);
        }

        let deal = self.repo.save_edit(&deal).await?;

        if let Some(old) = replaced {
            self.storage.remove(&old).await;
        }

        tracing::info!(deal_id = %deal.id, status = %deal.status, "Deal atualizado");
        Ok(deal)
    }

    pub async fn delete_deal(&self, deal_id: Uuid, username: &str) -> Result<(), AppError> {
        let deal = self.find(deal_id).await?;
        deal.authorize_delete(username)?;

        let mut tx = self.pool.begin().await?;
        let file_paths = self.project_repo.delete_files_for_deal(&mut *tx, deal.id).await?;
        let project_receipts = self.project_repo.delete_for_deal(&mut *tx, deal.id).await?;
        self.repo.delete(&mut *tx, deal.id).await?;
        tx.commit().await?;

        // Remoção física só depois do commit, sem falhar a operação
        let orphans = deal
            .receipt_file
            .iter()
            .chain(project_receipts.iter())
            .chain(file_paths.iter());
        for path in orphans {
            self.storage.remove(path).await;
        }

        tracing::info!(deal_id = %deal.id, "Deal removido com seus projetos");
        Ok(())
    }
}
