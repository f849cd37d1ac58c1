// src/services/project_service.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::{
    common::{error::AppError, extract::UploadedFile, storage::FileStorage},
    db::{DealRepository, ProjectRepository},
    models::project::{
        additional_fee_for, NewProject, NewProjectFile, Project, ProjectFile, ProjectListItem,
        ProjectStatus,
    },
    services::deal_service::RECEIPTS_DIR,
};

#[derive(Debug)]
pub struct CreateProjectInput {
    pub deal_id: Uuid,
    pub name: String,
    pub supervisor: String,
    pub description: String,
    pub deadline: Option<NaiveDate>,
    pub additional_fee: Option<String>,
    pub assigned_by: Option<String>,
    pub receipt: Option<UploadedFile>,
    pub files: Vec<UploadedFile>,
}

fn project_files_dir(project_id: Uuid) -> String {
    format!("project_files/{project_id}")
}

#[derive(Clone)]
pub struct ProjectService {
    repo: ProjectRepository,
    deal_repo: DealRepository,
    storage: FileStorage,
    pool: PgPool,
}

impl ProjectService {
    pub fn new(repo: ProjectRepository, deal_repo: DealRepository, storage: FileStorage, pool: PgPool) -> Self {
        Self {
            repo,
            deal_repo,
            storage,
            pool,
        }
    }

    async fn find(&self, project_id: Uuid) -> Result<Project, AppError> {
        self.repo
            .find_by_id(project_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Project not found".into()))
    }

    // =========================================================================
    //  PROJETOS
    // =========================================================================

    pub async fn create_project(&self, input: CreateProjectInput) -> Result<Project, AppError> {
        let deal = self
            .deal_repo
            .find_by_id(input.deal_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Deal not found".into()))?;

        let additional_fee = additional_fee_for(
            deal.status,
            input.additional_fee.as_deref(),
            input.receipt.is_some(),
        )?;

        let mut written = Vec::new();
        let (project, files) = match self.write_project(input, additional_fee, &mut written).await {
            Ok(created) => created,
            Err(e) => {
                self.discard(&written).await;
                return Err(e);
            }
        };

        tracing::info!(
            project_id = %project.id,
            deal_id = %deal.id,
            supervisor = %project.supervisor,
            files = files.len(),
            "Projeto criado"
        );
        Ok(project)
    }

    // Disco primeiro, banco depois: projeto e linhas dos arquivos entram na
    // mesma transação. `written` acumula o que já foi gravado em disco.
    async fn write_project(
        &self,
        input: CreateProjectInput,
        additional_fee: Decimal,
        written: &mut Vec<String>,
    ) -> Result<(Project, Vec<ProjectFile>), AppError> {
        let project_id = Uuid::new_v4();

        // Recibo só conta quando há taxa a comprovar
        let receipt_file = match (&input.receipt, additional_fee.is_zero()) {
            (Some(file), false) => {
                let name = format!("project_{}", file.file_name);
                let path = self.storage.save(RECEIPTS_DIR, &name, &file.data).await?;
                written.push(path.clone());
                Some(path)
            }
            _ => None,
        };

        let uploaded_by = input.assigned_by.clone().unwrap_or_else(|| input.supervisor.clone());
        let file_rows = self.save_uploads(project_id, &uploaded_by, input.files, written).await?;

        let new_project = NewProject {
            id: project_id,
            deal_id: input.deal_id,
            name: input.name,
            description: input.description,
            supervisor: input.supervisor,
            assigned_by: input.assigned_by,
            deadline: input.deadline,
            additional_fee,
            receipt_file,
        };

        let mut tx = self.pool.begin().await?;
        let project = self.repo.create(&mut *tx, &new_project).await?;
        let files = self.insert_file_rows(&mut tx, &file_rows).await?;
        tx.commit().await?;

        Ok((project, files))
    }

    pub async fn list_projects(
        &self,
        deal_id: Option<Uuid>,
        supervisor: Option<&str>,
    ) -> Result<Vec<ProjectListItem>, AppError> {
        if deal_id.is_none() && supervisor.is_none() {
            return Err(AppError::Validation(
                "Missing filter parameter: deal_id or supervisor".into(),
            ));
        }
        self.repo.list(deal_id, supervisor).await
    }

    pub async fn update_status(
        &self,
        project_id: Uuid,
        status: ProjectStatus,
        supervisor: &str,
    ) -> Result<Project, AppError> {
        let project = self.find(project_id).await?;
        project.authorize_status_update(supervisor)?;

        let project = self.repo.update_status(project.id, status).await?;
        tracing::info!(project_id = %project.id, status = %project.status, "Status do projeto atualizado");
        Ok(project)
    }

    // =========================================================================
    //  ARQUIVOS
    // =========================================================================

    /// Grava os uploads sob o diretório do projeto e devolve as linhas a inserir.
    async fn save_uploads(
        &self,
        project_id: Uuid,
        uploaded_by: &str,
        files: Vec<UploadedFile>,
        written: &mut Vec<String>,
    ) -> Result<Vec<NewProjectFile>, AppError> {
        let dir = project_files_dir(project_id);
        let mut rows = Vec::with_capacity(files.len());

        for file in files {
            let file_path = self.storage.save(&dir, &file.file_name, &file.data).await?;
            written.push(file_path.clone());
            rows.push(NewProjectFile {
                project_id,
                file_name: file.file_name,
                file_path,
                content_type: file.content_type,
                size_bytes: file.data.len() as i64,
                uploaded_by: uploaded_by.to_string(),
            });
        }

        Ok(rows)
    }

    async fn insert_file_rows(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        rows: &[NewProjectFile],
    ) -> Result<Vec<ProjectFile>, AppError> {
        let mut stored = Vec::with_capacity(rows.len());
        for row in rows {
            stored.push(self.repo.create_file(&mut **tx, row).await?);
        }
        Ok(stored)
    }

    // Desfaz gravações em disco de uma operação que não chegou ao commit
    async fn discard(&self, written: &[String]) {
        for path in written {
            self.storage.remove(path).await;
        }
    }

    async fn write_files(
        &self,
        project_id: Uuid,
        uploaded_by: &str,
        files: Vec<UploadedFile>,
        written: &mut Vec<String>,
    ) -> Result<Vec<ProjectFile>, AppError> {
        let rows = self.save_uploads(project_id, uploaded_by, files, written).await?;

        let mut tx = self.pool.begin().await?;
        let stored = self.insert_file_rows(&mut tx, &rows).await?;
        tx.commit().await?;
        Ok(stored)
    }

    /// Upload de vários arquivos: ou todos entram, ou nenhum.
    pub async fn upload_files(
        &self,
        project_id: Uuid,
        uploaded_by: &str,
        files: Vec<UploadedFile>,
    ) -> Result<Vec<ProjectFile>, AppError> {
        let project = self.find(project_id).await?;
        project.authorize_upload(uploaded_by)?;

        if files.is_empty() {
            return Err(AppError::Validation("No files were uploaded".into()));
        }

        let mut written = Vec::new();
        let stored = match self.write_files(project.id, uploaded_by, files, &mut written).await {
            Ok(stored) => stored,
            Err(e) => {
                self.discard(&written).await;
                return Err(e);
            }
        };

        tracing::info!(project_id = %project.id, count = stored.len(), "Arquivos enviados");
        Ok(stored)
    }

    pub async fn list_files(&self, project_id: Uuid) -> Result<Vec<ProjectFile>, AppError> {
        self.repo.list_files(project_id).await
    }

    pub async fn delete_file(&self, file_id: Uuid, username: &str) -> Result<(), AppError> {
        let file = self
            .repo
            .find_file(file_id)
            .await?
            .ok_or_else(|| AppError::NotFound("File not found".into()))?;
        let project = self.find(file.project_id).await?;
        file.authorize_delete(&project, username)?;

        self.repo.delete_file(file.id).await?;
        self.storage.remove(&file.file_path).await;

        tracing::info!(file_id = %file.id, project_id = %project.id, "Arquivo removido");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use assert_matches::assert_matches;

    use crate::{
        models::deal::DealStatus,
        services::deal_service::tests::{insert_deal, media_path, test_state, upload},
    };

    #[test]
    fn files_live_under_their_project() {
        let id = Uuid::nil();
        assert_eq!(
            project_files_dir(id),
            "project_files/00000000-0000-0000-0000-000000000000"
        );
    }

    fn project_input(deal_id: Uuid, supervisor: &str) -> CreateProjectInput {
        CreateProjectInput {
            deal_id,
            name: "Landing page".into(),
            supervisor: supervisor.into(),
            description: String::new(),
            deadline: NaiveDate::from_ymd_opt(2025, 3, 1),
            additional_fee: None,
            assigned_by: Some("ana".into()),
            receipt: None,
            files: Vec::new(),
        }
    }

    // Arquivos regulares abaixo de `dir`, em qualquer profundidade
    fn files_under(dir: &Path) -> usize {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return 0;
        };
        entries
            .flatten()
            .map(|entry| {
                let path = entry.path();
                if path.is_dir() {
                    files_under(&path)
                } else {
                    1
                }
            })
            .sum()
    }

    // --- criação ---

    #[sqlx::test(migrations = "./migrations")]
    async fn verified_deal_projects_need_fee_and_receipt(pool: PgPool) {
        let (state, _rx) = test_state(pool.clone());
        let projects = &state.project_service;
        let deal = insert_deal(&pool, "Website revamp", DealStatus::Verified).await;

        assert_matches!(
            projects.create_project(project_input(deal.id, "sam")).await,
            Err(AppError::Validation(msg)) if msg.starts_with("Additional fee is required")
        );

        let mut negative = project_input(deal.id, "sam");
        negative.additional_fee = Some("-5".into());
        negative.receipt = Some(upload("receipt", "paid.pdf", b"PDF"));
        assert_matches!(
            projects.create_project(negative).await,
            Err(AppError::Validation(msg)) if msg == "Additional fee must be greater than zero"
        );
        assert!(projects.list_projects(Some(deal.id), None).await.unwrap().is_empty());

        let mut input = project_input(deal.id, "sam");
        input.additional_fee = Some("150".into());
        input.receipt = Some(upload("receipt", "paid.pdf", b"PDF"));
        let project = projects.create_project(input).await.unwrap();

        assert_eq!(project.additional_fee, Decimal::new(150, 0));
        let receipt = project.receipt_file.unwrap();
        assert!(receipt.starts_with("receipts/"));
        assert!(receipt.ends_with("_project_paid.pdf"));
        assert!(media_path(&state, &receipt).exists());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn draft_deal_projects_ignore_fee_and_keep_every_file(pool: PgPool) {
        let (state, _rx) = test_state(pool.clone());
        let deal = insert_deal(&pool, "Website revamp", DealStatus::Draft).await;

        let mut input = project_input(deal.id, "sam");
        input.additional_fee = Some("500".into());
        input.receipt = Some(upload("receipt", "paid.pdf", b"PDF"));
        input.files = vec![
            upload("files", "brief.pdf", b"FIRST"),
            upload("files", "brief.pdf", b"SECOND"),
        ];
        let project = state.project_service.create_project(input).await.unwrap();

        assert_eq!(project.additional_fee, Decimal::ZERO);
        assert_eq!(project.receipt_file, None);
        assert!(!media_path(&state, RECEIPTS_DIR).exists());

        let files = state.project_service.list_files(project.id).await.unwrap();
        assert_eq!(files.len(), 2);
        assert_ne!(files[0].file_path, files[1].file_path);
        assert!(files.iter().all(|f| f.uploaded_by == "ana" && f.file_name == "brief.pdf"));

        let mut contents: Vec<Vec<u8>> = files
            .iter()
            .map(|f| std::fs::read(media_path(&state, &f.file_path)).unwrap())
            .collect();
        contents.sort();
        assert_eq!(contents, vec![b"FIRST".to_vec(), b"SECOND".to_vec()]);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn pending_or_missing_deal_refuses_projects(pool: PgPool) {
        let (state, _rx) = test_state(pool.clone());
        let pending = insert_deal(&pool, "Website revamp", DealStatus::PendingVerification).await;

        assert_matches!(
            state.project_service.create_project(project_input(pending.id, "sam")).await,
            Err(AppError::StateConflict(_))
        );
        assert_matches!(
            state.project_service.create_project(project_input(Uuid::new_v4(), "sam")).await,
            Err(AppError::NotFound(msg)) if msg == "Deal not found"
        );
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn failed_file_write_leaves_no_project(pool: PgPool) {
        let deal = insert_deal(&pool, "Website revamp", DealStatus::Draft).await;

        // Raiz de mídia que é um arquivo: nenhum diretório pode ser criado
        let root = std::env::temp_dir().join(format!("dealflow-blocked-{}", Uuid::new_v4()));
        std::fs::write(&root, b"x").unwrap();
        let service = ProjectService::new(
            ProjectRepository::new(pool.clone()),
            DealRepository::new(pool.clone()),
            FileStorage::new(root.clone()),
            pool.clone(),
        );

        let mut input = project_input(deal.id, "sam");
        input.files = vec![upload("files", "brief.pdf", b"BRIEF")];
        assert_matches!(service.create_project(input).await, Err(AppError::StorageError(_)));

        let repo = ProjectRepository::new(pool.clone());
        assert!(repo.list_for_deal(deal.id).await.unwrap().is_empty());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn failed_insert_discards_written_files(pool: PgPool) {
        let (state, _rx) = test_state(pool.clone());
        let deal = insert_deal(&pool, "Website revamp", DealStatus::Draft).await;

        // Postgres recusa NUL em TEXT: os arquivos já estão em disco quando o INSERT falha
        let mut input = project_input(deal.id, "sam");
        input.name = "Landing\0page".into();
        input.files = vec![
            upload("files", "brief.pdf", b"BRIEF"),
            upload("files", "logo.png", b"LOGO"),
        ];
        assert_matches!(
            state.project_service.create_project(input).await,
            Err(AppError::DatabaseError(_))
        );

        assert!(state.project_service.list_projects(Some(deal.id), None).await.unwrap().is_empty());
        assert_eq!(files_under(&media_path(&state, "project_files")), 0);
    }

    // --- listagem e status ---

    #[sqlx::test(migrations = "./migrations")]
    async fn listing_filters_and_carries_deal_title(pool: PgPool) {
        let (state, _rx) = test_state(pool.clone());
        let projects = &state.project_service;
        let website = insert_deal(&pool, "Website revamp", DealStatus::Draft).await;
        let mobile = insert_deal(&pool, "Mobile app", DealStatus::Draft).await;

        projects.create_project(project_input(website.id, "sam")).await.unwrap();
        projects.create_project(project_input(mobile.id, "sam")).await.unwrap();
        projects.create_project(project_input(mobile.id, "rui")).await.unwrap();

        let sam = projects.list_projects(None, Some("sam")).await.unwrap();
        assert_eq!(sam.len(), 2);
        let mut titles: Vec<&str> = sam.iter().map(|p| p.deal_title.as_str()).collect();
        titles.sort();
        assert_eq!(titles, vec!["Mobile app", "Website revamp"]);

        assert_eq!(projects.list_projects(Some(mobile.id), None).await.unwrap().len(), 2);

        let both = projects.list_projects(Some(mobile.id), Some("rui")).await.unwrap();
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].project.supervisor, "rui");
        assert_eq!(both[0].deal_title, "Mobile app");

        assert_matches!(
            projects.list_projects(None, None).await,
            Err(AppError::Validation(msg)) if msg == "Missing filter parameter: deal_id or supervisor"
        );
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn only_the_supervisor_moves_project_status(pool: PgPool) {
        let (state, _rx) = test_state(pool.clone());
        let deal = insert_deal(&pool, "Website revamp", DealStatus::Draft).await;
        let project = state
            .project_service
            .create_project(project_input(deal.id, "sam"))
            .await
            .unwrap();
        assert_eq!(project.status, ProjectStatus::Pending);

        assert_matches!(
            state.project_service.update_status(project.id, ProjectStatus::Completed, "rui").await,
            Err(AppError::Forbidden(_))
        );

        let moved = state
            .project_service
            .update_status(project.id, ProjectStatus::InProgress, "sam")
            .await
            .unwrap();
        assert_eq!(moved.status, ProjectStatus::InProgress);
        assert!(moved.updated_at >= project.updated_at);

        assert_matches!(
            state.project_service.update_status(Uuid::new_v4(), ProjectStatus::Completed, "sam").await,
            Err(AppError::NotFound(msg)) if msg == "Project not found"
        );
    }

    // --- arquivos ---

    #[sqlx::test(migrations = "./migrations")]
    async fn supervisor_uploads_and_uploader_deletes(pool: PgPool) {
        let (state, _rx) = test_state(pool.clone());
        let projects = &state.project_service;
        let deal = insert_deal(&pool, "Website revamp", DealStatus::Draft).await;
        let project = projects.create_project(project_input(deal.id, "sam")).await.unwrap();

        assert_matches!(
            projects
                .upload_files(project.id, "ana", vec![upload("files", "brief.pdf", b"X")])
                .await,
            Err(AppError::Forbidden(_))
        );
        assert_matches!(
            projects.upload_files(project.id, "sam", Vec::new()).await,
            Err(AppError::Validation(msg)) if msg == "No files were uploaded"
        );

        let stored = projects
            .upload_files(project.id, "sam", vec![upload("files", "brief.pdf", b"BRIEF")])
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].size_bytes, 5);
        assert_eq!(stored[0].uploaded_by, "sam");
        let on_disk = media_path(&state, &stored[0].file_path);
        assert!(on_disk.exists());

        assert_matches!(
            projects.delete_file(stored[0].id, "rui").await,
            Err(AppError::Forbidden(_))
        );
        projects.delete_file(stored[0].id, "sam").await.unwrap();
        assert!(projects.list_files(project.id).await.unwrap().is_empty());
        assert!(!on_disk.exists());

        assert_matches!(
            projects.delete_file(stored[0].id, "sam").await,
            Err(AppError::NotFound(msg)) if msg == "File not found"
        );
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn multi_file_upload_is_all_or_nothing(pool: PgPool) {
        let (state, _rx) = test_state(pool.clone());
        let deal = insert_deal(&pool, "Website revamp", DealStatus::Draft).await;
        let project = state
            .project_service
            .create_project(project_input(deal.id, "sam"))
            .await
            .unwrap();

        // A segunda linha falha no INSERT depois que a primeira já entrou
        let mut broken = upload("files", "notes.txt", b"NOTES");
        broken.content_type = Some("text/\0plain".into());
        let files = vec![upload("files", "brief.pdf", b"BRIEF"), broken];

        assert_matches!(
            state.project_service.upload_files(project.id, "sam", files).await,
            Err(AppError::DatabaseError(_))
        );
        assert!(state.project_service.list_files(project.id).await.unwrap().is_empty());
        assert_eq!(
            files_under(&media_path(&state, &project_files_dir(project.id))),
            0
        );
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn deal_cleanup_returns_every_stored_path(pool: PgPool) {
        let (state, _rx) = test_state(pool.clone());
        let deal = insert_deal(&pool, "Website revamp", DealStatus::Verified).await;
        let other = insert_deal(&pool, "Mobile app", DealStatus::Draft).await;

        let mut input = project_input(deal.id, "sam");
        input.additional_fee = Some("80".into());
        input.receipt = Some(upload("receipt", "fee.pdf", b"FEE"));
        input.files = vec![
            upload("files", "a.pdf", b"A"),
            upload("files", "b.pdf", b"B"),
        ];
        let project = state.project_service.create_project(input).await.unwrap();
        let untouched = state
            .project_service
            .create_project(CreateProjectInput {
                files: vec![upload("files", "c.pdf", b"C")],
                ..project_input(other.id, "sam")
            })
            .await
            .unwrap();

        let repo = ProjectRepository::new(pool.clone());
        let paths = repo.delete_files_for_deal(&pool, deal.id).await.unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths.iter().all(|p| p.starts_with(&project_files_dir(project.id))));
        assert!(state.project_service.list_files(project.id).await.unwrap().is_empty());

        let receipts = repo.delete_for_deal(&pool, deal.id).await.unwrap();
        assert_eq!(receipts, vec![project.receipt_file.clone().unwrap()]);
        assert!(repo.find_by_id(project.id).await.unwrap().is_none());

        assert_eq!(state.project_service.list_files(untouched.id).await.unwrap().len(), 1);
    }
}
