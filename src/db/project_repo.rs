// src/db/project_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::project::{
        NewProject, NewProjectFile, Project, ProjectFile, ProjectListItem, ProjectStatus,
    },
};

#[derive(Clone)]
pub struct ProjectRepository {
    pool: PgPool,
}

impl ProjectRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  PROJETOS
    // =========================================================================

    pub async fn create<'e, E>(&self, executor: E, project: &NewProject) -> Result<Project, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let created = sqlx::query_as::<_, Project>(
            r#"
            INSERT INTO projects (
                id, deal_id, name, description, supervisor, assigned_by,
                deadline, additional_fee, receipt_file, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'pending')
            RETURNING *
            "#,
        )
        .bind(project.id)
        .bind(project.deal_id)
        .bind(&project.name)
        .bind(&project.description)
        .bind(&project.supervisor)
        .bind(&project.assigned_by)
        .bind(project.deadline)
        .bind(project.additional_fee)
        .bind(&project.receipt_file)
        .fetch_one(executor)
        .await?;

        Ok(created)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Project>, AppError> {
        let project = sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(project)
    }

    /// Projetos de um deal, na ordem de criação.
    pub async fn list_for_deal(&self, deal_id: Uuid) -> Result<Vec<Project>, AppError> {
        let projects = sqlx::query_as::<_, Project>(
            "SELECT * FROM projects WHERE deal_id = $1 ORDER BY created_at ASC",
        )
        .bind(deal_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(projects)
    }

    /// Listagem com o título do deal. Mais recentes primeiro.
    pub async fn list(
        &self,
        deal_id: Option<Uuid>,
        supervisor: Option<&str>,
    ) -> Result<Vec<ProjectListItem>, AppError> {
        let projects = sqlx::query_as::<_, ProjectListItem>(
            r#"
            SELECT p.*, d.title AS deal_title
            FROM projects p
            JOIN deals d ON d.id = p.deal_id
            WHERE ($1::uuid IS NULL OR p.deal_id = $1)
              AND ($2::text IS NULL OR p.supervisor = $2)
            ORDER BY p.created_at DESC
            "#,
        )
        .bind(deal_id)
        .bind(supervisor)
        .fetch_all(&self.pool)
        .await?;
        Ok(projects)
    }

    pub async fn update_status(&self, id: Uuid, status: ProjectStatus) -> Result<Project, AppError> {
        let project = sqlx::query_as::<_, Project>(
            "UPDATE projects SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;
        Ok(project)
    }

    /// Apaga os projetos do deal e devolve os recibos que existiam.
    pub async fn delete_for_deal<'e, E>(&self, executor: E, deal_id: Uuid) -> Result<Vec<String>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let receipts: Vec<Option<String>> = sqlx::query_scalar(
            "DELETE FROM projects WHERE deal_id = $1 RETURNING receipt_file",
        )
        .bind(deal_id)
        .fetch_all(executor)
        .await?;

        Ok(receipts.into_iter().flatten().collect())
    }

    // =========================================================================
    //  ARQUIVOS DO PROJETO
    // =========================================================================

    pub async fn create_file<'e, E>(&self, executor: E, file: &NewProjectFile) -> Result<ProjectFile, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let created = sqlx::query_as::<_, ProjectFile>(
            r#"
            INSERT INTO project_files (
                project_id, file_name, file_path, content_type, size_bytes, uploaded_by
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(file.project_id)
        .bind(&file.file_name)
        .bind(&file.file_path)
        .bind(&file.content_type)
        .bind(file.size_bytes)
        .bind(&file.uploaded_by)
        .fetch_one(executor)
        .await?;

        Ok(created)
    }

    pub async fn find_file(&self, id: Uuid) -> Result<Option<ProjectFile>, AppError> {
        let file = sqlx::query_as::<_, ProjectFile>("SELECT * FROM project_files WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(file)
    }

    pub async fn list_files(&self, project_id: Uuid) -> Result<Vec<ProjectFile>, AppError> {
        let files = sqlx::query_as::<_, ProjectFile>(
            "SELECT * FROM project_files WHERE project_id = $1 ORDER BY uploaded_at DESC",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(files)
    }

    pub async fn delete_file(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM project_files WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Apaga os arquivos de todos os projetos do deal e devolve os caminhos.
    pub async fn delete_files_for_deal<'e, E>(&self, executor: E, deal_id: Uuid) -> Result<Vec<String>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let paths: Vec<String> = sqlx::query_scalar(
            r#"
            DELETE FROM project_files
            WHERE project_id IN (SELECT id FROM projects WHERE deal_id = $1)
            RETURNING file_path
            "#,
        )
        .bind(deal_id)
        .fetch_all(executor)
        .await?;

        Ok(paths)
    }
}
