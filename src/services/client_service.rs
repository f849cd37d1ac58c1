// src/services/client_service.rs

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{ClientRepository, UserRepository},
    models::{
        auth::User,
        client::{Client, ClientFields},
    },
};

#[derive(Clone)]
pub struct ClientService {
    repo: ClientRepository,
    user_repo: UserRepository,
    pool: sqlx::PgPool,
}

impl ClientService {
    pub fn new(repo: ClientRepository, user_repo: UserRepository, pool: sqlx::PgPool) -> Self {
        Self { repo, user_repo, pool }
    }

    async fn owner(&self, username: &str) -> Result<User, AppError> {
        self.user_repo
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))
    }

    // Cliente de outro dono é tratado como inexistente
    async fn owned(&self, client_id: Uuid, username: &str) -> Result<Client, AppError> {
        let owner = self.owner(username).await?;
        self.repo
            .find_owned(client_id, owner.id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(
                    "Client not found or you do not have permission to access it".into(),
                )
            })
    }

    pub async fn create_client(
        &self,
        username: &str,
        name: &str,
        fields: &ClientFields,
    ) -> Result<Client, AppError> {
        let owner = self.owner(username).await?;
        let client = self.repo.create(&self.pool, owner.id, name.trim(), fields).await?;

        tracing::info!(client_id = %client.id, owner = %owner.username, "Cliente criado");
        Ok(client)
    }

    pub async fn list_clients(&self, username: &str, search: Option<&str>) -> Result<Vec<Client>, AppError> {
        let owner = self.owner(username).await?;
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        self.repo.list_owned(owner.id, search).await
    }

    pub async fn client_details(&self, client_id: Uuid, username: &str) -> Result<Client, AppError> {
        self.owned(client_id, username).await
    }

    pub async fn update_client(
        &self,
        client_id: Uuid,
        username: &str,
        name: Option<String>,
        fields: ClientFields,
    ) -> Result<Client, AppError> {
        let mut client = self.owned(client_id, username).await?;
        client.apply_changes(name, fields);
        self.repo.update(&client).await
    }

    pub async fn delete_client(&self, client_id: Uuid, username: &str) -> Result<(), AppError> {
        let client = self.owned(client_id, username).await?;
        self.repo.delete(client.id).await?;

        tracing::info!(client_id = %client.id, "Cliente removido");
        Ok(())
    }
}
