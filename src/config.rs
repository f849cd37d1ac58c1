// src/config.rs

use std::{env, str::FromStr, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tokio::sync::mpsc;

use crate::{
    common::storage::FileStorage,
    db::{
        ClientRepository, DealRepository, NotificationRepository, ProjectRepository,
        UserRepository,
    },
    models::notification::NewNotification,
    services::{
        auth::AuthService,
        client_service::ClientService,
        deal_service::DealService,
        notification_service::{run_outbox_worker, NotificationOutbox, NotificationService},
        project_service::ProjectService,
    },
};

// Configuração lida do ambiente (.env incluído)
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub media_root: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub notification_queue_capacity: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |key: &str| lookup(key).with_context(|| format!("{key} deve ser definida"));
        let or_default = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            media_root: or_default("MEDIA_ROOT", "media"),
            bind_addr: or_default("BIND_ADDR", "0.0.0.0:3000"),
            db_max_connections: parse_var(&lookup, "DB_MAX_CONNECTIONS", 5)?,
            notification_queue_capacity: parse_var(&lookup, "NOTIFICATION_QUEUE_CAPACITY", 256)?,
        })
    }
}

#[cfg(test)]
impl Config {
    /// Configuração de teste com mídia num diretório temporário próprio.
    pub(crate) fn for_tests() -> Self {
        let media_root = std::env::temp_dir().join(format!("dealflow-media-{}", uuid::Uuid::new_v4()));
        Self {
            database_url: "postgres://localhost/dealflow_test".into(),
            jwt_secret: "segredo-de-teste".into(),
            media_root: media_root.display().to_string(),
            bind_addr: "127.0.0.1:0".into(),
            db_max_connections: 1,
            notification_queue_capacity: 64,
        }
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} inválida: {raw}")),
        None => Ok(default),
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Config,
    pub auth_service: AuthService,
    pub client_service: ClientService,
    pub deal_service: DealService,
    pub project_service: ProjectService,
    pub notification_service: NotificationService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        let config = Config::from_env()?;

        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        let (state, outbox_rx) = Self::build(config, db_pool);

        tokio::spawn(run_outbox_worker(
            NotificationRepository::new(state.db_pool.clone()),
            outbox_rx,
        ));

        Ok(state)
    }

    /// Monta o gráfico de dependências. O receiver devolvido alimenta o
    /// worker do outbox.
    pub fn build(config: Config, db_pool: PgPool) -> (Self, mpsc::Receiver<NewNotification>) {
        let (outbox, outbox_rx) = NotificationOutbox::new(config.notification_queue_capacity);
        let storage = FileStorage::new(&config.media_root);

        let user_repo = UserRepository::new(db_pool.clone());
        let client_repo = ClientRepository::new(db_pool.clone());
        let deal_repo = DealRepository::new(db_pool.clone());
        let project_repo = ProjectRepository::new(db_pool.clone());
        let notification_repo = NotificationRepository::new(db_pool.clone());

        let auth_service = AuthService::new(user_repo.clone(), config.jwt_secret.clone());
        let client_service = ClientService::new(client_repo.clone(), user_repo.clone(), db_pool.clone());
        let deal_service = DealService::new(
            deal_repo.clone(),
            project_repo.clone(),
            client_repo,
            user_repo,
            storage.clone(),
            outbox,
            db_pool.clone(),
        );
        let project_service = ProjectService::new(project_repo, deal_repo, storage, db_pool.clone());
        let notification_service = NotificationService::new(notification_repo);

        let state = Self {
            db_pool,
            config,
            auth_service,
            client_service,
            deal_service,
            project_service,
            notification_service,
        };
        (state, outbox_rx)
    }
}
