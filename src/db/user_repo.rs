// src/db/user_repo.rs

use sqlx::PgPool;

use crate::{
    common::error::AppError,
    models::auth::{User, UserRole},
};

// O repositório de usuários, responsável por todas as interações com a tabela 'users'
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, role, email, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// Usuário com o papel exigido (ex: o vendedor que cria um deal).
    pub async fn find_with_role(
        &self,
        username: &str,
        role: UserRole,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, role, email, created_at
            FROM users
            WHERE username = $1 AND role = $2
            "#,
        )
        .bind(username)
        .bind(role)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn list(&self, role: Option<UserRole>) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, role, email, created_at
            FROM users
            WHERE ($1::user_role IS NULL OR role = $1)
            ORDER BY username ASC
            "#,
        )
        .bind(role)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    // Cria um novo usuário, convertendo a violação de chave única em erro amigável
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        role: UserRole,
    ) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, role)
            VALUES ($1, $2, $3)
            RETURNING id, username, role, email, created_at
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::UsernameAlreadyExists;
                }
            }
            e.into()
        })
    }
}
