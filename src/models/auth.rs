// src/models/auth.rs

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::common::error::AppError;

// --- ENUMS ---

// Mapeia o CREATE TYPE user_role do banco. O papel é fixo após o cadastro.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Salesperson,
    Verifier,
    Supervisor,
    Client,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Salesperson => "salesperson",
            UserRole::Verifier => "verifier",
            UserRole::Supervisor => "supervisor",
            UserRole::Client => "client",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "salesperson" => Ok(UserRole::Salesperson),
            "verifier" => Ok(UserRole::Verifier),
            "supervisor" => Ok(UserRole::Supervisor),
            "client" => Ok(UserRole::Client),
            other => Err(AppError::Validation(format!("Invalid role: {other}"))),
        }
    }
}

// Representa um usuário vindo do banco de dados
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct User {
    pub id: Uuid,
    #[schema(example = "ana.vendas")]
    pub username: String,
    pub role: UserRole,
    #[schema(example = "ana@empresa.com")]
    pub email: String,
    pub created_at: DateTime<Utc>,
}

// Dados para registro de um novo usuário
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterUserPayload {
    #[validate(length(min = 3, max = 64, message = "Username must have between 3 and 64 characters."))]
    #[schema(example = "ana.vendas")]
    pub username: String,
    #[validate(email(message = "Invalid email address."))]
    #[schema(example = "ana@empresa.com")]
    pub email: String,
    pub role: UserRole,
}

// Login simplificado: só o username, sem senha
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginUserPayload {
    #[validate(length(min = 1, message = "required"))]
    #[schema(example = "ana.vendas")]
    pub username: String,
}

// Resposta de autenticação com o token
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user: User,
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,     // Subject (username)
    pub role: UserRole,
    pub exp: usize,      // Expiration time
    pub iat: usize,      // Issued At
}
