// src/services/auth.rs

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::{
    common::error::AppError,
    db::UserRepository,
    models::auth::{Claims, User, UserRole},
};

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    jwt_secret: String,
}

impl AuthService {
    pub fn new(user_repo: UserRepository, jwt_secret: String) -> Self {
        Self { user_repo, jwt_secret }
    }

    pub async fn register_user(
        &self,
        username: &str,
        email: &str,
        role: UserRole,
    ) -> Result<(String, User), AppError> {
        let user = self.user_repo.create_user(username, email, role).await?;
        tracing::info!(username = %user.username, role = %user.role, "Usuário registrado");

        let token = self.create_token(&user)?;
        Ok((token, user))
    }

    // Login sem senha: basta o username existir
    pub async fn login_user(&self, username: &str) -> Result<(String, User), AppError> {
        let user = self
            .user_repo
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;

        let token = self.create_token(&user)?;
        Ok((token, user))
    }

    pub async fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let claims = self.decode_token(token)?;

        // O usuário pode ter sido removido depois da emissão do token
        self.user_repo
            .find_by_username(&claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)
    }

    pub async fn list_users(&self, role: Option<UserRole>) -> Result<Vec<User>, AppError> {
        self.user_repo.list(role).await
    }

    fn decode_token(&self, token: &str) -> Result<Claims, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;
        Ok(token_data.claims)
    }

    fn create_token(&self, user: &User) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::days(7);

        let claims = Claims {
            sub: user.username.clone(),
            role: user.role,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use sqlx::postgres::PgPoolOptions;
    use uuid::Uuid;

    fn service(secret: &str) -> AuthService {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        AuthService::new(UserRepository::new(pool), secret.into())
    }

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "vera".into(),
            role: UserRole::Verifier,
            email: "vera@example.com".into(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn token_carries_username_and_role() {
        let auth = service("segredo");
        let token = auth.create_token(&user()).unwrap();

        let claims = auth.decode_token(&token).unwrap();
        assert_eq!(claims.sub, "vera");
        assert_eq!(claims.role, UserRole::Verifier);
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 60 * 60);
    }

    #[tokio::test]
    async fn token_signed_with_other_secret_is_rejected() {
        let token = service("outro").create_token(&user()).unwrap();

        assert_matches!(service("segredo").decode_token(&token), Err(AppError::InvalidToken));
        assert_matches!(service("segredo").decode_token("lixo"), Err(AppError::InvalidToken));
    }
}
