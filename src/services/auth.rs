// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{NotificationRepository, UserRepository},
    models::auth::{EmailTokenClaims, Role, SessionClaims, User},
};

const SESSION_TTL_DAYS: i64 = 7;
const EMAIL_TOKEN_TTL_HOURS: i64 = 1;

/// Assinatura e leitura dos tokens (HS256). Não toca no banco, então o guard
/// de páginas pode usá-la direto.
#[derive(Clone)]
pub struct SessionTokens {
    jwt_secret: String,
    email_token_secret: String,
}

impl SessionTokens {
    pub fn new(jwt_secret: String, email_token_secret: String) -> Self {
        Self { jwt_secret, email_token_secret }
    }

    /// As claims refletem o estado do usuário no momento da emissão.
    pub fn issue_session(&self, user: &User) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::days(SESSION_TTL_DAYS);

        let claims = SessionClaims {
            id: user.id,
            role: user.role,
            is_verified: user.is_verified,
            has_profile: user.has_profile,
            original_role: user.original_role,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }

    /// Token malformado, expirado ou com assinatura errada vira `None`: para o
    /// guard, é o mesmo que não ter sessão.
    pub fn decode_session(&self, token: &str) -> Option<SessionClaims> {
        decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .ok()
    }

    pub fn issue_email_token(&self, user_id: Uuid) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = EmailTokenClaims {
            sub: user_id,
            exp: (now + chrono::Duration::hours(EMAIL_TOKEN_TTL_HOURS)).timestamp() as usize,
            iat: now.timestamp() as usize,
        };
        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.email_token_secret.as_ref()),
        )?)
    }

    pub fn decode_email_token(&self, token: &str) -> Result<Uuid, AppError> {
        decode::<EmailTokenClaims>(
            token,
            &DecodingKey::from_secret(self.email_token_secret.as_ref()),
            &Validation::default(),
        )
        .map(|data| data.claims.sub)
        .map_err(|_| AppError::InvalidToken)
    }
}

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    notification_repo: NotificationRepository,
    tokens: SessionTokens,
    app_url: String,
    pool: PgPool,
}

impl AuthService {
    pub fn new(
        user_repo: UserRepository,
        notification_repo: NotificationRepository,
        tokens: SessionTokens,
        app_url: String,
        pool: PgPool,
    ) -> Self {
        Self { user_repo, notification_repo, tokens, app_url, pool }
    }

    pub async fn register_user(
        &self,
        email: &str,
        password: &str,
        role: Option<Role>,
    ) -> Result<String, AppError> {
        let role = role.unwrap_or(Role::Customer);
        if !role.is_self_selectable() {
            return Err(AppError::Forbidden(format!(
                "O papel '{}' não pode ser escolhido no cadastro.",
                role
            )));
        }

        // 1. Hashing fora da transação (não toca no banco)
        let password_clone = password.to_owned();
        let hashed_password = tokio::task::spawn_blocking(move || hash(&password_clone, bcrypt::DEFAULT_COST))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;

        // 2. Usuário + e-mail de verificação na mesma transação
        let mut tx = self.pool.begin().await?;

        let new_user = self
            .user_repo
            .create_user(&mut *tx, email, &hashed_password, role)
            .await?;

        let email_token = self.tokens.issue_email_token(new_user.id)?;
        let link = format!(
            "{}/api/auth/verify-email?token={}",
            self.app_url.trim_end_matches('/'),
            email_token
        );
        self.notification_repo
            .enqueue(
                &mut *tx,
                new_user.id,
                "email_verification",
                "Confirme seu e-mail para ativar a conta.",
                json!({ "email": new_user.email, "link": link }),
            )
            .await?;

        tx.commit().await?;

        tracing::info!("Usuário {} registrado com papel {}.", new_user.id, role);
        self.tokens.issue_session(&new_user)
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<String, AppError> {
        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password_clone = password.to_owned();
        let password_hash_clone = user.password_hash.clone();

        // Executa a verificação em um thread separado
        let is_password_valid = tokio::task::spawn_blocking(move || verify(&password_clone, &password_hash_clone))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }

        self.user_repo.touch_last_login(user.id).await?;
        self.tokens.issue_session(&user)
    }

    /// Único caminho que marca `is_verified`. Devolve um token novo com a claim atualizada.
    pub async fn verify_email(&self, token: &str) -> Result<String, AppError> {
        let user_id = self.tokens.decode_email_token(token)?;
        let user = self
            .user_repo
            .mark_verified(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Usuário {}", user_id)))?;

        tracing::info!("E-mail do usuário {} verificado.", user.id);
        self.tokens.issue_session(&user)
    }

    pub async fn refresh_session(&self, user_id: Uuid) -> Result<String, AppError> {
        let user = self.find_user(user_id).await?;
        self.tokens.issue_session(&user)
    }

    pub async fn find_user(&self, user_id: Uuid) -> Result<User, AppError> {
        self.user_repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Usuário {}", user_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens() -> SessionTokens {
        SessionTokens::new("segredo-de-sessao".into(), "segredo-de-email".into())
    }

    fn user(role: Role, original_role: Option<Role>) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "ana@example.com".into(),
            password_hash: String::new(),
            role,
            original_role,
            is_verified: true,
            has_profile: false,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn session_token_carries_current_user_state() {
        let tokens = tokens();
        let u = user(Role::Seller, Some(Role::Admin));
        let token = tokens.issue_session(&u).unwrap();

        let claims = tokens.decode_session(&token).unwrap();
        assert_eq!(claims.id, u.id);
        assert_eq!(claims.role, Role::Seller);
        assert_eq!(claims.original_role, Some(Role::Admin));
        assert!(claims.is_verified);
        assert!(!claims.has_profile);
    }

    #[test]
    fn garbage_and_foreign_tokens_decode_to_none() {
        let tokens = tokens();
        assert!(tokens.decode_session("nao.e.um.jwt").is_none());

        let other = SessionTokens::new("outro".into(), "outro".into());
        let token = other.issue_session(&user(Role::Customer, None)).unwrap();
        assert!(tokens.decode_session(&token).is_none());
    }

    #[test]
    fn expired_session_is_treated_as_absent() {
        let tokens = tokens();
        let past = (Utc::now() - chrono::Duration::hours(2)).timestamp() as usize;
        let claims = SessionClaims {
            id: Uuid::new_v4(),
            role: Role::Customer,
            is_verified: true,
            has_profile: true,
            original_role: None,
            exp: past,
            iat: past - 60,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret("segredo-de-sessao".as_ref()),
        )
        .unwrap();
        assert!(tokens.decode_session(&token).is_none());
    }

    #[test]
    fn email_token_is_not_a_session() {
        let tokens = tokens();
        let id = Uuid::new_v4();
        let email_token = tokens.issue_email_token(id).unwrap();

        assert_eq!(tokens.decode_email_token(&email_token).unwrap(), id);
        assert!(tokens.decode_session(&email_token).is_none());
        assert!(matches!(
            tokens.decode_email_token("invalido"),
            Err(AppError::InvalidToken)
        ));
    }
}
