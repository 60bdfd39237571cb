// src/services/profile_service.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{ProfileRepository, UserRepository},
    models::profile::{CompleteProfilePayload, ProfileRecord},
    services::auth::SessionTokens,
};

#[derive(Clone)]
pub struct ProfileService {
    profile_repo: ProfileRepository,
    user_repo: UserRepository,
    tokens: SessionTokens,
    pool: PgPool,
}

impl ProfileService {
    pub fn new(
        profile_repo: ProfileRepository,
        user_repo: UserRepository,
        tokens: SessionTokens,
        pool: PgPool,
    ) -> Self {
        Self { profile_repo, user_repo, tokens, pool }
    }

    /// Cria o perfil do papel atual e liga `has_profile` na mesma transação.
    /// Devolve o perfil e um token de sessão já com a claim nova.
    pub async fn complete_profile(
        &self,
        user_id: Uuid,
        payload: CompleteProfilePayload,
    ) -> Result<(ProfileRecord, String), AppError> {
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Usuário {}", user_id)))?;

        if !payload.matches_role(user.role) {
            return Err(AppError::BadRequest(format!(
                "O perfil enviado não corresponde ao papel '{}'.",
                user.role
            )));
        }
        payload.validate_inner()?;

        let mut tx = self.pool.begin().await?;

        let record = match &payload {
            CompleteProfilePayload::Customer(input) => ProfileRecord::Customer(
                self.profile_repo.create_user_profile(&mut *tx, user.id, input).await?,
            ),
            CompleteProfilePayload::Seller(input) => ProfileRecord::Seller(
                self.profile_repo.create_seller_profile(&mut *tx, user.id, input).await?,
            ),
            CompleteProfilePayload::Support(input) => ProfileRecord::Support(
                self.profile_repo.create_support_profile(&mut *tx, user.id, input).await?,
            ),
            CompleteProfilePayload::Delivery(input) => ProfileRecord::Delivery(
                self.profile_repo.create_delivery_profile(&mut *tx, user.id, input).await?,
            ),
        };

        self.user_repo.set_has_profile(&mut *tx, user.id).await?;
        tx.commit().await?;

        tracing::info!("Perfil de {} criado para o usuário {}.", user.role, user.id);

        let refreshed = self
            .user_repo
            .find_by_id(user.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Usuário {}", user.id)))?;
        let token = self.tokens.issue_session(&refreshed)?;

        Ok((record, token))
    }

    pub async fn get_profile(&self, user_id: Uuid) -> Result<ProfileRecord, AppError> {
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Usuário {}", user_id)))?;

        self.profile_repo
            .find_for_user(user.id, user.role)
            .await?
            .ok_or_else(|| AppError::NotFound("Perfil".into()))
    }
}
