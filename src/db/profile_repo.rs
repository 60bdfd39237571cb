// src/db/profile_repo.rs

use sqlx::{types::Json, Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::auth::Role,
    models::profile::{
        DeliveryProfile, DeliveryProfileInput, ProfileRecord, SellerProfile, SellerProfileInput,
        SupportProfile, SupportProfileInput, UserProfile, UserProfileInput,
    },
};

// Cada tabela de perfil tem `user_id UNIQUE`: um perfil por usuário e papel.
#[derive(Clone)]
pub struct ProfileRepository {
    pool: PgPool,
}

fn profile_conflict(e: sqlx::Error) -> AppError {
    AppError::from_unique_violation(e, "O perfil deste usuário já existe.")
}

impl ProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_user_profile<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        input: &UserProfileInput,
    ) -> Result<UserProfile, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, UserProfile>(
            r#"
            INSERT INTO user_profiles (user_id, full_name, phone, gender, date_of_birth, addresses, preferences)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&input.full_name)
        .bind(&input.phone)
        .bind(&input.gender)
        .bind(input.date_of_birth)
        .bind(Json(&input.addresses))
        .bind(Json(&input.preferences))
        .fetch_one(executor)
        .await
        .map_err(profile_conflict)
    }

    pub async fn create_seller_profile<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        input: &SellerProfileInput,
    ) -> Result<SellerProfile, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, SellerProfile>(
            r#"
            INSERT INTO seller_profiles (user_id, business_name, gst_number, pan_number)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&input.business_name)
        .bind(&input.gst_number)
        .bind(&input.pan_number)
        .fetch_one(executor)
        .await
        .map_err(profile_conflict)
    }

    pub async fn create_support_profile<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        input: &SupportProfileInput,
    ) -> Result<SupportProfile, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, SupportProfile>(
            r#"
            INSERT INTO support_profiles (user_id, display_name, department)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&input.display_name)
        .bind(&input.department)
        .fetch_one(executor)
        .await
        .map_err(profile_conflict)
    }

    pub async fn create_delivery_profile<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        input: &DeliveryProfileInput,
    ) -> Result<DeliveryProfile, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, DeliveryProfile>(
            r#"
            INSERT INTO delivery_profiles (user_id, full_name, phone, vehicle_type)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&input.full_name)
        .bind(&input.phone)
        .bind(&input.vehicle_type)
        .fetch_one(executor)
        .await
        .map_err(profile_conflict)
    }

    /// Procura o perfil do usuário na tabela correspondente ao papel informado.
    pub async fn find_for_user(
        &self,
        user_id: Uuid,
        role: Role,
    ) -> Result<Option<ProfileRecord>, AppError> {
        let record = match role {
            Role::Customer | Role::Admin => {
                sqlx::query_as::<_, UserProfile>("SELECT * FROM user_profiles WHERE user_id = $1")
                    .bind(user_id)
                    .fetch_optional(&self.pool)
                    .await?
                    .map(ProfileRecord::Customer)
            }
            Role::Seller => {
                sqlx::query_as::<_, SellerProfile>("SELECT * FROM seller_profiles WHERE user_id = $1")
                    .bind(user_id)
                    .fetch_optional(&self.pool)
                    .await?
                    .map(ProfileRecord::Seller)
            }
            Role::Support => {
                sqlx::query_as::<_, SupportProfile>("SELECT * FROM support_profiles WHERE user_id = $1")
                    .bind(user_id)
                    .fetch_optional(&self.pool)
                    .await?
                    .map(ProfileRecord::Support)
            }
            Role::Delivery => {
                sqlx::query_as::<_, DeliveryProfile>("SELECT * FROM delivery_profiles WHERE user_id = $1")
                    .bind(user_id)
                    .fetch_optional(&self.pool)
                    .await?
                    .map(ProfileRecord::Delivery)
            }
        };
        Ok(record)
    }

    /// O perfil de entregador é o `delivery_person_id` das remessas.
    pub async fn find_delivery_profile_id(&self, user_id: Uuid) -> Result<Option<Uuid>, AppError> {
        let id = sqlx::query_scalar("SELECT id FROM delivery_profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(id)
    }

    /// `(id, is_available)` do perfil de entregador do usuário.
    pub async fn find_delivery_availability(&self, user_id: Uuid) -> Result<Option<(Uuid, bool)>, AppError> {
        let row = sqlx::query_as("SELECT id, is_available FROM delivery_profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    pub async fn delivery_profile_exists(&self, profile_id: Uuid) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM delivery_profiles WHERE id = $1)")
            .bind(profile_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}
