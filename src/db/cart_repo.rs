// src/db/cart_repo.rs

use sqlx::{types::Json, Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::cart::{Cart, CartItem},
};

// Um carrinho por usuário (`carts.user_id UNIQUE`).
#[derive(Clone)]
pub struct CartRepository {
    pool: PgPool,
}

impl CartRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_user(&self, user_id: Uuid) -> Result<Option<Cart>, AppError> {
        let cart = sqlx::query_as::<_, Cart>("SELECT * FROM carts WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(cart)
    }

    /// Lê o carrinho travando a linha, para ler-modificar-gravar sem perder atualização.
    pub async fn find_by_user_for_update<'e, E>(&self, executor: E, user_id: Uuid) -> Result<Option<Cart>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let cart = sqlx::query_as::<_, Cart>("SELECT * FROM carts WHERE user_id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(executor)
            .await?;
        Ok(cart)
    }

    pub async fn save_items<'e, E>(&self, executor: E, user_id: Uuid, items: &[CartItem]) -> Result<Cart, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let cart = sqlx::query_as::<_, Cart>(
            r#"
            INSERT INTO carts (user_id, items)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET items = EXCLUDED.items, updated_at = now()
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(Json(items))
        .fetch_one(executor)
        .await?;
        Ok(cart)
    }

    pub async fn clear<'e, E>(&self, executor: E, user_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE carts SET items = '[]'::jsonb, updated_at = now() WHERE user_id = $1")
            .bind(user_id)
            .execute(executor)
            .await?;
        Ok(())
    }
}
