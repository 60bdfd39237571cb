// src/db/payout_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::payouts::{Payout, PayoutBreakdown},
};

#[derive(Clone)]
pub struct PayoutRepository {
    pool: PgPool,
}

impl PayoutRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Grava o repasse apenas uma vez por pedido; valores já gravados nunca são recalculados.
    pub async fn insert_once<'e, E>(
        &self,
        executor: E,
        seller_id: Uuid,
        order_id: Uuid,
        breakdown: &PayoutBreakdown,
    ) -> Result<Option<Payout>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let payout = sqlx::query_as::<_, Payout>(
            r#"
            INSERT INTO payouts (seller_id, order_id, amount, platform_commission, tax_deducted, net_amount)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (order_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(seller_id)
        .bind(order_id)
        .bind(breakdown.amount)
        .bind(breakdown.platform_commission)
        .bind(breakdown.tax_deducted)
        .bind(breakdown.net_amount)
        .fetch_optional(executor)
        .await?;
        Ok(payout)
    }

    pub async fn find_by_order<'e, E>(&self, executor: E, order_id: Uuid) -> Result<Option<Payout>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let payout = sqlx::query_as::<_, Payout>("SELECT * FROM payouts WHERE order_id = $1")
            .bind(order_id)
            .fetch_optional(executor)
            .await?;
        Ok(payout)
    }

    pub async fn list_for_seller(&self, seller_id: Uuid) -> Result<Vec<Payout>, AppError> {
        let payouts = sqlx::query_as::<_, Payout>(
            "SELECT * FROM payouts WHERE seller_id = $1 ORDER BY created_at DESC",
        )
        .bind(seller_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(payouts)
    }
}
