// src/db/payment_repo.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::payments::{Payment, PaymentStatus},
};

#[derive(Clone)]
pub struct PaymentRepository {
    pool: PgPool,
}

impl PaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insere um pagamento `pending`. Se o recibo já existe, devolve `None`
    /// e o chamador busca o registro existente (idempotência por recibo).
    pub async fn insert_pending(
        &self,
        order_id: Uuid,
        receipt: &str,
        amount: Decimal,
        currency: &str,
        provider: &str,
    ) -> Result<Option<Payment>, AppError> {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (order_id, receipt, amount, currency, provider)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (receipt) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(order_id)
        .bind(receipt)
        .bind(amount)
        .bind(currency)
        .bind(provider)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "Este pedido já possui um pagamento."))?;
        Ok(payment)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>, AppError> {
        let payment = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(payment)
    }

    pub async fn find_by_receipt(&self, receipt: &str) -> Result<Option<Payment>, AppError> {
        let payment = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE receipt = $1")
            .bind(receipt)
            .fetch_optional(&self.pool)
            .await?;
        Ok(payment)
    }

    pub async fn find_by_gateway_order(&self, gateway_order_id: &str) -> Result<Option<Payment>, AppError> {
        let payment = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE gateway_order_id = $1")
            .bind(gateway_order_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(payment)
    }

    pub async fn set_gateway_order(&self, id: Uuid, gateway_order_id: &str) -> Result<Payment, AppError> {
        sqlx::query_as::<_, Payment>(
            "UPDATE payments SET gateway_order_id = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(gateway_order_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Pagamento {}", id)))
    }

    /// Compare-and-set do status. `None` quando outro fluxo já mudou o pagamento.
    pub async fn transition_status<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        from: PaymentStatus,
        to: PaymentStatus,
        transaction_id: Option<&str>,
        failure_reason: Option<&str>,
    ) -> Result<Option<Payment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        from.transition(to)?;
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments
            SET status = $3,
                transaction_id = COALESCE($4, transaction_id),
                failure_reason = COALESCE($5, failure_reason),
                updated_at = now()
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .bind(transaction_id)
        .bind(failure_reason)
        .fetch_optional(executor)
        .await?;
        Ok(payment)
    }

    pub async fn list_stale_pending(&self, cutoff: DateTime<Utc>, limit: i64) -> Result<Vec<Payment>, AppError> {
        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT * FROM payments
            WHERE status = 'pending' AND created_at < $1
            ORDER BY created_at ASC
            LIMIT $2
            "#,
        )
        .bind(cutoff)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(payments)
    }
}
