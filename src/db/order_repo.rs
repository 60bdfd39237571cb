// src/db/order_repo.rs

use sqlx::{types::Json, Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::orders::{Order, OrderLine, OrderStatus, OrderTotals, ShippingAddress},
};

#[derive(Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

pub struct NewOrder<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub seller_id: Uuid,
    pub checkout_receipt: &'a str,
    pub items: &'a [OrderLine],
    pub totals: OrderTotals,
    pub currency: &'a str,
    pub shipping_address: &'a ShippingAddress,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert<'e, E>(&self, executor: E, order: &NewOrder<'_>) -> Result<Order, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (
                id, user_id, seller_id, checkout_receipt, items, subtotal, tax_amount,
                shipping_fee, total_amount, currency, shipping_address
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(order.id)
        .bind(order.user_id)
        .bind(order.seller_id)
        .bind(order.checkout_receipt)
        .bind(Json(order.items))
        .bind(order.totals.subtotal)
        .bind(order.totals.tax_amount)
        .bind(order.totals.shipping_fee)
        .bind(order.totals.total_amount)
        .bind(order.currency)
        .bind(Json(order.shipping_address))
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "Este checkout já foi processado."))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, AppError> {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(order)
    }

    pub async fn find_by_receipt(&self, user_id: Uuid, receipt: &str) -> Result<Vec<Order>, AppError> {
        let orders = sqlx::query_as::<_, Order>(
            "SELECT * FROM orders WHERE user_id = $1 AND checkout_receipt = $2 ORDER BY seller_id",
        )
        .bind(user_id)
        .bind(receipt)
        .fetch_all(&self.pool)
        .await?;
        Ok(orders)
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, AppError> {
        let orders = sqlx::query_as::<_, Order>(
            "SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(orders)
    }

    pub async fn list_for_seller(&self, seller_id: Uuid) -> Result<Vec<Order>, AppError> {
        let orders = sqlx::query_as::<_, Order>(
            "SELECT * FROM orders WHERE seller_id = $1 ORDER BY created_at DESC",
        )
        .bind(seller_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(orders)
    }

    /// Compare-and-set do status: só grava se o pedido ainda estiver em `from`.
    pub async fn transition_status<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Option<Order>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        from.transition(to)?;
        let order = sqlx::query_as::<_, Order>(
            "UPDATE orders SET status = $3, updated_at = now() WHERE id = $1 AND status = $2 RETURNING *",
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .fetch_optional(executor)
        .await?;
        Ok(order)
    }

    pub async fn set_payment<'e, E>(&self, executor: E, id: Uuid, payment_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE orders SET payment_id = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(payment_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn set_shipment<'e, E>(&self, executor: E, id: Uuid, shipment_id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE orders SET shipment_id = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(shipment_id)
            .execute(executor)
            .await?;
        Ok(())
    }
}
