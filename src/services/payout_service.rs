// src/services/payout_service.rs

use rust_decimal::Decimal;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::PayoutRepository,
    models::{
        orders::Order,
        payouts::{Payout, PayoutBreakdown},
    },
};

#[derive(Clone)]
pub struct PayoutService {
    payout_repo: PayoutRepository,
    commission_rate: Decimal,
    tax_rate: Decimal,
}

impl PayoutService {
    pub fn new(payout_repo: PayoutRepository, commission_rate: Decimal, tax_rate: Decimal) -> Self {
        Self { payout_repo, commission_rate, tax_rate }
    }

    pub fn breakdown_for(&self, order: &Order) -> PayoutBreakdown {
        PayoutBreakdown::from_rates(order.total_amount, self.commission_rate, self.tax_rate)
    }

    /// Repasse do pedido, gravado uma única vez. Se já existe, devolve o gravado sem recalcular.
    pub async fn derive_payout(&self, conn: &mut PgConnection, order: &Order) -> Result<Payout, AppError> {
        let breakdown = self.breakdown_for(order);

        if let Some(payout) = self
            .payout_repo
            .insert_once(&mut *conn, order.seller_id, order.id, &breakdown)
            .await?
        {
            tracing::info!(
                "Repasse {} do pedido {}: líquido {} {}.",
                payout.id,
                order.id,
                payout.net_amount,
                order.currency
            );
            return Ok(payout);
        }

        self.payout_repo
            .find_by_order(&mut *conn, order.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Repasse do pedido {}", order.id)))
    }

    pub async fn list_payouts(&self, seller_id: Uuid) -> Result<Vec<Payout>, AppError> {
        self.payout_repo.list_for_seller(seller_id).await
    }
}
