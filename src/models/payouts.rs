// src/models/payouts.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Payout {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub order_id: Uuid,
    pub amount: Decimal,
    pub platform_commission: Decimal,
    pub tax_deducted: Decimal,
    pub net_amount: Decimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

// Repasse calculado uma única vez, quando o pagamento é concluído.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayoutBreakdown {
    pub amount: Decimal,
    pub platform_commission: Decimal,
    pub tax_deducted: Decimal,
    pub net_amount: Decimal,
}

impl PayoutBreakdown {
    pub fn new(amount: Decimal, platform_commission: Decimal, tax_deducted: Decimal) -> Self {
        Self {
            amount,
            platform_commission,
            tax_deducted,
            net_amount: amount - platform_commission - tax_deducted,
        }
    }

    /// Comissão e imposto como frações do valor do pedido.
    pub fn from_rates(amount: Decimal, commission_rate: Decimal, tax_rate: Decimal) -> Self {
        let commission = (amount * commission_rate).round_dp(2);
        let tax = (amount * tax_rate).round_dp(2);
        Self::new(amount, commission, tax)
    }
}
