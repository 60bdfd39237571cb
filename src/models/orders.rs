// src/models/orders.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

use crate::common::error::AppError;

// --- Status do Pedido ---
// Só os campos de status/referência mudam depois da criação.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }

    pub fn can_transition_to(self, to: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, to),
            (Pending, Confirmed) | (Pending, Cancelled) | (Confirmed, Refunded)
        )
    }

    pub fn transition(self, to: OrderStatus) -> Result<OrderStatus, AppError> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(AppError::invalid_transition("order", self, to))
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    #[validate(length(min = 1, message = "Endereço de entrega incompleto."))]
    pub street: String,
    #[validate(length(min = 1, message = "Endereço de entrega incompleto."))]
    pub city: String,
    #[validate(length(min = 1, message = "Endereço de entrega incompleto."))]
    pub state: String,
    #[validate(length(min = 1, message = "Endereço de entrega incompleto."))]
    pub zip_code: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub seller_id: Uuid,
    pub checkout_receipt: String,
    pub items: Json<Vec<OrderLine>>,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub shipping_fee: Decimal,
    pub total_amount: Decimal,
    pub currency: String,
    pub shipping_address: Json<ShippingAddress>,
    pub status: OrderStatus,
    pub payment_id: Option<Uuid>,
    pub shipment_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Totais de um pedido (um pedido por vendedor)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub shipping_fee: Decimal,
    pub total_amount: Decimal,
}

impl OrderTotals {
    pub fn compute(lines: &[OrderLine], tax_rate: Decimal, shipping_fee: Decimal) -> Self {
        let subtotal: Decimal = lines
            .iter()
            .map(|l| l.unit_price * Decimal::from(l.quantity))
            .sum();
        let tax_amount = (subtotal * tax_rate).round_dp(2);
        Self {
            subtotal,
            tax_amount,
            shipping_fee,
            total_amount: subtotal + tax_amount + shipping_fee,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutItem {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "A quantidade mínima é 1."))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutPayload {
    /// Chave de idempotência da tentativa de checkout.
    #[validate(length(min = 8, max = 64, message = "Recibo de checkout inválido."))]
    pub receipt: String,

    #[validate(nested)]
    pub shipping_address: ShippingAddress,

    /// Compra direta; se ausente, usa o carrinho.
    #[validate(nested)]
    pub items: Option<Vec<CheckoutItem>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_add_tax_and_flat_shipping() {
        let lines = vec![
            OrderLine { product_id: Uuid::nil(), name: "A".into(), quantity: 2, unit_price: Decimal::new(100, 0) },
            OrderLine { product_id: Uuid::nil(), name: "B".into(), quantity: 1, unit_price: Decimal::new(50, 0) },
        ];
        let totals = OrderTotals::compute(&lines, Decimal::new(5, 2), Decimal::new(40, 0));
        assert_eq!(totals.subtotal, Decimal::new(250, 0));
        assert_eq!(totals.tax_amount, Decimal::new(1250, 2));
        assert_eq!(totals.total_amount, Decimal::new(30250, 2));
    }

    #[test]
    fn cancelled_orders_stay_cancelled() {
        assert!(OrderStatus::Pending.transition(OrderStatus::Confirmed).is_ok());
        assert!(matches!(
            OrderStatus::Cancelled.transition(OrderStatus::Confirmed),
            Err(AppError::InvalidStateTransition { .. })
        ));
    }
}
