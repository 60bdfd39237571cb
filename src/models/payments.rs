// src/models/payments.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;
use validator::Validate;

use crate::common::error::AppError;

// pending -> completed | failed ; completed -> refunded. Nada sai de failed/refunded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn can_transition_to(self, to: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, to),
            (Pending, Completed) | (Pending, Failed) | (Completed, Refunded)
        )
    }

    pub fn transition(self, to: PaymentStatus) -> Result<PaymentStatus, AppError> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(AppError::invalid_transition("payment", self, to))
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub receipt: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: PaymentStatus,
    pub provider: String,
    pub gateway_order_id: Option<String>,
    pub transaction_id: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- Contrato com o gateway ---

#[derive(Debug, Clone, Serialize)]
pub struct GatewayOrderRequest {
    /// Em unidades menores da moeda (paise/centavos).
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GatewayOrder {
    pub gateway_order_id: String,
    pub amount: i64,
    pub currency: String,
}

/// Converte um valor decimal para unidades menores (x100), arredondando.
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    use rust_decimal::{prelude::ToPrimitive, RoundingStrategy};
    (amount * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

// --- Payloads ---

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentPayload {
    pub order_id: Uuid,
    #[validate(length(min = 8, max = 64, message = "Recibo de pagamento inválido."))]
    pub receipt: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PaymentWebhookPayload {
    #[validate(length(min = 1))]
    pub gateway_order_id: String,
    pub success: bool,
    pub transaction_id: Option<String>,
    pub failure_reason: Option<String>,
    /// HMAC-SHA256 em hex, com o segredo do gateway.
    pub signature: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentResponse {
    pub payment_id: Uuid,
    pub gateway_order_id: Option<String>,
    pub amount: Decimal,
    pub currency: String,
    pub status: PaymentStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refund_only_from_completed() {
        assert_eq!(
            PaymentStatus::Completed.transition(PaymentStatus::Refunded).unwrap(),
            PaymentStatus::Refunded
        );
        let err = PaymentStatus::Pending.transition(PaymentStatus::Refunded).unwrap_err();
        assert!(matches!(err, AppError::InvalidStateTransition { entity: "payment", .. }));
    }

    #[test]
    fn no_transition_leaves_failed_or_refunded() {
        use PaymentStatus::*;
        for from in [Failed, Refunded] {
            for to in [Pending, Completed, Failed, Refunded] {
                assert!(!from.can_transition_to(to), "{from} -> {to}");
            }
        }
        assert!(!Completed.can_transition_to(Failed));
        assert!(!Completed.can_transition_to(Pending));
    }

    #[test]
    fn minor_units_round_half_away() {
        assert_eq!(to_minor_units(Decimal::new(30250, 2)), Some(30250));
        assert_eq!(to_minor_units(Decimal::new(10005, 3)), Some(1001));
    }
}
