// src/services/payment_service.rs

use chrono::Utc;
use sqlx::PgPool;
use std::{sync::Arc, time::Duration};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::{OrderRepository, PaymentRepository},
    models::{
        orders::OrderStatus,
        payments::{
            to_minor_units, CreatePaymentPayload, CreatePaymentResponse, GatewayOrderRequest, Payment,
            PaymentStatus, PaymentWebhookPayload,
        },
    },
    services::{
        gateway::{create_order_with_timeout, verify_webhook, PaymentGateway},
        payout_service::PayoutService,
        reservation_service::ReservationService,
        shipment_service::ShipmentService,
    },
};

const STALE_BATCH: i64 = 100;

/// O que fazer com um webhook, dado o status atual do pagamento.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookAction {
    /// Aplicar a transição e seus efeitos.
    Apply(PaymentStatus),
    /// Mesmo resultado já aplicado: só reexecuta os efeitos idempotentes.
    Replay(PaymentStatus),
}

pub fn webhook_action(current: PaymentStatus, success: bool) -> Result<WebhookAction, AppError> {
    let target = if success { PaymentStatus::Completed } else { PaymentStatus::Failed };
    if current == target {
        return Ok(WebhookAction::Replay(target));
    }
    current.transition(target)?;
    Ok(WebhookAction::Apply(target))
}

impl From<&Payment> for CreatePaymentResponse {
    fn from(payment: &Payment) -> Self {
        CreatePaymentResponse {
            payment_id: payment.id,
            gateway_order_id: payment.gateway_order_id.clone(),
            amount: payment.amount,
            currency: payment.currency.clone(),
            status: payment.status,
        }
    }
}

#[derive(Clone)]
pub struct PaymentService {
    payment_repo: PaymentRepository,
    order_repo: OrderRepository,
    reservations: ReservationService,
    payouts: PayoutService,
    shipments: ShipmentService,
    gateway: Arc<dyn PaymentGateway>,
    gateway_timeout: Duration,
    webhook_secret: String,
    pool: PgPool,
}

impl PaymentService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        payment_repo: PaymentRepository,
        order_repo: OrderRepository,
        reservations: ReservationService,
        payouts: PayoutService,
        shipments: ShipmentService,
        gateway: Arc<dyn PaymentGateway>,
        gateway_timeout: Duration,
        webhook_secret: String,
        pool: PgPool,
    ) -> Self {
        Self {
            payment_repo,
            order_repo,
            reservations,
            payouts,
            shipments,
            gateway,
            gateway_timeout,
            webhook_secret,
            pool,
        }
    }

    // --- CREATE PAYMENT ---
    pub async fn create_payment(
        &self,
        user_id: Uuid,
        payload: CreatePaymentPayload,
    ) -> Result<CreatePaymentResponse, AppError> {
        payload.validate()?;

        let order = self
            .order_repo
            .find_by_id(payload.order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Pedido {}", payload.order_id)))?;

        if order.user_id != user_id {
            return Err(AppError::Forbidden("Este pedido pertence a outro usuário.".into()));
        }

        // Mesmo recibo = mesma tentativa
        if let Some(existing) = self.payment_repo.find_by_receipt(&payload.receipt).await? {
            if existing.order_id != order.id {
                return Err(AppError::Conflict("Recibo já usado em outro pedido.".into()));
            }
            return Ok(CreatePaymentResponse::from(&existing));
        }

        if order.status != OrderStatus::Pending {
            return Err(AppError::Conflict(format!(
                "O pedido está '{}' e não aceita pagamento.",
                order.status
            )));
        }

        let amount = to_minor_units(order.total_amount)
            .ok_or_else(|| AppError::BadRequest("Valor do pedido fora do intervalo.".into()))?;

        let payment = match self
            .payment_repo
            .insert_pending(order.id, &payload.receipt, order.total_amount, &order.currency, self.gateway.provider())
            .await?
        {
            Some(p) => p,
            None => {
                // Outra requisição com o mesmo recibo gravou primeiro
                let existing = self
                    .payment_repo
                    .find_by_receipt(&payload.receipt)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Pagamento {}", payload.receipt)))?;
                return Ok(CreatePaymentResponse::from(&existing));
            }
        };

        self.order_repo.set_payment(&self.pool, order.id, payment.id).await?;

        let request = GatewayOrderRequest {
            amount,
            currency: order.currency.clone(),
            receipt: payload.receipt.clone(),
        };

        match create_order_with_timeout(self.gateway.as_ref(), &request, self.gateway_timeout).await {
            Ok(gateway_order) => {
                let payment = self
                    .payment_repo
                    .set_gateway_order(payment.id, &gateway_order.gateway_order_id)
                    .await?;
                tracing::info!(
                    "Pagamento {} aberto no gateway ({}).",
                    payment.id,
                    gateway_order.gateway_order_id
                );
                Ok(CreatePaymentResponse::from(&payment))
            }
            Err(err) => {
                tracing::warn!("Gateway falhou para o pagamento {}: {}", payment.id, err);
                self.fail_payment(&payment, &err.to_string()).await?;
                Err(match err {
                    AppError::UpstreamFailure(_) => err,
                    other => AppError::UpstreamFailure(other.to_string()),
                })
            }
        }
    }

    /// pending -> failed, cancela o pedido e libera o estoque.
    /// Devolve `false` quando outro fluxo já tirou o pagamento de `pending`.
    async fn fail_payment(&self, payment: &Payment, reason: &str) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let failed = self
            .payment_repo
            .transition_status(&mut *tx, payment.id, PaymentStatus::Pending, PaymentStatus::Failed, None, Some(reason))
            .await?;

        if failed.is_none() {
            return Ok(false);
        }

        self.order_repo
            .transition_status(&mut *tx, payment.order_id, OrderStatus::Pending, OrderStatus::Cancelled)
            .await?;

        tx.commit().await?;

        self.reservations.release(payment.order_id).await?;
        tracing::info!("Pagamento {} falhou ({}); reserva do pedido {} liberada.", payment.id, reason, payment.order_id);
        Ok(true)
    }

    /// Efeitos do pagamento concluído. Todos idempotentes: o replay de um webhook
    /// repete este passo sem duplicar nada.
    async fn complete_effects(&self, payment: &Payment) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let order = match self
            .order_repo
            .transition_status(&mut *tx, payment.order_id, OrderStatus::Pending, OrderStatus::Confirmed)
            .await?
        {
            Some(order) => order,
            None => self
                .order_repo
                .find_by_id(payment.order_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Pedido {}", payment.order_id)))?,
        };

        if order.status == OrderStatus::Confirmed {
            self.payouts.derive_payout(&mut *tx, &order).await?;
            self.shipments.create_in(&mut *tx, &order).await?;
        }

        tx.commit().await?;

        self.reservations.commit(payment.order_id).await?;
        Ok(())
    }

    // --- WEBHOOK ---
    pub async fn confirm_payment(&self, payload: PaymentWebhookPayload) -> Result<Payment, AppError> {
        if let Err(e) = verify_webhook(&self.webhook_secret, &payload) {
            tracing::warn!("Webhook com assinatura inválida para {}.", payload.gateway_order_id);
            return Err(e);
        }
        payload.validate()?;

        let payment = self
            .payment_repo
            .find_by_gateway_order(&payload.gateway_order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Pagamento do gateway {}", payload.gateway_order_id)))?;

        match webhook_action(payment.status, payload.success)? {
            WebhookAction::Replay(PaymentStatus::Completed) => {
                tracing::debug!("Webhook repetido para o pagamento {}.", payment.id);
                self.complete_effects(&payment).await?;
                Ok(payment)
            }
            WebhookAction::Replay(_) => {
                self.reservations.release(payment.order_id).await?;
                Ok(payment)
            }
            WebhookAction::Apply(PaymentStatus::Completed) => {
                let updated = self
                    .payment_repo
                    .transition_status(
                        &self.pool,
                        payment.id,
                        PaymentStatus::Pending,
                        PaymentStatus::Completed,
                        payload.transaction_id.as_deref(),
                        None,
                    )
                    .await?;

                let Some(updated) = updated else {
                    return self.lost_race(payment.id, payload.success).await;
                };

                self.complete_effects(&updated).await?;
                tracing::info!("Pagamento {} concluído; pedido {} confirmado.", updated.id, updated.order_id);
                Ok(updated)
            }
            WebhookAction::Apply(_) => {
                let reason = payload.failure_reason.as_deref().unwrap_or("recusado pelo gateway");
                if !self.fail_payment(&payment, reason).await? {
                    return self.lost_race(payment.id, payload.success).await;
                }
                self.load(payment.id).await
            }
        }
    }

    // O status mudou entre a leitura e o compare-and-set: reavalia com o valor novo.
    async fn lost_race(&self, payment_id: Uuid, success: bool) -> Result<Payment, AppError> {
        let current = self.load(payment_id).await?;
        match webhook_action(current.status, success)? {
            WebhookAction::Replay(_) => Ok(current),
            WebhookAction::Apply(target) => Err(AppError::invalid_transition("payment", current.status, target)),
        }
    }

    async fn load(&self, payment_id: Uuid) -> Result<Payment, AppError> {
        self.payment_repo
            .find_by_id(payment_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Pagamento {}", payment_id)))
    }

    pub async fn get_payment(&self, payment_id: Uuid) -> Result<Payment, AppError> {
        self.load(payment_id).await
    }

    // --- REFUND ---
    pub async fn refund_payment(&self, payment_id: Uuid) -> Result<Payment, AppError> {
        let payment = self.load(payment_id).await?;
        payment.status.transition(PaymentStatus::Refunded)?;

        let mut tx = self.pool.begin().await?;

        let refunded = self
            .payment_repo
            .transition_status(&mut *tx, payment.id, PaymentStatus::Completed, PaymentStatus::Refunded, None, None)
            .await?
            .ok_or_else(|| AppError::invalid_transition("payment", payment.status, PaymentStatus::Refunded))?;

        self.order_repo
            .transition_status(&mut *tx, payment.order_id, OrderStatus::Confirmed, OrderStatus::Refunded)
            .await?;

        tx.commit().await?;

        tracing::info!("Pagamento {} reembolsado.", refunded.id);
        Ok(refunded)
    }

    // --- SWEEPER ---
    /// Pagamentos parados em `pending` além do prazo falham e liberam o estoque.
    pub async fn expire_stale_payments(&self, max_age: Duration) -> Result<usize, AppError> {
        let max_age = chrono::Duration::from_std(max_age)
            .map_err(|e| anyhow::anyhow!("Prazo de pagamento inválido: {}", e))?;
        let cutoff = Utc::now() - max_age;

        let stale = self.payment_repo.list_stale_pending(cutoff, STALE_BATCH).await?;
        let mut expired = 0;
        for payment in &stale {
            match self.fail_payment(payment, "expirado").await {
                Ok(true) => expired += 1,
                Ok(false) => {}
                Err(e) => tracing::error!("Falha ao expirar o pagamento {}: {}", payment.id, e),
            }
        }

        if expired > 0 {
            tracing::info!("{} pagamento(s) pendente(s) expirado(s).", expired);
        }
        Ok(expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_webhook_applies_transition() {
        assert_eq!(
            webhook_action(PaymentStatus::Pending, true).unwrap(),
            WebhookAction::Apply(PaymentStatus::Completed)
        );
        assert_eq!(
            webhook_action(PaymentStatus::Pending, false).unwrap(),
            WebhookAction::Apply(PaymentStatus::Failed)
        );
    }

    #[test]
    fn repeated_webhook_is_a_replay() {
        assert_eq!(
            webhook_action(PaymentStatus::Completed, true).unwrap(),
            WebhookAction::Replay(PaymentStatus::Completed)
        );
        assert_eq!(
            webhook_action(PaymentStatus::Failed, false).unwrap(),
            WebhookAction::Replay(PaymentStatus::Failed)
        );
    }

    #[test]
    fn conflicting_webhook_is_invalid_transition() {
        for (current, success) in [
            (PaymentStatus::Completed, false),
            (PaymentStatus::Failed, true),
            (PaymentStatus::Refunded, true),
            (PaymentStatus::Refunded, false),
        ] {
            assert!(matches!(
                webhook_action(current, success),
                Err(AppError::InvalidStateTransition { entity: "payment", .. })
            ));
        }
    }
}
