// src/services/gateway.rs

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::Duration;
use subtle::ConstantTimeEq;

use crate::{
    common::error::AppError,
    models::payments::{GatewayOrder, GatewayOrderRequest, PaymentWebhookPayload},
};

type HmacSha256 = Hmac<Sha256>;

/// Cliente do gateway de pagamento. O resultado final chega depois, pelo webhook.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn provider(&self) -> &'static str;

    async fn create_order(&self, request: &GatewayOrderRequest) -> Result<GatewayOrder, AppError>;
}

pub struct HttpPaymentGateway {
    client: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl HttpPaymentGateway {
    pub fn new(base_url: String, key_id: String, key_secret: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            key_id,
            key_secret,
        }
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    fn provider(&self) -> &'static str {
        "gateway"
    }

    async fn create_order(&self, request: &GatewayOrderRequest) -> Result<GatewayOrder, AppError> {
        let response = self
            .client
            .post(format!("{}/orders", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::UpstreamFailure(format!("falha de rede: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::UpstreamFailure(format!("gateway respondeu {}", status)));
        }

        let order: GatewayOrder = response
            .json()
            .await
            .map_err(|e| AppError::UpstreamFailure(format!("resposta inválida: {}", e)))?;

        if order.amount != request.amount || order.currency != request.currency {
            return Err(AppError::UpstreamFailure(format!(
                "gateway devolveu {} {} para um pedido de {} {}",
                order.amount, order.currency, request.amount, request.currency
            )));
        }

        Ok(order)
    }
}

/// Chama o gateway com prazo. Estourar o prazo é uma `UpstreamFailure`; não há nova tentativa aqui.
pub async fn create_order_with_timeout(
    gateway: &dyn PaymentGateway,
    request: &GatewayOrderRequest,
    limit: Duration,
) -> Result<GatewayOrder, AppError> {
    match tokio::time::timeout(limit, gateway.create_order(request)).await {
        Ok(result) => result,
        Err(_) => Err(AppError::UpstreamFailure(format!(
            "gateway não respondeu em {} ms",
            limit.as_millis()
        ))),
    }
}

// "<pedido no gateway>|<transação>|<completed|failed>"
fn webhook_message(payload: &PaymentWebhookPayload) -> String {
    format!(
        "{}|{}|{}",
        payload.gateway_order_id,
        payload.transaction_id.as_deref().unwrap_or_default(),
        if payload.success { "completed" } else { "failed" }
    )
}

fn compute_hmac(secret: &str, message: &str) -> Result<Vec<u8>, AppError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| anyhow::anyhow!("Segredo do gateway inválido: {}", e))?;
    mac.update(message.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

pub fn sign_webhook(secret: &str, payload: &PaymentWebhookPayload) -> Result<String, AppError> {
    Ok(hex::encode(compute_hmac(secret, &webhook_message(payload))?))
}

/// Rejeita o webhook sem assinatura ou com assinatura que não confere.
pub fn verify_webhook(secret: &str, payload: &PaymentWebhookPayload) -> Result<(), AppError> {
    let provided = payload
        .signature
        .as_deref()
        .and_then(|sig| hex::decode(sig.trim()).ok())
        .ok_or(AppError::Unauthorized)?;
    let expected = compute_hmac(secret, &webhook_message(payload))?;

    if provided.len() != expected.len() || !bool::from(provided.ct_eq(expected.as_slice())) {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

#[cfg(test)]
pub mod fakes {
    use super::*;

    pub enum FakeBehavior {
        Accept,
        Reject,
        Hang,
    }

    pub struct FakeGateway(pub FakeBehavior);

    #[async_trait]
    impl PaymentGateway for FakeGateway {
        fn provider(&self) -> &'static str {
            "fake"
        }

        async fn create_order(&self, request: &GatewayOrderRequest) -> Result<GatewayOrder, AppError> {
            match self.0 {
                FakeBehavior::Accept => Ok(GatewayOrder {
                    gateway_order_id: format!("order_{}", request.receipt),
                    amount: request.amount,
                    currency: request.currency.clone(),
                }),
                FakeBehavior::Reject => Err(AppError::UpstreamFailure("recusado".into())),
                FakeBehavior::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Err(AppError::UpstreamFailure("inalcançável".into()))
                }
            }
        }
    }
}
