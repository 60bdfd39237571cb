use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::VerifiedUser,
    models::payments::{CreatePaymentPayload, CreatePaymentResponse, Payment, PaymentWebhookPayload},
};

pub async fn create_payment(
    State(app_state): State<AppState>,
    VerifiedUser(claims): VerifiedUser,
    Json(payload): Json<CreatePaymentPayload>,
) -> Result<(StatusCode, Json<CreatePaymentResponse>), AppError> {
    let response = app_state.payment_service.create_payment(claims.id, payload).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

// Quem pode ver o pedido pode ver o pagamento
pub async fn get_payment(
    State(app_state): State<AppState>,
    VerifiedUser(claims): VerifiedUser,
    Path(payment_id): Path<Uuid>,
) -> Result<Json<Payment>, AppError> {
    let payment = app_state.payment_service.get_payment(payment_id).await?;
    app_state
        .order_service
        .get_order(claims.role_view(), claims.id, payment.order_id)
        .await?;
    Ok(Json(payment))
}

// Chamado pelo gateway, sem sessão
pub async fn webhook(
    State(app_state): State<AppState>,
    Json(payload): Json<PaymentWebhookPayload>,
) -> Result<Json<Payment>, AppError> {
    let payment = app_state.payment_service.confirm_payment(payload).await?;
    Ok(Json(payment))
}
