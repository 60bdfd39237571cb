use axum::{extract::State, Json};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::rbac::{RequireRole, SellerRole},
    models::payouts::Payout,
};

pub async fn list_payouts(
    State(app_state): State<AppState>,
    seller: RequireRole<SellerRole>,
) -> Result<Json<Vec<Payout>>, AppError> {
    let payouts = app_state.payout_service.list_payouts(seller.claims.id).await?;
    Ok(Json(payouts))
}
