use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{
        auth::VerifiedUser,
        rbac::{RequireRole, SellerRole},
    },
    models::orders::{CheckoutPayload, Order},
};

// Um pedido por vendedor
pub async fn checkout(
    State(app_state): State<AppState>,
    VerifiedUser(claims): VerifiedUser,
    Json(payload): Json<CheckoutPayload>,
) -> Result<(StatusCode, Json<Vec<Order>>), AppError> {
    let orders = app_state.order_service.checkout(claims.id, payload).await?;
    Ok((StatusCode::CREATED, Json(orders)))
}

pub async fn list_my_orders(
    State(app_state): State<AppState>,
    VerifiedUser(claims): VerifiedUser,
) -> Result<Json<Vec<Order>>, AppError> {
    let orders = app_state.order_service.list_orders_for_user(claims.id).await?;
    Ok(Json(orders))
}

pub async fn get_order(
    State(app_state): State<AppState>,
    VerifiedUser(claims): VerifiedUser,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = app_state
        .order_service
        .get_order(claims.role_view(), claims.id, order_id)
        .await?;
    Ok(Json(order))
}

pub async fn list_seller_orders(
    State(app_state): State<AppState>,
    seller: RequireRole<SellerRole>,
) -> Result<Json<Vec<Order>>, AppError> {
    let orders = app_state.order_service.list_orders_for_seller(seller.claims.id).await?;
    Ok(Json(orders))
}
