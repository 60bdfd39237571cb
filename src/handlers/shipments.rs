use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::rbac::{DeliveryRole, RequireRole},
    models::shipments::{Shipment, UpdateShipmentStatusPayload},
};

pub async fn list_my_shipments(
    State(app_state): State<AppState>,
    driver: RequireRole<DeliveryRole>,
) -> Result<Json<Vec<Shipment>>, AppError> {
    let shipments = app_state.shipment_service.list_my_shipments(driver.claims.id).await?;
    Ok(Json(shipments))
}

// Remessas sem entregador, para quem está disponível
pub async fn list_available_shipments(
    State(app_state): State<AppState>,
    driver: RequireRole<DeliveryRole>,
) -> Result<Json<Vec<Shipment>>, AppError> {
    let shipments = app_state.shipment_service.list_available(driver.claims.id).await?;
    Ok(Json(shipments))
}

pub async fn accept_shipment(
    State(app_state): State<AppState>,
    driver: RequireRole<DeliveryRole>,
    Path(shipment_id): Path<Uuid>,
) -> Result<Json<Shipment>, AppError> {
    let shipment = app_state
        .shipment_service
        .accept_shipment(driver.claims.id, shipment_id)
        .await?;
    Ok(Json(shipment))
}

pub async fn update_shipment_status(
    State(app_state): State<AppState>,
    driver: RequireRole<DeliveryRole>,
    Path(shipment_id): Path<Uuid>,
    Json(payload): Json<UpdateShipmentStatusPayload>,
) -> Result<Json<Shipment>, AppError> {
    let shipment = app_state
        .shipment_service
        .update_shipment_status(driver.claims.id, shipment_id, payload)
        .await?;
    Ok(Json(shipment))
}
