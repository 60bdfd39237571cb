// Rotas exclusivas de admin (ou de admin simulando outro papel)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::rbac::{AdminRole, RequireRole},
    models::{
        auth::{SwitchRolePayload, User},
        catalog::{Category, CreateCategoryPayload},
        notifications::AuditLog,
        payments::Payment,
        shipments::{AssignShipmentPayload, Shipment},
    },
};

pub async fn set_user_role(
    State(app_state): State<AppState>,
    admin: RequireRole<AdminRole>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<SwitchRolePayload>,
) -> Result<Json<User>, AppError> {
    let user = app_state
        .role_service
        .set_user_role(admin.claims.id, user_id, payload.role)
        .await?;
    Ok(Json(user))
}

pub async fn create_category(
    State(app_state): State<AppState>,
    _admin: RequireRole<AdminRole>,
    Json(payload): Json<CreateCategoryPayload>,
) -> Result<(StatusCode, Json<Category>), AppError> {
    let category = app_state.inventory_service.create_category(payload).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn create_shipment(
    State(app_state): State<AppState>,
    _admin: RequireRole<AdminRole>,
    Path(order_id): Path<Uuid>,
) -> Result<(StatusCode, Json<Shipment>), AppError> {
    let shipment = app_state.shipment_service.create_shipment(order_id).await?;
    Ok((StatusCode::CREATED, Json(shipment)))
}

pub async fn assign_shipment(
    State(app_state): State<AppState>,
    _admin: RequireRole<AdminRole>,
    Path(shipment_id): Path<Uuid>,
    Json(payload): Json<AssignShipmentPayload>,
) -> Result<Json<Shipment>, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;
    let shipment = app_state
        .shipment_service
        .assign_shipment(shipment_id, payload.delivery_person_id)
        .await?;
    Ok(Json(shipment))
}

pub async fn refund_payment(
    State(app_state): State<AppState>,
    _admin: RequireRole<AdminRole>,
    Path(payment_id): Path<Uuid>,
) -> Result<Json<Payment>, AppError> {
    let payment = app_state.payment_service.refund_payment(payment_id).await?;
    Ok(Json(payment))
}

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub limit: Option<i64>,
}

pub async fn list_audit_logs(
    State(app_state): State<AppState>,
    _admin: RequireRole<AdminRole>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<Vec<AuditLog>>, AppError> {
    let logs = app_state.role_service.list_audit_logs(query.limit.unwrap_or(100)).await?;
    Ok(Json(logs))
}
