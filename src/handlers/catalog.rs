use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{
        auth::VerifiedUser,
        rbac::{RequireRole, SellerRole},
    },
    models::{
        auth::SessionClaims,
        catalog::{
            AdjustStockPayload, CatalogSnapshot, ChangeProductStatusPayload, CreateProductPayload, InventoryLog,
            Product, UpdateAttributesPayload,
        },
        inventory::StockLevel,
        reviews::{CreateReviewPayload, Review},
    },
    services::inventory_service::CatalogActor,
};

fn actor(claims: &SessionClaims) -> CatalogActor {
    CatalogActor { user_id: claims.id, view: claims.role_view() }
}

// --- Vitrine (pública) ---

pub async fn list_catalog(State(app_state): State<AppState>) -> Result<Json<CatalogSnapshot>, AppError> {
    let snapshot = app_state.inventory_service.list_catalog().await?;
    Ok(Json(snapshot))
}

pub async fn get_product(
    State(app_state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<Product>, AppError> {
    let product = app_state.inventory_service.get_product(product_id).await?;
    Ok(Json(product))
}

#[derive(Debug, Serialize)]
pub struct Availability {
    #[serde(flatten)]
    pub level: StockLevel,
    pub available: i32,
}

// Saldo livre = estoque - reservado
pub async fn get_availability(
    State(app_state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<Availability>, AppError> {
    let level = app_state
        .reservations
        .stock_level(product_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Produto {}", product_id)))?;
    Ok(Json(Availability { level, available: level.available() }))
}

pub async fn list_reviews(
    State(app_state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<Json<Vec<Review>>, AppError> {
    let reviews = app_state.review_service.list_reviews(product_id).await?;
    Ok(Json(reviews))
}

pub async fn create_review(
    State(app_state): State<AppState>,
    VerifiedUser(claims): VerifiedUser,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<CreateReviewPayload>,
) -> Result<(StatusCode, Json<Review>), AppError> {
    let review = app_state.review_service.create_review(claims.id, product_id, payload).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

// --- Produtos do vendedor ---

pub async fn create_product(
    State(app_state): State<AppState>,
    seller: RequireRole<SellerRole>,
    Json(payload): Json<CreateProductPayload>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    let product = app_state.inventory_service.create_product(seller.claims.id, payload).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn list_my_products(
    State(app_state): State<AppState>,
    seller: RequireRole<SellerRole>,
) -> Result<Json<Vec<Product>>, AppError> {
    let products = app_state.inventory_service.list_seller_products(seller.claims.id).await?;
    Ok(Json(products))
}

// Vendedor dono ou admin; o serviço decide qual papel vale
pub async fn change_product_status(
    State(app_state): State<AppState>,
    VerifiedUser(claims): VerifiedUser,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<ChangeProductStatusPayload>,
) -> Result<Json<Product>, AppError> {
    let product = app_state
        .inventory_service
        .change_product_status(actor(&claims), product_id, payload.status)
        .await?;
    Ok(Json(product))
}

#[derive(Debug, Serialize)]
pub struct StockAdjustmentResponse {
    pub product: Product,
    pub log: InventoryLog,
}

pub async fn adjust_stock(
    State(app_state): State<AppState>,
    VerifiedUser(claims): VerifiedUser,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<AdjustStockPayload>,
) -> Result<Json<StockAdjustmentResponse>, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;
    let (product, log) = app_state
        .inventory_service
        .adjust_stock(actor(&claims), product_id, payload.delta, payload.reason.as_deref())
        .await?;
    Ok(Json(StockAdjustmentResponse { product, log }))
}

pub async fn update_attributes(
    State(app_state): State<AppState>,
    VerifiedUser(claims): VerifiedUser,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<UpdateAttributesPayload>,
) -> Result<Json<Product>, AppError> {
    payload.validate().map_err(AppError::ValidationError)?;
    let product = app_state
        .inventory_service
        .update_attributes(actor(&claims), product_id, &payload.attributes)
        .await?;
    Ok(Json(product))
}
