use axum::{extract::State, http::StatusCode, Json};

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::VerifiedUser,
    models::cart::{CartItem, SetCartItemPayload},
};

pub async fn get_cart(
    State(app_state): State<AppState>,
    VerifiedUser(claims): VerifiedUser,
) -> Result<Json<Vec<CartItem>>, AppError> {
    let items = app_state.cart_service.get_cart(claims.id).await?;
    Ok(Json(items))
}

// Quantidade 0 remove o item
pub async fn set_cart_item(
    State(app_state): State<AppState>,
    VerifiedUser(claims): VerifiedUser,
    Json(payload): Json<SetCartItemPayload>,
) -> Result<Json<Vec<CartItem>>, AppError> {
    let items = app_state.cart_service.set_cart_item(claims.id, payload).await?;
    Ok(Json(items))
}

pub async fn clear_cart(
    State(app_state): State<AppState>,
    VerifiedUser(claims): VerifiedUser,
) -> Result<StatusCode, AppError> {
    app_state.cart_service.clear_cart(claims.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
