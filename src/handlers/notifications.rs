use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::notifications::Notification,
};

// Usuário não verificado também precisa ver o link de verificação
pub async fn list_notifications(
    State(app_state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> Result<Json<Vec<Notification>>, AppError> {
    let notifications = app_state.notification_service.list_notifications(claims.id).await?;
    Ok(Json(notifications))
}

pub async fn mark_read(
    State(app_state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<Notification>, AppError> {
    let notification = app_state.notification_service.mark_read(claims.id, notification_id).await?;
    Ok(Json(notification))
}
