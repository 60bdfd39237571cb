// src/services/notification_service.rs

use uuid::Uuid;

use crate::{common::error::AppError, db::NotificationRepository, models::notifications::Notification};

const INBOX_LIMIT: i64 = 50;

// Caixa de entrada do usuário (link de verificação, OTP de entrega)
#[derive(Clone)]
pub struct NotificationService {
    notification_repo: NotificationRepository,
}

impl NotificationService {
    pub fn new(notification_repo: NotificationRepository) -> Self {
        Self { notification_repo }
    }

    pub async fn list_notifications(&self, user_id: Uuid) -> Result<Vec<Notification>, AppError> {
        self.notification_repo.list_for_user(user_id, INBOX_LIMIT).await
    }

    pub async fn mark_read(&self, user_id: Uuid, notification_id: Uuid) -> Result<Notification, AppError> {
        self.notification_repo
            .mark_read(user_id, notification_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Notificação {}", notification_id)))
    }
}
