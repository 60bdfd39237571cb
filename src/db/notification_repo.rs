// src/db/notification_repo.rs

use serde_json::Value;
use sqlx::{types::Json, Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::notifications::{AuditLog, Notification},
};

// Notificações e e-mails saem por esta tabela; o envio é feito fora deste serviço.
#[derive(Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn enqueue<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        kind: &str,
        message: &str,
        payload: Value,
    ) -> Result<Uuid, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let id = sqlx::query_scalar(
            r#"
            INSERT INTO notifications (user_id, kind, message, payload)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(kind)
        .bind(message)
        .bind(Json(payload))
        .fetch_one(executor)
        .await?;
        Ok(id)
    }

    pub async fn list_for_user(&self, user_id: Uuid, limit: i64) -> Result<Vec<Notification>, AppError> {
        let notifications = sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(notifications)
    }

    /// Marca como lida; só o dono enxerga a notificação.
    pub async fn mark_read(&self, user_id: Uuid, id: Uuid) -> Result<Option<Notification>, AppError> {
        let notification = sqlx::query_as::<_, Notification>(
            r#"
            UPDATE notifications SET read_at = COALESCE(read_at, now())
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(notification)
    }
}

// Trilha de auditoria (trocas de papel).
#[derive(Clone)]
pub struct AuditRepository {
    pool: PgPool,
}

impl AuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn record<'e, E>(
        &self,
        executor: E,
        actor_id: Uuid,
        action: &str,
        target_id: Option<Uuid>,
        details: Value,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            "INSERT INTO audit_logs (actor_id, action, target_id, details) VALUES ($1, $2, $3, $4)",
        )
        .bind(actor_id)
        .bind(action)
        .bind(target_id)
        .bind(Json(details))
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn list_recent(&self, limit: i64) -> Result<Vec<AuditLog>, AppError> {
        let logs = sqlx::query_as::<_, AuditLog>("SELECT * FROM audit_logs ORDER BY created_at DESC LIMIT $1")
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(logs)
    }
}
