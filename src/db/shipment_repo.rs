// src/db/shipment_repo.rs

use sqlx::{types::Json, Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::shipments::{GeoPoint, Shipment, ShipmentEvent, ShipmentStatus},
};

#[derive(Clone)]
pub struct ShipmentRepository {
    pool: PgPool,
}

impl ShipmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Uma remessa por pedido: em conflito devolve `None`.
    pub async fn insert_once<'e, E>(
        &self,
        executor: E,
        order_id: Uuid,
        tracking_number: &str,
        otp_code: &str,
        first_event: &ShipmentEvent,
    ) -> Result<Option<Shipment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let shipment = sqlx::query_as::<_, Shipment>(
            r#"
            INSERT INTO shipments (order_id, tracking_number, otp_code, events)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (order_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(order_id)
        .bind(tracking_number)
        .bind(otp_code)
        .bind(Json(vec![first_event]))
        .fetch_optional(executor)
        .await?;
        Ok(shipment)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Shipment>, AppError> {
        let shipment = sqlx::query_as::<_, Shipment>("SELECT * FROM shipments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(shipment)
    }

    pub async fn find_by_order<'e, E>(&self, executor: E, order_id: Uuid) -> Result<Option<Shipment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let shipment = sqlx::query_as::<_, Shipment>("SELECT * FROM shipments WHERE order_id = $1")
            .bind(order_id)
            .fetch_optional(executor)
            .await?;
        Ok(shipment)
    }

    pub async fn list_for_delivery_person(&self, delivery_person_id: Uuid) -> Result<Vec<Shipment>, AppError> {
        let shipments = sqlx::query_as::<_, Shipment>(
            "SELECT * FROM shipments WHERE delivery_person_id = $1 ORDER BY created_at DESC",
        )
        .bind(delivery_person_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(shipments)
    }

    /// Atribui o entregador enquanto a remessa ainda está `pending`.
    pub async fn assign(&self, id: Uuid, delivery_person_id: Uuid) -> Result<Option<Shipment>, AppError> {
        let shipment = sqlx::query_as::<_, Shipment>(
            r#"
            UPDATE shipments
            SET delivery_person_id = $2, updated_at = now()
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(delivery_person_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(shipment)
    }

    /// Remessas `pending` ainda sem entregador, mais recentes primeiro.
    pub async fn list_available(&self, limit: i64) -> Result<Vec<Shipment>, AppError> {
        let shipments = sqlx::query_as::<_, Shipment>(
            r#"
            SELECT * FROM shipments
            WHERE status = 'pending' AND delivery_person_id IS NULL
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(shipments)
    }

    /// O entregador assume a remessa. Só um aceite vence: os demais recebem `None`.
    pub async fn accept<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        delivery_person_id: Uuid,
        event: &ShipmentEvent,
    ) -> Result<Option<Shipment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let shipment = sqlx::query_as::<_, Shipment>(
            r#"
            UPDATE shipments
            SET delivery_person_id = $2, events = events || $3, updated_at = now()
            WHERE id = $1 AND status = 'pending' AND delivery_person_id IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(delivery_person_id)
        .bind(Json(vec![event]))
        .fetch_optional(executor)
        .await?;
        Ok(shipment)
    }

    /// Compare-and-set do status com o evento anexado ao histórico.
    pub async fn transition_status(
        &self,
        id: Uuid,
        from: ShipmentStatus,
        event: &ShipmentEvent,
    ) -> Result<Option<Shipment>, AppError> {
        from.transition(event.status)?;
        let shipment = sqlx::query_as::<_, Shipment>(
            r#"
            UPDATE shipments
            SET status = $3,
                events = events || $4,
                current_location = COALESCE($5, current_location),
                pickup_time = CASE WHEN $3 = 'in-transit'::shipment_status THEN now() ELSE pickup_time END,
                delivered_time = CASE WHEN $3 = 'delivered'::shipment_status THEN now() ELSE delivered_time END,
                updated_at = now()
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(event.status)
        .bind(Json(vec![event]))
        .bind(event.location.as_ref().map(Json::<&GeoPoint>))
        .fetch_optional(&self.pool)
        .await?;
        Ok(shipment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::test_support::{seed_delivery_profile, seed_order, seed_user},
        models::auth::Role,
    };
    use chrono::Utc;

    fn event(note: &str) -> ShipmentEvent {
        ShipmentEvent { status: ShipmentStatus::Pending, timestamp: Utc::now(), location: None, note: Some(note.into()) }
    }

    async fn seed_shipment(pool: &PgPool, repo: &ShipmentRepository) -> Shipment {
        let customer = seed_user(pool, Role::Customer).await;
        let seller = seed_user(pool, Role::Seller).await;
        let order = seed_order(pool, customer, seller).await;
        let tracking = format!("DLG{}", order.simple());
        repo.insert_once(pool, order, &tracking, "482913", &event("Remessa criada"))
            .await
            .unwrap()
            .unwrap()
    }

    async fn seed_driver(pool: &PgPool) -> Uuid {
        let user = seed_user(pool, Role::Delivery).await;
        seed_delivery_profile(pool, user).await
    }

    #[sqlx::test]
    async fn double_accept_has_a_single_winner(pool: PgPool) {
        let repo = ShipmentRepository::new(pool.clone());
        let shipment = seed_shipment(&pool, &repo).await;
        let (first, second) = (seed_driver(&pool).await, seed_driver(&pool).await);

        let (event_a, event_b) = (event("aceita"), event("aceita"));
        let (a, b) = tokio::join!(
            repo.accept(&pool, shipment.id, first, &event_a),
            repo.accept(&pool, shipment.id, second, &event_b),
        );
        let winners: Vec<Shipment> = [a.unwrap(), b.unwrap()].into_iter().flatten().collect();
        assert_eq!(winners.len(), 1);

        let stored = repo.find_by_id(shipment.id).await.unwrap().unwrap();
        assert_eq!(stored.delivery_person_id, winners[0].delivery_person_id);
        assert!(stored.delivery_person_id == Some(first) || stored.delivery_person_id == Some(second));
        assert_eq!(stored.events.0.len(), 2);
        assert!(repo.list_available(50).await.unwrap().is_empty());
    }

    #[sqlx::test]
    async fn only_unassigned_pending_shipments_are_available(pool: PgPool) {
        let repo = ShipmentRepository::new(pool.clone());
        let open = seed_shipment(&pool, &repo).await;
        let assigned = seed_shipment(&pool, &repo).await;
        let driver = seed_driver(&pool).await;

        repo.assign(assigned.id, driver).await.unwrap().unwrap();

        let available: Vec<Uuid> = repo.list_available(50).await.unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(available, vec![open.id]);

        // Já atribuída pelo admin: aceitar não sobrescreve
        assert!(repo.accept(&pool, assigned.id, seed_driver(&pool).await, &event("aceita")).await.unwrap().is_none());
    }
}
