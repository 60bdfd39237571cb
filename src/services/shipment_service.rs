// src/services/shipment_service.rs

use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::{NotificationRepository, OrderRepository, ProfileRepository, ShipmentRepository},
    models::{
        orders::{Order, OrderStatus},
        shipments::{
            generate_delivery_otp, generate_tracking_number, Shipment, ShipmentEvent, ShipmentStatus,
            UpdateShipmentStatusPayload,
        },
    },
};

/// Valida a atualização feita pelo entregador e monta o evento do histórico.
pub fn plan_status_update(
    shipment: &Shipment,
    delivery_person_id: Uuid,
    payload: &UpdateShipmentStatusPayload,
    now: DateTime<Utc>,
) -> Result<ShipmentEvent, AppError> {
    if shipment.delivery_person_id != Some(delivery_person_id) {
        return Err(AppError::Forbidden("Esta remessa não está atribuída a você.".into()));
    }

    let to = shipment.status.transition(payload.status)?;

    if to == ShipmentStatus::Delivered && payload.otp.as_deref() != Some(shipment.otp_code.as_str()) {
        return Err(AppError::BadRequest("Código de entrega inválido.".into()));
    }

    Ok(ShipmentEvent {
        status: to,
        timestamp: now,
        location: payload.location.clone(),
        note: payload.note.clone(),
    })
}

const AVAILABLE_LIMIT: i64 = 50;

/// Só remessas `pending` e sem entregador podem ser aceitas.
pub fn check_acceptable(shipment: &Shipment) -> Result<(), AppError> {
    if shipment.status != ShipmentStatus::Pending {
        return Err(AppError::Conflict(format!(
            "A remessa está '{}' e não pode mais ser aceita.",
            shipment.status
        )));
    }
    if shipment.delivery_person_id.is_some() {
        return Err(AppError::Conflict("A remessa já foi aceita por outro entregador.".into()));
    }
    Ok(())
}

#[derive(Clone)]
pub struct ShipmentService {
    shipment_repo: ShipmentRepository,
    order_repo: OrderRepository,
    profile_repo: ProfileRepository,
    notification_repo: NotificationRepository,
    pool: PgPool,
}

impl ShipmentService {
    pub fn new(
        shipment_repo: ShipmentRepository,
        order_repo: OrderRepository,
        profile_repo: ProfileRepository,
        notification_repo: NotificationRepository,
        pool: PgPool,
    ) -> Self {
        Self { shipment_repo, order_repo, profile_repo, notification_repo, pool }
    }

    async fn load(&self, shipment_id: Uuid) -> Result<Shipment, AppError> {
        self.shipment_repo
            .find_by_id(shipment_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Remessa {}", shipment_id)))
    }

    /// Cria a remessa do pedido dentro da transação do chamador. Uma por pedido:
    /// se já existe, devolve a existente.
    pub async fn create_in(&self, conn: &mut PgConnection, order: &Order) -> Result<Shipment, AppError> {
        let now = Utc::now();
        let first_event = ShipmentEvent {
            status: ShipmentStatus::Pending,
            timestamp: now,
            location: None,
            note: Some("Remessa criada".into()),
        };
        let tracking_number = generate_tracking_number(now);
        let otp = generate_delivery_otp();

        let created = self
            .shipment_repo
            .insert_once(&mut *conn, order.id, &tracking_number, &otp, &first_event)
            .await?;

        let Some(shipment) = created else {
            return self
                .shipment_repo
                .find_by_order(&mut *conn, order.id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Remessa do pedido {}", order.id)));
        };

        self.order_repo.set_shipment(&mut *conn, order.id, shipment.id).await?;

        // O cliente recebe o OTP; o entregador nunca o vê.
        self.notification_repo
            .enqueue(
                &mut *conn,
                order.user_id,
                "delivery_otp",
                "Seu pedido será enviado. Informe este código ao receber a entrega.",
                json!({ "orderId": order.id, "trackingNumber": shipment.tracking_number, "otp": otp }),
            )
            .await?;

        tracing::info!("Remessa {} criada para o pedido {}.", shipment.tracking_number, order.id);
        Ok(shipment)
    }

    pub async fn create_shipment(&self, order_id: Uuid) -> Result<Shipment, AppError> {
        let order = self
            .order_repo
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Pedido {}", order_id)))?;

        if order.status != OrderStatus::Confirmed {
            return Err(AppError::Conflict(format!(
                "O pedido está '{}'; só pedidos confirmados são enviados.",
                order.status
            )));
        }

        let mut tx = self.pool.begin().await?;
        let shipment = self.create_in(&mut *tx, &order).await?;
        tx.commit().await?;
        Ok(shipment)
    }

    pub async fn assign_shipment(&self, shipment_id: Uuid, delivery_person_id: Uuid) -> Result<Shipment, AppError> {
        if !self.profile_repo.delivery_profile_exists(delivery_person_id).await? {
            return Err(AppError::NotFound(format!("Entregador {}", delivery_person_id)));
        }

        match self.shipment_repo.assign(shipment_id, delivery_person_id).await? {
            Some(shipment) => {
                tracing::info!("Remessa {} atribuída ao entregador {}.", shipment.id, delivery_person_id);
                Ok(shipment)
            }
            None => {
                let current = self.load(shipment_id).await?;
                Err(AppError::Conflict(format!(
                    "A remessa está '{}' e não pode mais ser atribuída.",
                    current.status
                )))
            }
        }
    }

    pub async fn update_shipment_status(
        &self,
        driver_user_id: Uuid,
        shipment_id: Uuid,
        payload: UpdateShipmentStatusPayload,
    ) -> Result<Shipment, AppError> {
        payload.validate()?;

        let delivery_person_id = self
            .profile_repo
            .find_delivery_profile_id(driver_user_id)
            .await?
            .ok_or_else(|| AppError::Forbidden("Complete o perfil de entregador primeiro.".into()))?;

        let shipment = self.load(shipment_id).await?;
        let event = plan_status_update(&shipment, delivery_person_id, &payload, Utc::now())?;

        match self
            .shipment_repo
            .transition_status(shipment.id, shipment.status, &event)
            .await?
        {
            Some(updated) => {
                tracing::info!("Remessa {}: {} -> {}.", updated.id, shipment.status, updated.status);
                Ok(updated)
            }
            None => {
                // Outra atualização venceu a corrida
                let current = self.load(shipment_id).await?;
                Err(AppError::invalid_transition("shipment", current.status, payload.status))
            }
        }
    }

    // Perfil de entregador disponível para novas entregas
    async fn available_driver(&self, driver_user_id: Uuid) -> Result<Uuid, AppError> {
        match self.profile_repo.find_delivery_availability(driver_user_id).await? {
            Some((id, true)) => Ok(id),
            Some((_, false)) => Err(AppError::Forbidden("Você está indisponível para entregas.".into())),
            None => Err(AppError::Forbidden("Complete o perfil de entregador primeiro.".into())),
        }
    }

    pub async fn list_available(&self, driver_user_id: Uuid) -> Result<Vec<Shipment>, AppError> {
        self.available_driver(driver_user_id).await?;
        self.shipment_repo.list_available(AVAILABLE_LIMIT).await
    }

    pub async fn accept_shipment(&self, driver_user_id: Uuid, shipment_id: Uuid) -> Result<Shipment, AppError> {
        let delivery_person_id = self.available_driver(driver_user_id).await?;

        let shipment = self.load(shipment_id).await?;
        check_acceptable(&shipment)?;

        let order = self
            .order_repo
            .find_by_id(shipment.order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Pedido {}", shipment.order_id)))?;

        let event = ShipmentEvent {
            status: ShipmentStatus::Pending,
            timestamp: Utc::now(),
            location: None,
            note: Some("Aceita pelo entregador".into()),
        };

        let mut tx = self.pool.begin().await?;
        let Some(accepted) = self
            .shipment_repo
            .accept(&mut *tx, shipment.id, delivery_person_id, &event)
            .await?
        else {
            // Outro entregador aceitou entre a leitura e o update
            let current = self.load(shipment_id).await?;
            check_acceptable(&current)?;
            return Err(AppError::Conflict("A remessa já foi aceita por outro entregador.".into()));
        };

        for user_id in [order.user_id, order.seller_id] {
            self.notification_repo
                .enqueue(
                    &mut *tx,
                    user_id,
                    "shipment_accepted",
                    "Um entregador assumiu a entrega do pedido.",
                    json!({ "orderId": order.id, "trackingNumber": accepted.tracking_number }),
                )
                .await?;
        }
        tx.commit().await?;

        tracing::info!("Remessa {} aceita pelo entregador {}.", accepted.id, delivery_person_id);
        Ok(accepted)
    }

    pub async fn list_my_shipments(&self, driver_user_id: Uuid) -> Result<Vec<Shipment>, AppError> {
        let Some(delivery_person_id) = self.profile_repo.find_delivery_profile_id(driver_user_id).await? else {
            return Ok(Vec::new());
        };
        self.shipment_repo.list_for_delivery_person(delivery_person_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::types::Json;

    fn shipment(status: ShipmentStatus, driver: Option<Uuid>) -> Shipment {
        let now = Utc::now();
        Shipment {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            delivery_person_id: driver,
            tracking_number: "DLGTEST".into(),
            otp_code: "482913".into(),
            status,
            current_location: None,
            events: Json(vec![]),
            pickup_time: None,
            delivered_time: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn payload(status: ShipmentStatus, otp: Option<&str>) -> UpdateShipmentStatusPayload {
        UpdateShipmentStatusPayload {
            status,
            location: None,
            note: Some("saiu para entrega".into()),
            otp: otp.map(str::to_string),
        }
    }

    #[test]
    fn assigned_driver_moves_shipment_forward() {
        let driver = Uuid::new_v4();
        let s = shipment(ShipmentStatus::Pending, Some(driver));
        let event = plan_status_update(&s, driver, &payload(ShipmentStatus::InTransit, None), Utc::now()).unwrap();
        assert_eq!(event.status, ShipmentStatus::InTransit);
        assert_eq!(event.note.as_deref(), Some("saiu para entrega"));
    }

    #[test]
    fn other_driver_is_forbidden() {
        let s = shipment(ShipmentStatus::Pending, Some(Uuid::new_v4()));
        let err = plan_status_update(&s, Uuid::new_v4(), &payload(ShipmentStatus::InTransit, None), Utc::now())
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn delivery_requires_matching_otp() {
        let driver = Uuid::new_v4();
        let s = shipment(ShipmentStatus::InTransit, Some(driver));

        assert!(matches!(
            plan_status_update(&s, driver, &payload(ShipmentStatus::Delivered, None), Utc::now()),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            plan_status_update(&s, driver, &payload(ShipmentStatus::Delivered, Some("000000")), Utc::now()),
            Err(AppError::BadRequest(_))
        ));
        assert!(plan_status_update(&s, driver, &payload(ShipmentStatus::Delivered, Some("482913")), Utc::now()).is_ok());
    }

    #[test]
    fn only_open_pending_shipments_are_acceptable() {
        assert!(check_acceptable(&shipment(ShipmentStatus::Pending, None)).is_ok());
        assert!(matches!(
            check_acceptable(&shipment(ShipmentStatus::Pending, Some(Uuid::new_v4()))),
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            check_acceptable(&shipment(ShipmentStatus::InTransit, None)),
            Err(AppError::Conflict(_))
        ));
    }

    #[test]
    fn terminal_shipments_reject_updates() {
        let driver = Uuid::new_v4();
        for status in [ShipmentStatus::Delivered, ShipmentStatus::Failed] {
            let s = shipment(status, Some(driver));
            let err = plan_status_update(&s, driver, &payload(ShipmentStatus::InTransit, None), Utc::now())
                .unwrap_err();
            assert!(matches!(err, AppError::InvalidStateTransition { .. }));
        }
    }

    #[test]
    fn pending_cannot_skip_to_delivered() {
        let driver = Uuid::new_v4();
        let s = shipment(ShipmentStatus::Pending, Some(driver));
        assert!(matches!(
            plan_status_update(&s, driver, &payload(ShipmentStatus::Delivered, Some("482913")), Utc::now()),
            Err(AppError::InvalidStateTransition { .. })
        ));
    }
}
