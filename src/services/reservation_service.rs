// src/services/reservation_service.rs

use std::sync::Arc;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::StockLedger,
    models::inventory::{ReservationOutcome, StockLevel, StockLine},
};

// Fachada sobre o livro de reservas. O checkout reserva vários pedidos de uma vez;
// o pagamento efetiva ou libera a reserva de um pedido.
#[derive(Clone)]
pub struct ReservationService {
    ledger: Arc<dyn StockLedger>,
}

impl ReservationService {
    pub fn new(ledger: Arc<dyn StockLedger>) -> Self {
        Self { ledger }
    }

    pub async fn reserve(&self, order_id: Uuid, lines: &[StockLine]) -> Result<ReservationOutcome, AppError> {
        self.ledger.reserve(order_id, lines).await
    }

    /// Reserva todos os pedidos ou nenhum. Se um pedido falhar, as reservas
    /// feitas antes dele nesta chamada são liberadas e o erro original é devolvido.
    pub async fn reserve_all(&self, orders: &[(Uuid, Vec<StockLine>)]) -> Result<(), AppError> {
        for (index, (order_id, lines)) in orders.iter().enumerate() {
            if let Err(err) = self.ledger.reserve(*order_id, lines).await {
                tracing::warn!("Reserva do pedido {} falhou: {}. Desfazendo {} reserva(s).", order_id, err, index);
                for (done_id, _) in &orders[..index] {
                    self.release_quietly(*done_id).await;
                }
                return Err(err);
            }
        }
        Ok(())
    }

    pub async fn commit(&self, order_id: Uuid) -> Result<ReservationOutcome, AppError> {
        let outcome = self.ledger.commit(order_id).await?;
        if outcome == ReservationOutcome::AlreadyApplied {
            tracing::debug!("Reserva do pedido {} já estava efetivada.", order_id);
        }
        Ok(outcome)
    }

    pub async fn release(&self, order_id: Uuid) -> Result<ReservationOutcome, AppError> {
        let outcome = self.ledger.release(order_id).await?;
        if outcome == ReservationOutcome::AlreadyApplied {
            tracing::debug!("Reserva do pedido {} já estava liberada.", order_id);
        }
        Ok(outcome)
    }

    /// Liberação de compensação: falhas são só registradas, o erro que importa é o do chamador.
    pub async fn release_quietly(&self, order_id: Uuid) {
        if let Err(e) = self.ledger.release(order_id).await {
            tracing::error!("Falha ao liberar a reserva do pedido {}: {}", order_id, e);
        }
    }

    pub async fn stock_level(&self, product_id: Uuid) -> Result<Option<StockLevel>, AppError> {
        self.ledger.stock_level(product_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_ledger::MemoryStockLedger;
    use crate::models::inventory::ReservationState;

    fn service_with(products: &[(Uuid, i32)]) -> (ReservationService, Arc<MemoryStockLedger>) {
        let ledger = Arc::new(MemoryStockLedger::with_products(products));
        (ReservationService::new(ledger.clone()), ledger)
    }

    fn line(product_id: Uuid, quantity: i32) -> StockLine {
        StockLine { product_id, quantity }
    }

    async fn level(service: &ReservationService, product_id: Uuid) -> StockLevel {
        service.stock_level(product_id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn reserve_and_release_restores_availability() {
        let p = Uuid::new_v4();
        let order = Uuid::new_v4();
        let (service, _) = service_with(&[(p, 5)]);

        service.reserve(order, &[line(p, 5)]).await.unwrap();
        assert_eq!(level(&service, p).await, StockLevel { stock: 5, reserved: 5 });

        service.release(order).await.unwrap();
        assert_eq!(level(&service, p).await, StockLevel { stock: 5, reserved: 0 });
    }

    #[tokio::test]
    async fn over_reservation_fails_without_side_effects() {
        let p = Uuid::new_v4();
        let (service, ledger) = service_with(&[(p, 5)]);
        let order = Uuid::new_v4();

        let err = service.reserve(order, &[line(p, 6)]).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::InsufficientStock { requested: 6, available: 5, .. }
        ));
        assert_eq!(level(&service, p).await.reserved, 0);
        assert_eq!(ledger.reservation_state(order), None);
    }

    #[tokio::test]
    async fn multi_line_reservation_is_all_or_nothing() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let (service, _) = service_with(&[(a, 10), (b, 1)]);

        let result = service.reserve(Uuid::new_v4(), &[line(a, 3), line(b, 2)]).await;
        assert!(result.is_err());
        assert_eq!(level(&service, a).await.reserved, 0);
        assert_eq!(level(&service, b).await.reserved, 0);
    }

    #[tokio::test]
    async fn commit_takes_stock_and_reservation_together() {
        let p = Uuid::new_v4();
        let order = Uuid::new_v4();
        let (service, ledger) = service_with(&[(p, 5)]);

        service.reserve(order, &[line(p, 3)]).await.unwrap();
        assert_eq!(service.commit(order).await.unwrap(), ReservationOutcome::Applied);
        assert_eq!(level(&service, p).await, StockLevel { stock: 2, reserved: 0 });
        assert_eq!(ledger.reservation_state(order), Some(ReservationState::Committed));
    }

    #[tokio::test]
    async fn retries_never_double_count() {
        let p = Uuid::new_v4();
        let order = Uuid::new_v4();
        let (service, _) = service_with(&[(p, 5)]);

        service.reserve(order, &[line(p, 2)]).await.unwrap();
        assert_eq!(
            service.reserve(order, &[line(p, 2)]).await.unwrap(),
            ReservationOutcome::AlreadyApplied
        );
        assert_eq!(level(&service, p).await.reserved, 2);

        service.commit(order).await.unwrap();
        assert_eq!(service.commit(order).await.unwrap(), ReservationOutcome::AlreadyApplied);
        assert_eq!(level(&service, p).await, StockLevel { stock: 3, reserved: 0 });

        // Depois de efetivada, a reserva não pode mais ser liberada.
        assert!(matches!(
            service.release(order).await,
            Err(AppError::InvalidStateTransition { .. })
        ));
    }

    #[tokio::test]
    async fn failed_order_in_batch_releases_earlier_ones() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let (service, ledger) = service_with(&[(a, 4), (b, 1)]);
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        let batch = vec![(first, vec![line(a, 4)]), (second, vec![line(b, 2)])];
        let err = service.reserve_all(&batch).await.unwrap_err();

        assert!(matches!(err, AppError::InsufficientStock { .. }));
        assert_eq!(level(&service, a).await.reserved, 0);
        assert_eq!(ledger.reservation_state(first), Some(ReservationState::Released));
        assert_eq!(ledger.reservation_state(second), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_reservations_of_last_unit_admit_exactly_one() {
        let p = Uuid::new_v4();
        let (service, _) = service_with(&[(p, 1)]);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service.reserve(Uuid::new_v4(), &[StockLine { product_id: p, quantity: 1 }]).await
            }));
        }

        let mut ok = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(AppError::InsufficientStock { .. }) => {}
                Err(other) => panic!("erro inesperado: {other}"),
            }
        }

        assert_eq!(ok, 1);
        assert_eq!(level(&service, p).await, StockLevel { stock: 1, reserved: 1 });
    }
}
