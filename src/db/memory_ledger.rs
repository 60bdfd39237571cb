// src/db/memory_ledger.rs
//
// Livro de reservas em memória, usado nos testes dos serviços.
// Um único Mutex faz o papel do UPDATE condicional: checagem e escrita são atômicas.

use async_trait::async_trait;
use std::{collections::HashMap, sync::Mutex};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::stock_ledger::StockLedger,
    models::inventory::{normalize_lines, ReservationOutcome, ReservationState, StockLevel, StockLine},
};

#[derive(Default)]
struct LedgerState {
    products: HashMap<Uuid, StockLevel>,
    reservations: HashMap<Uuid, (ReservationState, Vec<StockLine>)>,
}

#[derive(Default)]
pub struct MemoryStockLedger {
    state: Mutex<LedgerState>,
}

impl MemoryStockLedger {
    pub fn with_products(products: &[(Uuid, i32)]) -> Self {
        let ledger = Self::default();
        {
            let mut state = ledger.state.lock().unwrap();
            for (id, stock) in products {
                state.products.insert(*id, StockLevel { stock: *stock, reserved: 0 });
            }
        }
        ledger
    }

    pub fn reservation_state(&self, order_id: Uuid) -> Option<ReservationState> {
        self.state.lock().unwrap().reservations.get(&order_id).map(|(s, _)| *s)
    }

    fn settle(&self, order_id: Uuid, target: ReservationState) -> Result<ReservationOutcome, AppError> {
        let mut state = self.state.lock().unwrap();
        let (current, lines) = state
            .reservations
            .get(&order_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Reserva do pedido {}", order_id)))?;

        if current.settle(target)? == ReservationOutcome::AlreadyApplied {
            return Ok(ReservationOutcome::AlreadyApplied);
        }

        for line in &lines {
            let level = state
                .products
                .get_mut(&line.product_id)
                .ok_or_else(|| AppError::NotFound(format!("Produto {}", line.product_id)))?;
            match target {
                ReservationState::Committed => level.commit(line.quantity),
                _ => level.release(line.quantity),
            }
        }

        if let Some(entry) = state.reservations.get_mut(&order_id) {
            entry.0 = target;
        }
        Ok(ReservationOutcome::Applied)
    }
}

#[async_trait]
impl StockLedger for MemoryStockLedger {
    async fn reserve(&self, order_id: Uuid, lines: &[StockLine]) -> Result<ReservationOutcome, AppError> {
        let lines = normalize_lines(lines)?;
        let mut state = self.state.lock().unwrap();

        if state.reservations.contains_key(&order_id) {
            return Ok(ReservationOutcome::AlreadyApplied);
        }

        // Checa tudo antes de escrever qualquer coisa
        for line in &lines {
            let level = state
                .products
                .get(&line.product_id)
                .ok_or_else(|| AppError::NotFound(format!("Produto {}", line.product_id)))?;
            if !level.can_reserve(line.quantity) {
                return Err(AppError::InsufficientStock {
                    product_id: line.product_id,
                    requested: line.quantity,
                    available: level.available(),
                });
            }
        }

        for line in &lines {
            if let Some(level) = state.products.get_mut(&line.product_id) {
                level.reserve(line.quantity);
            }
        }
        state.reservations.insert(order_id, (ReservationState::Held, lines));
        Ok(ReservationOutcome::Applied)
    }

    async fn commit(&self, order_id: Uuid) -> Result<ReservationOutcome, AppError> {
        self.settle(order_id, ReservationState::Committed)
    }

    async fn release(&self, order_id: Uuid) -> Result<ReservationOutcome, AppError> {
        self.settle(order_id, ReservationState::Released)
    }

    async fn stock_level(&self, product_id: Uuid) -> Result<Option<StockLevel>, AppError> {
        Ok(self.state.lock().unwrap().products.get(&product_id).copied())
    }
}
