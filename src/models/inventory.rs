// src/models/inventory.rs

use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};
use uuid::Uuid;

use crate::common::error::AppError;

// --- Linha de reserva ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockLine {
    pub product_id: Uuid,
    pub quantity: i32,
}

// --- Estado do livro de reservas (um registro por pedido) ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "reservation_state", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReservationState {
    Held,
    Committed,
    Released,
}

impl ReservationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationState::Held => "held",
            ReservationState::Committed => "committed",
            ReservationState::Released => "released",
        }
    }

    /// Decide o resultado de liquidar (commit/release) uma reserva no estado atual.
    /// `target` é Committed ou Released.
    pub fn settle(self, target: ReservationState) -> Result<ReservationOutcome, AppError> {
        match (self, target) {
            (ReservationState::Held, ReservationState::Committed | ReservationState::Released) => {
                Ok(ReservationOutcome::Applied)
            }
            (current, target) if current == target => Ok(ReservationOutcome::AlreadyApplied),
            (current, target) => Err(AppError::invalid_transition("reservation", current, target)),
        }
    }
}

impl fmt::Display for ReservationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resultado idempotente: repetir a mesma operação nunca conta duas vezes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationOutcome {
    Applied,
    AlreadyApplied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockLevel {
    pub stock: i32,
    pub reserved: i32,
}

impl StockLevel {
    pub fn available(&self) -> i32 {
        self.stock - self.reserved
    }

    pub fn can_reserve(&self, quantity: i32) -> bool {
        self.available() >= quantity
    }

    pub fn reserve(&mut self, quantity: i32) {
        self.reserved += quantity;
    }

    /// Efetiva a reserva: sai do estoque e da reserva juntos.
    pub fn commit(&mut self, quantity: i32) {
        self.stock -= quantity;
        self.reserved -= quantity;
    }

    /// Desfaz a reserva sem tocar no estoque.
    pub fn release(&mut self, quantity: i32) {
        self.reserved -= quantity;
    }
}

/// Junta linhas repetidas do mesmo produto e ordena por id.
/// A ordem fixa evita deadlock entre reservas concorrentes no banco.
pub fn normalize_lines(lines: &[StockLine]) -> Result<Vec<StockLine>, AppError> {
    if lines.is_empty() {
        return Err(AppError::BadRequest("O pedido não possui itens.".into()));
    }

    let mut merged: BTreeMap<Uuid, i32> = BTreeMap::new();
    for line in lines {
        if line.quantity < 1 {
            return Err(AppError::BadRequest(format!(
                "Quantidade inválida para o produto {}.",
                line.product_id
            )));
        }
        let entry = merged.entry(line.product_id).or_insert(0);
        *entry = entry
            .checked_add(line.quantity)
            .ok_or_else(|| AppError::BadRequest("Quantidade excessiva.".into()))?;
    }

    Ok(merged
        .into_iter()
        .map(|(product_id, quantity)| StockLine { product_id, quantity })
        .collect())
}
