// src/db/stock_ledger.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        catalog::ProductStatus,
        inventory::{normalize_lines, ReservationOutcome, ReservationState, StockLevel, StockLine},
    },
};

/// Livro de reservas de estoque.
///
/// Cada pedido tem no máximo uma reserva (`held`), que termina exatamente uma vez
/// em `committed` (pagamento concluído) ou `released` (pagamento falhou/expirou).
/// Repetir uma operação já aplicada devolve `AlreadyApplied` sem mexer nos saldos.
#[async_trait]
pub trait StockLedger: Send + Sync {
    /// Reserva todas as linhas ou nenhuma. Falha com `InsufficientStock` sem reserva parcial.
    async fn reserve(&self, order_id: Uuid, lines: &[StockLine]) -> Result<ReservationOutcome, AppError>;

    async fn commit(&self, order_id: Uuid) -> Result<ReservationOutcome, AppError>;

    async fn release(&self, order_id: Uuid) -> Result<ReservationOutcome, AppError>;

    async fn stock_level(&self, product_id: Uuid) -> Result<Option<StockLevel>, AppError>;
}

// Implementação Postgres: cada linha é um UPDATE condicional (nunca lê-depois-escreve).
#[derive(Clone)]
pub struct PgStockLedger {
    pool: PgPool,
}

impl PgStockLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn settle(&self, order_id: Uuid, target: ReservationState) -> Result<ReservationOutcome, AppError> {
        let mut tx = self.pool.begin().await?;

        // FOR UPDATE serializa commit/release concorrentes da mesma reserva
        let current: Option<ReservationState> = sqlx::query_scalar(
            "SELECT state FROM stock_reservations WHERE order_id = $1 FOR UPDATE",
        )
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?;

        let current = current.ok_or_else(|| AppError::NotFound(format!("Reserva do pedido {}", order_id)))?;

        if current.settle(target)? == ReservationOutcome::AlreadyApplied {
            return Ok(ReservationOutcome::AlreadyApplied);
        }

        let lines: Vec<(Uuid, i32)> = sqlx::query_as(
            "SELECT product_id, quantity FROM stock_reservation_lines WHERE order_id = $1 ORDER BY product_id",
        )
        .bind(order_id)
        .fetch_all(&mut *tx)
        .await?;

        let sql = match target {
            ReservationState::Committed => {
                r#"
                UPDATE products
                SET stock = stock - $2, reserved = reserved - $2, updated_at = now()
                WHERE id = $1 AND reserved >= $2 AND stock >= $2
                "#
            }
            _ => {
                r#"
                UPDATE products
                SET reserved = reserved - $2, updated_at = now()
                WHERE id = $1 AND reserved >= $2
                "#
            }
        };

        for (product_id, quantity) in lines {
            let updated = sqlx::query(sql)
                .bind(product_id)
                .bind(quantity)
                .execute(&mut *tx)
                .await?;

            if updated.rows_affected() == 0 {
                // Saldo reservado menor que a reserva registrada: estado corrompido.
                return Err(anyhow::anyhow!(
                    "Reserva inconsistente para o produto {} no pedido {}",
                    product_id,
                    order_id
                )
                .into());
            }
        }

        sqlx::query("UPDATE stock_reservations SET state = $2, settled_at = now() WHERE order_id = $1")
            .bind(order_id)
            .bind(target)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(ReservationOutcome::Applied)
    }
}

#[async_trait]
impl StockLedger for PgStockLedger {
    async fn reserve(&self, order_id: Uuid, lines: &[StockLine]) -> Result<ReservationOutcome, AppError> {
        let lines = normalize_lines(lines)?;
        let mut tx = self.pool.begin().await?;

        // A reserva é chaveada pelo pedido: uma repetição não reserva de novo.
        let inserted = sqlx::query(
            "INSERT INTO stock_reservations (order_id, state) VALUES ($1, 'held') ON CONFLICT (order_id) DO NOTHING",
        )
        .bind(order_id)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            return Ok(ReservationOutcome::AlreadyApplied);
        }

        for line in &lines {
            let updated = sqlx::query(
                r#"
                UPDATE products
                SET reserved = reserved + $2, updated_at = now()
                WHERE id = $1 AND status = 'active' AND stock - reserved >= $2
                "#,
            )
            .bind(line.product_id)
            .bind(line.quantity)
            .execute(&mut *tx)
            .await?;

            if updated.rows_affected() == 0 {
                // Nada foi reservado: o rollback do `tx` desfaz as linhas anteriores.
                let current: Option<(i32, i32, ProductStatus)> =
                    sqlx::query_as("SELECT stock, reserved, status FROM products WHERE id = $1")
                        .bind(line.product_id)
                        .fetch_optional(&mut *tx)
                        .await?;

                return Err(match current {
                    None => AppError::NotFound(format!("Produto {}", line.product_id)),
                    Some((_, _, status)) if status != ProductStatus::Active => {
                        AppError::BadRequest(format!("O produto {} não está à venda.", line.product_id))
                    }
                    Some((stock, reserved, _)) => AppError::InsufficientStock {
                        product_id: line.product_id,
                        requested: line.quantity,
                        available: stock - reserved,
                    },
                });
            }

            sqlx::query(
                "INSERT INTO stock_reservation_lines (order_id, product_id, quantity) VALUES ($1, $2, $3)",
            )
            .bind(order_id)
            .bind(line.product_id)
            .bind(line.quantity)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(ReservationOutcome::Applied)
    }

    async fn commit(&self, order_id: Uuid) -> Result<ReservationOutcome, AppError> {
        self.settle(order_id, ReservationState::Committed).await
    }

    async fn release(&self, order_id: Uuid) -> Result<ReservationOutcome, AppError> {
        self.settle(order_id, ReservationState::Released).await
    }

    async fn stock_level(&self, product_id: Uuid) -> Result<Option<StockLevel>, AppError> {
        let level: Option<(i32, i32)> = sqlx::query_as("SELECT stock, reserved FROM products WHERE id = $1")
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(level.map(|(stock, reserved)| StockLevel { stock, reserved }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::test_support::{seed_product, seed_user},
        models::auth::Role,
    };

    fn line(product_id: Uuid, quantity: i32) -> StockLine {
        StockLine { product_id, quantity }
    }

    async fn level(ledger: &PgStockLedger, product_id: Uuid) -> StockLevel {
        ledger.stock_level(product_id).await.unwrap().unwrap()
    }

    #[sqlx::test]
    async fn concurrent_reservations_of_last_unit_admit_exactly_one(pool: PgPool) {
        let seller = seed_user(&pool, Role::Seller).await;
        let product = seed_product(&pool, seller, 1).await;
        let ledger = PgStockLedger::new(pool.clone());

        let (lines_a, lines_b) = ([line(product, 1)], [line(product, 1)]);
        let (first, second) = tokio::join!(
            ledger.reserve(Uuid::new_v4(), &lines_a),
            ledger.reserve(Uuid::new_v4(), &lines_b),
        );

        let mut applied = 0;
        for result in [first, second] {
            match result {
                Ok(ReservationOutcome::Applied) => applied += 1,
                Err(AppError::InsufficientStock { available: 0, .. }) => {}
                other => panic!("resultado inesperado: {:?}", other),
            }
        }
        assert_eq!(applied, 1);
        assert_eq!(level(&ledger, product).await, StockLevel { stock: 1, reserved: 1 });
    }

    #[sqlx::test]
    async fn failing_line_rolls_back_the_whole_reservation(pool: PgPool) {
        let seller = seed_user(&pool, Role::Seller).await;
        let plenty = seed_product(&pool, seller, 5).await;
        let scarce = seed_product(&pool, seller, 1).await;
        let ledger = PgStockLedger::new(pool.clone());
        let order = Uuid::new_v4();

        let err = ledger.reserve(order, &[line(plenty, 2), line(scarce, 3)]).await.unwrap_err();
        assert!(matches!(err, AppError::InsufficientStock { requested: 3, available: 1, .. }));

        assert_eq!(level(&ledger, plenty).await, StockLevel { stock: 5, reserved: 0 });
        assert_eq!(level(&ledger, scarce).await, StockLevel { stock: 1, reserved: 0 });
        let rows: i64 = sqlx::query_scalar("SELECT count(*) FROM stock_reservations WHERE order_id = $1")
            .bind(order)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(rows, 0);

        // Nada ficou registrado: o mesmo pedido pode reservar de novo
        assert_eq!(
            ledger.reserve(order, &[line(plenty, 2), line(scarce, 1)]).await.unwrap(),
            ReservationOutcome::Applied
        );
        assert_eq!(level(&ledger, plenty).await, StockLevel { stock: 5, reserved: 2 });
    }

    #[sqlx::test]
    async fn commit_and_release_apply_once(pool: PgPool) {
        let seller = seed_user(&pool, Role::Seller).await;
        let product = seed_product(&pool, seller, 5).await;
        let ledger = PgStockLedger::new(pool.clone());

        let paid = Uuid::new_v4();
        assert_eq!(ledger.reserve(paid, &[line(product, 2)]).await.unwrap(), ReservationOutcome::Applied);
        assert_eq!(
            ledger.reserve(paid, &[line(product, 2)]).await.unwrap(),
            ReservationOutcome::AlreadyApplied
        );
        assert_eq!(level(&ledger, product).await, StockLevel { stock: 5, reserved: 2 });

        assert_eq!(ledger.commit(paid).await.unwrap(), ReservationOutcome::Applied);
        assert_eq!(ledger.commit(paid).await.unwrap(), ReservationOutcome::AlreadyApplied);
        assert_eq!(level(&ledger, product).await, StockLevel { stock: 3, reserved: 0 });
        assert!(matches!(
            ledger.release(paid).await,
            Err(AppError::InvalidStateTransition { entity: "reservation", .. })
        ));

        let abandoned = Uuid::new_v4();
        ledger.reserve(abandoned, &[line(product, 1)]).await.unwrap();
        assert_eq!(ledger.release(abandoned).await.unwrap(), ReservationOutcome::Applied);
        assert_eq!(ledger.release(abandoned).await.unwrap(), ReservationOutcome::AlreadyApplied);
        assert_eq!(level(&ledger, product).await, StockLevel { stock: 3, reserved: 0 });

        assert!(matches!(ledger.commit(Uuid::new_v4()).await, Err(AppError::NotFound(_))));
    }
}
