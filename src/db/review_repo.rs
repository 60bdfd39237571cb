// src/db/review_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{common::error::AppError, models::reviews::Review};

#[derive(Clone)]
pub struct ReviewRepository {
    pool: PgPool,
}

impl ReviewRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_user_and_product(&self, user_id: Uuid, product_id: Uuid) -> Result<Option<Review>, AppError> {
        let review = sqlx::query_as::<_, Review>(
            "SELECT * FROM reviews WHERE user_id = $1 AND product_id = $2",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(review)
    }

    pub async fn insert(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        rating: i16,
        comment: Option<&str>,
    ) -> Result<Review, AppError> {
        // O índice único (user_id, product_id) cobre a corrida entre a busca e o insert.
        sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (user_id, product_id, rating, comment)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(product_id)
        .bind(rating)
        .bind(comment)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "Você já avaliou este produto."))
    }

    pub async fn list_for_product(&self, product_id: Uuid) -> Result<Vec<Review>, AppError> {
        let reviews = sqlx::query_as::<_, Review>(
            "SELECT * FROM reviews WHERE product_id = $1 ORDER BY created_at DESC",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(reviews)
    }
}
