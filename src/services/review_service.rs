// src/services/review_service.rs

use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::{ProductRepository, ReviewRepository},
    models::reviews::{CreateReviewPayload, Review},
};

#[derive(Clone)]
pub struct ReviewService {
    review_repo: ReviewRepository,
    product_repo: ProductRepository,
}

impl ReviewService {
    pub fn new(review_repo: ReviewRepository, product_repo: ProductRepository) -> Self {
        Self { review_repo, product_repo }
    }

    /// Uma avaliação por (usuário, produto).
    pub async fn create_review(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        payload: CreateReviewPayload,
    ) -> Result<Review, AppError> {
        payload.validate()?;

        if self.product_repo.find_by_id(product_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Produto {}", product_id)));
        }

        if self
            .review_repo
            .find_by_user_and_product(user_id, product_id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict("Você já avaliou este produto.".into()));
        }

        self.review_repo
            .insert(user_id, product_id, payload.rating, payload.comment.as_deref())
            .await
    }

    pub async fn list_reviews(&self, product_id: Uuid) -> Result<Vec<Review>, AppError> {
        self.review_repo.list_for_product(product_id).await
    }
}
