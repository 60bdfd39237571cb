// src/services/cart_service.rs

use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::{CartRepository, ProductRepository},
    models::{
        cart::{apply_cart_item, CartItem, SetCartItemPayload},
        catalog::ProductStatus,
    },
};

#[derive(Clone)]
pub struct CartService {
    cart_repo: CartRepository,
    product_repo: ProductRepository,
    pool: PgPool,
}

impl CartService {
    pub fn new(cart_repo: CartRepository, product_repo: ProductRepository, pool: PgPool) -> Self {
        Self { cart_repo, product_repo, pool }
    }

    pub async fn get_cart(&self, user_id: Uuid) -> Result<Vec<CartItem>, AppError> {
        Ok(self
            .cart_repo
            .find_by_user(user_id)
            .await?
            .map(|cart| cart.items.0)
            .unwrap_or_default())
    }

    pub async fn set_cart_item(&self, user_id: Uuid, payload: SetCartItemPayload) -> Result<Vec<CartItem>, AppError> {
        payload.validate()?;

        if payload.quantity > 0 {
            let product = self
                .product_repo
                .find_by_id(payload.product_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Produto {}", payload.product_id)))?;
            if product.status != ProductStatus::Active {
                return Err(AppError::BadRequest("Este produto não está disponível.".into()));
            }
        }

        let mut tx = self.pool.begin().await?;

        let mut items = self
            .cart_repo
            .find_by_user_for_update(&mut *tx, user_id)
            .await?
            .map(|cart| cart.items.0)
            .unwrap_or_default();

        apply_cart_item(&mut items, payload.product_id, payload.quantity);

        let cart = self.cart_repo.save_items(&mut *tx, user_id, &items).await?;
        tx.commit().await?;

        Ok(cart.items.0)
    }

    pub async fn clear_cart(&self, user_id: Uuid) -> Result<(), AppError> {
        self.cart_repo.clear(&self.pool, user_id).await
    }
}
