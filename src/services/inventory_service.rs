// src/services/inventory_service.rs

use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::ProductRepository,
    models::{
        auth::{Role, RoleView},
        catalog::{
            AttributeMap, CatalogSnapshot, Category, CreateCategoryPayload, CreateProductPayload,
            InventoryLog, Product, ProductStatus,
        },
    },
};

/// Quem está agindo sobre um produto.
#[derive(Debug, Clone, Copy)]
pub struct CatalogActor {
    pub user_id: Uuid,
    pub view: RoleView,
}

impl CatalogActor {
    /// Admin age como admin; vendedor só sobre os próprios produtos.
    pub fn acting_role(&self, product: &Product) -> Result<Role, AppError> {
        if self.view.is_admin() {
            return Ok(Role::Admin);
        }
        if self.view.satisfies(Role::Seller) && product.seller_id == self.user_id {
            return Ok(Role::Seller);
        }
        Err(AppError::Forbidden("Você não pode alterar este produto.".into()))
    }
}

/// Valida a troca de status de um produto para o ator informado.
pub fn authorize_status_change(
    actor: &CatalogActor,
    product: &Product,
    to: ProductStatus,
) -> Result<(), AppError> {
    let role = actor.acting_role(product)?;
    if !product.status.can_transition(to, role) {
        return Err(AppError::invalid_transition("product", product.status, to));
    }
    Ok(())
}

#[derive(Clone)]
pub struct InventoryService {
    product_repo: ProductRepository,
    currency: String,
    pool: PgPool,
}

impl InventoryService {
    pub fn new(product_repo: ProductRepository, currency: String, pool: PgPool) -> Self {
        Self { product_repo, currency, pool }
    }

    async fn load(&self, product_id: Uuid) -> Result<Product, AppError> {
        self.product_repo
            .find_by_id(product_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Produto {}", product_id)))
    }

    // --- CREATE PRODUCT ---
    pub async fn create_product(&self, seller_id: Uuid, input: CreateProductPayload) -> Result<Product, AppError> {
        input.validate()?;

        let mut tx = self.pool.begin().await?;

        let product = self
            .product_repo
            .create_product(&mut *tx, seller_id, &input, &self.currency)
            .await?;

        // Estoque inicial também entra no histórico
        if input.stock > 0 {
            self.product_repo
                .record_inventory_log(&mut *tx, product.id, seller_id, input.stock, Some("estoque inicial"))
                .await?;
        }

        tx.commit().await?;

        tracing::info!("Produto {} ({}) criado pelo vendedor {}.", product.id, product.sku, seller_id);
        Ok(product)
    }

    pub async fn change_product_status(
        &self,
        actor: CatalogActor,
        product_id: Uuid,
        to: ProductStatus,
    ) -> Result<Product, AppError> {
        let product = self.load(product_id).await?;
        authorize_status_change(&actor, &product, to)?;

        // Compare-and-set: se outro ator mudou o status no meio, reavalia com o valor novo.
        match self.product_repo.update_status(product.id, product.status, to).await? {
            Some(updated) => {
                tracing::info!(
                    "Produto {}: {} -> {} por {}.",
                    updated.id,
                    product.status,
                    to,
                    actor.user_id
                );
                Ok(updated)
            }
            None => {
                let current = self.load(product_id).await?;
                Err(AppError::invalid_transition("product", current.status, to))
            }
        }
    }

    /// Ajuste manual de estoque. Nunca deixa o estoque abaixo do reservado.
    pub async fn adjust_stock(
        &self,
        actor: CatalogActor,
        product_id: Uuid,
        delta: i32,
        reason: Option<&str>,
    ) -> Result<(Product, InventoryLog), AppError> {
        let product = self.load(product_id).await?;
        actor.acting_role(&product)?;

        if delta == 0 {
            return Err(AppError::BadRequest("O ajuste de estoque não pode ser zero.".into()));
        }

        let mut tx = self.pool.begin().await?;

        let updated = match self.product_repo.adjust_stock(&mut *tx, product.id, delta).await? {
            Some(p) => p,
            None => {
                let current = self.load(product_id).await?;
                return Err(AppError::InsufficientStock {
                    product_id,
                    requested: delta.saturating_abs(),
                    available: current.available(),
                });
            }
        };

        let log = self
            .product_repo
            .record_inventory_log(&mut *tx, product.id, actor.user_id, delta, reason)
            .await?;

        tx.commit().await?;

        if updated.available() <= updated.low_stock_threshold {
            tracing::warn!(
                "Produto {} com estoque baixo: {} disponível(is).",
                updated.id,
                updated.available()
            );
        }

        Ok((updated, log))
    }

    pub async fn update_attributes(
        &self,
        actor: CatalogActor,
        product_id: Uuid,
        attributes: &AttributeMap,
    ) -> Result<Product, AppError> {
        let product = self.load(product_id).await?;
        actor.acting_role(&product)?;

        self.product_repo
            .update_attributes(product.id, attributes)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Produto {}", product_id)))
    }

    pub async fn get_product(&self, product_id: Uuid) -> Result<Product, AppError> {
        self.load(product_id).await
    }

    pub async fn list_catalog(&self) -> Result<CatalogSnapshot, AppError> {
        let products = self.product_repo.list_active().await?;
        let categories = self.product_repo.list_categories().await?;
        Ok(CatalogSnapshot { products, categories })
    }

    pub async fn list_seller_products(&self, seller_id: Uuid) -> Result<Vec<Product>, AppError> {
        self.product_repo.list_for_seller(seller_id).await
    }

    pub async fn create_category(&self, payload: CreateCategoryPayload) -> Result<Category, AppError> {
        payload.validate()?;
        self.product_repo
            .create_category(&payload.name, &payload.slug, payload.parent_id)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use sqlx::types::Json;

    fn product(seller_id: Uuid, status: ProductStatus) -> Product {
        let now = Utc::now();
        Product {
            id: Uuid::new_v4(),
            seller_id,
            category_id: None,
            sku: "SKU-1".into(),
            name: "Caneca".into(),
            description: None,
            price: Decimal::new(100, 0),
            currency: "INR".into(),
            discount: Decimal::ZERO,
            attributes: Json(AttributeMap::new()),
            stock: 5,
            reserved: 0,
            low_stock_threshold: 10,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    fn actor(user_id: Uuid, role: Role, original: Option<Role>) -> CatalogActor {
        CatalogActor { user_id, view: RoleView::new(role, original) }
    }

    #[test]
    fn owner_publishes_draft() {
        let seller = Uuid::new_v4();
        let p = product(seller, ProductStatus::Draft);
        assert!(authorize_status_change(&actor(seller, Role::Seller, None), &p, ProductStatus::Active).is_ok());
    }

    #[test]
    fn other_seller_is_forbidden() {
        let p = product(Uuid::new_v4(), ProductStatus::Draft);
        let err = authorize_status_change(&actor(Uuid::new_v4(), Role::Seller, None), &p, ProductStatus::Active)
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn only_admin_bans() {
        let seller = Uuid::new_v4();
        let p = product(seller, ProductStatus::Active);

        let err = authorize_status_change(&actor(seller, Role::Seller, None), &p, ProductStatus::Banned).unwrap_err();
        assert!(matches!(err, AppError::InvalidStateTransition { .. }));

        // Admin simulando vendedor continua com poderes de admin.
        let simulating = actor(Uuid::new_v4(), Role::Seller, Some(Role::Admin));
        assert!(authorize_status_change(&simulating, &p, ProductStatus::Banned).is_ok());
    }

    #[test]
    fn deleted_is_terminal() {
        let p = product(Uuid::new_v4(), ProductStatus::Deleted);
        let admin = actor(Uuid::new_v4(), Role::Admin, None);
        for to in [ProductStatus::Active, ProductStatus::Draft, ProductStatus::Banned] {
            assert!(authorize_status_change(&admin, &p, to).is_err());
        }
    }

    #[test]
    fn customers_cannot_touch_products() {
        let user = Uuid::new_v4();
        let p = product(user, ProductStatus::Draft);
        assert!(matches!(
            actor(user, Role::Customer, None).acting_role(&p),
            Err(AppError::Forbidden(_))
        ));
    }
}
