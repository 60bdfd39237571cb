// src/db/product_repo.rs

use sqlx::{types::Json, Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::catalog::{
        AttributeMap, Category, CreateProductPayload, InventoryLog, Product, ProductStatus,
    },
};

#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Leitura
    // ---

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    pub async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<Product>, AppError> {
        let products = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    pub async fn list_active(&self) -> Result<Vec<Product>, AppError> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE status = 'active' ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    pub async fn list_for_seller(&self, seller_id: Uuid) -> Result<Vec<Product>, AppError> {
        let products = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE seller_id = $1 AND status <> 'deleted' ORDER BY created_at DESC",
        )
        .bind(seller_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(products)
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        let categories = sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(categories)
    }

    // ---
    // Escrita
    // ---

    pub async fn create_product<'e, E>(
        &self,
        executor: E,
        seller_id: Uuid,
        input: &CreateProductPayload,
        currency: &str,
    ) -> Result<Product, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (
                seller_id, category_id, sku, name, description, price, currency,
                discount, attributes, stock, low_stock_threshold
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(seller_id)
        .bind(input.category_id)
        .bind(&input.sku)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.price)
        .bind(currency)
        .bind(input.discount)
        .bind(Json(&input.attributes))
        .bind(input.stock)
        .bind(input.low_stock_threshold)
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "Já existe um produto com este SKU."))
    }

    /// Troca de status com compare-and-set sobre o status lido.
    pub async fn update_status(
        &self,
        id: Uuid,
        from: ProductStatus,
        to: ProductStatus,
    ) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>(
            "UPDATE products SET status = $3, updated_at = now() WHERE id = $1 AND status = $2 RETURNING *",
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await?;
        Ok(product)
    }

    pub async fn update_attributes(&self, id: Uuid, attributes: &AttributeMap) -> Result<Option<Product>, AppError> {
        let product = sqlx::query_as::<_, Product>(
            "UPDATE products SET attributes = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(Json(attributes))
        .fetch_optional(&self.pool)
        .await?;
        Ok(product)
    }

    /// Ajuste atômico de estoque: nunca deixa `stock` abaixo de `reserved`.
    /// Retorna `None` quando o ajuste violaria o invariante.
    pub async fn adjust_stock<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        delta: i32,
    ) -> Result<Option<Product>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let product = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
            SET stock = stock + $2, updated_at = now()
            WHERE id = $1 AND stock + $2 >= reserved AND stock + $2 >= 0
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(delta)
        .fetch_optional(executor)
        .await?;
        Ok(product)
    }

    pub async fn record_inventory_log<'e, E>(
        &self,
        executor: E,
        product_id: Uuid,
        operator_id: Uuid,
        quantity_changed: i32,
        reason: Option<&str>,
    ) -> Result<InventoryLog, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let log = sqlx::query_as::<_, InventoryLog>(
            r#"
            INSERT INTO inventory_logs (product_id, operator_id, quantity_changed, reason)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(product_id)
        .bind(operator_id)
        .bind(quantity_changed)
        .bind(reason)
        .fetch_one(executor)
        .await?;
        Ok(log)
    }

    pub async fn create_category(
        &self,
        name: &str,
        slug: &str,
        parent_id: Option<Uuid>,
    ) -> Result<Category, AppError> {
        sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name, slug, parent_id) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(name)
        .bind(slug)
        .bind(parent_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "Já existe uma categoria com este slug."))
    }

    /// Incrementa o contador de pedidos dos produtos vendidos.
    pub async fn bump_order_count<'e, E>(&self, executor: E, ids: &[Uuid]) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE products SET order_count = order_count + 1 WHERE id = ANY($1)")
            .bind(ids)
            .execute(executor)
            .await?;
        Ok(())
    }
}
