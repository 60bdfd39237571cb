// src/models/catalog.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use std::{collections::BTreeMap, fmt};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::auth::Role;

// --- Atributos flexíveis ---
// Conjunto fechado de valores escalares. Nada de JSON arbitrário nos invariantes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

pub type AttributeMap = BTreeMap<String, AttributeValue>;

pub const MAX_ATTRIBUTES: usize = 50;
pub const MAX_ATTRIBUTE_KEY_LEN: usize = 64;
pub const MAX_ATTRIBUTE_TEXT_LEN: usize = 512;

pub fn validate_attributes(attrs: &AttributeMap) -> Result<(), ValidationError> {
    if attrs.len() > MAX_ATTRIBUTES {
        let mut err = ValidationError::new("too_many_attributes");
        err.message = Some(format!("No máximo {} atributos.", MAX_ATTRIBUTES).into());
        return Err(err);
    }

    for (key, value) in attrs {
        let key_len = key.trim().chars().count();
        if key_len == 0 || key_len > MAX_ATTRIBUTE_KEY_LEN {
            let mut err = ValidationError::new("attribute_key");
            err.message = Some("Chave de atributo deve ter entre 1 e 64 caracteres.".into());
            return Err(err);
        }
        match value {
            AttributeValue::Number(n) if !n.is_finite() => {
                let mut err = ValidationError::new("attribute_number");
                err.message = Some(format!("Atributo '{}' não é um número finito.", key).into());
                return Err(err);
            }
            AttributeValue::Text(s) if s.chars().count() > MAX_ATTRIBUTE_TEXT_LEN => {
                let mut err = ValidationError::new("attribute_text");
                err.message = Some(format!("Atributo '{}' excede 512 caracteres.", key).into());
                return Err(err);
            }
            _ => {}
        }
    }
    Ok(())
}

// --- Status do Produto ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "product_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Active,
    Draft,
    Banned,
    Deleted,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Active => "active",
            ProductStatus::Draft => "draft",
            ProductStatus::Banned => "banned",
            ProductStatus::Deleted => "deleted",
        }
    }

    /// Transições iniciadas pelo vendedor dono do produto.
    pub fn seller_can_transition(self, to: ProductStatus) -> bool {
        use ProductStatus::*;
        matches!(
            (self, to),
            (Draft, Active) | (Active, Draft) | (Draft, Deleted) | (Active, Deleted)
        )
    }

    /// O admin pode tudo que o vendedor pode, mais banir e desbanir.
    pub fn admin_can_transition(self, to: ProductStatus) -> bool {
        use ProductStatus::*;
        self.seller_can_transition(to)
            || matches!(
                (self, to),
                (Active, Banned) | (Draft, Banned) | (Banned, Draft) | (Banned, Active)
            )
    }

    pub fn can_transition(self, to: ProductStatus, actor: Role) -> bool {
        match actor {
            Role::Admin => self.admin_can_transition(to),
            Role::Seller => self.seller_can_transition(to),
            _ => false,
        }
    }
}

impl fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub category_id: Option<Uuid>,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub currency: String,
    pub discount: Decimal, // percentual (0..=100)
    pub attributes: Json<AttributeMap>,
    pub stock: i32,
    pub reserved: i32,
    pub low_stock_threshold: i32,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn available(&self) -> i32 {
        self.stock - self.reserved
    }

    /// Preço unitário após o desconto percentual.
    pub fn effective_price(&self) -> Decimal {
        self.price - (self.price * self.discount / Decimal::ONE_HUNDRED)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct InventoryLog {
    pub id: Uuid,
    pub product_id: Uuid,
    pub operator_id: Uuid,
    pub quantity_changed: i32,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() {
        let mut err = ValidationError::new("range");
        err.message = Some("O valor não pode ser negativo.".into());
        return Err(err);
    }
    Ok(())
}

fn validate_discount(val: &Decimal) -> Result<(), ValidationError> {
    validate_not_negative(val)?;
    if *val > Decimal::ONE_HUNDRED {
        let mut err = ValidationError::new("range");
        err.message = Some("O desconto é um percentual entre 0 e 100.".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductPayload {
    #[validate(length(min = 1, max = 64, message = "O SKU é obrigatório."))]
    pub sku: String,

    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,

    pub description: Option<String>,
    pub category_id: Option<Uuid>,

    #[validate(custom(function = "validate_not_negative"))]
    pub price: Decimal,

    #[validate(custom(function = "validate_discount"))]
    #[serde(default)]
    pub discount: Decimal,

    #[validate(range(min = 0, message = "O estoque inicial não pode ser negativo."))]
    #[serde(default)]
    pub stock: i32,

    #[validate(range(min = 0))]
    #[serde(default = "default_low_stock_threshold")]
    pub low_stock_threshold: i32,

    #[validate(custom(function = "validate_attributes"))]
    #[serde(default)]
    pub attributes: AttributeMap,
}

fn default_low_stock_threshold() -> i32 {
    10
}

#[derive(Debug, Deserialize)]
pub struct ChangeProductStatusPayload {
    pub status: ProductStatus,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AdjustStockPayload {
    #[validate(range(min = -1_000_000, max = 1_000_000))]
    pub delta: i32,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAttributesPayload {
    #[validate(custom(function = "validate_attributes"))]
    pub attributes: AttributeMap,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCategoryPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,
    #[validate(length(min = 1, max = 80, message = "O slug é obrigatório."))]
    pub slug: String,
    pub parent_id: Option<Uuid>,
}

// Modelo de leitura para o serviço de busca externo
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSnapshot {
    pub products: Vec<Product>,
    pub categories: Vec<Category>,
}
