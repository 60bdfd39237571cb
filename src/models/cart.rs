// src/models/cart.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Json<Vec<CartItem>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SetCartItemPayload {
    pub product_id: Uuid,
    #[validate(range(min = 0, max = 10_000, message = "A quantidade não pode ser negativa."))]
    pub quantity: i32,
}

/// Define a quantidade de um produto no carrinho. Quantidade 0 remove a linha.
pub fn apply_cart_item(items: &mut Vec<CartItem>, product_id: Uuid, quantity: i32) {
    if quantity <= 0 {
        items.retain(|item| item.product_id != product_id);
        return;
    }

    match items.iter_mut().find(|item| item.product_id == product_id) {
        Some(existing) => existing.quantity = quantity,
        None => items.push(CartItem { product_id, quantity }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_quantity_removes_line_and_positive_updates_in_place() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut items = vec![];

        apply_cart_item(&mut items, a, 2);
        apply_cart_item(&mut items, b, 1);
        apply_cart_item(&mut items, a, 5);
        assert_eq!(items, vec![CartItem { product_id: a, quantity: 5 }, CartItem { product_id: b, quantity: 1 }]);

        apply_cart_item(&mut items, a, 0);
        assert_eq!(items, vec![CartItem { product_id: b, quantity: 1 }]);
    }
}
