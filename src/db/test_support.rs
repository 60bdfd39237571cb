// src/db/test_support.rs
//
// Linhas mínimas para os testes `#[sqlx::test]`, que rodam sobre um banco
// novo com as migrações aplicadas.

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::auth::Role;

pub async fn seed_user(pool: &PgPool, role: Role) -> Uuid {
    sqlx::query_scalar(
        r#"
        INSERT INTO users (email, password_hash, role, is_verified, has_profile)
        VALUES ($1, 'hash', $2, TRUE, TRUE)
        RETURNING id
        "#,
    )
    .bind(format!("{}@teste.dev", Uuid::new_v4()))
    .bind(role)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn seed_product(pool: &PgPool, seller_id: Uuid, stock: i32) -> Uuid {
    sqlx::query_scalar(
        r#"
        INSERT INTO products (seller_id, sku, name, price, currency, stock, status)
        VALUES ($1, $2, 'Produto de teste', 10.00, 'INR', $3, 'active')
        RETURNING id
        "#,
    )
    .bind(seller_id)
    .bind(format!("SKU-{}", Uuid::new_v4()))
    .bind(stock)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn seed_order(pool: &PgPool, user_id: Uuid, seller_id: Uuid) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO orders (id, user_id, seller_id, checkout_receipt, items, subtotal, tax_amount,
                            shipping_fee, total_amount, currency, shipping_address, status)
        VALUES ($1, $2, $3, $4, '[]', 100.00, 5.00, 40.00, 145.00, 'INR', '{}', 'confirmed')
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(seller_id)
    .bind(format!("rcpt-{}", id))
    .execute(pool)
    .await
    .unwrap();
    id
}

pub async fn seed_delivery_profile(pool: &PgPool, user_id: Uuid) -> Uuid {
    sqlx::query_scalar(
        r#"
        INSERT INTO delivery_profiles (user_id, full_name, phone, vehicle_type)
        VALUES ($1, 'Entregador', '+5511999990000', 'moto')
        RETURNING id
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
    .unwrap()
}
