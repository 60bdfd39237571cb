// src/services/order_service.rs

use rust_decimal::Decimal;
use sqlx::PgPool;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    db::{order_repo::NewOrder, CartRepository, OrderRepository, ProductRepository},
    models::{
        auth::{Role, RoleView},
        catalog::{Product, ProductStatus},
        inventory::{normalize_lines, StockLine},
        orders::{CheckoutPayload, Order, OrderLine, OrderTotals, ShippingAddress},
    },
    services::reservation_service::ReservationService,
};

/// Um pedido ainda não gravado: um por vendedor.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub lines: Vec<OrderLine>,
    pub totals: OrderTotals,
}

impl OrderDraft {
    pub fn stock_lines(&self) -> Vec<StockLine> {
        self.lines
            .iter()
            .map(|l| StockLine { product_id: l.product_id, quantity: l.quantity })
            .collect()
    }
}

/// Monta os pedidos do checkout: agrupa as linhas por vendedor e calcula os totais.
/// Todos os produtos precisam existir e estar ativos.
pub fn build_order_drafts(
    products: &[Product],
    items: &[StockLine],
    tax_rate: Decimal,
    shipping_fee: Decimal,
) -> Result<Vec<OrderDraft>, AppError> {
    let items = normalize_lines(items)?;
    let by_id: HashMap<Uuid, &Product> = products.iter().map(|p| (p.id, p)).collect();

    let mut by_seller: BTreeMap<Uuid, Vec<OrderLine>> = BTreeMap::new();
    for item in &items {
        let product = by_id
            .get(&item.product_id)
            .ok_or_else(|| AppError::NotFound(format!("Produto {}", item.product_id)))?;

        if product.status != ProductStatus::Active {
            return Err(AppError::BadRequest(format!(
                "O produto '{}' não está disponível para compra.",
                product.name
            )));
        }

        by_seller.entry(product.seller_id).or_default().push(OrderLine {
            product_id: product.id,
            name: product.name.clone(),
            quantity: item.quantity,
            unit_price: product.effective_price().round_dp(2),
        });
    }

    Ok(by_seller
        .into_iter()
        .map(|(seller_id, lines)| {
            let totals = OrderTotals::compute(&lines, tax_rate, shipping_fee);
            OrderDraft { id: Uuid::new_v4(), seller_id, lines, totals }
        })
        .collect())
}

/// Quem pode ver um pedido: o comprador, o vendedor, suporte e admin.
pub fn can_view_order(view: RoleView, user_id: Uuid, order: &Order) -> bool {
    order.user_id == user_id
        || order.seller_id == user_id
        || view.is_admin()
        || view.satisfies(Role::Support)
}

#[derive(Clone)]
pub struct OrderService {
    order_repo: OrderRepository,
    product_repo: ProductRepository,
    cart_repo: CartRepository,
    reservations: ReservationService,
    tax_rate: Decimal,
    shipping_fee: Decimal,
    currency: String,
    pool: PgPool,
}

impl OrderService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        order_repo: OrderRepository,
        product_repo: ProductRepository,
        cart_repo: CartRepository,
        reservations: ReservationService,
        tax_rate: Decimal,
        shipping_fee: Decimal,
        currency: String,
        pool: PgPool,
    ) -> Self {
        Self { order_repo, product_repo, cart_repo, reservations, tax_rate, shipping_fee, currency, pool }
    }

    /// Checkout idempotente por recibo: repetir o mesmo recibo devolve os pedidos já criados.
    pub async fn checkout(&self, user_id: Uuid, payload: CheckoutPayload) -> Result<Vec<Order>, AppError> {
        payload.validate()?;

        let existing = self.order_repo.find_by_receipt(user_id, &payload.receipt).await?;
        if !existing.is_empty() {
            tracing::info!("Checkout {} repetido; devolvendo {} pedido(s).", payload.receipt, existing.len());
            return Ok(existing);
        }

        // 1. Itens da requisição ou do carrinho
        let (items, from_cart) = match &payload.items {
            Some(items) => (
                items
                    .iter()
                    .map(|i| StockLine { product_id: i.product_id, quantity: i.quantity })
                    .collect::<Vec<_>>(),
                false,
            ),
            None => {
                let cart = self.cart_repo.find_by_user(user_id).await?;
                let items = cart
                    .map(|c| c.items.0)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|i| StockLine { product_id: i.product_id, quantity: i.quantity })
                    .collect::<Vec<_>>();
                (items, true)
            }
        };

        if items.is_empty() {
            return Err(AppError::BadRequest("O carrinho está vazio.".into()));
        }

        // 2. Pedidos por vendedor
        let ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
        let products = self.product_repo.find_many(&ids).await?;
        let drafts = build_order_drafts(&products, &items, self.tax_rate, self.shipping_fee)?;

        // 3. Reserva tudo ou nada
        let batch: Vec<(Uuid, Vec<StockLine>)> = drafts.iter().map(|d| (d.id, d.stock_lines())).collect();
        self.reservations.reserve_all(&batch).await?;

        // 4. Grava os pedidos; se falhar, devolve as reservas
        match self
            .persist_orders(user_id, &payload.receipt, &payload.shipping_address, &drafts, &ids, from_cart)
            .await
        {
            Ok(orders) => {
                tracing::info!(
                    "Checkout {} do usuário {} gerou {} pedido(s).",
                    payload.receipt,
                    user_id,
                    orders.len()
                );
                Ok(orders)
            }
            Err(err) => {
                for draft in &drafts {
                    self.reservations.release_quietly(draft.id).await;
                }
                // Duas tentativas simultâneas com o mesmo recibo: a perdedora devolve o que a outra gravou.
                if let AppError::Conflict(_) = err {
                    let existing = self.order_repo.find_by_receipt(user_id, &payload.receipt).await?;
                    if !existing.is_empty() {
                        return Ok(existing);
                    }
                }
                Err(err)
            }
        }
    }

    async fn persist_orders(
        &self,
        user_id: Uuid,
        receipt: &str,
        shipping_address: &ShippingAddress,
        drafts: &[OrderDraft],
        product_ids: &[Uuid],
        clear_cart: bool,
    ) -> Result<Vec<Order>, AppError> {
        let mut tx = self.pool.begin().await?;

        let mut orders = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let new_order = NewOrder {
                id: draft.id,
                user_id,
                seller_id: draft.seller_id,
                checkout_receipt: receipt,
                items: &draft.lines,
                totals: draft.totals,
                currency: &self.currency,
                shipping_address,
            };
            orders.push(self.order_repo.insert(&mut *tx, &new_order).await?);
        }

        self.product_repo.bump_order_count(&mut *tx, product_ids).await?;

        if clear_cart {
            self.cart_repo.clear(&mut *tx, user_id).await?;
        }

        tx.commit().await?;
        Ok(orders)
    }

    pub async fn get_order(&self, view: RoleView, user_id: Uuid, order_id: Uuid) -> Result<Order, AppError> {
        let order = self
            .order_repo
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Pedido {}", order_id)))?;

        if !can_view_order(view, user_id, &order) {
            return Err(AppError::Forbidden("Este pedido pertence a outro usuário.".into()));
        }
        Ok(order)
    }

    pub async fn list_orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>, AppError> {
        self.order_repo.list_for_user(user_id).await
    }

    pub async fn list_orders_for_seller(&self, seller_id: Uuid) -> Result<Vec<Order>, AppError> {
        self.order_repo.list_for_seller(seller_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::catalog::AttributeMap;
    use chrono::Utc;
    use sqlx::types::Json;

    fn product(seller_id: Uuid, price: i64, discount: i64, status: ProductStatus) -> Product {
        let now = Utc::now();
        Product {
            id: Uuid::new_v4(),
            seller_id,
            category_id: None,
            sku: Uuid::new_v4().to_string(),
            name: "Produto".into(),
            description: None,
            price: Decimal::new(price, 0),
            currency: "INR".into(),
            discount: Decimal::new(discount, 0),
            attributes: Json(AttributeMap::new()),
            stock: 10,
            reserved: 0,
            low_stock_threshold: 1,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    fn line(product: &Product, quantity: i32) -> StockLine {
        StockLine { product_id: product.id, quantity }
    }

    #[test]
    fn lines_are_split_into_one_order_per_seller() {
        let s1 = Uuid::new_v4();
        let s2 = Uuid::new_v4();
        let a = product(s1, 100, 0, ProductStatus::Active);
        let b = product(s1, 50, 0, ProductStatus::Active);
        let c = product(s2, 200, 10, ProductStatus::Active);

        let drafts = build_order_drafts(
            &[a.clone(), b.clone(), c.clone()],
            &[line(&a, 2), line(&c, 1), line(&b, 1)],
            Decimal::new(5, 2),
            Decimal::new(40, 0),
        )
        .unwrap();

        assert_eq!(drafts.len(), 2);
        let first = drafts.iter().find(|d| d.seller_id == s1).unwrap();
        assert_eq!(first.lines.len(), 2);
        assert_eq!(first.totals.subtotal, Decimal::new(250, 0));
        assert_eq!(first.totals.total_amount, Decimal::new(30250, 2));

        // 10% de desconto: 200 -> 180
        let second = drafts.iter().find(|d| d.seller_id == s2).unwrap();
        assert_eq!(second.lines[0].unit_price, Decimal::new(180, 0));
        assert_eq!(second.totals.shipping_fee, Decimal::new(40, 0));
    }

    #[test]
    fn repeated_product_lines_are_merged() {
        let a = product(Uuid::new_v4(), 10, 0, ProductStatus::Active);
        let drafts =
            build_order_drafts(&[a.clone()], &[line(&a, 1), line(&a, 2)], Decimal::ZERO, Decimal::ZERO).unwrap();
        assert_eq!(drafts[0].lines.len(), 1);
        assert_eq!(drafts[0].lines[0].quantity, 3);
        assert_eq!(drafts[0].stock_lines(), vec![StockLine { product_id: a.id, quantity: 3 }]);
    }

    #[test]
    fn inactive_or_unknown_products_block_checkout() {
        let draft = product(Uuid::new_v4(), 10, 0, ProductStatus::Draft);
        assert!(matches!(
            build_order_drafts(&[draft.clone()], &[line(&draft, 1)], Decimal::ZERO, Decimal::ZERO),
            Err(AppError::BadRequest(_))
        ));

        let missing = StockLine { product_id: Uuid::new_v4(), quantity: 1 };
        assert!(matches!(
            build_order_drafts(&[], &[missing], Decimal::ZERO, Decimal::ZERO),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn order_visibility() {
        let buyer = Uuid::new_v4();
        let seller = Uuid::new_v4();
        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4(),
            user_id: buyer,
            seller_id: seller,
            checkout_receipt: "rcpt-0001".into(),
            items: Json(vec![]),
            subtotal: Decimal::ZERO,
            tax_amount: Decimal::ZERO,
            shipping_fee: Decimal::ZERO,
            total_amount: Decimal::ZERO,
            currency: "INR".into(),
            shipping_address: Json(ShippingAddress {
                street: "Rua 1".into(),
                city: "Pune".into(),
                state: "MH".into(),
                zip_code: "411001".into(),
                phone: None,
            }),
            status: crate::models::orders::OrderStatus::Pending,
            payment_id: None,
            shipment_id: None,
            created_at: now,
            updated_at: now,
        };

        assert!(can_view_order(RoleView::new(Role::Customer, None), buyer, &order));
        assert!(can_view_order(RoleView::new(Role::Seller, None), seller, &order));
        assert!(can_view_order(RoleView::new(Role::Support, None), Uuid::new_v4(), &order));
        assert!(!can_view_order(RoleView::new(Role::Customer, None), Uuid::new_v4(), &order));
    }
}
