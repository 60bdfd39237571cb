// src/config.rs

use anyhow::Context;
use rust_decimal::Decimal;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, str::FromStr, sync::Arc, time::Duration};

use crate::{
    db::{
        AuditRepository, CartRepository, NotificationRepository, OrderRepository, PaymentRepository,
        PayoutRepository, PgStockLedger, ProductRepository, ProfileRepository, ReviewRepository,
        ShipmentRepository, UserRepository,
    },
    services::{
        auth::{AuthService, SessionTokens},
        cart_service::CartService,
        gateway::HttpPaymentGateway,
        inventory_service::InventoryService,
        notification_service::NotificationService,
        order_service::OrderService,
        payment_service::PaymentService,
        payout_service::PayoutService,
        profile_service::ProfileService,
        reservation_service::ReservationService,
        review_service::ReviewService,
        role_service::RoleService,
        shipment_service::ShipmentService,
    },
};

// Configuração lida uma única vez do ambiente (.env opcional)
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub email_token_secret: String,
    pub app_url: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    pub gateway_url: String,
    pub gateway_key_id: String,
    pub gateway_key_secret: String,
    pub gateway_timeout: Duration,
    pub payment_pending_ttl: Duration,
    pub platform_commission_rate: Decimal,
    pub payout_tax_rate: Decimal,
    pub order_tax_rate: Decimal,
    pub shipping_fee: Decimal,
    pub currency: String,
}

fn required(name: &str) -> anyhow::Result<String> {
    env::var(name).with_context(|| format!("{} deve ser definida", name))
}

fn parse_or<T>(name: &str, raw: Option<String>, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{} inválida ({}): {}", name, raw, e)),
        _ => Ok(default),
    }
}

fn or_default<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse_or(name, env::var(name).ok(), default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            email_token_secret: required("EMAIL_TOKEN_SECRET")?,
            app_url: or_default("APP_URL", "http://localhost:3000".to_string())?,
            bind_addr: or_default("BIND_ADDR", "0.0.0.0:3000".to_string())?,
            db_max_connections: or_default("DB_MAX_CONNECTIONS", 5)?,
            db_acquire_timeout: Duration::from_secs(or_default("DB_ACQUIRE_TIMEOUT_SECS", 3)?),
            gateway_url: required("PAYMENT_GATEWAY_URL")?,
            gateway_key_id: required("PAYMENT_GATEWAY_KEY_ID")?,
            gateway_key_secret: required("PAYMENT_GATEWAY_KEY_SECRET")?,
            gateway_timeout: Duration::from_secs(or_default("PAYMENT_GATEWAY_TIMEOUT_SECS", 10)?),
            payment_pending_ttl: Duration::from_secs(60 * or_default::<u64>("PAYMENT_PENDING_TTL_MINUTES", 30)?),
            platform_commission_rate: or_default("PLATFORM_COMMISSION_RATE", Decimal::new(5, 2))?,
            payout_tax_rate: or_default("PAYOUT_TAX_RATE", Decimal::new(2, 2))?,
            order_tax_rate: or_default("ORDER_TAX_RATE", Decimal::new(5, 2))?,
            shipping_fee: or_default("SHIPPING_FEE", Decimal::new(40, 0))?,
            currency: or_default("CURRENCY", "INR".to_string())?,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Arc<AppConfig>,
    pub tokens: SessionTokens,
    pub auth_service: AuthService,
    pub profile_service: ProfileService,
    pub role_service: RoleService,
    pub inventory_service: InventoryService,
    pub cart_service: CartService,
    pub order_service: OrderService,
    pub payment_service: PaymentService,
    pub shipment_service: ShipmentService,
    pub payout_service: PayoutService,
    pub review_service: ReviewService,
    pub reservations: ReservationService,
    pub notification_service: NotificationService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = AppConfig::from_env()?;

        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(config.db_acquire_timeout)
            .connect(&config.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        Ok(Self::build(db_pool, config))
    }

    // --- Monta o gráfico de dependências ---
    fn build(db_pool: PgPool, config: AppConfig) -> Self {
        let user_repo = UserRepository::new(db_pool.clone());
        let profile_repo = ProfileRepository::new(db_pool.clone());
        let product_repo = ProductRepository::new(db_pool.clone());
        let cart_repo = CartRepository::new(db_pool.clone());
        let order_repo = OrderRepository::new(db_pool.clone());
        let notification_repo = NotificationRepository::new(db_pool.clone());

        let tokens = SessionTokens::new(config.jwt_secret.clone(), config.email_token_secret.clone());
        let reservations = ReservationService::new(Arc::new(PgStockLedger::new(db_pool.clone())));
        let gateway = Arc::new(HttpPaymentGateway::new(
            config.gateway_url.clone(),
            config.gateway_key_id.clone(),
            config.gateway_key_secret.clone(),
        ));

        let auth_service = AuthService::new(
            user_repo.clone(),
            notification_repo.clone(),
            tokens.clone(),
            config.app_url.clone(),
            db_pool.clone(),
        );
        let profile_service =
            ProfileService::new(profile_repo.clone(), user_repo.clone(), tokens.clone(), db_pool.clone());
        let role_service = RoleService::new(
            user_repo,
            AuditRepository::new(db_pool.clone()),
            tokens.clone(),
            db_pool.clone(),
        );
        let inventory_service = InventoryService::new(product_repo.clone(), config.currency.clone(), db_pool.clone());
        let cart_service = CartService::new(cart_repo.clone(), product_repo.clone(), db_pool.clone());
        let order_service = OrderService::new(
            order_repo.clone(),
            product_repo.clone(),
            cart_repo,
            reservations.clone(),
            config.order_tax_rate,
            config.shipping_fee,
            config.currency.clone(),
            db_pool.clone(),
        );
        let payout_service = PayoutService::new(
            PayoutRepository::new(db_pool.clone()),
            config.platform_commission_rate,
            config.payout_tax_rate,
        );
        let shipment_service = ShipmentService::new(
            ShipmentRepository::new(db_pool.clone()),
            order_repo.clone(),
            profile_repo,
            notification_repo.clone(),
            db_pool.clone(),
        );
        let payment_service = PaymentService::new(
            PaymentRepository::new(db_pool.clone()),
            order_repo,
            reservations.clone(),
            payout_service.clone(),
            shipment_service.clone(),
            gateway,
            config.gateway_timeout,
            config.gateway_key_secret.clone(),
            db_pool.clone(),
        );
        let review_service = ReviewService::new(ReviewRepository::new(db_pool.clone()), product_repo);
        let notification_service = NotificationService::new(notification_repo);

        Self {
            db_pool,
            config: Arc::new(config),
            tokens,
            auth_service,
            profile_service,
            role_service,
            inventory_service,
            cart_service,
            order_service,
            payment_service,
            shipment_service,
            payout_service,
            review_service,
            reservations,
            notification_service,
        }
    }
}
