//src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod common;
mod config;
mod db;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::AppState;
use crate::middleware::{auth::auth_guard, guard::page_guard};

// Expira pagamentos pendentes antigos e libera o estoque reservado
fn spawn_payment_sweeper(app_state: AppState) {
    let ttl = app_state.config.payment_pending_ttl;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::cmp::max(ttl / 4, std::time::Duration::from_secs(30)));
        loop {
            ticker.tick().await;
            if let Err(e) = app_state.payment_service.expire_stale_payments(ttl).await {
                tracing::error!("Falha ao expirar pagamentos pendentes: {}", e);
            }
        }
    });
}

fn router(app_state: AppState) -> Router {
    // Rotas públicas
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/logout", post(handlers::auth::logout))
        .route("/verify-email", get(handlers::auth::verify_email));

    let catalog_routes = Router::new()
        .route("/", get(handlers::catalog::list_catalog))
        .route("/products/{id}", get(handlers::catalog::get_product))
        .route("/products/{id}/availability", get(handlers::catalog::get_availability))
        .route("/products/{id}/reviews", get(handlers::catalog::list_reviews));

    // Rotas protegidas pelo middleware (401 sem sessão)
    let user_routes = Router::new()
        .route("/session/refresh", post(handlers::auth::refresh))
        .route("/users/me", get(handlers::auth::get_me))
        .route(
            "/profile",
            get(handlers::profile::get_profile).post(handlers::profile::complete_profile),
        )
        .route("/roles/switch", post(handlers::auth::switch_role))
        .route("/roles/restore", post(handlers::auth::restore_role))
        .route(
            "/cart",
            get(handlers::cart::get_cart)
                .put(handlers::cart::set_cart_item)
                .delete(handlers::cart::clear_cart),
        )
        .route("/orders", get(handlers::orders::list_my_orders))
        .route("/orders/checkout", post(handlers::orders::checkout))
        .route("/orders/{id}", get(handlers::orders::get_order))
        .route("/payments", post(handlers::payments::create_payment))
        .route("/payments/{id}", get(handlers::payments::get_payment))
        .route("/products/{id}/reviews", post(handlers::catalog::create_review))
        .route("/notifications", get(handlers::notifications::list_notifications))
        .route("/notifications/{id}/read", post(handlers::notifications::mark_read))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    let seller_routes = Router::new()
        .route(
            "/products",
            post(handlers::catalog::create_product).get(handlers::catalog::list_my_products),
        )
        .route("/products/{id}/status", put(handlers::catalog::change_product_status))
        .route("/products/{id}/stock", post(handlers::catalog::adjust_stock))
        .route("/products/{id}/attributes", put(handlers::catalog::update_attributes))
        .route("/orders", get(handlers::orders::list_seller_orders))
        .route("/payouts", get(handlers::payouts::list_payouts))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    let delivery_routes = Router::new()
        .route("/shipments", get(handlers::shipments::list_my_shipments))
        .route("/shipments/available", get(handlers::shipments::list_available_shipments))
        .route("/shipments/{id}/accept", post(handlers::shipments::accept_shipment))
        .route("/shipments/{id}/status", put(handlers::shipments::update_shipment_status))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    let admin_routes = Router::new()
        .route("/users/{id}/role", put(handlers::admin::set_user_role))
        .route("/categories", post(handlers::admin::create_category))
        .route("/orders/{id}/shipment", post(handlers::admin::create_shipment))
        .route("/shipments/{id}/assign", put(handlers::admin::assign_shipment))
        .route("/payments/{id}/refund", post(handlers::admin::refund_payment))
        .route("/audit-logs", get(handlers::admin::list_audit_logs))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    // Páginas: o guard decide antes de qualquer handler
    let pages = Router::new()
        .route("/dashboard", get(handlers::session::page_shell))
        .route("/dashboard/{*rest}", get(handlers::session::page_shell))
        .route("/forbidden", get(handlers::session::page_shell))
        .route("/auth/{page}", get(handlers::session::page_shell))
        .route("/admin", get(handlers::session::page_shell))
        .route("/admin/{*rest}", get(handlers::session::page_shell))
        .route("/seller", get(handlers::session::page_shell))
        .route("/seller/{*rest}", get(handlers::session::page_shell))
        .route("/support", get(handlers::session::page_shell))
        .route("/support/{*rest}", get(handlers::session::page_shell))
        .route("/delivery", get(handlers::session::page_shell))
        .route("/delivery/{*rest}", get(handlers::session::page_shell))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), page_guard));

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/session/access", get(handlers::session::check_access))
        .route("/api/payments/webhook", post(handlers::payments::webhook))
        .nest("/api/auth", auth_routes)
        .nest("/api/catalog", catalog_routes)
        .nest("/api", user_routes)
        .nest("/api/seller", seller_routes)
        .nest("/api/delivery", delivery_routes)
        .nest("/api/admin", admin_routes)
        .merge(pages)
        .with_state(app_state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG controla o nível; padrão "info"
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new().await?;

    sqlx::migrate!().run(&app_state.db_pool).await?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    spawn_payment_sweeper(app_state.clone());

    let addr = app_state.config.bind_addr.clone();
    let app = router(app_state);

    // Inicia o servidor
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
