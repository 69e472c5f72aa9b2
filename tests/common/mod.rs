//! Common test utilities for handler integration tests

use std::sync::Arc;

use axum_test::TestServer;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use naturevita::auth::token::{self, TokenKind};
use naturevita::config::{Config, GatewayConfig};
use naturevita::email::ConsoleMailer;
use naturevita::routes::api_router;
use naturevita::AppState;

pub const JWT_SECRET: &str = "test-jwt-secret";
pub const SERVICE_SECRET: &str = "test-service-secret";

pub fn test_config() -> Config {
    Config {
        database_url: String::new(),
        port: 0,
        jwt_secret: JWT_SECRET.into(),
        jwt_refresh_secret: "test-refresh-secret".into(),
        jwt_ttl_secs: 3600,
        jwt_refresh_ttl_secs: 7200,
        bcrypt_cost: 4,
        frontend_url: "https://shop.test".into(),
        backend_url: "https://api.shop.test".into(),
        gateway: Some(GatewayConfig {
            // unroutable: tests never reach a live gateway
            api_url: "http://127.0.0.1:9/payment".into(),
            service_key: "test-service-key".into(),
            service_secret: SERVICE_SECRET.into(),
            return_url: "https://shop.test/payment/return".into(),
            notify_url: "https://api.shop.test/api/payments/webhook".into(),
            cancel_url: "https://shop.test/payment/cancel".into(),
        }),
        smtp: None,
    }
}

/// Server over a per-test database, console mailer, signed-but-offline gateway
pub fn test_server(pool: PgPool) -> TestServer {
    let state = AppState::new(pool, test_config(), Arc::new(ConsoleMailer));
    TestServer::new(api_router(state)).expect("failed to build test server")
}

/// Insert a verified, active user and mint an access token for them
pub async fn seed_user(pool: &PgPool, email: &str) -> (Uuid, String) {
    let user_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO users (id, name, email, password_hash, is_email_verified)
         VALUES ($1, 'Test Shopper', $2, 'not-a-real-hash', TRUE)",
    )
    .bind(user_id)
    .bind(email)
    .execute(pool)
    .await
    .expect("seed user");
    let access = token::issue(user_id, "user", TokenKind::Access, JWT_SECRET, 3600)
        .expect("mint access token");
    (user_id, access)
}

pub async fn seed_product(pool: &PgPool, name: &str, price: i64, stock: i32) -> Uuid {
    let product_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO products (id, name, slug, price, stock) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(product_id)
    .bind(name)
    .bind(name.to_lowercase().replace(' ', "-"))
    .bind(Decimal::new(price, 0))
    .bind(stock)
    .execute(pool)
    .await
    .expect("seed product");
    product_id
}

/// Insert a pending order with one item, bypassing the cart
pub async fn seed_pending_order(
    pool: &PgPool,
    user_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    total: i64,
) -> Uuid {
    let order_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO orders (id, user_id, subtotal, total_amount, status)
         VALUES ($1, $2, $3, $3, 'pending')",
    )
    .bind(order_id)
    .bind(user_id)
    .bind(Decimal::new(total, 0))
    .execute(pool)
    .await
    .expect("seed order");
    sqlx::query(
        "INSERT INTO order_items (id, order_id, product_id, quantity, price, subtotal)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(Uuid::new_v4())
    .bind(order_id)
    .bind(product_id)
    .bind(quantity)
    .bind(Decimal::new(total / i64::from(quantity.max(1)), 0))
    .bind(Decimal::new(total, 0))
    .execute(pool)
    .await
    .expect("seed order item");
    order_id
}

pub async fn product_stock(pool: &PgPool, product_id: Uuid) -> i32 {
    let (stock,): (i32,) = sqlx::query_as("SELECT stock FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_one(pool)
        .await
        .expect("read stock");
    stock
}

pub async fn count(pool: &PgPool, sql: &str, id: Uuid) -> i64 {
    let (n,): (i64,) = sqlx::query_as(sql).bind(id).fetch_one(pool).await.expect("count");
    n
}
