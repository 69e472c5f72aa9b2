//! Order and payment workflow over a real database: the handler-level
//! guarantees the domain unit tests cannot reach.

mod common;

use std::collections::BTreeMap;

use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use common::{
    count, product_stock, seed_pending_order, seed_product, seed_user, test_server,
    SERVICE_SECRET,
};
use naturevita::gateway::sign;

#[sqlx::test]
async fn empty_cart_creates_no_order(pool: PgPool) {
    let (user_id, token) = seed_user(&pool, "empty@example.com").await;
    let server = test_server(pool.clone());

    let response = server
        .post("/api/orders")
        .authorization_bearer(&token)
        .json(&json!({ "shippingAddress": { "city": "Douala" } }))
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Cart is empty");
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM orders WHERE user_id = $1", user_id).await, 0);
}

#[sqlx::test]
async fn cancel_restores_stock_exactly_once(pool: PgPool) {
    let (_user_id, token) = seed_user(&pool, "cancel@example.com").await;
    let product_id = seed_product(&pool, "Moringa Powder", 1500, 5).await;
    let server = test_server(pool.clone());

    let response = server
        .post("/api/cart")
        .authorization_bearer(&token)
        .json(&json!({ "productId": product_id, "quantity": 2 }))
        .await;
    assert_eq!(response.status_code(), 200);

    let response = server
        .post("/api/orders")
        .authorization_bearer(&token)
        .json(&json!({ "shippingAddress": { "city": "Douala" } }))
        .await;
    assert_eq!(response.status_code(), 201);
    let body: Value = response.json();
    let order_id = body["data"]["order"]["id"].as_str().expect("order id").to_string();
    assert_eq!(product_stock(&pool, product_id).await, 3);

    let response = server
        .post(&format!("/api/orders/{order_id}/cancel"))
        .authorization_bearer(&token)
        .await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(product_stock(&pool, product_id).await, 5);

    // A second cancel is rejected and must not restore stock again
    let response = server
        .post(&format!("/api/orders/{order_id}/cancel"))
        .authorization_bearer(&token)
        .await;
    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["message"], "Order is already cancelled");
    assert_eq!(product_stock(&pool, product_id).await, 5);
}

#[sqlx::test]
async fn second_initiate_rejected_while_payment_open(pool: PgPool) {
    let (user_id, token) = seed_user(&pool, "payer@example.com").await;
    let product_id = seed_product(&pool, "Baobab Oil", 4500, 10).await;
    let order_id = seed_pending_order(&pool, user_id, product_id, 1, 4500).await;

    sqlx::query(
        "INSERT INTO payments (id, order_id, user_id, payment_method, amount, currency, status)
         VALUES ($1, $2, $3, 'monetbil', 4500, 'XAF', 'pending')",
    )
    .bind(Uuid::new_v4())
    .bind(order_id)
    .bind(user_id)
    .execute(&pool)
    .await
    .expect("seed payment");

    let server = test_server(pool.clone());
    let response = server
        .post("/api/payments/initiate")
        .authorization_bearer(&token)
        .json(&json!({ "orderId": order_id }))
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["message"], "Payment already initiated for this order");
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM payments WHERE order_id = $1", order_id).await, 1);
}

fn signed_webhook(payment_ref: &str, status: &str) -> Value {
    let pairs = BTreeMap::from([
        ("transaction_id".to_string(), "MB-TEST-1".to_string()),
        ("payment_ref".to_string(), payment_ref.to_string()),
        ("status".to_string(), status.to_string()),
        ("amount".to_string(), "4500".to_string()),
    ]);
    let signature = sign(&pairs, SERVICE_SECRET);
    json!({
        "transaction_id": "MB-TEST-1",
        "payment_ref": payment_ref,
        "status": status,
        "amount": "4500",
        "signature": signature,
    })
}

#[sqlx::test]
async fn duplicate_completed_webhook_marks_paid_once(pool: PgPool) {
    let (user_id, _token) = seed_user(&pool, "webhook@example.com").await;
    let product_id = seed_product(&pool, "Hibiscus Tea", 4500, 10).await;
    let order_id = seed_pending_order(&pool, user_id, product_id, 1, 4500).await;

    let payment_ref = "PAY-test-1";
    sqlx::query(
        "INSERT INTO payments (id, order_id, user_id, payment_method, amount, currency, status,
         transaction_id) VALUES ($1, $2, $3, 'monetbil', 4500, 'XAF', 'pending', $4)",
    )
    .bind(Uuid::new_v4())
    .bind(order_id)
    .bind(user_id)
    .bind(payment_ref)
    .execute(&pool)
    .await
    .expect("seed payment");

    let server = test_server(pool.clone());
    let payload = signed_webhook(payment_ref, "success");

    let response = server.post("/api/payments/webhook").json(&payload).await;
    assert_eq!(response.status_code(), 200);

    let (order_status, payment_status): (String, String) = sqlx::query_as(
        "SELECT o.status, p.status FROM orders o JOIN payments p ON p.order_id = o.id
         WHERE o.id = $1",
    )
    .bind(order_id)
    .fetch_one(&pool)
    .await
    .expect("statuses");
    assert_eq!(order_status, "paid");
    assert_eq!(payment_status, "completed");

    // Redelivery re-writes the payment row but touches nothing order-side
    let response = server.post("/api/payments/webhook").json(&payload).await;
    assert_eq!(response.status_code(), 200);

    let (order_status,): (String,) = sqlx::query_as("SELECT status FROM orders WHERE id = $1")
        .bind(order_id)
        .fetch_one(&pool)
        .await
        .expect("order status");
    assert_eq!(order_status, "paid");
    assert_eq!(
        count(&pool, "SELECT COUNT(*) FROM notifications WHERE user_id = $1", user_id).await,
        1
    );
}

#[sqlx::test]
async fn tampered_webhook_changes_nothing(pool: PgPool) {
    let (user_id, _token) = seed_user(&pool, "tamper@example.com").await;
    let product_id = seed_product(&pool, "Shea Butter", 4500, 10).await;
    let order_id = seed_pending_order(&pool, user_id, product_id, 1, 4500).await;

    let payment_ref = "PAY-test-2";
    sqlx::query(
        "INSERT INTO payments (id, order_id, user_id, payment_method, amount, currency, status,
         transaction_id) VALUES ($1, $2, $3, 'monetbil', 4500, 'XAF', 'pending', $4)",
    )
    .bind(Uuid::new_v4())
    .bind(order_id)
    .bind(user_id)
    .bind(payment_ref)
    .execute(&pool)
    .await
    .expect("seed payment");

    let server = test_server(pool.clone());
    let mut payload = signed_webhook(payment_ref, "success");
    payload["amount"] = json!("1");

    let response = server.post("/api/payments/webhook").json(&payload).await;
    assert_eq!(response.status_code(), 400);

    let (order_status, payment_status): (String, String) = sqlx::query_as(
        "SELECT o.status, p.status FROM orders o JOIN payments p ON p.order_id = o.id
         WHERE o.id = $1",
    )
    .bind(order_id)
    .fetch_one(&pool)
    .await
    .expect("statuses");
    assert_eq!(order_status, "pending");
    assert_eq!(payment_status, "pending");
}

#[sqlx::test]
async fn oversized_cart_quantity_rejected(pool: PgPool) {
    let (user_id, token) = seed_user(&pool, "hoarder@example.com").await;
    let product_id = seed_product(&pool, "Neem Soap", 500, 10).await;
    let server = test_server(pool.clone());

    let response = server
        .post("/api/cart")
        .authorization_bearer(&token)
        .json(&json!({ "productId": product_id, "quantity": 2 }))
        .await;
    assert_eq!(response.status_code(), 200);

    // A near-i32::MAX top-up must be rejected, not wrapped into a negative
    let response = server
        .post("/api/cart")
        .authorization_bearer(&token)
        .json(&json!({ "productId": product_id, "quantity": i32::MAX }))
        .await;
    assert_eq!(response.status_code(), 400);

    let (quantity,): (i32,) =
        sqlx::query_as("SELECT quantity FROM carts WHERE user_id = $1 AND product_id = $2")
            .bind(user_id)
            .bind(product_id)
            .fetch_one(&pool)
            .await
            .expect("cart line");
    assert_eq!(quantity, 2);
}
