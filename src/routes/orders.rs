//! Order workflow: cart snapshot to immutable order, stock reservation,
//! promo redemption and cancellation.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::audit::log_activity;
use crate::auth::AuthUser;
use crate::domain::order::{compute_totals, CartLine, OrderStatus};
use crate::domain::promo::PromoCode;
use crate::email::{fire_and_forget, order_confirmation_email};
use crate::error::{ApiError, ApiResult};
use crate::response::{ApiResponse, Pagination};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateOrderBody {
    #[serde(rename = "shippingAddress")]
    pub shipping_address: serde_json::Value,
    pub notes: Option<String>,
    #[serde(rename = "promoCode")]
    pub promo_code: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct CartLineRow {
    product_id: Uuid,
    name: String,
    price: Decimal,
    quantity: i32,
    stock: i32,
}

pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<CreateOrderBody>,
) -> ApiResult<(StatusCode, Json<ApiResponse<serde_json::Value>>)> {
    if !user.is_email_verified {
        return Err(ApiError::bad_request("Please verify your email before placing an order"));
    }

    let rows: Vec<CartLineRow> = sqlx::query_as(
        "SELECT p.id AS product_id, p.name, p.price, c.quantity, p.stock
         FROM carts c JOIN products p ON c.product_id = p.id
         WHERE c.user_id = $1 AND p.is_active = TRUE",
    )
    .bind(user.id)
    .fetch_all(&state.db)
    .await?;
    if rows.is_empty() {
        return Err(ApiError::bad_request("Cart is empty"));
    }

    let lines: Vec<CartLine> = rows
        .into_iter()
        .map(|r| CartLine {
            product_id: r.product_id,
            name: r.name,
            unit_price: r.price,
            quantity: r.quantity,
            stock: r.stock,
        })
        .collect();

    for line in &lines {
        if !line.in_stock() {
            return Err(ApiError::bad_request(format!(
                "Insufficient stock for {}. Only {} available.",
                line.name, line.stock
            )));
        }
    }

    // A promo failing any check is dropped silently; the order proceeds at
    // full price.
    let supplied_code = body.promo_code.as_deref().map(|c| c.trim().to_uppercase());
    let promo: Option<PromoCode> = match &supplied_code {
        Some(code) => {
            sqlx::query_as(
                "SELECT id, code, description, discount_type, discount_value, min_purchase,
                 max_discount, usage_limit, used_count, is_active, valid_from, valid_until
                 FROM promo_codes WHERE code = $1",
            )
            .bind(code)
            .fetch_optional(&state.db)
            .await?
        }
        None => None,
    };
    let totals = compute_totals(&lines, promo.as_ref(), Utc::now());

    let mut tx = state.db.begin().await?;

    let order_id = Uuid::new_v4();
    let (order_number,): (String,) = sqlx::query_as(
        "INSERT INTO orders (id, user_id, subtotal, discount, total_amount, promo_code,
         shipping_address, notes, status)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending')
         RETURNING order_number",
    )
    .bind(order_id)
    .bind(user.id)
    .bind(totals.subtotal)
    .bind(totals.discount)
    .bind(totals.total)
    .bind(&supplied_code)
    .bind(&body.shipping_address)
    .bind(&body.notes)
    .fetch_one(&mut *tx)
    .await?;

    for line in &lines {
        sqlx::query(
            "INSERT INTO order_items (id, order_id, product_id, quantity, price, subtotal)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(Uuid::new_v4())
        .bind(order_id)
        .bind(line.product_id)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(line.line_subtotal())
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE products SET stock = stock - $1 WHERE id = $2")
            .bind(line.quantity)
            .bind(line.product_id)
            .execute(&mut *tx)
            .await?;
    }

    if let Some(code) = &totals.promo_code {
        sqlx::query("UPDATE promo_codes SET used_count = used_count + 1 WHERE code = $1")
            .bind(code)
            .execute(&mut *tx)
            .await?;
    }

    sqlx::query("DELETE FROM carts WHERE user_id = $1")
        .bind(user.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    log_activity(&state.db, Some(user.id), "order_created", Some("order"),
        Some(&order_id.to_string()), &format!("Order {order_number} created"))
        .await;

    let (subject, text) = order_confirmation_email(&order_number, &totals.total.to_string());
    fire_and_forget(state.mailer.clone(), user.email.clone(), subject, text);

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Order created successfully",
            json!({
                "order": {
                    "id": order_id,
                    "orderNumber": order_number,
                    "totalAmount": totals.total,
                    "status": "pending",
                }
            }),
        )),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct OrderSummaryRow {
    pub id: Uuid,
    pub order_number: String,
    pub total_amount: Decimal,
    pub status: String,
    pub payment_status: String,
    pub payment_method: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ListOrdersQuery>,
) -> ApiResult<Json<ApiResponse<serde_json::Value>>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(10).clamp(1, 100);
    let offset = (page - 1) * limit;

    let mut qb: sqlx::QueryBuilder<sqlx::Postgres> = sqlx::QueryBuilder::new(
        "SELECT id, order_number, total_amount, status, payment_status, payment_method,
         created_at FROM orders WHERE user_id = ",
    );
    qb.push_bind(user.id);
    if let Some(status) = &query.status {
        qb.push(" AND status = ").push_bind(status);
    }
    qb.push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(limit as i64)
        .push(" OFFSET ")
        .push_bind(offset as i64);
    let orders: Vec<OrderSummaryRow> = qb.build_query_as().fetch_all(&state.db).await?;

    let mut count_qb: sqlx::QueryBuilder<sqlx::Postgres> =
        sqlx::QueryBuilder::new("SELECT COUNT(*) FROM orders WHERE user_id = ");
    count_qb.push_bind(user.id);
    if let Some(status) = &query.status {
        count_qb.push(" AND status = ").push_bind(status);
    }
    let (total,): (i64,) = count_qb.build_query_as().fetch_one(&state.db).await?;

    Ok(Json(ApiResponse::data(json!({
        "orders": orders,
        "pagination": Pagination::new(page, limit, total),
    }))))
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct OrderDetailRow {
    pub id: Uuid,
    pub order_number: String,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub shipping_cost: Decimal,
    pub discount: Decimal,
    pub total_amount: Decimal,
    pub promo_code: Option<String>,
    pub shipping_address: Option<serde_json::Value>,
    pub notes: Option<String>,
    pub status: String,
    pub payment_status: String,
    pub payment_method: Option<String>,
    pub created_at: DateTime<Utc>,
    pub customer_name: String,
    pub customer_email: String,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct OrderItemRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: Decimal,
    pub subtotal: Decimal,
    pub product_name: String,
    pub product_slug: String,
    pub product_image: Option<String>,
}

pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<serde_json::Value>>> {
    let order: Option<OrderDetailRow> = sqlx::query_as(
        "SELECT o.id, o.order_number, o.subtotal, o.tax, o.shipping_cost, o.discount,
         o.total_amount, o.promo_code, o.shipping_address, o.notes, o.status,
         o.payment_status, o.payment_method, o.created_at,
         u.name AS customer_name, u.email AS customer_email
         FROM orders o JOIN users u ON o.user_id = u.id
         WHERE o.id = $1 AND o.user_id = $2",
    )
    .bind(id)
    .bind(user.id)
    .fetch_optional(&state.db)
    .await?;
    let Some(order) = order else {
        return Err(ApiError::not_found("Order not found"));
    };

    let items: Vec<OrderItemRow> = sqlx::query_as(
        "SELECT oi.id, oi.product_id, oi.quantity, oi.price, oi.subtotal,
         p.name AS product_name, p.slug AS product_slug, p.image_url AS product_image
         FROM order_items oi JOIN products p ON oi.product_id = p.id
         WHERE oi.order_id = $1",
    )
    .bind(id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(ApiResponse::data(json!({ "order": order, "items": items }))))
}

pub async fn cancel_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let order: Option<(String, String)> =
        sqlx::query_as("SELECT status, order_number FROM orders WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user.id)
            .fetch_optional(&state.db)
            .await?;
    let Some((status, order_number)) = order else {
        return Err(ApiError::not_found("Order not found"));
    };

    let status = OrderStatus::parse(&status)
        .ok_or_else(|| ApiError::Internal(format!("unknown order status: {status}")))?;
    if status == OrderStatus::Cancelled {
        return Err(ApiError::bad_request("Order is already cancelled"));
    }
    if !status.can_cancel() {
        return Err(ApiError::bad_request(
            "Cannot cancel order that is already shipped or delivered",
        ));
    }

    let mut tx = state.db.begin().await?;

    sqlx::query("UPDATE orders SET status = 'cancelled', updated_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    // The only stock increment path. Completed payments and promo redemptions
    // are deliberately not reversed.
    let items: Vec<(Uuid, i32)> =
        sqlx::query_as("SELECT product_id, quantity FROM order_items WHERE order_id = $1")
            .bind(id)
            .fetch_all(&mut *tx)
            .await?;
    for (product_id, quantity) in items {
        sqlx::query("UPDATE products SET stock = stock + $1 WHERE id = $2")
            .bind(quantity)
            .bind(product_id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    log_activity(&state.db, Some(user.id), "order_cancelled", Some("order"),
        Some(&id.to_string()), &format!("Order {order_number} cancelled"))
        .await;

    Ok(Json(ApiResponse::message("Order cancelled successfully")))
}
