//! Admin back-office: dashboard stats, catalog and user management,
//! review moderation, order status updates.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::QueryBuilder;
use uuid::Uuid;

use crate::audit::{log_activity, notify_user};
use crate::auth::AdminUser;
use crate::domain::order::OrderStatus;
use crate::error::{ApiError, ApiResult};
use crate::response::{ApiResponse, Pagination};
use crate::state::AppState;

fn slugify(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "-")
}

pub async fn dashboard_stats(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ApiResult<Json<ApiResponse<serde_json::Value>>> {
    let (users,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM users WHERE role = 'user'")
            .fetch_one(&state.db)
            .await?;
    let (products,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM products WHERE is_active = TRUE")
            .fetch_one(&state.db)
            .await?;
    let (orders, revenue): (i64, Decimal) = sqlx::query_as(
        "SELECT COUNT(*), COALESCE(SUM(total_amount), 0) FROM orders
         WHERE status NOT IN ('cancelled')",
    )
    .fetch_one(&state.db)
    .await?;
    let (pending_reviews,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM reviews WHERE is_approved = FALSE")
            .fetch_one(&state.db)
            .await?;

    let recent_orders: Vec<AdminOrderRow> = sqlx::query_as(
        "SELECT o.id, o.order_number, o.total_amount, o.status, o.payment_status,
         o.created_at, u.name AS customer_name, u.email AS customer_email
         FROM orders o JOIN users u ON o.user_id = u.id
         ORDER BY o.created_at DESC LIMIT 10",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(ApiResponse::data(json!({
        "users": users,
        "products": products,
        "orders": orders,
        "revenue": revenue,
        "pendingReviews": pending_reviews,
        "recentOrders": recent_orders,
    }))))
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct AdminProductRow {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub price: Decimal,
    pub stock: i32,
    pub category: Option<String>,
    pub category_id: Option<Uuid>,
    pub is_active: bool,
    pub is_featured: bool,
    pub views: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct AdminListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub search: Option<String>,
}

pub async fn list_products(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<AdminListQuery>,
) -> ApiResult<Json<ApiResponse<serde_json::Value>>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);

    let mut qb: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(
        "SELECT id, name, slug, price, stock, category, category_id, is_active, is_featured,
         views, created_at FROM products WHERE 1=1",
    );
    if let Some(search) = &query.search {
        qb.push(" AND name ILIKE ").push_bind(format!("%{search}%"));
    }
    qb.push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(limit as i64)
        .push(" OFFSET ")
        .push_bind(((page - 1) * limit) as i64);
    let products: Vec<AdminProductRow> = qb.build_query_as().fetch_all(&state.db).await?;

    let mut count_qb: QueryBuilder<sqlx::Postgres> =
        QueryBuilder::new("SELECT COUNT(*) FROM products WHERE 1=1");
    if let Some(search) = &query.search {
        count_qb.push(" AND name ILIKE ").push_bind(format!("%{search}%"));
    }
    let (total,): (i64,) = count_qb.build_query_as().fetch_one(&state.db).await?;

    Ok(Json(ApiResponse::data(json!({
        "products": products,
        "pagination": Pagination::new(page, limit, total),
    }))))
}

#[derive(Debug, Deserialize)]
pub struct ProductBody {
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "shortDescription")]
    pub short_description: Option<String>,
    pub price: Decimal,
    pub stock: Option<i32>,
    #[serde(rename = "imageUrl")]
    pub image_url: Option<String>,
    pub category: Option<String>,
    #[serde(rename = "categoryId")]
    pub category_id: Option<Uuid>,
    #[serde(rename = "isActive")]
    pub is_active: Option<bool>,
    #[serde(rename = "isFeatured")]
    pub is_featured: Option<bool>,
}

pub async fn create_product(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(body): Json<ProductBody>,
) -> ApiResult<(StatusCode, Json<ApiResponse<serde_json::Value>>)> {
    if body.name.trim().is_empty() {
        return Err(ApiError::bad_request("Product name is required"));
    }
    if body.price < Decimal::ZERO {
        return Err(ApiError::bad_request("Price cannot be negative"));
    }

    let product_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO products (id, name, slug, description, short_description, price, stock,
         image_url, category, category_id, is_active, is_featured)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
    )
    .bind(product_id)
    .bind(body.name.trim())
    .bind(slugify(&body.name))
    .bind(&body.description)
    .bind(&body.short_description)
    .bind(body.price)
    .bind(body.stock.unwrap_or(0))
    .bind(&body.image_url)
    .bind(&body.category)
    .bind(body.category_id)
    .bind(body.is_active.unwrap_or(true))
    .bind(body.is_featured.unwrap_or(false))
    .execute(&state.db)
    .await?;

    log_activity(&state.db, Some(admin.0.id), "product_created", Some("product"),
        Some(&product_id.to_string()), &format!("Product {} created", body.name))
        .await;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Product created successfully", json!({ "id": product_id }))),
    ))
}

pub async fn update_product(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(body): Json<ProductBody>,
) -> ApiResult<Json<ApiResponse<()>>> {
    if body.price < Decimal::ZERO {
        return Err(ApiError::bad_request("Price cannot be negative"));
    }

    let result = sqlx::query(
        "UPDATE products SET name = $1, slug = $2, description = $3, short_description = $4,
         price = $5, stock = $6, image_url = $7, category = $8, category_id = $9,
         is_active = $10, is_featured = $11, updated_at = NOW() WHERE id = $12",
    )
    .bind(body.name.trim())
    .bind(slugify(&body.name))
    .bind(&body.description)
    .bind(&body.short_description)
    .bind(body.price)
    .bind(body.stock.unwrap_or(0))
    .bind(&body.image_url)
    .bind(&body.category)
    .bind(body.category_id)
    .bind(body.is_active.unwrap_or(true))
    .bind(body.is_featured.unwrap_or(false))
    .bind(id)
    .execute(&state.db)
    .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Product not found"));
    }

    log_activity(&state.db, Some(admin.0.id), "product_updated", Some("product"),
        Some(&id.to_string()), &format!("Product {} updated", body.name))
        .await;

    Ok(Json(ApiResponse::message("Product updated successfully")))
}

pub async fn delete_product(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<()>>> {
    // Soft-deactivate; order history keeps its references
    let result =
        sqlx::query("UPDATE products SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&state.db)
            .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Product not found"));
    }
    log_activity(&state.db, Some(admin.0.id), "product_deleted", Some("product"),
        Some(&id.to_string()), "Product deactivated")
        .await;
    Ok(Json(ApiResponse::message("Product deleted successfully")))
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct AdminCategoryRow {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub is_active: bool,
    pub sort_order: i32,
    pub product_count: i64,
}

pub async fn list_categories(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ApiResult<Json<ApiResponse<serde_json::Value>>> {
    let categories: Vec<AdminCategoryRow> = sqlx::query_as(
        "SELECT c.id, c.name, c.slug, c.description, c.image_url, c.is_active, c.sort_order,
         COUNT(p.id) AS product_count
         FROM categories c LEFT JOIN products p ON c.id = p.category_id
         GROUP BY c.id ORDER BY c.sort_order ASC, c.name ASC",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(ApiResponse::data(json!({ "categories": categories }))))
}

#[derive(Debug, Deserialize)]
pub struct CategoryBody {
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "imageUrl")]
    pub image_url: Option<String>,
    #[serde(rename = "isActive")]
    pub is_active: Option<bool>,
    #[serde(rename = "sortOrder")]
    pub sort_order: Option<i32>,
}

pub async fn create_category(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(body): Json<CategoryBody>,
) -> ApiResult<(StatusCode, Json<ApiResponse<serde_json::Value>>)> {
    if body.name.trim().is_empty() {
        return Err(ApiError::bad_request("Category name is required"));
    }
    let slug = slugify(&body.name);
    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM categories WHERE slug = $1")
        .bind(&slug)
        .fetch_optional(&state.db)
        .await?;
    if existing.is_some() {
        return Err(ApiError::bad_request("Category already exists"));
    }

    let category_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO categories (id, name, slug, description, image_url, is_active, sort_order)
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(category_id)
    .bind(body.name.trim())
    .bind(&slug)
    .bind(&body.description)
    .bind(&body.image_url)
    .bind(body.is_active.unwrap_or(true))
    .bind(body.sort_order.unwrap_or(0))
    .execute(&state.db)
    .await?;

    log_activity(&state.db, Some(admin.0.id), "category_created", Some("category"),
        Some(&category_id.to_string()), &format!("Category {} created", body.name))
        .await;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Category created successfully",
            json!({ "id": category_id }))),
    ))
}

pub async fn update_category(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(body): Json<CategoryBody>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let result = sqlx::query(
        "UPDATE categories SET name = $1, slug = $2, description = $3, image_url = $4,
         is_active = $5, sort_order = $6 WHERE id = $7",
    )
    .bind(body.name.trim())
    .bind(slugify(&body.name))
    .bind(&body.description)
    .bind(&body.image_url)
    .bind(body.is_active.unwrap_or(true))
    .bind(body.sort_order.unwrap_or(0))
    .bind(id)
    .execute(&state.db)
    .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Category not found"));
    }
    log_activity(&state.db, Some(admin.0.id), "category_updated", Some("category"),
        Some(&id.to_string()), &format!("Category {} updated", body.name))
        .await;
    Ok(Json(ApiResponse::message("Category updated successfully")))
}

pub async fn delete_category(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<()>>> {
    sqlx::query("UPDATE products SET category_id = NULL WHERE category_id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;
    let result = sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Category not found"));
    }
    log_activity(&state.db, Some(admin.0.id), "category_deleted", Some("category"),
        Some(&id.to_string()), "Category deleted")
        .await;
    Ok(Json(ApiResponse::message("Category deleted successfully")))
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct AdminUserRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub is_active: bool,
    pub is_email_verified: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<AdminListQuery>,
) -> ApiResult<Json<ApiResponse<serde_json::Value>>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);

    let mut qb: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(
        "SELECT id, name, email, role, is_active, is_email_verified, last_login, created_at
         FROM users WHERE 1=1",
    );
    if let Some(search) = &query.search {
        let term = format!("%{search}%");
        qb.push(" AND (name ILIKE ")
            .push_bind(term.clone())
            .push(" OR email ILIKE ")
            .push_bind(term)
            .push(")");
    }
    qb.push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(limit as i64)
        .push(" OFFSET ")
        .push_bind(((page - 1) * limit) as i64);
    let users: Vec<AdminUserRow> = qb.build_query_as().fetch_all(&state.db).await?;

    let (total,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM users").fetch_one(&state.db).await?;

    Ok(Json(ApiResponse::data(json!({
        "users": users,
        "pagination": Pagination::new(page, limit, total),
    }))))
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct UserDetailRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub is_active: bool,
    pub is_email_verified: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct UserOrderRow {
    pub id: Uuid,
    pub order_number: String,
    pub total_amount: Decimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

pub async fn get_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<serde_json::Value>>> {
    let user: Option<UserDetailRow> = sqlx::query_as(
        "SELECT id, name, email, role, phone, address, city, country, is_active,
         is_email_verified, last_login, created_at FROM users WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&state.db)
    .await?;
    let Some(user) = user else {
        return Err(ApiError::not_found("User not found"));
    };

    let orders: Vec<UserOrderRow> = sqlx::query_as(
        "SELECT id, order_number, total_amount, status, created_at FROM orders
         WHERE user_id = $1 ORDER BY created_at DESC LIMIT 10",
    )
    .bind(id)
    .fetch_all(&state.db)
    .await?;

    // Cancelled and still-pending orders don't count toward spend
    let (total_orders, total_spent, average_order): (i64, Decimal, Decimal) = sqlx::query_as(
        "SELECT COUNT(*), COALESCE(SUM(total_amount), 0), COALESCE(AVG(total_amount), 0)
         FROM orders WHERE user_id = $1
         AND status IN ('paid', 'processing', 'shipped', 'delivered')",
    )
    .bind(id)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(ApiResponse::data(json!({
        "user": user,
        "orders": orders,
        "stats": {
            "totalOrders": total_orders,
            "totalSpent": total_spent,
            "averageOrderValue": average_order,
        },
    }))))
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserBody {
    pub role: Option<String>,
    #[serde(rename = "isActive")]
    pub is_active: Option<bool>,
}

pub async fn update_user(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateUserBody>,
) -> ApiResult<Json<ApiResponse<()>>> {
    if let Some(role) = &body.role {
        if role != "user" && role != "admin" {
            return Err(ApiError::bad_request("Role must be 'user' or 'admin'"));
        }
    }
    if body.role.is_none() && body.is_active.is_none() {
        return Err(ApiError::bad_request("No fields to update"));
    }

    let mut qb: QueryBuilder<sqlx::Postgres> = QueryBuilder::new("UPDATE users SET ");
    let mut any = false;
    if let Some(role) = &body.role {
        qb.push("role = ").push_bind(role.clone());
        any = true;
    }
    if let Some(is_active) = body.is_active {
        if any {
            qb.push(", ");
        }
        qb.push("is_active = ").push_bind(is_active);
    }
    qb.push(", updated_at = NOW() WHERE id = ").push_bind(id);

    let result = qb.build().execute(&state.db).await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("User not found"));
    }
    log_activity(&state.db, Some(admin.0.id), "user_updated", Some("user"),
        Some(&id.to_string()), "User account updated by admin")
        .await;
    Ok(Json(ApiResponse::message("User updated successfully")))
}

// ---------------------------------------------------------------------------
// Reviews
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct PendingReviewRow {
    pub id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub user_name: String,
    pub product_name: String,
    pub created_at: DateTime<Utc>,
}

pub async fn list_pending_reviews(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ApiResult<Json<ApiResponse<serde_json::Value>>> {
    let reviews: Vec<PendingReviewRow> = sqlx::query_as(
        "SELECT r.id, r.rating, r.comment, u.name AS user_name, p.name AS product_name,
         r.created_at
         FROM reviews r
         JOIN users u ON r.user_id = u.id
         JOIN products p ON r.product_id = p.id
         WHERE r.is_approved = FALSE ORDER BY r.created_at ASC",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(ApiResponse::data(json!({ "reviews": reviews }))))
}

pub async fn approve_review(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let result = sqlx::query("UPDATE reviews SET is_approved = TRUE WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Review not found"));
    }
    log_activity(&state.db, Some(admin.0.id), "review_approved", Some("review"),
        Some(&id.to_string()), "Review approved")
        .await;
    Ok(Json(ApiResponse::message("Review approved")))
}

pub async fn delete_review(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let result =
        sqlx::query("DELETE FROM reviews WHERE id = $1").bind(id).execute(&state.db).await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Review not found"));
    }
    log_activity(&state.db, Some(admin.0.id), "review_deleted", Some("review"),
        Some(&id.to_string()), "Review deleted")
        .await;
    Ok(Json(ApiResponse::message("Review deleted")))
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct AdminOrderRow {
    pub id: Uuid,
    pub order_number: String,
    pub total_amount: Decimal,
    pub status: String,
    pub payment_status: String,
    pub created_at: DateTime<Utc>,
    pub customer_name: String,
    pub customer_email: String,
}

#[derive(Debug, Deserialize)]
pub struct AdminOrdersQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<String>,
}

pub async fn list_orders(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<AdminOrdersQuery>,
) -> ApiResult<Json<ApiResponse<serde_json::Value>>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);

    let mut qb: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(
        "SELECT o.id, o.order_number, o.total_amount, o.status, o.payment_status, o.created_at,
         u.name AS customer_name, u.email AS customer_email
         FROM orders o JOIN users u ON o.user_id = u.id WHERE 1=1",
    );
    if let Some(status) = &query.status {
        qb.push(" AND o.status = ").push_bind(status);
    }
    qb.push(" ORDER BY o.created_at DESC LIMIT ")
        .push_bind(limit as i64)
        .push(" OFFSET ")
        .push_bind(((page - 1) * limit) as i64);
    let orders: Vec<AdminOrderRow> = qb.build_query_as().fetch_all(&state.db).await?;

    let mut count_qb: QueryBuilder<sqlx::Postgres> =
        QueryBuilder::new("SELECT COUNT(*) FROM orders WHERE 1=1");
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
pub struct AdminOrderDetailRow {
    pub id: Uuid,
    pub order_number: String,
    pub subtotal: Decimal,
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
    pub customer_phone: Option<String>,
    pub customer_address: Option<String>,
    pub customer_city: Option<String>,
    pub customer_country: Option<String>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct AdminOrderItemRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub price: Decimal,
    pub subtotal: Decimal,
    pub product_name: String,
    pub product_slug: String,
    pub product_image: Option<String>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct AdminPaymentRow {
    pub id: Uuid,
    pub payment_method: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: String,
    pub transaction_id: Option<String>,
    pub error_message: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

pub async fn get_order(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<serde_json::Value>>> {
    let order: Option<AdminOrderDetailRow> = sqlx::query_as(
        "SELECT o.id, o.order_number, o.subtotal, o.discount, o.total_amount, o.promo_code,
         o.shipping_address, o.notes, o.status, o.payment_status, o.payment_method, o.created_at,
         u.name AS customer_name, u.email AS customer_email, u.phone AS customer_phone,
         u.address AS customer_address, u.city AS customer_city, u.country AS customer_country
         FROM orders o JOIN users u ON o.user_id = u.id WHERE o.id = $1",
    )
    .bind(id)
    .fetch_optional(&state.db)
    .await?;
    let Some(order) = order else {
        return Err(ApiError::not_found("Order not found"));
    };

    let items: Vec<AdminOrderItemRow> = sqlx::query_as(
        "SELECT oi.id, oi.product_id, oi.quantity, oi.price, oi.subtotal,
         p.name AS product_name, p.slug AS product_slug, p.image_url AS product_image
         FROM order_items oi JOIN products p ON oi.product_id = p.id
         WHERE oi.order_id = $1",
    )
    .bind(id)
    .fetch_all(&state.db)
    .await?;

    let payments: Vec<AdminPaymentRow> = sqlx::query_as(
        "SELECT id, payment_method, amount, currency, status, transaction_id, error_message,
         metadata, created_at FROM payments WHERE order_id = $1 ORDER BY created_at DESC",
    )
    .bind(id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(ApiResponse::data(json!({
        "order": order,
        "items": items,
        "payments": payments,
    }))))
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatusBody {
    pub status: String,
}

/// No transition graph here: an admin may legally jump `pending → delivered`.
pub async fn update_order_status(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateOrderStatusBody>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let Some(new_status) = OrderStatus::parse(&body.status) else {
        return Err(ApiError::bad_request("Invalid status"));
    };

    let order: Option<(Uuid, String)> =
        sqlx::query_as("SELECT user_id, order_number FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&state.db)
            .await?;
    let Some((user_id, order_number)) = order else {
        return Err(ApiError::not_found("Order not found"));
    };

    sqlx::query("UPDATE orders SET status = $1, updated_at = NOW() WHERE id = $2")
        .bind(new_status.as_str())
        .bind(id)
        .execute(&state.db)
        .await?;

    notify_user(&state.db, user_id, "order_status", "Order update",
        &format!("Your order {} is now {}.", order_number, new_status.as_str()),
        Some(&format!("/orders/{id}")))
        .await;
    log_activity(&state.db, Some(admin.0.id), "order_status_updated", Some("order"),
        Some(&id.to_string()),
        &format!("Order {} status set to {}", order_number, new_status.as_str()))
        .await;

    Ok(Json(ApiResponse::message("Order status updated successfully")))
}
