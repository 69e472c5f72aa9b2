//! Catalog read service

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::QueryBuilder;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::response::{ApiResponse, Pagination};
use crate::state::AppState;

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct ProductRow {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub image_url: Option<String>,
    pub gallery: serde_json::Value,
    pub category: Option<String>,
    pub category_id: Option<Uuid>,
    pub category_name: Option<String>,
    pub category_slug: Option<String>,
    pub is_featured: bool,
    pub views: i64,
    pub average_rating: Decimal,
    pub review_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct ListProductsQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub featured: Option<bool>,
}

const PRODUCT_SELECT: &str = "SELECT p.id, p.name, p.slug, p.description, p.short_description, \
     p.price, p.stock, p.image_url, p.gallery, p.category, p.category_id, \
     c.name AS category_name, c.slug AS category_slug, p.is_featured, p.views, \
     COALESCE(AVG(r.rating), 0) AS average_rating, COUNT(r.id) AS review_count, p.created_at \
     FROM products p \
     LEFT JOIN categories c ON p.category_id = c.id \
     LEFT JOIN reviews r ON r.product_id = p.id AND r.is_approved = TRUE \
     WHERE p.is_active = TRUE";

/// Append the optional catalog filters shared by the list and count queries.
fn push_filters<'a>(qb: &mut QueryBuilder<'a, sqlx::Postgres>, query: &'a ListProductsQuery) {
    if let Some(category) = &query.category {
        qb.push(" AND (c.slug = ")
            .push_bind(category)
            .push(" OR p.category = ")
            .push_bind(category)
            .push(")");
    }
    if let Some(search) = &query.search {
        let term = format!("%{search}%");
        qb.push(" AND (p.name ILIKE ")
            .push_bind(term.clone())
            .push(" OR p.description ILIKE ")
            .push_bind(term.clone())
            .push(" OR p.short_description ILIKE ")
            .push_bind(term)
            .push(")");
    }
    if let Some(min) = query.min_price {
        qb.push(" AND p.price >= ").push_bind(min);
    }
    if let Some(max) = query.max_price {
        qb.push(" AND p.price <= ").push_bind(max);
    }
    if query.featured == Some(true) {
        qb.push(" AND p.is_featured = TRUE");
    }
}

/// Sort parameter maps to a fixed column whitelist; anything else falls back
/// to creation time.
fn sort_column(sort_by: Option<&str>) -> &'static str {
    match sort_by {
        Some("price") => "p.price",
        Some("name") => "p.name",
        Some("views") => "p.views",
        Some("averageRating") => "average_rating",
        _ => "p.created_at",
    }
}

pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ListProductsQuery>,
) -> ApiResult<Json<ApiResponse<serde_json::Value>>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(12).clamp(1, 100);
    let offset = (page - 1) * limit;

    let mut qb: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(PRODUCT_SELECT);
    push_filters(&mut qb, &query);
    qb.push(" GROUP BY p.id, c.name, c.slug");
    let direction = match query.sort_order.as_deref() {
        Some("asc") | Some("ASC") => "ASC",
        _ => "DESC",
    };
    qb.push(format!(" ORDER BY {} {}", sort_column(query.sort_by.as_deref()), direction));
    qb.push(" LIMIT ").push_bind(limit as i64).push(" OFFSET ").push_bind(offset as i64);

    let products: Vec<ProductRow> = qb.build_query_as().fetch_all(&state.db).await?;

    let mut count_qb: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(
        "SELECT COUNT(DISTINCT p.id) FROM products p \
         LEFT JOIN categories c ON p.category_id = c.id \
         WHERE p.is_active = TRUE",
    );
    push_filters(&mut count_qb, &query);
    let (total,): (i64,) = count_qb.build_query_as().fetch_one(&state.db).await?;

    Ok(Json(ApiResponse::data(json!({
        "products": products,
        "pagination": Pagination::new(page, limit, total),
    }))))
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct ReviewRow {
    pub id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub user_name: String,
    pub created_at: DateTime<Utc>,
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<serde_json::Value>>> {
    // Path segment is either a product id or a slug
    let mut qb: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(PRODUCT_SELECT);
    match Uuid::parse_str(&id) {
        Ok(uuid) => {
            qb.push(" AND p.id = ").push_bind(uuid);
        }
        Err(_) => {
            qb.push(" AND p.slug = ").push_bind(id.clone());
        }
    }
    qb.push(" GROUP BY p.id, c.name, c.slug");

    let product: Option<ProductRow> = qb.build_query_as().fetch_optional(&state.db).await?;
    let Some(product) = product else {
        return Err(ApiError::not_found("Product not found"));
    };

    let reviews: Vec<ReviewRow> = sqlx::query_as(
        "SELECT r.id, r.rating, r.comment, u.name AS user_name, r.created_at
         FROM reviews r JOIN users u ON r.user_id = u.id
         WHERE r.product_id = $1 AND r.is_approved = TRUE
         ORDER BY r.created_at DESC LIMIT 10",
    )
    .bind(product.id)
    .fetch_all(&state.db)
    .await?;

    // View counter is best-effort; a failure never blocks the read
    if let Err(err) = sqlx::query("UPDATE products SET views = views + 1 WHERE id = $1")
        .bind(product.id)
        .execute(&state.db)
        .await
    {
        tracing::warn!(product_id = %product.id, "failed to bump view counter: {}", err);
    }

    Ok(Json(ApiResponse::data(json!({
        "product": product,
        "reviews": reviews,
    }))))
}

#[derive(Debug, Deserialize)]
pub struct FeaturedQuery {
    pub limit: Option<u32>,
}

pub async fn featured_products(
    State(state): State<AppState>,
    Query(query): Query<FeaturedQuery>,
) -> ApiResult<Json<ApiResponse<serde_json::Value>>> {
    let limit = query.limit.unwrap_or(6).clamp(1, 50);
    let sql = format!(
        "{PRODUCT_SELECT} AND p.is_featured = TRUE \
         GROUP BY p.id, c.name, c.slug ORDER BY p.created_at DESC LIMIT $1"
    );
    let products: Vec<ProductRow> = sqlx::query_as(&sql)
        .bind(limit as i64)
        .fetch_all(&state.db)
        .await?;
    Ok(Json(ApiResponse::data(json!({ "products": products }))))
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct CategoryRow {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub sort_order: i32,
    pub product_count: i64,
}

pub async fn list_categories(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<serde_json::Value>>> {
    let categories: Vec<CategoryRow> = sqlx::query_as(
        "SELECT c.id, c.name, c.slug, c.description, c.image_url, c.sort_order,
         COUNT(p.id) AS product_count
         FROM categories c
         LEFT JOIN products p ON c.id = p.category_id AND p.is_active = TRUE
         WHERE c.is_active = TRUE
         GROUP BY c.id
         ORDER BY c.sort_order ASC, c.name ASC",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(ApiResponse::data(json!({ "categories": categories }))))
}
