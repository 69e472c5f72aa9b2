//! Product reviews (admin-moderated)

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
use crate::error::{ApiError, ApiResult};
use crate::response::{ApiResponse, Pagination};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateReviewBody {
    #[serde(rename = "productId")]
    pub product_id: Uuid,
    #[serde(rename = "orderId")]
    pub order_id: Option<Uuid>,
    pub rating: i32,
    pub comment: Option<String>,
}

pub async fn create_review(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<CreateReviewBody>,
) -> ApiResult<(StatusCode, Json<ApiResponse<serde_json::Value>>)> {
    if !(1..=5).contains(&body.rating) {
        return Err(ApiError::bad_request("Rating must be between 1 and 5"));
    }

    let product: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM products WHERE id = $1 AND is_active = TRUE")
            .bind(body.product_id)
            .fetch_optional(&state.db)
            .await?;
    if product.is_none() {
        return Err(ApiError::not_found("Product not found"));
    }

    if let Some(order_id) = body.order_id {
        let order: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM orders WHERE id = $1 AND user_id = $2")
                .bind(order_id)
                .bind(user.id)
                .fetch_optional(&state.db)
                .await?;
        if order.is_none() {
            return Err(ApiError::Forbidden("Order not found or access denied".into()));
        }
    }

    let existing: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM reviews WHERE user_id = $1 AND product_id = $2")
            .bind(user.id)
            .bind(body.product_id)
            .fetch_optional(&state.db)
            .await?;
    if existing.is_some() {
        return Err(ApiError::bad_request("You have already reviewed this product"));
    }

    let review_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO reviews (id, user_id, product_id, order_id, rating, comment, is_approved)
         VALUES ($1, $2, $3, $4, $5, $6, FALSE)",
    )
    .bind(review_id)
    .bind(user.id)
    .bind(body.product_id)
    .bind(body.order_id)
    .bind(body.rating)
    .bind(&body.comment)
    .execute(&state.db)
    .await?;

    log_activity(&state.db, Some(user.id), "review_created", Some("review"),
        Some(&review_id.to_string()),
        &format!("Review created for product {}", body.product_id))
        .await;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Review submitted successfully. It will be published after admin approval.",
            json!({ "reviewId": review_id }),
        )),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ReviewPageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct ProductReviewRow {
    pub id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub user_name: String,
    pub created_at: DateTime<Utc>,
}

pub async fn product_reviews(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Query(query): Query<ReviewPageQuery>,
) -> ApiResult<Json<ApiResponse<serde_json::Value>>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(10).clamp(1, 100);
    let offset = (page - 1) * limit;

    let reviews: Vec<ProductReviewRow> = sqlx::query_as(
        "SELECT r.id, r.rating, r.comment, u.name AS user_name, r.created_at
         FROM reviews r JOIN users u ON r.user_id = u.id
         WHERE r.product_id = $1 AND r.is_approved = TRUE
         ORDER BY r.created_at DESC LIMIT $2 OFFSET $3",
    )
    .bind(product_id)
    .bind(limit as i64)
    .bind(offset as i64)
    .fetch_all(&state.db)
    .await?;

    let (total, average_rating): (i64, Decimal) = sqlx::query_as(
        "SELECT COUNT(*), COALESCE(AVG(rating), 0) FROM reviews
         WHERE product_id = $1 AND is_approved = TRUE",
    )
    .bind(product_id)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(ApiResponse::data(json!({
        "reviews": reviews,
        "averageRating": average_rating,
        "pagination": Pagination::new(page, limit, total),
    }))))
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct MyReviewRow {
    pub id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub is_approved: bool,
    pub product_name: String,
    pub product_slug: String,
    pub product_image: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub async fn my_reviews(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<ApiResponse<serde_json::Value>>> {
    let reviews: Vec<MyReviewRow> = sqlx::query_as(
        "SELECT r.id, r.rating, r.comment, r.is_approved, p.name AS product_name,
         p.slug AS product_slug, p.image_url AS product_image, r.created_at
         FROM reviews r JOIN products p ON r.product_id = p.id
         WHERE r.user_id = $1 ORDER BY r.created_at DESC",
    )
    .bind(user.id)
    .fetch_all(&state.db)
    .await?;
    Ok(Json(ApiResponse::data(json!({ "reviews": reviews }))))
}
