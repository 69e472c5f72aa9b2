//! Cart service: one mutable line per (user, product)

use axum::extract::{Path, State};
use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::audit::log_activity;
use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::response::ApiResponse;
use crate::state::AppState;

/// Per-line quantity cap, applied to the combined quantity after merging
/// with an existing line.
const MAX_LINE_QUANTITY: i32 = 1000;

/// Combine an existing line quantity with a newly requested amount.
/// `None` on arithmetic overflow or when the result exceeds the cap.
fn merged_quantity(existing: Option<i32>, added: i32) -> Option<i32> {
    let total = existing.unwrap_or(0).checked_add(added)?;
    (1..=MAX_LINE_QUANTITY).contains(&total).then_some(total)
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct CartItemRow {
    pub id: Uuid,
    pub quantity: i32,
    pub product_id: Uuid,
    pub name: String,
    pub slug: String,
    pub price: Decimal,
    pub image_url: Option<String>,
    pub stock: i32,
    pub subtotal: Decimal,
}

pub async fn get_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<ApiResponse<serde_json::Value>>> {
    let items: Vec<CartItemRow> = sqlx::query_as(
        "SELECT c.id, c.quantity, p.id AS product_id, p.name, p.slug, p.price, p.image_url,
         p.stock, (p.price * c.quantity) AS subtotal
         FROM carts c JOIN products p ON c.product_id = p.id
         WHERE c.user_id = $1 AND p.is_active = TRUE
         ORDER BY c.created_at DESC",
    )
    .bind(user.id)
    .fetch_all(&state.db)
    .await?;

    let total: Decimal = items.iter().map(|i| i.subtotal).sum();
    Ok(Json(ApiResponse::data(json!({ "items": items, "total": total }))))
}

#[derive(Debug, Deserialize)]
pub struct AddToCartBody {
    #[serde(rename = "productId")]
    pub product_id: Uuid,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

pub async fn add_to_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<AddToCartBody>,
) -> ApiResult<Json<ApiResponse<()>>> {
    if body.quantity < 1 {
        return Err(ApiError::bad_request("Quantity must be at least 1"));
    }
    if body.quantity > MAX_LINE_QUANTITY {
        return Err(ApiError::bad_request(format!(
            "Quantity cannot exceed {MAX_LINE_QUANTITY} per item"
        )));
    }

    let product: Option<(i32, bool)> =
        sqlx::query_as("SELECT stock, is_active FROM products WHERE id = $1")
            .bind(body.product_id)
            .fetch_optional(&state.db)
            .await?;
    let Some((stock, is_active)) = product else {
        return Err(ApiError::not_found("Product not found"));
    };
    if !is_active {
        return Err(ApiError::bad_request("Product is not available"));
    }

    let existing: Option<(Uuid, i32)> =
        sqlx::query_as("SELECT id, quantity FROM carts WHERE user_id = $1 AND product_id = $2")
            .bind(user.id)
            .bind(body.product_id)
            .fetch_optional(&state.db)
            .await?;

    let Some(requested) =
        merged_quantity(existing.as_ref().map(|(_, qty)| *qty), body.quantity)
    else {
        return Err(ApiError::bad_request(format!(
            "Quantity cannot exceed {MAX_LINE_QUANTITY} per item"
        )));
    };
    if stock < requested {
        return Err(ApiError::bad_request(format!("Only {stock} items available in stock")));
    }

    match existing {
        Some((line_id, _)) => {
            sqlx::query("UPDATE carts SET quantity = $1, updated_at = NOW() WHERE id = $2")
                .bind(requested)
                .bind(line_id)
                .execute(&state.db)
                .await?;
        }
        None => {
            sqlx::query(
                "INSERT INTO carts (id, user_id, product_id, quantity) VALUES ($1, $2, $3, $4)",
            )
            .bind(Uuid::new_v4())
            .bind(user.id)
            .bind(body.product_id)
            .bind(body.quantity)
            .execute(&state.db)
            .await?;
        }
    }

    log_activity(&state.db, Some(user.id), "add_to_cart", Some("product"),
        Some(&body.product_id.to_string()), "Item added to cart")
        .await;

    Ok(Json(ApiResponse::message("Item added to cart")))
}

#[derive(Debug, Deserialize)]
pub struct UpdateCartBody {
    pub quantity: i32,
}

pub async fn update_cart_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateCartBody>,
) -> ApiResult<Json<ApiResponse<()>>> {
    if body.quantity < 1 {
        return Err(ApiError::bad_request("Quantity must be at least 1"));
    }
    if body.quantity > MAX_LINE_QUANTITY {
        return Err(ApiError::bad_request(format!(
            "Quantity cannot exceed {MAX_LINE_QUANTITY} per item"
        )));
    }

    let line: Option<(i32, bool)> = sqlx::query_as(
        "SELECT p.stock, p.is_active FROM carts c JOIN products p ON c.product_id = p.id
         WHERE c.id = $1 AND c.user_id = $2",
    )
    .bind(id)
    .bind(user.id)
    .fetch_optional(&state.db)
    .await?;
    let Some((stock, is_active)) = line else {
        return Err(ApiError::not_found("Cart item not found"));
    };
    if !is_active {
        return Err(ApiError::bad_request("Product is not available"));
    }
    if stock < body.quantity {
        return Err(ApiError::bad_request(format!("Only {stock} items available in stock")));
    }

    sqlx::query("UPDATE carts SET quantity = $1, updated_at = NOW() WHERE id = $2")
        .bind(body.quantity)
        .bind(id)
        .execute(&state.db)
        .await?;

    Ok(Json(ApiResponse::message("Cart item updated")))
}

pub async fn remove_from_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let result = sqlx::query("DELETE FROM carts WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user.id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Cart item not found"));
    }
    Ok(Json(ApiResponse::message("Item removed from cart")))
}

pub async fn clear_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<ApiResponse<()>>> {
    sqlx::query("DELETE FROM carts WHERE user_id = $1")
        .bind(user.id)
        .execute(&state.db)
        .await?;
    Ok(Json(ApiResponse::message("Cart cleared")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merged_quantity_adds_to_existing_line() {
        assert_eq!(merged_quantity(None, 3), Some(3));
        assert_eq!(merged_quantity(Some(2), 3), Some(5));
    }

    #[test]
    fn test_merged_quantity_rejects_overflow() {
        // A request near i32::MAX against an existing line must not wrap
        assert_eq!(merged_quantity(Some(1), i32::MAX), None);
        assert_eq!(merged_quantity(Some(i32::MAX), i32::MAX), None);
    }

    #[test]
    fn test_merged_quantity_enforces_cap() {
        assert_eq!(merged_quantity(None, MAX_LINE_QUANTITY), Some(MAX_LINE_QUANTITY));
        assert_eq!(merged_quantity(None, MAX_LINE_QUANTITY + 1), None);
        assert_eq!(merged_quantity(Some(MAX_LINE_QUANTITY), 1), None);
    }
}
