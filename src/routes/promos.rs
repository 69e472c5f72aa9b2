//! Promo code validation and admin CRUD
//!
//! Unlike order creation, the validate endpoint surfaces each failure so the
//! storefront can tell the shopper why a code did not apply.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::QueryBuilder;
use uuid::Uuid;

use crate::auth::{AdminUser, AuthUser};
use crate::domain::promo::{DiscountType, PromoCode, PromoRejection};
use crate::error::{ApiError, ApiResult};
use crate::response::ApiResponse;
use crate::state::AppState;

const PROMO_COLUMNS: &str = "id, code, description, discount_type, discount_value, min_purchase, \
     max_discount, usage_limit, used_count, is_active, valid_from, valid_until";

#[derive(Debug, Deserialize)]
pub struct ValidatePromoBody {
    pub code: String,
    pub amount: Decimal,
}

pub async fn validate_promo(
    State(state): State<AppState>,
    _user: AuthUser,
    Json(body): Json<ValidatePromoBody>,
) -> ApiResult<Json<ApiResponse<serde_json::Value>>> {
    let code = body.code.trim().to_uppercase();
    if code.is_empty() {
        return Err(ApiError::bad_request("Promo code is required"));
    }

    let sql = format!("SELECT {PROMO_COLUMNS} FROM promo_codes WHERE code = $1");
    let promo: Option<PromoCode> =
        sqlx::query_as(&sql).bind(&code).fetch_optional(&state.db).await?;
    let Some(promo) = promo else {
        return Err(ApiError::not_found("Invalid or expired promo code"));
    };

    let now = Utc::now();
    if let Err(rejection) = promo.check(body.amount, now) {
        return Err(match rejection {
            PromoRejection::Inactive | PromoRejection::OutsideWindow => {
                ApiError::not_found("Invalid or expired promo code")
            }
            PromoRejection::UsageLimitReached => {
                ApiError::bad_request("Promo code has reached its usage limit")
            }
            PromoRejection::MinPurchaseNotMet => ApiError::bad_request(format!(
                "Minimum purchase of {} FCFA required",
                promo.min_purchase.unwrap_or_default()
            )),
        });
    }

    let discount = promo
        .discount_for(body.amount, now)
        .ok_or_else(|| ApiError::bad_request("Invalid promo code"))?;

    Ok(Json(ApiResponse::data(json!({
        "code": promo.code,
        "discount": discount,
        "discountType": promo.discount_type,
        "description": promo.description,
    }))))
}

#[derive(Debug, Deserialize)]
pub struct ListPromosQuery {
    #[serde(rename = "isActive")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct PromoListRow {
    pub id: Uuid,
    pub code: String,
    pub description: Option<String>,
    pub discount_type: String,
    pub discount_value: Decimal,
    pub min_purchase: Option<Decimal>,
    pub max_discount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub is_active: bool,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

pub async fn list_promos(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<ListPromosQuery>,
) -> ApiResult<Json<ApiResponse<serde_json::Value>>> {
    let mut qb: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(format!(
        "SELECT {PROMO_COLUMNS}, created_at FROM promo_codes WHERE 1=1"
    ));
    if let Some(is_active) = query.is_active {
        qb.push(" AND is_active = ").push_bind(is_active);
    }
    qb.push(" ORDER BY created_at DESC");
    let promos: Vec<PromoListRow> = qb.build_query_as().fetch_all(&state.db).await?;
    Ok(Json(ApiResponse::data(json!({ "promoCodes": promos }))))
}

#[derive(Debug, Deserialize)]
pub struct CreatePromoBody {
    pub code: String,
    pub description: Option<String>,
    #[serde(rename = "discountType")]
    pub discount_type: String,
    #[serde(rename = "discountValue")]
    pub discount_value: Decimal,
    #[serde(rename = "minPurchase")]
    pub min_purchase: Option<Decimal>,
    #[serde(rename = "maxDiscount")]
    pub max_discount: Option<Decimal>,
    #[serde(rename = "usageLimit")]
    pub usage_limit: Option<i32>,
    #[serde(rename = "validFrom")]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(rename = "validUntil")]
    pub valid_until: Option<DateTime<Utc>>,
}

pub async fn create_promo(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(body): Json<CreatePromoBody>,
) -> ApiResult<(StatusCode, Json<ApiResponse<serde_json::Value>>)> {
    let code = body.code.trim().to_uppercase();
    if code.is_empty() {
        return Err(ApiError::bad_request("Code, discountType, and discountValue are required"));
    }
    if DiscountType::parse(&body.discount_type).is_none() {
        return Err(ApiError::bad_request("discountType must be 'percentage' or 'fixed'"));
    }

    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM promo_codes WHERE code = $1")
        .bind(&code)
        .fetch_optional(&state.db)
        .await?;
    if existing.is_some() {
        return Err(ApiError::bad_request("Promo code already exists"));
    }

    let promo_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO promo_codes (id, code, description, discount_type, discount_value,
         min_purchase, max_discount, usage_limit, valid_from, valid_until)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(promo_id)
    .bind(&code)
    .bind(&body.description)
    .bind(&body.discount_type)
    .bind(body.discount_value)
    .bind(body.min_purchase)
    .bind(body.max_discount)
    .bind(body.usage_limit)
    .bind(body.valid_from)
    .bind(body.valid_until)
    .execute(&state.db)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Promo code created successfully",
            json!({ "id": promo_id }),
        )),
    ))
}

#[derive(Debug, Deserialize)]
pub struct UpdatePromoBody {
    pub description: Option<String>,
    #[serde(rename = "discountType")]
    pub discount_type: Option<String>,
    #[serde(rename = "discountValue")]
    pub discount_value: Option<Decimal>,
    #[serde(rename = "minPurchase")]
    pub min_purchase: Option<Decimal>,
    #[serde(rename = "maxDiscount")]
    pub max_discount: Option<Decimal>,
    #[serde(rename = "usageLimit")]
    pub usage_limit: Option<i32>,
    #[serde(rename = "isActive")]
    pub is_active: Option<bool>,
    #[serde(rename = "validFrom")]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(rename = "validUntil")]
    pub valid_until: Option<DateTime<Utc>>,
}

pub async fn update_promo(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdatePromoBody>,
) -> ApiResult<Json<ApiResponse<()>>> {
    if let Some(discount_type) = &body.discount_type {
        if DiscountType::parse(discount_type).is_none() {
            return Err(ApiError::bad_request("discountType must be 'percentage' or 'fixed'"));
        }
    }

    let mut qb: QueryBuilder<sqlx::Postgres> = QueryBuilder::new("UPDATE promo_codes SET ");
    let mut any = false;
    let mut set = |qb: &mut QueryBuilder<sqlx::Postgres>, any: &mut bool| {
        if *any {
            qb.push(", ");
        }
        *any = true;
    };
    if let Some(description) = &body.description {
        set(&mut qb, &mut any);
        qb.push("description = ").push_bind(description.clone());
    }
    if let Some(discount_type) = &body.discount_type {
        set(&mut qb, &mut any);
        qb.push("discount_type = ").push_bind(discount_type.clone());
    }
    if let Some(discount_value) = body.discount_value {
        set(&mut qb, &mut any);
        qb.push("discount_value = ").push_bind(discount_value);
    }
    if let Some(min_purchase) = body.min_purchase {
        set(&mut qb, &mut any);
        qb.push("min_purchase = ").push_bind(min_purchase);
    }
    if let Some(max_discount) = body.max_discount {
        set(&mut qb, &mut any);
        qb.push("max_discount = ").push_bind(max_discount);
    }
    if let Some(usage_limit) = body.usage_limit {
        set(&mut qb, &mut any);
        qb.push("usage_limit = ").push_bind(usage_limit);
    }
    if let Some(is_active) = body.is_active {
        set(&mut qb, &mut any);
        qb.push("is_active = ").push_bind(is_active);
    }
    if let Some(valid_from) = body.valid_from {
        set(&mut qb, &mut any);
        qb.push("valid_from = ").push_bind(valid_from);
    }
    if let Some(valid_until) = body.valid_until {
        set(&mut qb, &mut any);
        qb.push("valid_until = ").push_bind(valid_until);
    }
    if !any {
        return Err(ApiError::bad_request("No fields to update"));
    }
    qb.push(", updated_at = NOW() WHERE id = ").push_bind(id);

    let result = qb.build().execute(&state.db).await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Promo code not found"));
    }
    Ok(Json(ApiResponse::message("Promo code updated successfully")))
}

pub async fn delete_promo(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let result =
        sqlx::query("DELETE FROM promo_codes WHERE id = $1").bind(id).execute(&state.db).await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Promo code not found"));
    }
    Ok(Json(ApiResponse::message("Promo code deleted successfully")))
}
