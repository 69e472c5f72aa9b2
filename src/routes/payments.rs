//! Payment initiation and gateway webhook reconciliation
//!
//! The webhook is the system's only asynchronous entry point. Delivery is
//! at-least-once and possibly out of order, so the handler is idempotent:
//! the payment row is updated unconditionally, while order-side effects key
//! off the order's current status, never the payment's previous state.

use std::collections::BTreeMap;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::audit::{log_activity, notify_user};
use crate::auth::AuthUser;
use crate::domain::order::{map_gateway_status, webhook_completes_order};
use crate::email::{fire_and_forget, order_confirmation_email};
use crate::error::{ApiError, ApiResult};
use crate::gateway::verify_webhook;
use crate::response::ApiResponse;
use crate::state::AppState;

const PAYMENT_METHOD: &str = "monetbil";
const CURRENCY: &str = "XAF";

#[derive(Debug, Deserialize)]
pub struct InitiatePaymentBody {
    #[serde(rename = "orderId")]
    pub order_id: Uuid,
}

#[derive(Debug, sqlx::FromRow)]
struct PendingOrderRow {
    order_number: String,
    total_amount: Decimal,
    email: String,
    phone: Option<String>,
}

/// Gateway checkout payload. Every field here participates in the signature;
/// the service key itself never travels in the body.
fn gateway_payload(
    order: &PendingOrderRow,
    payment_ref: &str,
    config: &crate::config::GatewayConfig,
    frontend_url: &str,
) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("item_ref".to_string(), order.order_number.clone()),
        ("item_name".to_string(), format!("Commande NatureVita - {}", order.order_number)),
        ("amount".to_string(), order.total_amount.to_string()),
        ("currency".to_string(), CURRENCY.to_string()),
        ("return_url".to_string(), config.return_url.clone()),
        ("notify_url".to_string(), config.notify_url.clone()),
        ("cancel_url".to_string(), config.cancel_url.clone()),
        ("payment_ref".to_string(), payment_ref.to_string()),
        ("country".to_string(), "CM".to_string()),
        ("email".to_string(), order.email.clone()),
        ("phone".to_string(), order.phone.clone().unwrap_or_default()),
        ("logo".to_string(), format!("{frontend_url}/logo.png")),
    ])
}

pub async fn initiate_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<InitiatePaymentBody>,
) -> ApiResult<Json<ApiResponse<serde_json::Value>>> {
    let order: Option<PendingOrderRow> = sqlx::query_as(
        "SELECT o.order_number, o.total_amount, u.email, u.phone
         FROM orders o JOIN users u ON o.user_id = u.id
         WHERE o.id = $1 AND o.user_id = $2 AND o.status = 'pending'",
    )
    .bind(body.order_id)
    .bind(user.id)
    .fetch_optional(&state.db)
    .await?;
    let Some(order) = order else {
        return Err(ApiError::not_found("Order not found or already processed"));
    };

    let existing: Option<(Uuid,)> = sqlx::query_as(
        "SELECT id FROM payments WHERE order_id = $1 AND status IN ('pending', 'completed')",
    )
    .bind(body.order_id)
    .fetch_optional(&state.db)
    .await?;
    if existing.is_some() {
        return Err(ApiError::bad_request("Payment already initiated for this order"));
    }

    let Some(gateway) = &state.gateway else {
        return Err(ApiError::Internal("Payment gateway not configured".into()));
    };

    let payment_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO payments (id, order_id, user_id, payment_method, amount, currency, status)
         VALUES ($1, $2, $3, $4, $5, $6, 'pending')",
    )
    .bind(payment_id)
    .bind(body.order_id)
    .bind(user.id)
    .bind(PAYMENT_METHOD)
    .bind(order.total_amount)
    .bind(CURRENCY)
    .execute(&state.db)
    .await?;

    let payment_ref = format!("PAY-{}-{}", payment_id, Utc::now().timestamp_millis());
    let payload =
        gateway_payload(&order, &payment_ref, gateway.config(), &state.config.frontend_url);

    match gateway.initiate(payload).await {
        Ok(response) => {
            sqlx::query(
                "UPDATE payments SET transaction_id = $1, gateway_id = $2, updated_at = NOW()
                 WHERE id = $3",
            )
            .bind(&payment_ref)
            .bind(&response.transaction_id)
            .bind(payment_id)
            .execute(&state.db)
            .await?;

            log_activity(&state.db, Some(user.id), "payment_initiated", Some("payment"),
                Some(&payment_id.to_string()),
                &format!("Payment initiated for order {}", order.order_number))
                .await;

            Ok(Json(ApiResponse::data(json!({
                "paymentUrl": response.payment_url,
                "transactionId": payment_ref,
            }))))
        }
        Err(err) => {
            // No retry: the user must re-initiate
            sqlx::query(
                "UPDATE payments SET status = 'failed', error_message = $1, updated_at = NOW()
                 WHERE id = $2",
            )
            .bind(err.to_string())
            .bind(payment_id)
            .execute(&state.db)
            .await?;
            tracing::error!(order_id = %body.order_id, "gateway call failed: {}", err);
            Err(ApiError::Internal("Failed to initiate payment".into()))
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct WebhookPaymentRow {
    id: Uuid,
    order_id: Uuid,
    user_id: Uuid,
    order_number: String,
    order_status: String,
}

pub async fn webhook(
    State(state): State<AppState>,
    Json(payload): Json<serde_json::Value>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let Some(fields) = payload.as_object() else {
        return Err(ApiError::bad_request("Invalid payload"));
    };
    let Some(gateway) = &state.gateway else {
        return Err(ApiError::Internal("Payment gateway not configured".into()));
    };

    // Reject with no state change on signature mismatch
    if !verify_webhook(fields, &gateway.config().service_secret) {
        return Err(ApiError::bad_request("Invalid signature"));
    }

    let transaction_id = fields.get("transaction_id").and_then(|v| v.as_str()).unwrap_or("");
    let payment_ref = fields.get("payment_ref").and_then(|v| v.as_str()).unwrap_or("");
    let gateway_status = fields.get("status").and_then(|v| v.as_str()).unwrap_or("");

    let payment: Option<WebhookPaymentRow> = sqlx::query_as(
        "SELECT p.id, p.order_id, o.user_id, o.order_number, o.status AS order_status
         FROM payments p JOIN orders o ON p.order_id = o.id
         WHERE p.transaction_id = $1 OR p.gateway_id = $2",
    )
    .bind(payment_ref)
    .bind(transaction_id)
    .fetch_optional(&state.db)
    .await?;
    let Some(payment) = payment else {
        return Err(ApiError::not_found("Payment not found"));
    };

    let mapped = map_gateway_status(gateway_status);

    let mut tx = state.db.begin().await?;

    // Unconditional: duplicate deliveries re-write the same state
    sqlx::query(
        "UPDATE payments SET status = $1, gateway_id = $2, metadata = $3, updated_at = NOW()
         WHERE id = $4",
    )
    .bind(mapped.as_str())
    .bind(transaction_id)
    .bind(&payload)
    .bind(payment.id)
    .execute(&mut *tx)
    .await?;

    let completes_order = webhook_completes_order(mapped, &payment.order_status);
    if completes_order {
        sqlx::query(
            "UPDATE orders SET status = 'paid', payment_status = 'completed',
             payment_method = $1, payment_id = $2, updated_at = NOW() WHERE id = $3",
        )
        .bind(PAYMENT_METHOD)
        .bind(transaction_id)
        .bind(payment.order_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    if completes_order {
        notify_user(&state.db, payment.user_id, "order_paid", "Paiement confirmé",
            &format!("Votre commande {} a été payée avec succès.", payment.order_number),
            Some(&format!("/orders/{}", payment.order_id)))
            .await;
        log_activity(&state.db, Some(payment.user_id), "payment_completed", Some("payment"),
            Some(&payment.id.to_string()),
            &format!("Payment completed for order {}", payment.order_number))
            .await;

        let recipient: Option<(String, Decimal)> = sqlx::query_as(
            "SELECT u.email, o.total_amount FROM orders o JOIN users u ON o.user_id = u.id
             WHERE o.id = $1",
        )
        .bind(payment.order_id)
        .fetch_optional(&state.db)
        .await?;
        if let Some((email, total)) = recipient {
            let (subject, text) =
                order_confirmation_email(&payment.order_number, &total.to_string());
            fire_and_forget(state.mailer.clone(), email, subject, text);
        }
    }

    Ok(Json(ApiResponse::message("Webhook processed")))
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct PaymentStatusRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub payment_method: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: String,
    pub transaction_id: Option<String>,
    pub error_message: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub order_number: String,
    pub created_at: DateTime<Utc>,
}

pub async fn payment_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<serde_json::Value>>> {
    let payment: Option<PaymentStatusRow> = sqlx::query_as(
        "SELECT p.id, p.order_id, p.payment_method, p.amount, p.currency, p.status,
         p.transaction_id, p.error_message, p.metadata, o.order_number, p.created_at
         FROM payments p JOIN orders o ON p.order_id = o.id
         WHERE p.order_id = $1 AND p.user_id = $2
         ORDER BY p.created_at DESC LIMIT 1",
    )
    .bind(order_id)
    .bind(user.id)
    .fetch_optional(&state.db)
    .await?;
    let Some(payment) = payment else {
        return Err(ApiError::not_found("Payment not found"));
    };
    Ok(Json(ApiResponse::data(json!({ "payment": payment }))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;

    fn config() -> GatewayConfig {
        GatewayConfig {
            api_url: "https://gateway.test/v1/payment".into(),
            service_key: "key".into(),
            service_secret: "secret".into(),
            return_url: "https://shop.test/payment/return".into(),
            notify_url: "https://api.shop.test/api/payments/webhook".into(),
            cancel_url: "https://shop.test/payment/cancel".into(),
        }
    }

    #[test]
    fn test_gateway_payload_field_set() {
        let order = PendingOrderRow {
            order_number: "NV-00010001".into(),
            total_amount: Decimal::new(4500, 0),
            email: "buyer@example.com".into(),
            phone: None,
        };
        let payload = gateway_payload(&order, "PAY-x-1", &config(), "https://shop.test");

        let keys: Vec<&str> = payload.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            [
                "amount", "cancel_url", "country", "currency", "email", "item_name",
                "item_ref", "logo", "notify_url", "payment_ref", "phone", "return_url",
            ]
        );
        assert_eq!(payload["logo"], "https://shop.test/logo.png");
        assert_eq!(payload["phone"], "");
        // credentials stay out of the body
        assert!(!payload.values().any(|v| v == "key" || v == "secret"));
    }
}
