//! HTTP routes

pub mod admin;
pub mod auth;
pub mod cart;
pub mod notifications;
pub mod orders;
pub mod payments;
pub mod products;
pub mod promos;
pub mod reviews;

use axum::routing::{delete, get, post, put};
use axum::{Json, Router};

use crate::state::AppState;

pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async {
            Json(serde_json::json!({"status": "ok", "service": "naturevita"}))
        }))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/verify-email", get(auth::verify_email))
        .route("/api/auth/forgot-password", post(auth::forgot_password))
        .route("/api/auth/reset-password", post(auth::reset_password))
        .route("/api/auth/refresh", post(auth::refresh))
        .route("/api/auth/profile", get(auth::get_profile).put(auth::update_profile))
        .route("/api/auth/change-password", post(auth::change_password))
        .route("/api/products", get(products::list_products))
        .route("/api/products/featured", get(products::featured_products))
        .route("/api/products/categories", get(products::list_categories))
        .route("/api/products/:id", get(products::get_product))
        .route("/api/cart", get(cart::get_cart).post(cart::add_to_cart).delete(cart::clear_cart))
        .route("/api/cart/:id", put(cart::update_cart_item).delete(cart::remove_from_cart))
        .route("/api/orders", get(orders::list_orders).post(orders::create_order))
        .route("/api/orders/:id", get(orders::get_order))
        .route("/api/orders/:id/cancel", post(orders::cancel_order))
        .route("/api/payments/initiate", post(payments::initiate_payment))
        .route("/api/payments/webhook", post(payments::webhook))
        .route("/api/payments/status/:order_id", get(payments::payment_status))
        .route("/api/reviews", post(reviews::create_review))
        .route("/api/reviews/mine", get(reviews::my_reviews))
        .route("/api/reviews/product/:product_id", get(reviews::product_reviews))
        .route("/api/promo-codes/validate", post(promos::validate_promo))
        .route(
            "/api/notifications",
            get(notifications::list_notifications),
        )
        .route("/api/notifications/read-all", put(notifications::mark_all_read))
        .route("/api/notifications/:id/read", put(notifications::mark_read))
        .route("/api/notifications/:id", delete(notifications::delete_notification))
        .route("/api/admin/stats", get(admin::dashboard_stats))
        .route("/api/admin/products", get(admin::list_products).post(admin::create_product))
        .route("/api/admin/products/:id", put(admin::update_product).delete(admin::delete_product))
        .route("/api/admin/categories", get(admin::list_categories).post(admin::create_category))
        .route(
            "/api/admin/categories/:id",
            put(admin::update_category).delete(admin::delete_category),
        )
        .route("/api/admin/users", get(admin::list_users))
        .route("/api/admin/users/:id", get(admin::get_user).put(admin::update_user))
        .route("/api/admin/reviews", get(admin::list_pending_reviews))
        .route("/api/admin/reviews/:id/approve", put(admin::approve_review))
        .route("/api/admin/reviews/:id", delete(admin::delete_review))
        .route("/api/admin/orders", get(admin::list_orders))
        .route("/api/admin/orders/:id", get(admin::get_order))
        .route("/api/admin/orders/:id/status", put(admin::update_order_status))
        .route("/api/admin/promo-codes", get(promos::list_promos).post(promos::create_promo))
        .route("/api/admin/promo-codes/:id", put(promos::update_promo).delete(promos::delete_promo))
        .with_state(state)
}
