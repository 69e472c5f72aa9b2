//! NatureVita storefront backend
//!
//! REST API for the NatureVita shop: accounts and JWT auth, product
//! catalog, carts, orders with promo codes, Monetbil payment
//! reconciliation, moderated reviews, notifications, and an admin
//! back office.

pub mod audit;
pub mod auth;
pub mod config;
pub mod domain;
pub mod email;
pub mod error;
pub mod gateway;
pub mod response;
pub mod routes;
pub mod state;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use state::AppState;
