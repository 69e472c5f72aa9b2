//! Domain module
pub mod order;
pub mod promo;

pub use order::{compute_totals, map_gateway_status, CartLine, OrderStatus, OrderTotals, PaymentState};
pub use promo::{DiscountType, PromoCode};
