//! Order state machine and totals
//!
//! `pending → paid → processing → shipped → delivered`, with `cancelled`
//! reachable from every state except `shipped`/`delivered`. Transitions are
//! driven only by admin updates, the payment webhook, or user cancellation.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::promo::PromoCode;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Paid,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Paid,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }

    /// Users may cancel only before fulfilment starts shipping.
    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Paid | OrderStatus::Processing)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaymentState {
    Pending,
    Completed,
    Failed,
}

impl PaymentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentState::Pending => "pending",
            PaymentState::Completed => "completed",
            PaymentState::Failed => "failed",
        }
    }
}

/// Map the gateway's status string onto the internal payment state.
/// Anything unrecognized stays `pending`.
pub fn map_gateway_status(status: &str) -> PaymentState {
    match status {
        "success" => PaymentState::Completed,
        "failed" => PaymentState::Failed,
        _ => PaymentState::Pending,
    }
}

/// Whether a webhook delivery should transition the order to `paid`.
/// Keys off the order's current status, never the payment's previous state,
/// so duplicate or out-of-order deliveries are harmless.
pub fn webhook_completes_order(mapped: PaymentState, order_status: &str) -> bool {
    mapped == PaymentState::Completed && order_status == OrderStatus::Pending.as_str()
}

/// A cart line joined to its product, read at order-creation time.
#[derive(Clone, Debug)]
pub struct CartLine {
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub stock: i32,
}

impl CartLine {
    pub fn line_subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }

    pub fn in_stock(&self) -> bool {
        self.stock >= self.quantity
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    /// Set only when the promo actually applied
    pub promo_code: Option<String>,
}

/// Price a cart snapshot. A promo that fails any eligibility check is
/// silently ignored and the order proceeds at full price. Tax and shipping
/// are always zero.
pub fn compute_totals(
    lines: &[CartLine],
    promo: Option<&PromoCode>,
    now: chrono::DateTime<chrono::Utc>,
) -> OrderTotals {
    let subtotal: Decimal = lines.iter().map(|l| l.line_subtotal()).sum();
    let (discount, promo_code) = match promo.and_then(|p| p.discount_for(subtotal, now)) {
        Some(discount) => (discount, promo.map(|p| p.code.clone())),
        None => (Decimal::ZERO, None),
    };
    OrderTotals { subtotal, discount, total: subtotal - discount, promo_code }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::promo::tests::promo_percentage;
    use chrono::Utc;

    fn line(price: i64, qty: i32, stock: i32) -> CartLine {
        CartLine {
            product_id: Uuid::new_v4(),
            name: "Widget".into(),
            unit_price: Decimal::new(price, 0),
            quantity: qty,
            stock,
        }
    }

    #[test]
    fn test_status_roundtrip() {
        for status in OrderStatus::ALL {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::parse("refunded"), None);
    }

    #[test]
    fn test_can_cancel() {
        assert!(OrderStatus::Pending.can_cancel());
        assert!(OrderStatus::Paid.can_cancel());
        assert!(!OrderStatus::Shipped.can_cancel());
        assert!(!OrderStatus::Delivered.can_cancel());
    }

    #[test]
    fn test_gateway_status_mapping() {
        assert_eq!(map_gateway_status("success"), PaymentState::Completed);
        assert_eq!(map_gateway_status("failed"), PaymentState::Failed);
        assert_eq!(map_gateway_status("cancelled"), PaymentState::Pending);
        assert_eq!(map_gateway_status(""), PaymentState::Pending);
    }

    #[test]
    fn test_webhook_completes_pending_order_once() {
        assert!(webhook_completes_order(PaymentState::Completed, "pending"));
        // replayed delivery finds the order already paid
        assert!(!webhook_completes_order(PaymentState::Completed, "paid"));
        assert!(!webhook_completes_order(PaymentState::Failed, "pending"));
        assert!(!webhook_completes_order(PaymentState::Pending, "pending"));
    }

    #[test]
    fn test_totals_without_promo() {
        let totals = compute_totals(&[line(1000, 2, 10), line(500, 1, 3)], None, Utc::now());
        assert_eq!(totals.subtotal, Decimal::new(2500, 0));
        assert_eq!(totals.discount, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::new(2500, 0));
        assert_eq!(totals.promo_code, None);
    }

    #[test]
    fn test_save10_scenario() {
        // cart = [{price 1000, qty 2}], SAVE10 = 10% no cap
        let promo = promo_percentage("SAVE10", 10, None);
        let totals = compute_totals(&[line(1000, 2, 5)], Some(&promo), Utc::now());
        assert_eq!(totals.subtotal, Decimal::new(2000, 0));
        assert_eq!(totals.discount, Decimal::new(200, 0));
        assert_eq!(totals.total, Decimal::new(1800, 0));
        assert_eq!(totals.promo_code.as_deref(), Some("SAVE10"));
    }

    #[test]
    fn test_exhausted_promo_is_ignored() {
        let mut promo = promo_percentage("SAVE10", 10, None);
        promo.usage_limit = Some(5);
        promo.used_count = 5;
        let totals = compute_totals(&[line(1000, 2, 5)], Some(&promo), Utc::now());
        assert_eq!(totals.discount, Decimal::ZERO);
        assert_eq!(totals.total, totals.subtotal);
        assert_eq!(totals.promo_code, None);
    }

    #[test]
    fn test_discount_never_exceeds_subtotal() {
        let mut promo = promo_percentage("BIG", 10, None);
        promo.discount_type = "fixed".into();
        promo.discount_value = Decimal::new(5000, 0);
        let totals = compute_totals(&[line(1000, 2, 5)], Some(&promo), Utc::now());
        assert!(totals.discount >= Decimal::ZERO);
        assert!(totals.discount <= totals.subtotal);
        assert_eq!(totals.total, totals.subtotal - totals.discount);
    }

    #[test]
    fn test_stock_check() {
        assert!(line(100, 2, 2).in_stock());
        assert!(!line(100, 3, 2).in_stock());
    }
}
