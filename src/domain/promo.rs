//! Promo code evaluation
//!
//! A promo is applied at order-creation time only when every check passes:
//! active, inside its validity window, under its usage limit, and the order
//! subtotal meets the minimum purchase. During checkout a failed check never
//! errors; the promo is dropped and the order is priced in full.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiscountType {
    Percentage,
    Fixed,
}

impl DiscountType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "percentage" => Some(DiscountType::Percentage),
            "fixed" => Some(DiscountType::Fixed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::Percentage => "percentage",
            DiscountType::Fixed => "fixed",
        }
    }
}

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct PromoCode {
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
}

/// Why a promo did not apply. Surfaced by the validate endpoint; swallowed
/// during order creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PromoRejection {
    Inactive,
    OutsideWindow,
    UsageLimitReached,
    MinPurchaseNotMet,
}

impl PromoCode {
    pub fn check(&self, subtotal: Decimal, now: DateTime<Utc>) -> Result<(), PromoRejection> {
        if !self.is_active {
            return Err(PromoRejection::Inactive);
        }
        if self.valid_from.is_some_and(|from| from > now)
            || self.valid_until.is_some_and(|until| until < now)
        {
            return Err(PromoRejection::OutsideWindow);
        }
        if self.usage_limit.is_some_and(|limit| self.used_count >= limit) {
            return Err(PromoRejection::UsageLimitReached);
        }
        if self.min_purchase.is_some_and(|min| subtotal < min) {
            return Err(PromoRejection::MinPurchaseNotMet);
        }
        Ok(())
    }

    /// Discount for a given subtotal, or `None` when any check fails.
    /// Percentage discounts are capped at `max_discount`; the result never
    /// exceeds the subtotal.
    pub fn discount_for(&self, subtotal: Decimal, now: DateTime<Utc>) -> Option<Decimal> {
        self.check(subtotal, now).ok()?;
        let raw = match DiscountType::parse(&self.discount_type)? {
            DiscountType::Percentage => {
                let pct = subtotal * self.discount_value / Decimal::new(100, 0);
                match self.max_discount {
                    Some(cap) => pct.min(cap),
                    None => pct,
                }
            }
            DiscountType::Fixed => self.discount_value,
        };
        Some(raw.max(Decimal::ZERO).min(subtotal))
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use chrono::Duration;

    pub fn promo_percentage(code: &str, pct: i64, max: Option<i64>) -> PromoCode {
        PromoCode {
            id: Uuid::new_v4(),
            code: code.to_string(),
            description: None,
            discount_type: "percentage".into(),
            discount_value: Decimal::new(pct, 0),
            min_purchase: None,
            max_discount: max.map(|m| Decimal::new(m, 0)),
            usage_limit: None,
            used_count: 0,
            is_active: true,
            valid_from: None,
            valid_until: None,
        }
    }

    #[test]
    fn test_percentage_discount() {
        let promo = promo_percentage("SAVE10", 10, None);
        let d = promo.discount_for(Decimal::new(2000, 0), Utc::now()).unwrap();
        assert_eq!(d, Decimal::new(200, 0));
    }

    #[test]
    fn test_percentage_cap() {
        let promo = promo_percentage("SAVE10", 10, Some(150));
        let d = promo.discount_for(Decimal::new(2000, 0), Utc::now()).unwrap();
        assert_eq!(d, Decimal::new(150, 0));
    }

    #[test]
    fn test_fixed_discount() {
        let mut promo = promo_percentage("FLAT", 0, None);
        promo.discount_type = "fixed".into();
        promo.discount_value = Decimal::new(500, 0);
        let d = promo.discount_for(Decimal::new(2000, 0), Utc::now()).unwrap();
        assert_eq!(d, Decimal::new(500, 0));
    }

    #[test]
    fn test_inactive_rejected() {
        let mut promo = promo_percentage("OFF", 10, None);
        promo.is_active = false;
        assert_eq!(
            promo.check(Decimal::new(2000, 0), Utc::now()),
            Err(PromoRejection::Inactive)
        );
        assert_eq!(promo.discount_for(Decimal::new(2000, 0), Utc::now()), None);
    }

    #[test]
    fn test_validity_window() {
        let now = Utc::now();
        let mut promo = promo_percentage("SOON", 10, None);
        promo.valid_from = Some(now + Duration::hours(1));
        assert_eq!(promo.check(Decimal::new(100, 0), now), Err(PromoRejection::OutsideWindow));

        let mut promo = promo_percentage("GONE", 10, None);
        promo.valid_until = Some(now - Duration::hours(1));
        assert_eq!(promo.check(Decimal::new(100, 0), now), Err(PromoRejection::OutsideWindow));

        let mut promo = promo_percentage("LIVE", 10, None);
        promo.valid_from = Some(now - Duration::hours(1));
        promo.valid_until = Some(now + Duration::hours(1));
        assert!(promo.check(Decimal::new(100, 0), now).is_ok());
    }

    #[test]
    fn test_usage_limit() {
        let mut promo = promo_percentage("LIM", 10, None);
        promo.usage_limit = Some(3);
        promo.used_count = 2;
        assert!(promo.check(Decimal::new(100, 0), Utc::now()).is_ok());
        promo.used_count = 3;
        assert_eq!(
            promo.check(Decimal::new(100, 0), Utc::now()),
            Err(PromoRejection::UsageLimitReached)
        );
    }

    #[test]
    fn test_min_purchase() {
        let mut promo = promo_percentage("MIN", 10, None);
        promo.min_purchase = Some(Decimal::new(1000, 0));
        assert_eq!(
            promo.check(Decimal::new(999, 0), Utc::now()),
            Err(PromoRejection::MinPurchaseNotMet)
        );
        assert!(promo.check(Decimal::new(1000, 0), Utc::now()).is_ok());
    }
}
