//! Cart and order pricing.
//!
//! Pure computation over already-fetched rows; nothing in this module
//! touches the database. Two deliberately separate policies live here:
//! the cart preview policy (flat 15% tax, threshold shipping) and the
//! committed-order policy (15% for product orders, 10% for stays and
//! activities, shipping only on product orders). They are never merged.

use crate::{
    config::AppConfig,
    entities::{promo_code, DiscountType, OrderType},
};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

/// Monetary rounding used everywhere: half away from zero, pinned to
/// exactly two decimals so amounts serialize as `x.yz`.
pub fn round2(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

pub fn decimal_from_f64(value: f64) -> Decimal {
    Decimal::from_f64_retain(value)
        .unwrap_or_default()
        .round_dp(4)
}

/// Numeric pricing policy, sourced from configuration.
#[derive(Debug, Clone)]
pub struct PricingPolicy {
    pub cart_tax_rate: Decimal,
    pub product_order_tax_rate: Decimal,
    pub service_order_tax_rate: Decimal,
    pub free_shipping_threshold: Decimal,
    pub standard_shipping_rate: Decimal,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        use rust_decimal_macros::dec;
        Self {
            cart_tax_rate: dec!(0.15),
            product_order_tax_rate: dec!(0.15),
            service_order_tax_rate: dec!(0.10),
            free_shipping_threshold: dec!(50),
            standard_shipping_rate: dec!(5.99),
        }
    }
}

impl PricingPolicy {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            cart_tax_rate: decimal_from_f64(cfg.cart_tax_rate),
            product_order_tax_rate: decimal_from_f64(cfg.product_order_tax_rate),
            service_order_tax_rate: decimal_from_f64(cfg.service_order_tax_rate),
            free_shipping_threshold: decimal_from_f64(cfg.free_shipping_threshold),
            standard_shipping_rate: decimal_from_f64(cfg.standard_shipping_rate),
        }
    }
}

/// A cart line that survived the active filter, reduced to what pricing
/// needs.
#[derive(Debug, Clone)]
pub struct PricedLine {
    pub unit_price: Decimal,
    pub quantity: i32,
}

/// Cart-level pricing summary; identical whether computed for a display
/// read or as part of a promo application response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub item_count: usize,
    pub total_quantity: i64,
}

/// Subtotal over surviving lines, rounded to 2 decimals.
pub fn subtotal(lines: &[PricedLine]) -> Decimal {
    round2(
        lines
            .iter()
            .map(|l| l.unit_price * Decimal::from(l.quantity))
            .sum(),
    )
}

/// Discount a promo grants against a subtotal. Zero when the minimum
/// amount is not met; percentage discounts are capped by
/// `maximum_discount`, fixed discounts by the subtotal itself.
pub fn discount_for(promo: &promo_code::Model, subtotal: Decimal) -> Decimal {
    if let Some(minimum) = promo.minimum_amount {
        if subtotal < minimum {
            return Decimal::ZERO;
        }
    }

    let discount = match promo.discount_type {
        DiscountType::Percentage => {
            let raw = subtotal * promo.discount_value / Decimal::from(100);
            match promo.maximum_discount {
                Some(cap) => raw.min(cap),
                None => raw,
            }
        }
        DiscountType::Fixed => promo.discount_value.min(subtotal),
    };

    round2(discount.max(Decimal::ZERO))
}

/// Full cart pricing pipeline: subtotal, discount, shipping, tax, total.
pub fn cart_summary(
    policy: &PricingPolicy,
    lines: &[PricedLine],
    promo: Option<&promo_code::Model>,
) -> CartSummary {
    let subtotal = self::subtotal(lines);
    let discount = round2(promo.map(|p| discount_for(p, subtotal)).unwrap_or_default());
    let discounted = subtotal - discount;

    let shipping = round2(if discounted >= policy.free_shipping_threshold {
        Decimal::ZERO
    } else {
        policy.standard_shipping_rate
    });
    let tax = round2(discounted * policy.cart_tax_rate);
    let total = round2(discounted + shipping + tax);

    CartSummary {
        subtotal,
        discount,
        shipping,
        tax,
        total,
        item_count: lines.len(),
        total_quantity: lines.iter().map(|l| i64::from(l.quantity)).sum(),
    }
}

/// Committed-order totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
}

/// Order-level pricing: tax rate depends on order type, shipping applies
/// to product orders under the threshold only.
pub fn order_totals(policy: &PricingPolicy, order_type: OrderType, subtotal: Decimal) -> OrderTotals {
    let subtotal = round2(subtotal);
    let tax_rate = match order_type {
        OrderType::Product => policy.product_order_tax_rate,
        OrderType::Property | OrderType::Activity => policy.service_order_tax_rate,
    };
    let shipping = round2(
        if order_type == OrderType::Product && subtotal < policy.free_shipping_threshold {
            policy.standard_shipping_rate
        } else {
            Decimal::ZERO
        },
    );
    let tax = round2(subtotal * tax_rate);
    let total = round2(subtotal + tax + shipping);

    OrderTotals {
        subtotal,
        tax,
        shipping,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn promo(
        discount_type: DiscountType,
        value: Decimal,
        minimum: Option<Decimal>,
        cap: Option<Decimal>,
    ) -> promo_code::Model {
        promo_code::Model {
            id: Uuid::new_v4(),
            code: "TEST".to_string(),
            discount_type,
            discount_value: value,
            minimum_amount: minimum,
            maximum_discount: cap,
            usage_limit: None,
            expires_at: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn lines(rows: &[(Decimal, i32)]) -> Vec<PricedLine> {
        rows.iter()
            .map(|&(unit_price, quantity)| PricedLine {
                unit_price,
                quantity,
            })
            .collect()
    }

    #[test]
    fn summary_under_threshold_charges_shipping() {
        // subtotal 40.00 -> shipping 5.99, tax 6.00, total 51.99
        let policy = PricingPolicy::default();
        let summary = cart_summary(&policy, &lines(&[(dec!(20.00), 2)]), None);

        assert_eq!(summary.subtotal, dec!(40.00));
        assert_eq!(summary.discount, dec!(0));
        assert_eq!(summary.shipping, dec!(5.99));
        assert_eq!(summary.tax, dec!(6.00));
        assert_eq!(summary.total, dec!(51.99));
        assert_eq!(summary.item_count, 1);
        assert_eq!(summary.total_quantity, 2);
    }

    #[test]
    fn fixed_discount_can_bring_cart_to_exact_threshold() {
        // subtotal 60.00 with a fixed $10 promo: discounted 50 meets the
        // threshold exactly, so shipping is free
        let policy = PricingPolicy::default();
        let promo = promo(DiscountType::Fixed, dec!(10), None, None);
        let summary = cart_summary(&policy, &lines(&[(dec!(30.00), 2)]), Some(&promo));

        assert_eq!(summary.subtotal, dec!(60.00));
        assert_eq!(summary.discount, dec!(10.00));
        assert_eq!(summary.shipping, dec!(0));
        assert_eq!(summary.tax, dec!(7.50));
        assert_eq!(summary.total, dec!(57.50));
    }

    #[test]
    fn percentage_discount_capped_at_maximum() {
        let promo = promo(DiscountType::Percentage, dec!(50), None, Some(dec!(15)));
        assert_eq!(discount_for(&promo, dec!(100)), dec!(15));
    }

    #[test]
    fn percentage_discount_uncapped() {
        let promo = promo(DiscountType::Percentage, dec!(10), None, None);
        assert_eq!(discount_for(&promo, dec!(85.50)), dec!(8.55));
    }

    #[test]
    fn fixed_discount_never_exceeds_subtotal() {
        let promo = promo(DiscountType::Fixed, dec!(25), None, None);
        assert_eq!(discount_for(&promo, dec!(18.00)), dec!(18.00));
    }

    #[test]
    fn discount_zero_below_minimum_amount() {
        let promo = promo(DiscountType::Fixed, dec!(10), Some(dec!(50)), None);
        assert_eq!(discount_for(&promo, dec!(49.99)), Decimal::ZERO);
        assert_eq!(discount_for(&promo, dec!(50.00)), dec!(10.00));
    }

    #[test]
    fn empty_cart_summary() {
        let policy = PricingPolicy::default();
        let summary = cart_summary(&policy, &[], None);
        assert_eq!(summary.subtotal, Decimal::ZERO);
        assert_eq!(summary.item_count, 0);
        assert_eq!(summary.total_quantity, 0);
        // An empty cart is below the free-shipping threshold, so the flat
        // rate still applies.
        assert_eq!(summary.shipping, dec!(5.99));
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        assert_eq!(round2(dec!(1.005)), dec!(1.01));
        assert_eq!(round2(dec!(2.675)), dec!(2.68));
        assert_eq!(round2(dec!(1.004)), dec!(1.00));
    }

    #[test]
    fn rounding_pins_two_decimal_places() {
        assert_eq!(round2(dec!(5)).to_string(), "5.00");
        assert_eq!(round2(dec!(4.0)).to_string(), "4.00");
        assert_eq!(round2(Decimal::ZERO).to_string(), "0.00");
    }

    #[test]
    fn subtotal_rounds_the_sum_not_each_line() {
        // Per-line rounding would give 1.01 + 1.01 = 2.02.
        let summed = subtotal(&lines(&[(dec!(1.005), 1), (dec!(1.005), 1)]));
        assert_eq!(summed, dec!(2.01));
    }

    #[test]
    fn product_order_totals_include_shipping_under_threshold() {
        let policy = PricingPolicy::default();
        let totals = order_totals(&policy, OrderType::Product, dec!(40));
        assert_eq!(totals.tax, dec!(6.00));
        assert_eq!(totals.shipping, dec!(5.99));
        assert_eq!(totals.total, dec!(51.99));
    }

    #[test]
    fn product_order_totals_free_shipping_at_threshold() {
        let policy = PricingPolicy::default();
        let totals = order_totals(&policy, OrderType::Product, dec!(50));
        assert_eq!(totals.shipping, Decimal::ZERO);
        assert_eq!(totals.total, dec!(57.50));
    }

    #[test]
    fn service_orders_use_ten_percent_and_no_shipping() {
        let policy = PricingPolicy::default();
        let stay = order_totals(&policy, OrderType::Property, dec!(400));
        assert_eq!(stay.tax, dec!(40.00));
        assert_eq!(stay.shipping, Decimal::ZERO);
        assert_eq!(stay.total, dec!(440.00));

        let activity = order_totals(&policy, OrderType::Activity, dec!(30));
        assert_eq!(activity.tax, dec!(3.00));
        assert_eq!(activity.shipping, Decimal::ZERO);
    }

    #[test]
    fn policy_from_config_round_trips_defaults() {
        let cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "a_test_secret_that_is_long_enough_to_pass".to_string(),
            "127.0.0.1".to_string(),
            0,
        );
        let policy = PricingPolicy::from_config(&cfg);
        assert_eq!(policy.cart_tax_rate, dec!(0.15));
        assert_eq!(policy.service_order_tax_rate, dec!(0.10));
        assert_eq!(policy.free_shipping_threshold, dec!(50));
        assert_eq!(policy.standard_shipping_rate, dec!(5.99));
    }
}
