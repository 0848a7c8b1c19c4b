//! Property-based tests over the pricing engine: the summary identities
//! must hold for arbitrary carts and promo definitions.

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;
use shorestay_api::entities::{promo_code, DiscountType};
use shorestay_api::services::pricing::{self, PricedLine, PricingPolicy};
use uuid::Uuid;

fn price_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..100_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn lines_strategy() -> impl Strategy<Value = Vec<PricedLine>> {
    prop::collection::vec(
        (price_strategy(), 1i32..20).prop_map(|(unit_price, quantity)| PricedLine {
            unit_price,
            quantity,
        }),
        0..8,
    )
}

fn promo_strategy() -> impl Strategy<Value = promo_code::Model> {
    (
        prop_oneof![Just(DiscountType::Percentage), Just(DiscountType::Fixed)],
        1i64..10_000,
        prop::option::of(0i64..50_000),
    )
        .prop_map(|(discount_type, value, maximum)| {
            let discount_value = match discount_type {
                // Percentages stay within 0..=100.
                DiscountType::Percentage => Decimal::new(value % 100 + 1, 0),
                DiscountType::Fixed => Decimal::new(value, 2),
            };
            promo_code::Model {
                id: Uuid::new_v4(),
                code: "PROP".to_string(),
                discount_type,
                discount_value,
                minimum_amount: None,
                maximum_discount: maximum.map(|m| Decimal::new(m, 2)),
                usage_limit: None,
                expires_at: None,
                is_active: true,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            }
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn totals_compose_from_their_parts(lines in lines_strategy(), promo in promo_strategy()) {
        let policy = PricingPolicy::default();
        let summary = pricing::cart_summary(&policy, &lines, Some(&promo));

        prop_assert_eq!(
            summary.total,
            summary.subtotal - summary.discount + summary.shipping + summary.tax
        );
    }

    #[test]
    fn discount_never_exceeds_subtotal(lines in lines_strategy(), promo in promo_strategy()) {
        let policy = PricingPolicy::default();
        let summary = pricing::cart_summary(&policy, &lines, Some(&promo));

        prop_assert!(summary.discount >= Decimal::ZERO);
        prop_assert!(summary.discount <= summary.subtotal);
    }

    #[test]
    fn shipping_is_free_exactly_at_threshold(lines in lines_strategy(), promo in promo_strategy()) {
        let policy = PricingPolicy::default();
        let summary = pricing::cart_summary(&policy, &lines, Some(&promo));

        let discounted = summary.subtotal - summary.discount;
        if discounted >= Decimal::new(50, 0) {
            prop_assert_eq!(summary.shipping, Decimal::ZERO);
        } else {
            prop_assert_eq!(summary.shipping, Decimal::new(599, 2));
        }
    }

    #[test]
    fn tax_applies_to_the_discounted_subtotal(lines in lines_strategy(), promo in promo_strategy()) {
        let policy = PricingPolicy::default();
        let summary = pricing::cart_summary(&policy, &lines, Some(&promo));

        let expected = pricing::round2((summary.subtotal - summary.discount) * Decimal::new(15, 2));
        prop_assert_eq!(summary.tax, expected);
    }

    #[test]
    fn quantities_are_counted(lines in lines_strategy()) {
        let policy = PricingPolicy::default();
        let summary = pricing::cart_summary(&policy, &lines, None);

        prop_assert_eq!(summary.item_count, lines.len());
        let quantity: i64 = lines.iter().map(|l| i64::from(l.quantity)).sum();
        prop_assert_eq!(summary.total_quantity, quantity);
    }
}
