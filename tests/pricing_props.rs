//! Property tests for order pricing.

use proptest::prelude::*;
use rust_decimal::Decimal;
use storefront_api::pricing::{
    DeliveryOption, PricedLine, SPRINT10_CAP, compute_totals, from_minor, round_money, to_minor,
};

/// Unit prices with up to four decimal places, so sub-paise amounts show up.
fn line_strategy() -> impl Strategy<Value = PricedLine> {
    (0i64..500_000_000, 0u32..120, 0u32..=4)
        .prop_map(|(mantissa, qty, scale)| PricedLine::new(Decimal::new(mantissa, scale), qty))
}

fn delivery_strategy() -> impl Strategy<Value = DeliveryOption> {
    prop_oneof![Just(DeliveryOption::Standard), Just(DeliveryOption::Express)]
}

fn promo_strategy() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some("SPRINT10".to_string())),
        Just(Some(" shipfree ".to_string())),
        "[A-Z0-9]{0,10}".prop_map(Some),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn total_is_sum_of_parts_and_never_negative(
        lines in prop::collection::vec(line_strategy(), 0..8),
        delivery in delivery_strategy(),
        protection in any::<bool>(),
        promo in promo_strategy(),
    ) {
        let totals = compute_totals(&lines, delivery, protection, promo.as_deref());

        prop_assert!(totals.total_price >= Decimal::ZERO);
        prop_assert!(totals.discount_price >= Decimal::ZERO);
        prop_assert!(totals.discount_price <= SPRINT10_CAP.max(totals.shipping_price));

        let expected = (totals.items_price + totals.shipping_price + totals.protection_price
            - totals.discount_price)
            .max(Decimal::ZERO);
        prop_assert_eq!(totals.total_price, expected);

        let exact: Decimal = lines.iter().map(PricedLine::line_total).sum();
        prop_assert_eq!(totals.items_price, round_money(exact));
        prop_assert!((totals.items_price - exact).abs() <= Decimal::new(5, 3));
        prop_assert_eq!(round_money(totals.total_price), totals.total_price);
    }

    #[test]
    fn adding_a_line_never_lowers_items_price(
        lines in prop::collection::vec(line_strategy(), 0..6),
        extra in line_strategy(),
        delivery in delivery_strategy(),
    ) {
        let before = compute_totals(&lines, delivery, false, None);
        let mut more = lines.clone();
        more.push(extra);
        let after = compute_totals(&more, delivery, false, None);
        prop_assert!(after.items_price >= before.items_price);
    }

    #[test]
    fn minor_units_round_trip_for_money_values(paise in -1_000_000_000i64..1_000_000_000) {
        let amount = from_minor(paise);
        prop_assert_eq!(round_money(amount), amount);
        prop_assert_eq!(to_minor(amount), Some(paise));
    }
}
