//! Property-based tests for pagination, order pricing and input validation.

use proptest::prelude::*;
use rust_decimal::Decimal;
use storefront_api::{
    repositories::PageRequest,
    services::{orders::OrderLine, users::USERNAME_RE, MAX_AMOUNT},
};
use uuid::Uuid;
use validator::Validate;

fn price_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000, 0u32..100).prop_map(|(units, cents)| {
        Decimal::from(units) + Decimal::new(cents as i64, 2)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn pages_partition_the_listing(total in 0usize..300, per_page in 1u64..=100) {
        let items: Vec<usize> = (0..total).collect();
        let pages = (total as u64).div_ceil(per_page).max(1);
        let mut seen = Vec::new();

        for page in 1..=pages {
            let request = PageRequest::new(page, per_page, 100).unwrap();
            let slice = request.slice(items.clone());
            prop_assert_eq!(slice.total, total as u64);
            prop_assert!(slice.items.len() as u64 <= per_page);
            prop_assert_eq!(slice.total_pages(), (total as u64).div_ceil(per_page));
            seen.extend(slice.items);
        }

        prop_assert_eq!(seen, items);
    }

    #[test]
    fn out_of_range_page_sizes_are_rejected(per_page in 101u64..10_000) {
        prop_assert!(PageRequest::new(1, per_page, 100).is_err());
        prop_assert!(PageRequest::new(1, 0, 100).is_err());
        prop_assert!(PageRequest::new(0, 10, 100).is_err());
    }

    #[test]
    fn order_totals_are_sums_of_subtotals(
        lines in prop::collection::vec((price_strategy(), 1i32..1_000), 1..20)
    ) {
        let lines: Vec<OrderLine> = lines
            .into_iter()
            .map(|(price_at_order, quantity)| OrderLine {
                product_id: Uuid::new_v4(),
                quantity,
                price_at_order,
            })
            .collect();

        let total: Decimal = lines.iter().map(|line| line.subtotal().unwrap()).sum();
        let expected: Decimal = lines
            .iter()
            .map(|line| line.price_at_order * Decimal::from(line.quantity))
            .sum();

        prop_assert_eq!(total, expected);
        prop_assert!(!total.is_sign_negative() || total.is_zero());
        for line in &lines {
            prop_assert!(line.validate().is_ok());
        }
    }

    #[test]
    fn non_positive_quantities_fail_validation(quantity in -1_000i32..=0) {
        let line = OrderLine {
            product_id: Uuid::new_v4(),
            quantity,
            price_at_order: Decimal::ONE,
        };
        prop_assert!(line.validate().is_err());
    }

    #[test]
    fn oversized_amounts_never_panic(
        mantissa in any::<i64>(),
        scale in 0u32..=10,
        quantity in 1i32..=i32::MAX,
    ) {
        let price = Decimal::new(mantissa, scale)
            .abs()
            .checked_mul(Decimal::from(1_000_000_000_000_000i64))
            .unwrap_or(Decimal::MAX);
        let line = OrderLine {
            product_id: Uuid::new_v4(),
            quantity,
            price_at_order: price,
        };
        // Either a storable subtotal or a validation error, never an overflow
        match line.subtotal() {
            Ok(subtotal) => prop_assert!(subtotal <= MAX_AMOUNT),
            Err(err) => prop_assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST),
        }
    }

    #[test]
    fn well_formed_usernames_match(username in "[A-Za-z0-9_]{3,80}") {
        prop_assert!(USERNAME_RE.is_match(&username));
    }

    #[test]
    fn usernames_with_punctuation_do_not_match(
        prefix in "[a-z]{2,10}",
        symbol in "[-.@ !]",
    ) {
        let username = format!("{}{}", prefix, symbol);
        prop_assert!(!USERNAME_RE.is_match(&username));
    }
}
