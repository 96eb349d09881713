// Core services
pub mod orders;
pub mod users;

// Per-customer serialization of cart mutations and checkout
pub mod locks;

// Commerce
pub mod commerce;

use rust_decimal::Decimal;
use validator::ValidationError;

use crate::errors::ServiceError;

pub use locks::CustomerLocks;
pub use orders::OrderService;
pub use users::UserService;

/// Largest amount a `DECIMAL(16,4)` money column holds: 999999999999.9999
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_874_919_423, 2_328_306, 0, false, 4);

/// Accepts money amounts between zero and [`MAX_AMOUNT`].
pub(crate) fn validate_amount(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        let mut err = ValidationError::new("non_negative");
        err.message = Some("Amount must not be negative".into());
        return Err(err);
    }
    if *value > MAX_AMOUNT {
        let mut err = ValidationError::new("max_amount");
        err.message = Some(format!("Amount must not exceed {}", MAX_AMOUNT).into());
        return Err(err);
    }
    Ok(())
}

fn amount_too_large() -> ServiceError {
    ServiceError::ValidationError(format!("Amount must not exceed {}", MAX_AMOUNT))
}

/// `unit_price × quantity`, rejected when it leaves the storable range.
pub fn line_subtotal(unit_price: Decimal, quantity: i32) -> Result<Decimal, ServiceError> {
    unit_price
        .checked_mul(Decimal::from(quantity))
        .filter(|subtotal| *subtotal <= MAX_AMOUNT)
        .ok_or_else(amount_too_large)
}

/// Sum of amounts without overflow. The caller bounds the result if it is
/// stored.
pub fn checked_total(amounts: impl IntoIterator<Item = Decimal>) -> Result<Decimal, ServiceError> {
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |total, amount| total.checked_add(amount))
        .ok_or_else(amount_too_large)
}

/// Order totals are stored, so they share the line bound.
pub fn order_total(subtotals: impl IntoIterator<Item = Decimal>) -> Result<Decimal, ServiceError> {
    Some(checked_total(subtotals)?)
        .filter(|total| *total <= MAX_AMOUNT)
        .ok_or_else(amount_too_large)
}
