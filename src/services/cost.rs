//! Net unit cost of an invoice line, and checked money arithmetic.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::errors::ServiceError;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// `(unit_price - unit_price * discount_pct / 100) * (1 + vat_pct / 100)`
///
/// Exact decimal arithmetic with no intermediate rounding. The result is the
/// stored cost basis of the line. Inputs whose cost does not fit in a
/// `Decimal` are rejected as [`ServiceError::InvalidInput`].
pub fn net_unit_cost(
    unit_price: Decimal,
    discount_pct: Decimal,
    vat_pct: Decimal,
) -> Result<Decimal, ServiceError> {
    unit_price
        .checked_mul(discount_pct)
        .and_then(|discount| discount.checked_div(HUNDRED))
        .and_then(|discount| unit_price.checked_sub(discount))
        .and_then(|discounted| {
            vat_pct
                .checked_div(HUNDRED)
                .and_then(|vat| Decimal::ONE.checked_add(vat))
                .and_then(|factor| discounted.checked_mul(factor))
        })
        .ok_or_else(|| {
            ServiceError::InvalidInput(format!(
                "net unit cost overflows for unit price {}, discount {}%, VAT {}%",
                unit_price, discount_pct, vat_pct
            ))
        })
}

/// `quantity * unit_cost`, or `None` when the product is not representable.
pub fn line_value(quantity: i32, unit_cost: Decimal) -> Option<Decimal> {
    Decimal::from(quantity).checked_mul(unit_cost)
}

/// Sums monetary amounts, failing instead of overflowing.
pub fn checked_total<I>(amounts: I) -> Result<Decimal, ServiceError>
where
    I: IntoIterator<Item = Decimal>,
{
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, amount| acc.checked_add(amount))
        .ok_or_else(|| ServiceError::InternalError("monetary total overflows".to_string()))
}

/// Rounds a monetary amount to two decimal places for display.
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
}
