// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Server-side order pricing.
//!
//! All arithmetic is fixed-point (`rust_decimal`) and checked: an amount that
//! does not fit a `Decimal` is an [`AmountOverflow`], never a panic. Tax is
//! rounded to two places, half away from zero. Every computed amount carries
//! exactly [`MONEY_SCALE`] fractional digits. Caller-supplied totals never
//! enter here.

use rust_decimal::{Decimal, RoundingStrategy};

/// Default tax rate (10%).
pub const DEFAULT_TAX_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);

/// Fractional digits of every money amount.
pub const MONEY_SCALE: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Order amount is out of range")]
pub struct AmountOverflow;

/// Tax rate and flat shipping fee applied to every order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingPolicy {
    pub tax_rate: Decimal,
    pub shipping_flat_fee: Decimal,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            tax_rate: DEFAULT_TAX_RATE,
            shipping_flat_fee: Decimal::ZERO,
        }
    }
}

/// Authoritative totals of one order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total_amount: Decimal,
}

impl PricingPolicy {
    pub fn new(tax_rate: Decimal, shipping_flat_fee: Decimal) -> Self {
        Self {
            tax_rate,
            shipping_flat_fee,
        }
    }

    /// `round(subtotal × rate, 2)`, half-up.
    pub fn tax_on(&self, subtotal: Decimal) -> Result<Decimal, AmountOverflow> {
        let tax = subtotal.checked_mul(self.tax_rate).ok_or(AmountOverflow)?;
        Ok(to_money(tax.round_dp_with_strategy(
            MONEY_SCALE,
            RoundingStrategy::MidpointAwayFromZero,
        )))
    }

    /// Subtotal is the exact sum of the line totals; shipping is not taxed.
    pub fn totals<I>(&self, line_totals: I) -> Result<OrderTotals, AmountOverflow>
    where
        I: IntoIterator<Item = Decimal>,
    {
        let subtotal = line_totals
            .into_iter()
            .try_fold(Decimal::ZERO, |sum, line| sum.checked_add(line))
            .ok_or(AmountOverflow)?;
        let tax = self.tax_on(subtotal)?;
        let total_amount = subtotal
            .checked_add(tax)
            .and_then(|total| total.checked_add(self.shipping_flat_fee))
            .ok_or(AmountOverflow)?;
        Ok(OrderTotals {
            subtotal: to_money(subtotal),
            shipping: to_money(self.shipping_flat_fee),
            tax,
            total_amount: to_money(total_amount),
        })
    }
}

/// `unit_price × quantity`, exact.
pub fn line_total(unit_price: Decimal, quantity: u32) -> Result<Decimal, AmountOverflow> {
    unit_price
        .checked_mul(Decimal::from(quantity))
        .map(to_money)
        .ok_or(AmountOverflow)
}

/// True when `amount` needs no more than [`MONEY_SCALE`] fractional digits.
pub fn is_money_amount(amount: Decimal) -> bool {
    amount.normalize().scale() <= MONEY_SCALE
}

/// Pads to [`MONEY_SCALE`] digits. Inputs are already at most that precise.
fn to_money(amount: Decimal) -> Decimal {
    let mut amount = amount;
    amount.rescale(MONEY_SCALE);
    amount
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn default_rate_is_ten_percent() {
        assert_eq!(PricingPolicy::default().tax_rate, dec("0.10"));
    }

    #[test]
    fn tax_rounds_half_up() {
        let policy = PricingPolicy::default();
        assert_eq!(policy.tax_on(dec("19.995")).unwrap(), dec("2.00"));
        assert_eq!(policy.tax_on(dec("0.05")).unwrap(), dec("0.01"));
        assert_eq!(policy.tax_on(dec("0.04")).unwrap(), dec("0.00"));
        assert_eq!(policy.tax_on(dec("19.98")).unwrap(), dec("2.00"));
    }

    #[test]
    fn subtotal_is_exact_sum_of_lines() {
        let policy = PricingPolicy::default();
        let lines = [
            line_total(dec("9.99"), 2).unwrap(),
            line_total(dec("0.33"), 3).unwrap(),
        ];
        let totals = policy.totals(lines).unwrap();
        assert_eq!(totals.subtotal, dec("20.97"));
        assert_eq!(totals.tax, dec("2.10"));
        assert_eq!(totals.total_amount, dec("23.07"));
    }

    #[test]
    fn example_order_totals() {
        let totals = PricingPolicy::default()
            .totals([line_total(dec("9.99"), 2).unwrap()])
            .unwrap();
        assert_eq!(totals.subtotal, dec("19.98"));
        assert_eq!(totals.tax, dec("2.00"));
        assert_eq!(totals.total_amount, dec("21.98"));
        assert_eq!(totals.shipping, Decimal::ZERO);
    }

    #[test]
    fn shipping_is_added_untaxed() {
        let policy = PricingPolicy::new(dec("0.10"), dec("4.99"));
        let totals = policy.totals([dec("100.00")]).unwrap();
        assert_eq!(totals.tax, dec("10.00"));
        assert_eq!(totals.total_amount, dec("114.99"));
    }

    #[test]
    fn amounts_carry_two_fractional_digits() {
        let line = line_total(dec("25"), 1).unwrap();
        assert_eq!(line.to_string(), "25.00");

        let totals = PricingPolicy::default().totals([line]).unwrap();
        for amount in [totals.subtotal, totals.shipping, totals.tax, totals.total_amount] {
            assert_eq!(amount.scale(), MONEY_SCALE);
        }
        assert_eq!(totals.total_amount.to_string(), "27.50");
    }

    #[test]
    fn overflow_is_an_error() {
        let huge = dec("40000000000000000000000000000");
        assert_eq!(line_total(huge, 2), Err(AmountOverflow));
        assert_eq!(
            PricingPolicy::default().totals([huge, huge]),
            Err(AmountOverflow)
        );
        assert_eq!(
            PricingPolicy::new(Decimal::ZERO, huge).totals([huge]),
            Err(AmountOverflow)
        );
    }

    #[test]
    fn money_amounts_have_at_most_two_decimals() {
        assert!(is_money_amount(dec("9.99")));
        assert!(is_money_amount(dec("25")));
        assert!(is_money_amount(dec("9.990")));
        assert!(!is_money_amount(dec("0.333")));
    }
}
