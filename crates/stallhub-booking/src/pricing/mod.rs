//! Booking price calculation.
//!
//! Amounts are rounded to two decimals at every aggregation boundary:
//! per stall, per tax line, and for each aggregate. Totals are sums of
//! rounded parts, never roundings of raw sums.

use rust_decimal::{Decimal, RoundingStrategy};

use stallhub_entity::booking::{PriceBreakdown, StallCharge, TaxCharge};
use stallhub_entity::exhibition::{Discount, DiscountKind, TaxRate};
use stallhub_entity::stall::Stall;

/// Rounds half away from zero to two decimals.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Computes the [`PriceBreakdown`] for a set of stalls.
#[derive(Debug, Clone, Copy, Default)]
pub struct PriceCalculator;

impl PriceCalculator {
    /// Prices `stalls` in the given order under an optional discount and
    /// the given tax lines. Inactive tax lines are skipped.
    pub fn price<'a>(
        &self,
        stalls: &[Stall],
        discount: Option<&Discount>,
        taxes: impl IntoIterator<Item = &'a TaxRate>,
    ) -> PriceBreakdown {
        let bases: Vec<Decimal> = stalls
            .iter()
            .map(|s| round2(s.rate_per_unit * s.area()))
            .collect();
        let discounts = discount_shares(&bases, discount);

        let charges: Vec<StallCharge> = stalls
            .iter()
            .zip(bases.iter().zip(discounts))
            .map(|(stall, (&base, discount))| StallCharge {
                stall_id: stall.id,
                stall_number: stall.number.clone(),
                area: stall.area(),
                rate: stall.rate_per_unit,
                base_amount: base,
                discount_amount: discount,
                amount_after_discount: round2(base - discount),
            })
            .collect();

        let base_amount = round2(charges.iter().map(|c| c.base_amount).sum());
        let discount_amount = round2(charges.iter().map(|c| c.discount_amount).sum());
        let amount_after_discount =
            round2(charges.iter().map(|c| c.amount_after_discount).sum());

        let taxes: Vec<TaxCharge> = taxes
            .into_iter()
            .filter(|t| t.is_active)
            .map(|t| TaxCharge {
                name: t.name.clone(),
                rate: t.rate,
                amount: round2(amount_after_discount * t.rate / Decimal::ONE_HUNDRED),
            })
            .collect();
        let tax_amount = round2(taxes.iter().map(|t| t.amount).sum());

        PriceBreakdown {
            stalls: charges,
            base_amount,
            discount_amount,
            amount_after_discount,
            taxes,
            tax_amount,
            total_amount: round2(amount_after_discount + tax_amount),
        }
    }
}

/// Per-stall discount amounts, aligned with `bases`.
fn discount_shares(bases: &[Decimal], discount: Option<&Discount>) -> Vec<Decimal> {
    let Some(discount) = discount.filter(|d| d.is_active) else {
        return vec![Decimal::ZERO; bases.len()];
    };
    let value = discount.value.max(Decimal::ZERO);

    match discount.kind {
        DiscountKind::Percentage => {
            let pct = value.min(Decimal::ONE_HUNDRED);
            bases
                .iter()
                .map(|b| round2(b * pct / Decimal::ONE_HUNDRED))
                .collect()
        }
        DiscountKind::Fixed => {
            let total: Decimal = bases.iter().sum();
            if total <= Decimal::ZERO {
                return vec![Decimal::ZERO; bases.len()];
            }
            bases
                .iter()
                .map(|b| round2((value * b / total).min(*b)))
                .collect()
        }
    }
}
