use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

/// Percent rates applied on top of a cart subtotal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricingRates {
    /// 10 = 10%
    pub tax_rate_percent: Decimal,
    /// Minimum deposit, 50 = 50%
    pub dp_percent: Decimal,
}

/// A fully resolved cart line, ready to be priced
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub base_price: Decimal,
    pub quantity: i32,
    pub option_adjustments: Vec<Decimal>,
}

/// Monetary snapshot of a cart or booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CartTotals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub dp: Decimal,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PricingError {
    #[error("Quantity must be at least 1, got {0}")]
    InvalidQuantity(i32),
}

/// Service for calculating booking prices, tax and deposit
pub struct PriceCalculator;

impl PriceCalculator {
    /// Unit price of a line: base price plus every selected option's adjustment
    ///
    /// Computed once when the line is resolved and stored on the booking item.
    /// A negative result is possible when an option carries a large negative
    /// adjustment; it is kept as configured and logged.
    pub fn unit_price(base_price: Decimal, option_adjustments: &[Decimal]) -> Decimal {
        let unit = base_price + option_adjustments.iter().sum::<Decimal>();
        if unit < Decimal::ZERO {
            tracing::warn!(
                "Negative unit price {} (base {} with adjustments {:?})",
                unit,
                base_price,
                option_adjustments
            );
        }
        unit
    }

    /// Calculate subtotal for a booking item
    ///
    /// # Arguments
    /// * `quantity` - Number of portions ordered
    /// * `unit_price` - Price per portion, frozen at the time it was added
    pub fn calculate_subtotal(quantity: i32, unit_price: Decimal) -> Decimal {
        Decimal::from(quantity) * unit_price
    }

    /// Sum of line subtotals
    pub fn calculate_total(subtotals: &[Decimal]) -> Decimal {
        subtotals.iter().sum()
    }

    /// Tax on a subtotal, rounded to currency precision (2 dp, half away from zero)
    pub fn calculate_tax(subtotal: Decimal, tax_rate_percent: Decimal) -> Decimal {
        (subtotal * tax_rate_percent / Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }

    /// Minimum deposit, always rounded up to a whole currency unit
    pub fn calculate_dp(total: Decimal, dp_percent: Decimal) -> Decimal {
        (total * dp_percent / Decimal::ONE_HUNDRED).ceil()
    }

    /// Derive tax, total and deposit from a subtotal
    pub fn totals_from_subtotal(subtotal: Decimal, rates: PricingRates) -> CartTotals {
        let tax = Self::calculate_tax(subtotal, rates.tax_rate_percent);
        let total = subtotal + tax;
        CartTotals {
            subtotal,
            tax,
            total,
            dp: Self::calculate_dp(total, rates.dp_percent),
        }
    }

    /// Price a cart of resolved lines
    pub fn price_cart(lines: &[CartLine], rates: PricingRates) -> Result<CartTotals, PricingError> {
        let subtotals = lines
            .iter()
            .map(|line| {
                if line.quantity < 1 {
                    return Err(PricingError::InvalidQuantity(line.quantity));
                }
                let unit = Self::unit_price(line.base_price, &line.option_adjustments);
                Ok(Self::calculate_subtotal(line.quantity, unit))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::totals_from_subtotal(Self::calculate_total(&subtotals), rates))
    }

    /// Re-derive totals from stored `(unit_price, quantity)` pairs
    ///
    /// Never consults the catalog: stored unit prices are authoritative.
    pub fn totals_for_items<I>(items: I, rates: PricingRates) -> Result<CartTotals, PricingError>
    where
        I: IntoIterator<Item = (Decimal, i32)>,
    {
        let subtotals = items
            .into_iter()
            .map(|(unit_price, quantity)| {
                if quantity < 1 {
                    return Err(PricingError::InvalidQuantity(quantity));
                }
                Ok(Self::calculate_subtotal(quantity, unit_price))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::totals_from_subtotal(Self::calculate_total(&subtotals), rates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn default_rates() -> PricingRates {
        PricingRates {
            tax_rate_percent: dec!(10),
            dp_percent: dec!(50),
        }
    }

    #[test]
    fn test_calculate_subtotal_basic() {
        assert_eq!(PriceCalculator::calculate_subtotal(2, dec!(45000)), dec!(90000));
    }

    #[test]
    fn test_unit_price_adds_adjustments() {
        let unit = PriceCalculator::unit_price(dec!(45000), &[dec!(5000), dec!(-2000)]);
        assert_eq!(unit, dec!(48000));
    }

    #[test]
    fn test_unit_price_may_go_negative() {
        let unit = PriceCalculator::unit_price(dec!(1000), &[dec!(-1500)]);
        assert_eq!(unit, dec!(-500));
    }

    #[test]
    fn test_calculate_total_empty() {
        assert_eq!(PriceCalculator::calculate_total(&[]), dec!(0));
    }

    #[test]
    fn test_tax_rounds_to_two_places() {
        assert_eq!(PriceCalculator::calculate_tax(dec!(333.33), dec!(10)), dec!(33.33));
        assert_eq!(PriceCalculator::calculate_tax(dec!(0.05), dec!(10)), dec!(0.01));
        assert_eq!(PriceCalculator::calculate_tax(dec!(100000), dec!(10)), dec!(10000));
    }

    #[test]
    fn test_dp_rounds_up() {
        assert_eq!(PriceCalculator::calculate_dp(dec!(45000), dec!(50)), dec!(22500));
        assert_eq!(PriceCalculator::calculate_dp(dec!(45001), dec!(50)), dec!(22501));
        assert_eq!(PriceCalculator::calculate_dp(dec!(33.33), dec!(50)), dec!(17));
    }

    #[test]
    fn test_paket_hemat_scenario() {
        let lines = vec![CartLine {
            base_price: dec!(45000),
            quantity: 2,
            option_adjustments: vec![dec!(5000)],
        }];

        assert_eq!(
            PriceCalculator::unit_price(dec!(45000), &lines[0].option_adjustments),
            dec!(50000)
        );

        let totals = PriceCalculator::price_cart(&lines, default_rates()).unwrap();
        assert_eq!(totals.subtotal, dec!(100000));
        assert_eq!(totals.tax, dec!(10000));
        assert_eq!(totals.total, dec!(110000));
        assert_eq!(totals.dp, dec!(55000));
    }

    #[test]
    fn test_price_cart_rejects_zero_quantity() {
        let lines = vec![CartLine {
            base_price: dec!(10000),
            quantity: 0,
            option_adjustments: vec![],
        }];
        assert_eq!(
            PriceCalculator::price_cart(&lines, default_rates()),
            Err(PricingError::InvalidQuantity(0))
        );
    }

    #[test]
    fn test_totals_for_items_uses_stored_prices() {
        let totals =
            PriceCalculator::totals_for_items(vec![(dec!(50000), 2), (dec!(15000), 1)], default_rates())
                .unwrap();
        assert_eq!(totals.subtotal, dec!(115000));
        assert_eq!(totals.tax, dec!(11500));
        assert_eq!(totals.total, dec!(126500));
        assert_eq!(totals.dp, dec!(63250));
    }

    #[test]
    fn test_zero_rates() {
        let rates = PricingRates {
            tax_rate_percent: dec!(0),
            dp_percent: dec!(0),
        };
        let totals = PriceCalculator::totals_for_items(vec![(dec!(12500), 3)], rates).unwrap();
        assert_eq!(totals.tax, dec!(0));
        assert_eq!(totals.total, dec!(37500));
        assert_eq!(totals.dp, dec!(0));
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn rates(tax: u32, dp: u32) -> PricingRates {
        PricingRates {
            tax_rate_percent: Decimal::from(tax),
            dp_percent: Decimal::from(dp),
        }
    }

    /// total == subtotal + tax and tax == round(subtotal * rate / 100, 2)
    #[test]
    fn prop_totals_invariant() {
        proptest!(|(
            lines in prop::collection::vec((1u32..=500_000u32, 1i32..=20), 1..=10),
            tax in 0u32..=25u32
        )| {
            let cart: Vec<CartLine> = lines
                .iter()
                .map(|&(cents, qty)| CartLine {
                    base_price: Decimal::from(cents) / Decimal::from(100),
                    quantity: qty,
                    option_adjustments: vec![],
                })
                .collect();

            let totals = PriceCalculator::price_cart(&cart, rates(tax, 50)).unwrap();
            let expected_tax = (totals.subtotal * Decimal::from(tax) / Decimal::ONE_HUNDRED)
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

            prop_assert_eq!(totals.total, totals.subtotal + totals.tax);
            prop_assert_eq!(totals.tax, expected_tax);
        });
    }

    /// dp is the smallest whole amount not below total * dp% / 100
    #[test]
    fn prop_dp_is_ceiling() {
        proptest!(|(
            total_cents in 0u64..=100_000_000u64,
            dp in 0u32..=100u32
        )| {
            let total = Decimal::from(total_cents) / Decimal::from(100);
            let exact = total * Decimal::from(dp) / Decimal::ONE_HUNDRED;
            let deposit = PriceCalculator::calculate_dp(total, Decimal::from(dp));

            prop_assert!(deposit >= exact);
            prop_assert!(deposit - exact < Decimal::ONE);
            prop_assert_eq!(deposit, deposit.trunc());
        });
    }

    /// Recomputing from stored items matches the checkout-time pricing
    #[test]
    fn prop_stored_items_reproduce_cart_totals() {
        proptest!(|(
            lines in prop::collection::vec((1u32..=200_000u32, 0u32..=20_000u32, 1i32..=10), 1..=8)
        )| {
            let cart: Vec<CartLine> = lines
                .iter()
                .map(|&(base, adj, qty)| CartLine {
                    base_price: Decimal::from(base),
                    quantity: qty,
                    option_adjustments: vec![Decimal::from(adj)],
                })
                .collect();
            let stored: Vec<(Decimal, i32)> = cart
                .iter()
                .map(|line| (PriceCalculator::unit_price(line.base_price, &line.option_adjustments), line.quantity))
                .collect();

            let from_cart = PriceCalculator::price_cart(&cart, rates(10, 50)).unwrap();
            let from_items = PriceCalculator::totals_for_items(stored, rates(10, 50)).unwrap();
            prop_assert_eq!(from_cart, from_items);
        });
    }
}
