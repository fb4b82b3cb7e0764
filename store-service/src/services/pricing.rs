use crate::models::DiscountKind;

/// Pricing policy applied to carts and orders. All amounts are integer
/// currency units.
#[derive(Debug, Clone, Copy)]
pub struct PricingPolicy {
    pub shipping_fee: i64,
    pub tax_rate_percent: i64,
    pub loyalty_earn_divisor: i64,
}

impl PricingPolicy {
    pub fn tax(&self, subtotal: i64) -> i64 {
        subtotal * self.tax_rate_percent / 100
    }

    /// Flat fee; empty carts ship nothing.
    pub fn shipping(&self, subtotal: i64) -> i64 {
        if subtotal > 0 { self.shipping_fee } else { 0 }
    }

    pub fn points_earned(&self, total: i64) -> i64 {
        if self.loyalty_earn_divisor > 0 {
            total / self.loyalty_earn_divisor
        } else {
            0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: i64,
    pub shipping_fee: i64,
    pub tax: i64,
    pub discount_amount: i64,
    pub loyalty_discount_amount: i64,
    pub total: i64,
}

/// Discount value for a subtotal, capped at the subtotal so an order can never
/// be discounted below zero by the code alone.
pub fn discount_amount(kind: DiscountKind, value: i64, subtotal: i64) -> i64 {
    let raw = match kind {
        DiscountKind::Percent => subtotal * value / 100,
        DiscountKind::Fixed => value,
    };
    raw.clamp(0, subtotal)
}

/// The number of loyalty points that may actually be redeemed: no more than
/// the balance offered, and no more than what is left to pay.
pub fn redeemable_points(requested: i64, subtotal: i64, shipping: i64, tax: i64, discount: i64) -> i64 {
    let remaining = subtotal + shipping + tax - discount;
    requested.clamp(0, remaining.max(0))
}

/// Compute the monetary breakdown of an order.
///
/// Upholds the invariant `total == subtotal + shipping_fee + tax -
/// discount_amount - loyalty_discount_amount` by construction.
pub fn order_totals(
    policy: &PricingPolicy,
    subtotal: i64,
    discount_amount: i64,
    loyalty_discount_amount: i64,
) -> OrderTotals {
    let shipping_fee = policy.shipping(subtotal);
    let tax = policy.tax(subtotal);
    let total = subtotal + shipping_fee + tax - discount_amount - loyalty_discount_amount;
    OrderTotals {
        subtotal,
        shipping_fee,
        tax,
        discount_amount,
        loyalty_discount_amount,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> PricingPolicy {
        PricingPolicy {
            shipping_fee: 30000,
            tax_rate_percent: 0,
            loyalty_earn_divisor: 100,
        }
    }

    #[test]
    fn checkout_scenario_from_cart() {
        // Variant price 1000, qty 2, shipping 30000, tax 0.
        let totals = order_totals(&policy(), 2000, 0, 0);
        assert_eq!(totals.total, 32000);
        assert_eq!(
            totals.total,
            totals.subtotal + totals.shipping_fee + totals.tax
                - totals.discount_amount
                - totals.loyalty_discount_amount
        );
    }

    #[test]
    fn percent_discount() {
        assert_eq!(discount_amount(DiscountKind::Percent, 10, 100_000), 10_000);
    }

    #[test]
    fn fixed_discount_capped_at_subtotal() {
        assert_eq!(discount_amount(DiscountKind::Fixed, 5000, 3000), 3000);
        assert_eq!(discount_amount(DiscountKind::Fixed, 5000, 80_000), 5000);
    }

    #[test]
    fn tax_rate_applies_to_subtotal() {
        let p = PricingPolicy {
            tax_rate_percent: 8,
            ..policy()
        };
        let totals = order_totals(&p, 100_000, 0, 0);
        assert_eq!(totals.tax, 8000);
        assert_eq!(totals.total, 100_000 + 30000 + 8000);
    }

    #[test]
    fn loyalty_redeem_capped_at_remaining() {
        // Remaining to pay is 32000; more points than that cannot be burned.
        assert_eq!(redeemable_points(50_000, 2000, 30000, 0, 0), 32000);
        assert_eq!(redeemable_points(1000, 2000, 30000, 0, 0), 1000);
        assert_eq!(redeemable_points(-5, 2000, 30000, 0, 0), 0);
    }

    #[test]
    fn invariant_holds_with_discount_and_loyalty() {
        let totals = order_totals(&policy(), 100_000, 10_000, 5000);
        assert_eq!(totals.total, 100_000 + 30000 - 10_000 - 5000);
    }

    #[test]
    fn empty_cart_ships_free() {
        assert_eq!(policy().shipping(0), 0);
    }

    #[test]
    fn points_earned_uses_divisor() {
        assert_eq!(policy().points_earned(32000), 320);
        assert_eq!(policy().points_earned(99), 0);
    }
}
