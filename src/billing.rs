//! Monetary arithmetic for order submission.
//!
//! All amounts are integer cents. The daily discount budget is distributed
//! across the meal orders of a submission in submission order; the delivery
//! surcharge lands on the first order of the user's first pay order of the
//! day and nowhere else.

/// Amounts computed for one meal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderAmounts {
    pub total_cents: i64,
    pub discount_cents: i64,
    pub pay_cents: i64,
}

/// What is left of a user's daily discount budget, plus the pending
/// surcharge if this is their first pay order of the day.
#[derive(Debug)]
pub struct DiscountBudget {
    remaining_cents: i64,
    surcharge_cents: i64,
}

impl DiscountBudget {
    pub fn new(
        daily_budget_cents: i64,
        spent_today_cents: i64,
        surcharge_due: bool,
        surcharge_cents: i64,
    ) -> Self {
        Self {
            remaining_cents: (daily_budget_cents - spent_today_cents).max(0),
            surcharge_cents: if surcharge_due { surcharge_cents } else { 0 },
        }
    }

    pub fn remaining_cents(&self) -> i64 {
        self.remaining_cents
    }

    /// Applies the budget to one meal order. The discount never exceeds the
    /// order's own total; the surcharge is consumed by the first call.
    pub fn apply(&mut self, total_cents: i64) -> OrderAmounts {
        let discount_cents = self.remaining_cents.min(total_cents);
        let pay_cents = (total_cents - discount_cents).max(0) + self.surcharge_cents;
        self.remaining_cents -= discount_cents;
        self.surcharge_cents = 0;
        OrderAmounts {
            total_cents,
            discount_cents,
            pay_cents,
        }
    }
}

pub fn line_total_cents(unit_price_cents: i64, quantity: i32) -> i64 {
    unit_price_cents * i64::from(quantity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_submission_of_the_day() {
        // $5 budget, $1.60 surcharge, orders of $12 and $8.
        let mut budget = DiscountBudget::new(500, 0, true, 160);

        let first = budget.apply(1200);
        assert_eq!(
            first,
            OrderAmounts {
                total_cents: 1200,
                discount_cents: 500,
                pay_cents: 860,
            }
        );

        let second = budget.apply(800);
        assert_eq!(
            second,
            OrderAmounts {
                total_cents: 800,
                discount_cents: 0,
                pay_cents: 800,
            }
        );

        let total: i64 = [first, second].iter().map(|a| a.total_cents).sum();
        let pay: i64 = [first, second].iter().map(|a| a.pay_cents).sum();
        let discount: i64 = [first, second].iter().map(|a| a.discount_cents).sum();
        assert_eq!((total, pay, discount), (2000, 1660, 500));
    }

    #[test]
    fn discount_clamped_to_order_total() {
        let mut budget = DiscountBudget::new(500, 0, false, 160);
        let amounts = budget.apply(300);
        assert_eq!(amounts.discount_cents, 300);
        assert_eq!(amounts.pay_cents, 0);
        // The unapplied excess stays available for the next order.
        assert_eq!(budget.remaining_cents(), 200);
    }

    #[test]
    fn prior_spending_reduces_the_budget() {
        let mut budget = DiscountBudget::new(500, 350, false, 160);
        assert_eq!(budget.remaining_cents(), 150);
        let amounts = budget.apply(1000);
        assert_eq!(amounts.discount_cents, 150);
        assert_eq!(amounts.pay_cents, 850);
    }

    #[test]
    fn overspent_budget_clamps_to_zero() {
        let mut budget = DiscountBudget::new(500, 900, false, 160);
        assert_eq!(budget.remaining_cents(), 0);
        let amounts = budget.apply(1000);
        assert_eq!(amounts.discount_cents, 0);
        assert_eq!(amounts.pay_cents, 1000);
    }

    #[test]
    fn no_surcharge_after_first_pay_order_of_the_day() {
        let mut budget = DiscountBudget::new(0, 0, false, 160);
        assert_eq!(budget.apply(1000).pay_cents, 1000);
    }

    #[test]
    fn surcharge_lands_only_on_the_first_order() {
        let mut budget = DiscountBudget::new(0, 0, true, 160);
        assert_eq!(budget.apply(1000).pay_cents, 1160);
        assert_eq!(budget.apply(1000).pay_cents, 1000);
        assert_eq!(budget.apply(1000).pay_cents, 1000);
    }

    #[test]
    fn no_tier_means_no_discount() {
        let mut budget = DiscountBudget::new(0, 0, true, 160);
        let amounts = budget.apply(800);
        assert_eq!(amounts.discount_cents, 0);
        assert_eq!(amounts.pay_cents, 960);
    }

    #[test]
    fn line_totals_use_integer_cents() {
        assert_eq!(line_total_cents(250, 3), 750);
        assert_eq!(line_total_cents(0, 10), 0);
    }
}
