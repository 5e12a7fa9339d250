use crate::balance::Balance;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::types::Allocation;

/// waterfall components in their fixed application order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Component {
    Fees,
    Interest,
    Principal,
}

const ORDER: [Component; 3] = [Component::Fees, Component::Interest, Component::Principal];

/// fixed-order payment allocator: fees first, then interest, then principal
///
/// Each bucket is capped at its outstanding amount. A remainder beyond the
/// total outstanding is rejected rather than silently absorbed, so the parts
/// always sum exactly to the payment amount.
#[derive(Debug, Clone, Copy, Default)]
pub struct Waterfall;

impl Waterfall {
    pub fn new() -> Self {
        Waterfall
    }

    pub fn allocate(&self, amount: Money, balance: &Balance) -> Result<Allocation> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount { amount });
        }

        if amount > balance.total() {
            return Err(LedgerError::Overpayment {
                outstanding: balance.total(),
                offered: amount,
            });
        }

        let mut remaining = amount;
        let mut allocation = Allocation::default();

        for component in ORDER {
            let (outstanding, applied) = match component {
                Component::Fees => (balance.fees_outstanding, &mut allocation.fees),
                Component::Interest => (balance.interest_outstanding, &mut allocation.interest),
                Component::Principal => (balance.principal_outstanding, &mut allocation.principal),
            };

            let portion = remaining.min(outstanding);
            *applied = portion;
            remaining -= portion;

            if remaining.is_zero() {
                break;
            }
        }

        Ok(allocation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balance(fees: i64, interest: i64, principal: i64) -> Balance {
        Balance {
            fees_outstanding: Money::from_major(fees),
            interest_outstanding: Money::from_major(interest),
            principal_outstanding: Money::from_major(principal),
        }
    }

    #[test]
    fn test_fees_interest_principal_order() {
        let allocation = Waterfall::new()
            .allocate(Money::from_major(125), &balance(50, 100, 1_000))
            .unwrap();

        assert_eq!(allocation.fees, Money::from_major(50));
        assert_eq!(allocation.interest, Money::from_major(75));
        assert_eq!(allocation.principal, Money::ZERO);
        assert_eq!(allocation.total(), Money::from_major(125));
    }

    #[test]
    fn test_interest_then_principal_split() {
        // fees 0, interest 5,000 outstanding, 30,000 payment
        let allocation = Waterfall::new()
            .allocate(Money::from_major(30_000), &balance(0, 5_000, 100_000))
            .unwrap();

        assert_eq!(allocation.fees, Money::ZERO);
        assert_eq!(allocation.interest, Money::from_major(5_000));
        assert_eq!(allocation.principal, Money::from_major(25_000));
    }

    #[test]
    fn test_parts_always_sum_to_amount() {
        let b = balance(37, 211, 9_999);
        for amount in [1, 37, 38, 248, 5_000, 10_247] {
            let allocation = Waterfall::new()
                .allocate(Money::from_major(amount), &b)
                .unwrap();
            assert_eq!(allocation.total(), Money::from_major(amount));
        }
    }

    #[test]
    fn test_overpayment_rejected() {
        let result = Waterfall::new().allocate(Money::from_major(200), &balance(10, 20, 100));
        assert!(matches!(
            result,
            Err(LedgerError::Overpayment {
                outstanding,
                offered,
            }) if outstanding == Money::from_major(130) && offered == Money::from_major(200)
        ));
    }

    #[test]
    fn test_exact_payoff_allowed() {
        let allocation = Waterfall::new()
            .allocate(Money::from_major(130), &balance(10, 20, 100))
            .unwrap();
        assert_eq!(allocation.fees, Money::from_major(10));
        assert_eq!(allocation.interest, Money::from_major(20));
        assert_eq!(allocation.principal, Money::from_major(100));
    }

    #[test]
    fn test_zero_amount_rejected() {
        let result = Waterfall::new().allocate(Money::ZERO, &balance(10, 20, 100));
        assert!(matches!(result, Err(LedgerError::InvalidAmount { .. })));
    }
}
