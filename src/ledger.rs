use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::types::{Allocation, LoanId, TransactionId, TransactionType};

/// immutable ledger row for one monetary event on a loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub loan_id: LoanId,
    pub transaction_type: TransactionType,
    pub amount: Money,
    pub date: DateTime<Utc>,
    /// present for repayment and settlement entries only
    pub allocation: Option<Allocation>,
}

/// append-only transaction log for a single loan
///
/// Rows are never updated or deleted once committed; corrections are
/// modeled as new offsetting entries. Balances are always re-derived by
/// replaying this log, never read from a stored field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionLog {
    entries: Vec<Transaction>,
}

impl TransactionLog {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// validate and append one entry, returning its id
    pub fn append(
        &mut self,
        loan_id: LoanId,
        transaction_type: TransactionType,
        amount: Money,
        date: DateTime<Utc>,
        allocation: Option<Allocation>,
    ) -> Result<TransactionId> {
        Self::validate(transaction_type, amount, allocation.as_ref())?;

        let id = Uuid::new_v4();
        self.entries.push(Transaction {
            id,
            loan_id,
            transaction_type,
            amount,
            date,
            allocation,
        });
        Ok(id)
    }

    /// precondition checks without touching the log
    pub fn validate(
        transaction_type: TransactionType,
        amount: Money,
        allocation: Option<&Allocation>,
    ) -> Result<()> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount { amount });
        }

        if transaction_type.requires_allocation() {
            let allocation = allocation.ok_or(LedgerError::MissingAllocation {
                transaction_type,
                amount,
            })?;

            if allocation.fees.is_negative()
                || allocation.interest.is_negative()
                || allocation.principal.is_negative()
            {
                return Err(LedgerError::InvalidAllocation {
                    parts_total: allocation.total(),
                    amount,
                });
            }

            // amounts are already rounded to the minor unit, so the
            // tolerance reduces to exact equality after Money rounding
            if allocation.total() != amount {
                return Err(LedgerError::InvalidAllocation {
                    parts_total: allocation.total(),
                    amount,
                });
            }
        }

        Ok(())
    }

    pub fn entries(&self) -> &[Transaction] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// entries dated at or before the given instant
    pub fn entries_as_of(&self, as_of: DateTime<Utc>) -> impl Iterator<Item = &Transaction> {
        self.entries.iter().filter(move |t| t.date <= as_of)
    }

    /// true once any repayment or settlement has been recorded
    pub fn has_repayments(&self) -> bool {
        self.entries
            .iter()
            .any(|t| t.transaction_type.requires_allocation())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draw_log(loan_id: LoanId, amount: i64, date: DateTime<Utc>) -> TransactionLog {
        let mut log = TransactionLog::new();
        log.append(loan_id, TransactionType::Draw, Money::from_major(amount), date, None)
            .unwrap();
        log
    }

    #[test]
    fn test_append_rejects_non_positive_amount() {
        let mut log = TransactionLog::new();
        let result = log.append(
            Uuid::new_v4(),
            TransactionType::Fee,
            Money::ZERO,
            Utc::now(),
            None,
        );
        assert!(matches!(result, Err(LedgerError::InvalidAmount { .. })));
        assert!(log.is_empty());
    }

    #[test]
    fn test_repayment_requires_matching_allocation() {
        let loan_id = Uuid::new_v4();
        let now = Utc::now();
        let mut log = draw_log(loan_id, 1_000, now);

        // an absent allocation is its own error, not a zero-sum one
        let result = log.append(
            loan_id,
            TransactionType::Repayment,
            Money::from_major(100),
            now,
            None,
        );
        assert!(matches!(
            result,
            Err(LedgerError::MissingAllocation {
                transaction_type: TransactionType::Repayment,
                ..
            })
        ));

        // an all-zero allocation reports what the parts summed to
        let result = log.append(
            loan_id,
            TransactionType::Repayment,
            Money::from_major(100),
            now,
            Some(Allocation::default()),
        );
        assert!(matches!(
            result,
            Err(LedgerError::InvalidAllocation { parts_total, .. }) if parts_total.is_zero()
        ));

        // parts do not sum to the amount
        let bad = Allocation {
            fees: Money::from_major(10),
            interest: Money::from_major(10),
            principal: Money::from_major(10),
        };
        let result = log.append(
            loan_id,
            TransactionType::Repayment,
            Money::from_major(100),
            now,
            Some(bad),
        );
        assert!(matches!(result, Err(LedgerError::InvalidAllocation { .. })));

        // exact sum is accepted
        let good = Allocation {
            fees: Money::ZERO,
            interest: Money::from_major(20),
            principal: Money::from_major(80),
        };
        log.append(
            loan_id,
            TransactionType::Repayment,
            Money::from_major(100),
            now,
            Some(good),
        )
        .unwrap();
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_negative_allocation_part_rejected() {
        let loan_id = Uuid::new_v4();
        let now = Utc::now();
        let mut log = draw_log(loan_id, 1_000, now);

        let negative = Allocation {
            fees: Money::from_major(-10),
            interest: Money::from_major(60),
            principal: Money::from_major(50),
        };
        let result = log.append(
            loan_id,
            TransactionType::Settlement,
            Money::from_major(100),
            now,
            Some(negative),
        );
        assert!(matches!(result, Err(LedgerError::InvalidAllocation { .. })));
    }

    #[test]
    fn test_entries_as_of_filters_by_date() {
        let loan_id = Uuid::new_v4();
        let day1 = Utc::now();
        let day2 = day1 + chrono::Duration::days(1);

        let mut log = draw_log(loan_id, 500, day1);
        log.append(loan_id, TransactionType::Fee, Money::from_major(25), day2, None)
            .unwrap();

        assert_eq!(log.entries_as_of(day1).count(), 1);
        assert_eq!(log.entries_as_of(day2).count(), 2);
    }
}
