use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::ledger::TransactionLog;
use crate::types::TransactionType;

/// derived loan balance, never persisted as authoritative state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Balance {
    pub principal_outstanding: Money,
    pub interest_outstanding: Money,
    pub fees_outstanding: Money,
}

impl Balance {
    pub const ZERO: Balance = Balance {
        principal_outstanding: Money::ZERO,
        interest_outstanding: Money::ZERO,
        fees_outstanding: Money::ZERO,
    };

    pub fn total(&self) -> Money {
        self.principal_outstanding + self.interest_outstanding + self.fees_outstanding
    }

    pub fn is_zero(&self) -> bool {
        self.total().is_zero()
    }

    /// replay the full log filtered to entries dated at or before `as_of`
    ///
    /// A pure fold: full replay always equals any prefix replayed and then
    /// folded forward with the suffix. A loan with no transactions yields
    /// all-zero balances.
    pub fn replay(log: &TransactionLog, as_of: DateTime<Utc>) -> Balance {
        let mut balance = Balance::ZERO;
        for entry in log.entries_as_of(as_of) {
            match entry.transaction_type {
                TransactionType::Draw => balance.principal_outstanding += entry.amount,
                TransactionType::Fee => balance.fees_outstanding += entry.amount,
                TransactionType::InterestAccrual => balance.interest_outstanding += entry.amount,
                TransactionType::Repayment | TransactionType::Settlement => {
                    // allocation presence is enforced at append time
                    if let Some(allocation) = entry.allocation {
                        balance.fees_outstanding -= allocation.fees;
                        balance.interest_outstanding -= allocation.interest;
                        balance.principal_outstanding -= allocation.principal;
                    }
                }
            }
        }
        balance
    }

    /// replay over every committed entry
    pub fn replay_all(log: &TransactionLog) -> Balance {
        Balance::replay(log, DateTime::<Utc>::MAX_UTC)
    }
}
