pub mod waterfall;

use chrono::{DateTime, Utc};

use crate::balance::Balance;
use crate::decimal::Money;
use crate::types::{Allocation, LoanId, LoanStatus, TransactionId};

pub use waterfall::Waterfall;

/// result of a repayment or settlement through the waterfall
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentResult {
    pub loan_id: LoanId,
    pub transaction_id: TransactionId,
    pub amount: Money,
    pub allocation: Allocation,
    /// settlement amount beyond the outstanding total, returned to the
    /// caller rather than absorbed into the ledger
    pub excess: Money,
    pub balance_after: Balance,
    pub status_after: LoanStatus,
    pub payment_date: DateTime<Utc>,
}

impl PaymentResult {
    /// share of principal repaid so far is meaningful because the waterfall
    /// order is fixed; callers surface this as repayment progress
    pub fn settled_in_full(&self) -> bool {
        self.balance_after.is_zero()
    }
}
