use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;

/// unique identifier for a facility
pub type FacilityId = Uuid;

/// unique identifier for a credit line
pub type CreditLineId = Uuid;

/// unique identifier for a loan
pub type LoanId = Uuid;

/// unique identifier for a ledger transaction
pub type TransactionId = Uuid;

/// loan status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanStatus {
    /// drawn and outstanding
    Active,
    /// fully repaid, balance derived to zero
    Settled,
    /// terminated with an audit reason, terminal
    Cancelled,
}

/// ledger transaction types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    /// creates or increases loan principal
    Draw,
    /// partial payment split through the waterfall
    Repayment,
    /// fee charged to the loan
    Fee,
    /// interest accrued against outstanding principal
    InterestAccrual,
    /// closing payment covering the full outstanding balance
    Settlement,
}

impl TransactionType {
    /// repayment-like entries carry an allocation breakdown
    pub fn requires_allocation(&self) -> bool {
        matches!(self, TransactionType::Repayment | TransactionType::Settlement)
    }
}

/// waterfall allocation breakdown for a repayment or settlement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Allocation {
    pub fees: Money,
    pub interest: Money,
    pub principal: Money,
}

impl Allocation {
    pub fn total(&self) -> Money {
        self.fees + self.interest + self.principal
    }
}

/// revolving window status derived from percentage used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevolvingStatus {
    /// < 70% used
    Available,
    /// 70-90% used
    Warning,
    /// 90-100% used
    Critical,
    /// window fully consumed
    Expired,
}
