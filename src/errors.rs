use thiserror::Error;
use uuid::Uuid;

use crate::decimal::Money;
use crate::types::{LoanStatus, TransactionType};

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("invalid amount: {amount}")]
    InvalidAmount { amount: Money },

    #[error("invalid allocation: parts sum to {parts_total}, transaction amount is {amount}")]
    InvalidAllocation { parts_total: Money, amount: Money },

    #[error("{transaction_type:?} transaction of {amount} requires an allocation")]
    MissingAllocation {
        transaction_type: TransactionType,
        amount: Money,
    },

    #[error("overpayment: outstanding {outstanding}, offered {offered}")]
    Overpayment { outstanding: Money, offered: Money },

    #[error("insufficient settlement amount: outstanding {outstanding}, offered {offered}")]
    InsufficientSettlementAmount { outstanding: Money, offered: Money },

    #[error("invalid state transition: cannot {attempted} a loan in status {current:?}")]
    InvalidStateTransition {
        attempted: &'static str,
        current: LoanStatus,
    },

    #[error("revolving window exhausted: {days_used} of {max_days} days consumed")]
    RevolvingWindowExhausted { days_used: i64, max_days: i64 },

    #[error("revolving tracking not enabled for facility {facility_id}")]
    RevolvingNotEnabled { facility_id: Uuid },

    #[error("credit limit exceeded: available {available}, requested {requested}")]
    CreditLimitExceeded {
        available: Money,
        requested: Money,
    },

    #[error("facility {facility_id} is deactivated")]
    FacilityInactive { facility_id: Uuid },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("invalid date: {message}")]
    InvalidDate { message: String },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },
}

impl LedgerError {
    pub fn loan_not_found(id: Uuid) -> Self {
        LedgerError::NotFound { entity: "loan", id }
    }

    pub fn facility_not_found(id: Uuid) -> Self {
        LedgerError::NotFound {
            entity: "facility",
            id,
        }
    }

    pub fn credit_line_not_found(id: Uuid) -> Self {
        LedgerError::NotFound {
            entity: "credit line",
            id,
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
