pub mod balance;
pub mod config;
pub mod decimal;
pub mod engine;
pub mod errors;
pub mod events;
pub mod facility;
pub mod ledger;
pub mod lifecycle;
pub mod payments;
pub mod revolving;
pub mod types;

// re-export key types
pub use balance::Balance;
pub use config::FacilityConfig;
pub use decimal::{Money, Rate};
pub use engine::LedgerEngine;
pub use errors::{LedgerError, Result};
pub use events::{Event, EventStore};
pub use facility::{CreditLine, Facility, FacilitySummary};
pub use ledger::{Transaction, TransactionLog};
pub use lifecycle::{Loan, LoanAccount};
pub use payments::{PaymentResult, Waterfall};
pub use revolving::RevolvingUsage;
pub use types::{
    Allocation, CreditLineId, FacilityId, LoanId, LoanStatus, RevolvingStatus, TransactionId,
    TransactionType,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
