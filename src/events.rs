use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{Allocation, FacilityId, LoanId, LoanStatus, TransactionId};

/// all events emitted by ledger operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // lifecycle events
    LoanDrawn {
        loan_id: LoanId,
        facility_id: FacilityId,
        principal: Money,
        start_date: NaiveDate,
        due_date: NaiveDate,
        timestamp: DateTime<Utc>,
    },
    LoanSettled {
        loan_id: LoanId,
        settlement_amount: Money,
        settled_date: NaiveDate,
        timestamp: DateTime<Utc>,
    },
    LoanCancelled {
        loan_id: LoanId,
        reason: String,
        forced: bool,
        timestamp: DateTime<Utc>,
    },
    LoanRevolved {
        loan_id: LoanId,
        old_due_date: NaiveDate,
        new_due_date: NaiveDate,
        days_remaining: i64,
        timestamp: DateTime<Utc>,
    },
    StatusChanged {
        loan_id: LoanId,
        old_status: LoanStatus,
        new_status: LoanStatus,
        timestamp: DateTime<Utc>,
    },

    // ledger events
    PaymentReceived {
        loan_id: LoanId,
        transaction_id: TransactionId,
        amount: Money,
        allocation: Allocation,
        remaining_total: Money,
        timestamp: DateTime<Utc>,
    },
    FeeCharged {
        loan_id: LoanId,
        transaction_id: TransactionId,
        amount: Money,
        timestamp: DateTime<Utc>,
    },
    InterestAccrued {
        loan_id: LoanId,
        transaction_id: TransactionId,
        amount: Money,
        days: u32,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
