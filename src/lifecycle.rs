use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::balance::Balance;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::ledger::TransactionLog;
use crate::payments::{PaymentResult, Waterfall};
use crate::types::{CreditLineId, FacilityId, LoanId, LoanStatus, TransactionType};

/// a single drawdown with its own repayment lifecycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub facility_id: FacilityId,
    pub credit_line_id: CreditLineId,
    pub principal: Money,
    pub start_date: NaiveDate,
    pub due_date: NaiveDate,
    pub settled_date: Option<NaiveDate>,
    pub status: LoanStatus,
    pub cancellation_reason: Option<String>,
}

/// loan plus its ledger and audit stream
///
/// All mutations go through the transition methods below: validate first,
/// then apply the status change and its transaction(s) as one block, so a
/// rejected operation leaves no trace in the log.
#[derive(Debug)]
pub struct LoanAccount {
    pub loan: Loan,
    pub log: TransactionLog,
    pub events: EventStore,
}

impl LoanAccount {
    /// draw: create a loan in `Active` with one draw transaction equal to
    /// its principal
    pub fn open(
        facility_id: FacilityId,
        credit_line_id: CreditLineId,
        principal: Money,
        start_date: NaiveDate,
        due_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        if !principal.is_positive() {
            return Err(LedgerError::InvalidAmount { amount: principal });
        }
        if due_date < start_date {
            return Err(LedgerError::InvalidDate {
                message: format!("due date {} precedes start date {}", due_date, start_date),
            });
        }

        let loan = Loan {
            id: Uuid::new_v4(),
            facility_id,
            credit_line_id,
            principal,
            start_date,
            due_date,
            settled_date: None,
            status: LoanStatus::Active,
            cancellation_reason: None,
        };

        let mut account = Self {
            loan,
            log: TransactionLog::new(),
            events: EventStore::new(),
        };

        account
            .log
            .append(account.loan.id, TransactionType::Draw, principal, now, None)?;

        account.events.emit(Event::LoanDrawn {
            loan_id: account.loan.id,
            facility_id,
            principal,
            start_date,
            due_date,
            timestamp: now,
        });

        Ok(account)
    }

    /// derived balance at a point in time
    pub fn balance_as_of(&self, as_of: DateTime<Utc>) -> Balance {
        Balance::replay(&self.log, as_of)
    }

    /// current derived balance
    pub fn balance(&self) -> Balance {
        Balance::replay_all(&self.log)
    }

    /// partial repayment through the waterfall; auto-settles when the
    /// resulting total reaches zero
    pub fn repay(&mut self, amount: Money, now: DateTime<Utc>) -> Result<PaymentResult> {
        self.ensure_active("repay")?;

        let balance = self.balance();
        let allocation = Waterfall::new().allocate(amount, &balance)?;

        // a payment covering the full outstanding total will settle the
        // loan, so the settled-date invariant must hold before anything
        // touches the log
        let will_settle = amount == balance.total();
        if will_settle {
            self.validate_settled_date(now)?;
        }

        let transaction_id = self.log.append(
            self.loan.id,
            TransactionType::Repayment,
            amount,
            now,
            Some(allocation),
        )?;

        let balance_after = self.balance();
        if balance_after.is_zero() {
            self.settle_status(now);
        }

        self.events.emit(Event::PaymentReceived {
            loan_id: self.loan.id,
            transaction_id,
            amount,
            allocation,
            remaining_total: balance_after.total(),
            timestamp: now,
        });

        Ok(PaymentResult {
            loan_id: self.loan.id,
            transaction_id,
            amount,
            allocation,
            excess: Money::ZERO,
            balance_after,
            status_after: self.loan.status,
            payment_date: now,
        })
    }

    /// full settlement: requires the offered amount to cover the entire
    /// outstanding total; the ledger entry is written for exactly the
    /// outstanding total and any excess is returned to the caller
    pub fn settle(&mut self, amount: Money, now: DateTime<Utc>) -> Result<PaymentResult> {
        self.ensure_active("settle")?;

        let balance = self.balance();
        let outstanding = balance.total();
        if amount < outstanding {
            return Err(LedgerError::InsufficientSettlementAmount {
                outstanding,
                offered: amount,
            });
        }

        self.validate_settled_date(now)?;
        let allocation = Waterfall::new().allocate(outstanding, &balance)?;

        let transaction_id = self.log.append(
            self.loan.id,
            TransactionType::Settlement,
            outstanding,
            now,
            Some(allocation),
        )?;

        self.settle_status(now);

        self.events.emit(Event::LoanSettled {
            loan_id: self.loan.id,
            settlement_amount: outstanding,
            settled_date: self.loan.settled_date.unwrap_or(now.date_naive()),
            timestamp: now,
        });

        Ok(PaymentResult {
            loan_id: self.loan.id,
            transaction_id,
            amount: outstanding,
            allocation,
            excess: amount - outstanding,
            balance_after: self.balance(),
            status_after: self.loan.status,
            payment_date: now,
        })
    }

    /// revolve: extend the due date without touching the principal balance.
    /// The caller (engine) enforces the facility's remaining-days gate.
    pub fn revolve(
        &mut self,
        new_due_date: NaiveDate,
        days_remaining: i64,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.ensure_active("revolve")?;

        if new_due_date <= self.loan.due_date {
            return Err(LedgerError::InvalidDate {
                message: format!(
                    "new due date {} does not extend current due date {}",
                    new_due_date, self.loan.due_date
                ),
            });
        }

        let old_due_date = self.loan.due_date;
        self.loan.due_date = new_due_date;

        self.events.emit(Event::LoanRevolved {
            loan_id: self.loan.id,
            old_due_date,
            new_due_date,
            days_remaining,
            timestamp: now,
        });

        Ok(())
    }

    /// cancel: terminal. Permitted while the log holds only the initiating
    /// draw; any further activity requires a forced audit reason.
    pub fn cancel(&mut self, reason: Option<String>, now: DateTime<Utc>) -> Result<()> {
        self.ensure_active("cancel")?;

        let pristine = self.log.len() == 1;
        let forced = reason.is_some();
        if !pristine && !forced {
            return Err(LedgerError::InvalidStateTransition {
                attempted: "cancel",
                current: self.loan.status,
            });
        }

        let reason = reason.unwrap_or_else(|| "cancelled before any activity".to_string());

        let old_status = self.loan.status;
        self.loan.status = LoanStatus::Cancelled;
        self.loan.cancellation_reason = Some(reason.clone());

        self.events.emit(Event::LoanCancelled {
            loan_id: self.loan.id,
            reason,
            forced,
            timestamp: now,
        });
        self.events.emit(Event::StatusChanged {
            loan_id: self.loan.id,
            old_status,
            new_status: LoanStatus::Cancelled,
            timestamp: now,
        });

        Ok(())
    }

    /// charge a fee against the loan
    pub fn charge_fee(&mut self, amount: Money, now: DateTime<Utc>) -> Result<()> {
        self.ensure_active("charge a fee on")?;

        let transaction_id =
            self.log
                .append(self.loan.id, TransactionType::Fee, amount, now, None)?;

        self.events.emit(Event::FeeCharged {
            loan_id: self.loan.id,
            transaction_id,
            amount,
            timestamp: now,
        });

        Ok(())
    }

    /// record an interest accrual computed by the engine
    pub fn accrue_interest(&mut self, amount: Money, days: u32, now: DateTime<Utc>) -> Result<()> {
        self.ensure_active("accrue interest on")?;

        let transaction_id = self.log.append(
            self.loan.id,
            TransactionType::InterestAccrual,
            amount,
            now,
            None,
        )?;

        self.events.emit(Event::InterestAccrued {
            loan_id: self.loan.id,
            transaction_id,
            amount,
            days,
            timestamp: now,
        });

        Ok(())
    }

    fn ensure_active(&self, attempted: &'static str) -> Result<()> {
        if self.loan.status != LoanStatus::Active {
            return Err(LedgerError::InvalidStateTransition {
                attempted,
                current: self.loan.status,
            });
        }
        Ok(())
    }

    /// settled date must never precede the start date; checked before any
    /// settling operation writes to the log
    fn validate_settled_date(&self, now: DateTime<Utc>) -> Result<()> {
        let settled_date = now.date_naive();
        if settled_date < self.loan.start_date {
            return Err(LedgerError::InvalidDate {
                message: format!(
                    "settled date {} precedes start date {}",
                    settled_date, self.loan.start_date
                ),
            });
        }
        Ok(())
    }

    fn settle_status(&mut self, now: DateTime<Utc>) {
        let old_status = self.loan.status;
        self.loan.status = LoanStatus::Settled;
        self.loan.settled_date = Some(now.date_naive());

        self.events.emit(Event::StatusChanged {
            loan_id: self.loan.id,
            old_status,
            new_status: LoanStatus::Settled,
            timestamp: now,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use hourglass_rs::{SafeTimeProvider, TimeSource};

    fn test_time() -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ))
    }

    fn open_loan(time: &SafeTimeProvider, principal: i64) -> LoanAccount {
        let now = time.now();
        LoanAccount::open(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Money::from_major(principal),
            now.date_naive(),
            now.date_naive() + chrono::Duration::days(40),
            now,
        )
        .unwrap()
    }

    #[test]
    fn test_draw_creates_active_loan_with_draw_entry() {
        let time = test_time();
        let account = open_loan(&time, 100_000);

        assert_eq!(account.loan.status, LoanStatus::Active);
        assert_eq!(account.log.len(), 1);
        assert_eq!(account.balance().total(), Money::from_major(100_000));
    }

    #[test]
    fn test_due_before_start_rejected() {
        let time = test_time();
        let now = time.now();
        let result = LoanAccount::open(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Money::from_major(1_000),
            now.date_naive(),
            now.date_naive() - chrono::Duration::days(1),
            now,
        );
        assert!(matches!(result, Err(LedgerError::InvalidDate { .. })));
    }

    #[test]
    fn test_partial_repayment_stays_active() {
        let time = test_time();
        let mut account = open_loan(&time, 100_000);
        account
            .accrue_interest(Money::from_major(5_000), 30, time.now())
            .unwrap();

        let result = account.repay(Money::from_major(30_000), time.now()).unwrap();

        assert_eq!(result.allocation.fees, Money::ZERO);
        assert_eq!(result.allocation.interest, Money::from_major(5_000));
        assert_eq!(result.allocation.principal, Money::from_major(25_000));
        assert_eq!(result.balance_after.total(), Money::from_major(75_000));
        assert_eq!(account.loan.status, LoanStatus::Active);
    }

    #[test]
    fn test_repayment_to_zero_auto_settles() {
        let time = test_time();
        let control = time.test_control().unwrap();
        let mut account = open_loan(&time, 10_000);

        control.advance(chrono::Duration::days(5));
        let result = account.repay(Money::from_major(10_000), time.now()).unwrap();

        assert!(result.settled_in_full());
        assert_eq!(account.loan.status, LoanStatus::Settled);
        assert_eq!(
            account.loan.settled_date,
            Some(time.now().date_naive())
        );
    }

    #[test]
    fn test_settlement_clears_balance() {
        let time = test_time();
        let control = time.test_control().unwrap();
        let mut account = open_loan(&time, 100_000);
        account
            .repay(Money::from_major(30_000), time.now())
            .unwrap();

        control.advance(chrono::Duration::days(10));
        let result = account.settle(Money::from_major(70_000), time.now()).unwrap();

        assert_eq!(result.amount, Money::from_major(70_000));
        assert_eq!(result.excess, Money::ZERO);
        assert_eq!(account.loan.status, LoanStatus::Settled);
        assert!(account.loan.settled_date.is_some());
        assert_eq!(account.balance().total(), Money::ZERO);
    }

    #[test]
    fn test_settlement_below_outstanding_rejected() {
        let time = test_time();
        let mut account = open_loan(&time, 100_000);

        let result = account.settle(Money::from_major(99_999), time.now());
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientSettlementAmount { .. })
        ));
        // ledger untouched by the rejected operation
        assert_eq!(account.log.len(), 1);
        assert_eq!(account.loan.status, LoanStatus::Active);
    }

    #[test]
    fn test_settlement_excess_returned_not_absorbed() {
        let time = test_time();
        let mut account = open_loan(&time, 1_000);

        let result = account.settle(Money::from_major(1_200), time.now()).unwrap();
        assert_eq!(result.amount, Money::from_major(1_000));
        assert_eq!(result.excess, Money::from_major(200));
        assert_eq!(account.balance().total(), Money::ZERO);
    }

    #[test]
    fn test_overpayment_on_repay_rejected() {
        let time = test_time();
        let mut account = open_loan(&time, 1_000);

        let result = account.repay(Money::from_major(1_500), time.now());
        assert!(matches!(result, Err(LedgerError::Overpayment { .. })));
        assert_eq!(account.log.len(), 1);
    }

    #[test]
    fn test_operations_on_settled_loan_rejected() {
        let time = test_time();
        let mut account = open_loan(&time, 1_000);
        account.settle(Money::from_major(1_000), time.now()).unwrap();

        let result = account.repay(Money::from_major(10), time.now());
        assert!(matches!(
            result,
            Err(LedgerError::InvalidStateTransition {
                attempted: "repay",
                current: LoanStatus::Settled,
            })
        ));

        assert!(account.charge_fee(Money::from_major(10), time.now()).is_err());
        assert!(account.cancel(None, time.now()).is_err());
    }

    #[test]
    fn test_cancel_pristine_loan() {
        let time = test_time();
        let mut account = open_loan(&time, 1_000);

        account.cancel(None, time.now()).unwrap();
        assert_eq!(account.loan.status, LoanStatus::Cancelled);
        assert!(account.loan.cancellation_reason.is_some());
    }

    #[test]
    fn test_cancel_after_repayment_requires_reason() {
        let time = test_time();
        let mut account = open_loan(&time, 1_000);
        account.repay(Money::from_major(100), time.now()).unwrap();

        let result = account.cancel(None, time.now());
        assert!(matches!(
            result,
            Err(LedgerError::InvalidStateTransition { .. })
        ));

        account
            .cancel(Some("written off after fraud review".to_string()), time.now())
            .unwrap();
        assert_eq!(account.loan.status, LoanStatus::Cancelled);
        assert_eq!(
            account.loan.cancellation_reason.as_deref(),
            Some("written off after fraud review")
        );
    }

    #[test]
    fn test_revolve_extends_due_date_only() {
        let time = test_time();
        let mut account = open_loan(&time, 5_000);
        let old_due = account.loan.due_date;
        let balance_before = account.balance();

        account
            .revolve(old_due + chrono::Duration::days(30), 50, time.now())
            .unwrap();

        assert_eq!(account.loan.due_date, old_due + chrono::Duration::days(30));
        assert_eq!(account.balance(), balance_before);
        // no ledger entry for a revolve
        assert_eq!(account.log.len(), 1);
    }

    #[test]
    fn test_revolve_must_extend() {
        let time = test_time();
        let mut account = open_loan(&time, 5_000);
        let old_due = account.loan.due_date;

        assert!(account.revolve(old_due, 50, time.now()).is_err());
    }

    #[test]
    fn test_settled_loan_never_has_nonzero_balance() {
        let time = test_time();
        let mut account = open_loan(&time, 2_500);
        account.charge_fee(Money::from_major(25), time.now()).unwrap();

        // every path into Settled goes through a zero-total replay
        account.settle(Money::from_major(2_525), time.now()).unwrap();
        assert_eq!(account.loan.status, LoanStatus::Settled);
        assert!(account.balance().is_zero());
    }
}
