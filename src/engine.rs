use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use chrono::{DateTime, NaiveDate, Utc};
use hourglass_rs::SafeTimeProvider;

use crate::balance::Balance;
use crate::config::FacilityConfig;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::events::Event;
use crate::facility::{Facility, FacilitySummary};
use crate::ledger::Transaction;
use crate::lifecycle::{Loan, LoanAccount};
use crate::payments::PaymentResult;
use crate::revolving::RevolvingUsage;
use crate::types::{CreditLineId, FacilityId, LoanId, LoanStatus, TransactionType};

/// loan ledger engine: the operation surface callers invoke
///
/// Each loan lives behind its own mutex, so mutating operations on one loan
/// are serialized (at most one in flight) while operations on different
/// loans proceed independently. Every mutating operation validates fully
/// before it writes, and applies its status change and transaction(s) while
/// holding the loan lock, so concurrent repayments can never both read a
/// stale balance and jointly overdraw it. Facility-scoped gates (the credit
/// limit on draw, the revolving window on revolve) are checked and committed
/// under the loan-map write lock, which serializes them across loans.
#[derive(Debug, Default)]
pub struct LedgerEngine {
    facilities: RwLock<HashMap<FacilityId, Facility>>,
    loans: RwLock<HashMap<LoanId, Arc<Mutex<LoanAccount>>>>,
}

impl LedgerEngine {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- facility management ----

    pub fn register_facility(&self, config: FacilityConfig) -> Result<FacilityId> {
        let facility = Facility::new(config)?;
        let id = facility.id;
        write_lock(&self.facilities).insert(id, facility);
        Ok(id)
    }

    /// soft-deactivate: blocks new draws, existing loans keep running
    pub fn deactivate_facility(&self, facility_id: FacilityId) -> Result<()> {
        let mut facilities = write_lock(&self.facilities);
        let facility = facilities
            .get_mut(&facility_id)
            .ok_or(LedgerError::facility_not_found(facility_id))?;
        facility.deactivate();
        Ok(())
    }

    pub fn open_credit_line(
        &self,
        facility_id: FacilityId,
        limit: Option<Money>,
    ) -> Result<CreditLineId> {
        let mut facilities = write_lock(&self.facilities);
        let facility = facilities
            .get_mut(&facility_id)
            .ok_or(LedgerError::facility_not_found(facility_id))?;
        facility.open_credit_line(limit)
    }

    // ---- lifecycle operations ----

    /// draw a new loan against a credit line
    pub fn draw(
        &self,
        credit_line_id: CreditLineId,
        principal: Money,
        start_date: NaiveDate,
        due_date: NaiveDate,
        time_provider: &SafeTimeProvider,
    ) -> Result<LoanId> {
        let (facility_id, line_limit, credit_limit, facility_active) = {
            let facilities = read_lock(&self.facilities);
            let facility = facilities
                .values()
                .find(|f| f.credit_lines.iter().any(|l| l.id == credit_line_id))
                .ok_or(LedgerError::credit_line_not_found(credit_line_id))?;
            let line = facility.credit_line(credit_line_id)?;
            (
                facility.id,
                line.limit,
                facility.config.credit_limit,
                facility.active,
            )
        };

        if !facility_active {
            return Err(LedgerError::FacilityInactive { facility_id });
        }

        let account = LoanAccount::open(
            facility_id,
            credit_line_id,
            principal,
            start_date,
            due_date,
            time_provider.now(),
        )?;
        let loan_id = account.loan.id;

        // limit checks and the insertion share one write lock: two
        // concurrent draws must not both read a stale outstanding total
        // and jointly exceed the facility or line limit
        let mut loans = write_lock(&self.loans);
        let facility_drawn = drawn_principal(&loans, |loan| loan.facility_id == facility_id);
        if facility_drawn + principal > credit_limit {
            return Err(LedgerError::CreditLimitExceeded {
                available: (credit_limit - facility_drawn).max(Money::ZERO),
                requested: principal,
            });
        }
        if let Some(limit) = line_limit {
            let line_drawn = drawn_principal(&loans, |loan| loan.credit_line_id == credit_line_id);
            if line_drawn + principal > limit {
                return Err(LedgerError::CreditLimitExceeded {
                    available: (limit - line_drawn).max(Money::ZERO),
                    requested: principal,
                });
            }
        }

        loans.insert(loan_id, Arc::new(Mutex::new(account)));
        Ok(loan_id)
    }

    /// partial repayment; auto-settles the loan when the balance reaches zero
    pub fn repay(
        &self,
        loan_id: LoanId,
        amount: Money,
        time_provider: &SafeTimeProvider,
    ) -> Result<PaymentResult> {
        let now = time_provider.now();
        self.with_account(loan_id, |account| account.repay(amount, now))
    }

    /// full settlement covering the entire outstanding balance
    pub fn settle(
        &self,
        loan_id: LoanId,
        amount: Money,
        time_provider: &SafeTimeProvider,
    ) -> Result<PaymentResult> {
        let now = time_provider.now();
        self.with_account(loan_id, |account| account.settle(amount, now))
    }

    /// extend a loan's due date, gated on the facility's remaining
    /// revolving days
    pub fn revolve(
        &self,
        loan_id: LoanId,
        new_due_date: NaiveDate,
        time_provider: &SafeTimeProvider,
    ) -> Result<()> {
        let facility_id = self.loan(loan_id)?.facility_id;
        let max_days = {
            let facilities = read_lock(&self.facilities);
            let facility = facilities
                .get(&facility_id)
                .ok_or(LedgerError::facility_not_found(facility_id))?;
            if !facility.config.revolving_enabled {
                return Err(LedgerError::RevolvingNotEnabled { facility_id });
            }
            facility.config.max_revolving_period_days.unwrap_or(0) as i64
        };
        let now = time_provider.now();

        // the window gate and the extension commit share one write lock:
        // two revolves must not both see the same remaining days and
        // jointly overrun the facility window
        let loans = write_lock(&self.loans);
        let facility_loans = collect_facility_loans(&loans, facility_id);
        let usage = RevolvingUsage::compute(facility_id, max_days, facility_loans.iter());
        if !usage.can_revolve {
            return Err(LedgerError::RevolvingWindowExhausted {
                days_used: usage.days_used,
                max_days: usage.max_period_days,
            });
        }

        let account = loans
            .get(&loan_id)
            .cloned()
            .ok_or(LedgerError::loan_not_found(loan_id))?;
        let mut account = lock_account(&account);
        account.revolve(new_due_date, usage.days_remaining, now)
    }

    /// cancel a loan; a reason is required once the ledger holds anything
    /// beyond the initiating draw
    pub fn cancel(
        &self,
        loan_id: LoanId,
        reason: Option<String>,
        time_provider: &SafeTimeProvider,
    ) -> Result<()> {
        let now = time_provider.now();
        self.with_account(loan_id, |account| account.cancel(reason, now))
    }

    /// charge a fee to a loan
    pub fn charge_fee(
        &self,
        loan_id: LoanId,
        amount: Money,
        time_provider: &SafeTimeProvider,
    ) -> Result<()> {
        let now = time_provider.now();
        self.with_account(loan_id, |account| account.charge_fee(amount, now))
    }

    /// accrue simple daily interest at the facility funding rate since the
    /// last accrual (or the draw), returning the amount recorded
    pub fn accrue_interest(
        &self,
        loan_id: LoanId,
        time_provider: &SafeTimeProvider,
    ) -> Result<Money> {
        let facility_id = self.loan(loan_id)?.facility_id;
        let funding_rate = {
            let facilities = read_lock(&self.facilities);
            facilities
                .get(&facility_id)
                .ok_or(LedgerError::facility_not_found(facility_id))?
                .config
                .funding_rate
        };

        let now = time_provider.now();
        self.with_account(loan_id, |account| {
            let last_accrued = account
                .log
                .entries()
                .iter()
                .filter(|t| t.transaction_type == TransactionType::InterestAccrual)
                .last()
                .map(|t| t.date)
                .or_else(|| account.log.entries().first().map(|t| t.date))
                .unwrap_or(now);

            let days = (now.date_naive() - last_accrued.date_naive()).num_days();
            if days <= 0 {
                return Ok(Money::ZERO);
            }

            let principal = account.balance().principal_outstanding;
            let amount = principal.apply_rate(funding_rate.as_decimal(), days as u32);
            if amount.is_zero() {
                return Ok(Money::ZERO);
            }

            account.accrue_interest(amount, days as u32, now)?;
            Ok(amount)
        })
    }

    // ---- read-only queries ----

    /// derived balance filtered to entries dated at or before `as_of`
    pub fn balance_as_of(&self, loan_id: LoanId, as_of: DateTime<Utc>) -> Result<Balance> {
        self.with_account(loan_id, |account| Ok(account.balance_as_of(as_of)))
    }

    /// current derived balance (full replay)
    pub fn balance(&self, loan_id: LoanId) -> Result<Balance> {
        self.with_account(loan_id, |account| Ok(account.balance()))
    }

    /// loan snapshot for schedulers and other external consumers
    pub fn loan(&self, loan_id: LoanId) -> Result<Loan> {
        self.with_account(loan_id, |account| Ok(account.loan.clone()))
    }

    /// committed transaction history, for reporting consumers
    pub fn transactions(&self, loan_id: LoanId) -> Result<Vec<Transaction>> {
        self.with_account(loan_id, |account| Ok(account.log.entries().to_vec()))
    }

    /// drain the audit event stream for a loan
    pub fn take_events(&self, loan_id: LoanId) -> Result<Vec<Event>> {
        self.with_account(loan_id, |account| Ok(account.events.take_events()))
    }

    /// revolving-window usage for a facility; read-only over the loan set
    pub fn usage(&self, facility_id: FacilityId) -> Result<RevolvingUsage> {
        let max_days = {
            let facilities = read_lock(&self.facilities);
            let facility = facilities
                .get(&facility_id)
                .ok_or(LedgerError::facility_not_found(facility_id))?;
            if !facility.config.revolving_enabled {
                return Err(LedgerError::RevolvingNotEnabled { facility_id });
            }
            facility.config.max_revolving_period_days.unwrap_or(0) as i64
        };

        let loans = self.facility_loans(facility_id);
        Ok(RevolvingUsage::compute(facility_id, max_days, loans.iter()))
    }

    /// outstanding totals and utilization for read-only consumers
    pub fn facility_summary(&self, facility_id: FacilityId) -> Result<FacilitySummary> {
        let (bank_name, credit_limit) = {
            let facilities = read_lock(&self.facilities);
            let facility = facilities
                .get(&facility_id)
                .ok_or(LedgerError::facility_not_found(facility_id))?;
            (facility.config.bank_name.clone(), facility.config.credit_limit)
        };

        let mut principal_outstanding = Money::ZERO;
        let mut total_outstanding = Money::ZERO;
        let mut active_loans = 0;
        let mut settled_loans = 0;
        let mut cancelled_loans = 0;

        let loans = read_lock(&self.loans);
        for account in loans.values() {
            let account = lock_account(account);
            if account.loan.facility_id != facility_id {
                continue;
            }
            match account.loan.status {
                LoanStatus::Active => {
                    active_loans += 1;
                    let balance = account.balance();
                    principal_outstanding += balance.principal_outstanding;
                    total_outstanding += balance.total();
                }
                LoanStatus::Settled => settled_loans += 1,
                LoanStatus::Cancelled => cancelled_loans += 1,
            }
        }

        let utilization = if credit_limit.is_zero() {
            crate::decimal::Rate::ZERO
        } else {
            crate::decimal::Rate::from_decimal(
                principal_outstanding.as_decimal() / credit_limit.as_decimal(),
            )
        };

        Ok(FacilitySummary {
            facility_id,
            bank_name,
            credit_limit,
            principal_outstanding,
            total_outstanding,
            utilization,
            active_loans,
            settled_loans,
            cancelled_loans,
        })
    }

    // ---- internals ----

    fn with_account<T>(
        &self,
        loan_id: LoanId,
        f: impl FnOnce(&mut LoanAccount) -> Result<T>,
    ) -> Result<T> {
        let account = {
            let loans = read_lock(&self.loans);
            loans
                .get(&loan_id)
                .cloned()
                .ok_or(LedgerError::loan_not_found(loan_id))?
        };
        let mut account = lock_account(&account);
        f(&mut account)
    }

    fn facility_loans(&self, facility_id: FacilityId) -> Vec<Loan> {
        let loans = read_lock(&self.loans);
        collect_facility_loans(&loans, facility_id)
    }
}

fn drawn_principal(
    loans: &HashMap<LoanId, Arc<Mutex<LoanAccount>>>,
    matches: impl Fn(&Loan) -> bool,
) -> Money {
    loans
        .values()
        .map(|account| {
            let account = lock_account(account);
            if account.loan.status == LoanStatus::Active && matches(&account.loan) {
                account.balance().principal_outstanding
            } else {
                Money::ZERO
            }
        })
        .sum()
}

fn collect_facility_loans(
    loans: &HashMap<LoanId, Arc<Mutex<LoanAccount>>>,
    facility_id: FacilityId,
) -> Vec<Loan> {
    loans
        .values()
        .filter_map(|account| {
            let account = lock_account(account);
            (account.loan.facility_id == facility_id).then(|| account.loan.clone())
        })
        .collect()
}

// a poisoned lock only means another thread panicked mid-operation; the
// loan data itself is only written after validation, so recover the guard
fn lock_account(account: &Mutex<LoanAccount>) -> MutexGuard<'_, LoanAccount> {
    account.lock().unwrap_or_else(|e| e.into_inner())
}

fn read_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|e| e.into_inner())
}

fn write_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}
