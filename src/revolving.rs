use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::lifecycle::Loan;
use crate::types::{FacilityId, LoanStatus, RevolvingStatus};

/// derived revolving-window usage for a facility
///
/// Recomputed on demand by aggregating loan date ranges; no running counter
/// is persisted anywhere, so there is no second source of truth to drift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevolvingUsage {
    pub facility_id: FacilityId,
    pub max_period_days: i64,
    pub days_used: i64,
    pub days_remaining: i64,
    /// clamped to [0, 100], one decimal place
    pub percentage_used: Decimal,
    pub status: RevolvingStatus,
    pub can_revolve: bool,
    /// loans with a negative date span, clamped to zero days and reported
    /// here instead of being silently dropped
    pub skipped_loans: u32,
}

impl RevolvingUsage {
    /// aggregate elapsed active days across a facility's loans
    ///
    /// Per loan: `effective_end = min(settled_date, due_date)` when settled,
    /// else `due_date`; negative spans clamp to zero. Cancelled loans never
    /// consumed the window and are excluded.
    pub fn compute<'a>(
        facility_id: FacilityId,
        max_period_days: i64,
        loans: impl IntoIterator<Item = &'a Loan>,
    ) -> Self {
        let mut days_used = 0i64;
        let mut skipped_loans = 0u32;

        for loan in loans {
            if loan.status == LoanStatus::Cancelled {
                continue;
            }

            let effective_end = match loan.settled_date {
                Some(settled) => settled.min(loan.due_date),
                None => loan.due_date,
            };

            let span = (effective_end - loan.start_date).num_days();
            if span < 0 {
                skipped_loans += 1;
            } else {
                days_used += span;
            }
        }

        let days_remaining = (max_period_days - days_used).max(0);

        // the status ladder compares the exact ratio; rounding applies only
        // to the reported figure, so 89.96% still sits below the 90% band
        let exact_percentage = if max_period_days <= 0 {
            Decimal::from(100)
        } else {
            Decimal::from(days_used) / Decimal::from(max_period_days) * Decimal::from(100)
        };
        let status = Self::status_for(exact_percentage);
        let percentage_used = exact_percentage
            .round_dp(1)
            .clamp(Decimal::ZERO, Decimal::from(100));

        Self {
            facility_id,
            max_period_days,
            days_used,
            days_remaining,
            percentage_used,
            status,
            can_revolve: days_remaining > 0,
            skipped_loans,
        }
    }

    fn status_for(percentage: Decimal) -> RevolvingStatus {
        if percentage >= Decimal::from(100) {
            RevolvingStatus::Expired
        } else if percentage >= Decimal::from(90) {
            RevolvingStatus::Critical
        } else if percentage >= Decimal::from(70) {
            RevolvingStatus::Warning
        } else {
            RevolvingStatus::Available
        }
    }
}
