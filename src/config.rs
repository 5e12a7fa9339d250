use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, Result};

/// facility configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilityConfig {
    /// bank extending the facility
    pub bank_name: String,
    /// total credit the facility may extend
    pub credit_limit: Money,
    /// annual cost-of-funding rate used for interest accrual
    pub funding_rate: Rate,
    /// maximum cumulative days the facility may remain drawn
    pub max_revolving_period_days: Option<u32>,
    /// whether revolving-window tracking is enabled
    pub revolving_enabled: bool,
}

impl FacilityConfig {
    /// facility with revolving-window tracking
    pub fn revolving(
        bank_name: impl Into<String>,
        credit_limit: Money,
        funding_rate: Rate,
        max_period_days: u32,
    ) -> Self {
        Self {
            bank_name: bank_name.into(),
            credit_limit,
            funding_rate,
            max_revolving_period_days: Some(max_period_days),
            revolving_enabled: true,
        }
    }

    /// facility without revolving tracking
    pub fn term(bank_name: impl Into<String>, credit_limit: Money, funding_rate: Rate) -> Self {
        Self {
            bank_name: bank_name.into(),
            credit_limit,
            funding_rate,
            max_revolving_period_days: None,
            revolving_enabled: false,
        }
    }

    /// working-capital preset: 90-day window at a 6% funding cost
    pub fn working_capital(bank_name: impl Into<String>, credit_limit: Money) -> Self {
        Self::revolving(
            bank_name,
            credit_limit,
            Rate::from_decimal(dec!(0.06)),
            90,
        )
    }

    pub fn validate(&self) -> Result<()> {
        if !self.credit_limit.is_positive() {
            return Err(LedgerError::InvalidAmount {
                amount: self.credit_limit,
            });
        }
        if self.revolving_enabled && self.max_revolving_period_days.is_none() {
            return Err(LedgerError::InvalidConfiguration {
                message: "revolving tracking enabled without a maximum period".to_string(),
            });
        }
        Ok(())
    }
}
