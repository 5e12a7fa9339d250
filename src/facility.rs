use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::FacilityConfig;
use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, Result};
use crate::types::{CreditLineId, FacilityId};

/// sub-allocation of a facility against which loans are drawn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditLine {
    pub id: CreditLineId,
    pub facility_id: FacilityId,
    /// optional cap below the facility limit
    pub limit: Option<Money>,
}

/// a credit arrangement a bank extends, with a limit and funding cost
///
/// Facilities are never hard-deleted while loans reference them; callers
/// soft-deactivate instead, which blocks new draws.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Facility {
    pub id: FacilityId,
    pub config: FacilityConfig,
    pub credit_lines: Vec<CreditLine>,
    pub active: bool,
}

impl Facility {
    pub fn new(config: FacilityConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            id: Uuid::new_v4(),
            config,
            credit_lines: Vec::new(),
            active: true,
        })
    }

    pub fn open_credit_line(&mut self, limit: Option<Money>) -> Result<CreditLineId> {
        if !self.active {
            return Err(LedgerError::FacilityInactive {
                facility_id: self.id,
            });
        }
        if let Some(limit) = limit {
            if !limit.is_positive() || limit > self.config.credit_limit {
                return Err(LedgerError::InvalidAmount { amount: limit });
            }
        }

        let line = CreditLine {
            id: Uuid::new_v4(),
            facility_id: self.id,
            limit,
        };
        let id = line.id;
        self.credit_lines.push(line);
        Ok(id)
    }

    pub fn credit_line(&self, id: CreditLineId) -> Result<&CreditLine> {
        self.credit_lines
            .iter()
            .find(|l| l.id == id)
            .ok_or(LedgerError::credit_line_not_found(id))
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }
}

/// read-only aggregate view for reporting and insight consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilitySummary {
    pub facility_id: FacilityId,
    pub bank_name: String,
    pub credit_limit: Money,
    pub principal_outstanding: Money,
    pub total_outstanding: Money,
    pub utilization: Rate,
    pub active_loans: usize,
    pub settled_loans: usize,
    pub cancelled_loans: usize,
}

impl FacilitySummary {
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("JSON error: {}", e))
    }
}
