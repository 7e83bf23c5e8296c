use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::{CashSplit, ExchangeRate, Money};
use crate::types::EmployeeId;

/// running cash total held by one manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub manager_id: EmployeeId,
    /// base-currency cash
    pub dollar: Money,
    /// local-currency cash
    pub sum: Money,
    pub updated_at: DateTime<Utc>,
}

impl Balance {
    pub fn new(manager_id: EmployeeId, now: DateTime<Utc>) -> Self {
        Self {
            manager_id,
            dollar: Money::ZERO,
            sum: Money::ZERO,
            updated_at: now,
        }
    }

    /// add received cash, negative parts debit
    pub fn credit(&mut self, cash: CashSplit, now: DateTime<Utc>) {
        self.dollar += cash.dollar;
        self.sum += cash.sum;
        self.updated_at = now;
    }

    /// whole balance in base currency
    pub fn total(&self, rate: ExchangeRate) -> Money {
        self.dollar + rate.to_base(self.sum)
    }
}
