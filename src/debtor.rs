use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::calendar::overdue_days;
use crate::config::SweepConfig;
use crate::contract::Contract;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::events::Event;
use crate::store::LedgerTables;
use crate::types::{ContractId, ContractStatus, DebtorId, EmployeeId};

/// marker that a contract is overdue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Debtor {
    pub id: DebtorId,
    pub contract_id: ContractId,
    pub debt_amount: Money,
    pub due_date: DateTime<Utc>,
    pub overdue_days: u32,
    /// none when raised by the scheduled sweep
    pub created_by: Option<EmployeeId>,
    pub created_at: DateTime<Utc>,
}

impl Debtor {
    pub fn for_contract(contract: &Contract, now: DateTime<Utc>, created_by: Option<EmployeeId>) -> Self {
        Self {
            id: Uuid::new_v4(),
            contract_id: contract.id,
            debt_amount: contract.monthly_payment,
            due_date: contract.next_payment_date,
            overdue_days: overdue_days(contract.next_payment_date, now),
            created_by,
            created_at: now,
        }
    }

    /// recompute the overdue day count, true when it changed
    pub fn refresh(&mut self, now: DateTime<Utc>) -> bool {
        let days = overdue_days(self.due_date, now);
        if days == self.overdue_days {
            return false;
        }
        self.overdue_days = days;
        true
    }
}

/// outcome of one overdue sweep
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    pub scanned: usize,
    pub created: usize,
    pub refreshed: usize,
}

/// mark every overdue contract that has no debtor yet
///
/// idempotent: a contract with an open debtor only gets its day count
/// refreshed.
pub fn sweep_overdue(tables: &mut LedgerTables, now: DateTime<Utc>, created_by: Option<EmployeeId>) -> SweepReport {
    let mut report = SweepReport::default();

    let overdue: Vec<Contract> = tables
        .contracts
        .values()
        .filter(|c| c.is_active && !c.is_deleted && c.status == ContractStatus::Active)
        .filter(|c| c.next_payment_date < now)
        .cloned()
        .collect();

    for contract in overdue {
        report.scanned += 1;

        let mut known = false;
        for debtor in tables.debtors.values_mut().filter(|d| d.contract_id == contract.id) {
            known = true;
            if debtor.refresh(now) {
                report.refreshed += 1;
            }
        }
        if known {
            continue;
        }

        let debtor = Debtor::for_contract(&contract, now, created_by);
        debug!(
            contract_id = %contract.id,
            debt_amount = %debtor.debt_amount,
            overdue_days = debtor.overdue_days,
            "debtor created"
        );
        tables.events.emit(Event::DebtorCreated {
            debtor_id: debtor.id,
            contract_id: contract.id,
            debt_amount: debtor.debt_amount,
            overdue_days: debtor.overdue_days,
            timestamp: now,
        });
        tables.debtors.insert(debtor.id, debtor);
        report.created += 1;
    }

    info!(
        scanned = report.scanned,
        created = report.created,
        refreshed = report.refreshed,
        "overdue sweep finished"
    );
    report
}

/// decides when the periodic sweep is due
#[derive(Debug, Clone)]
pub struct SweepSchedule {
    interval: Duration,
    next_run: DateTime<Utc>,
}

impl SweepSchedule {
    /// first run after the start-up delay, then every interval
    pub fn new(config: SweepConfig, started_at: DateTime<Utc>) -> Result<Self> {
        if config.interval_hours == 0 {
            return Err(LedgerError::Validation {
                field: "sweep.interval_hours".to_string(),
                message: "must be positive".to_string(),
            });
        }
        Ok(Self {
            interval: Duration::hours(config.interval_hours as i64),
            next_run: started_at + Duration::seconds(config.initial_delay_secs as i64),
        })
    }

    pub fn next_run(&self) -> DateTime<Utc> {
        self.next_run
    }

    /// true when a sweep should run now, schedules the following one
    pub fn tick(&mut self, now: DateTime<Utc>) -> bool {
        if now < self.next_run {
            return false;
        }
        // skip missed slots instead of running them back to back
        while self.next_run <= now {
            self.next_run += self.interval;
        }
        true
    }
}
