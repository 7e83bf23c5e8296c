mod contracts;
mod debtors;
mod payments;

pub use contracts::StatusSweepReport;

use crate::balance::Balance;
use crate::config::LedgerConfig;
use crate::contract::Contract;
use crate::debtor::Debtor;
use crate::decimal::Money;
use crate::editing::EditThrottle;
use crate::errors::Result;
use crate::events::Event;
use crate::notes::Note;
use crate::payments::Payment;
use crate::store::{LedgerStore, MemoryStore};
use crate::types::{ContractId, Employee, EmployeeId, PaymentId};

/// entry point for every ledger operation
///
/// operations take the clock as an argument so callers and tests decide
/// what "now" is.
pub struct LedgerService<S: LedgerStore = MemoryStore> {
    store: S,
    config: LedgerConfig,
    throttle: EditThrottle,
}

impl LedgerService<MemoryStore> {
    /// service over a fresh in-memory store
    pub fn in_memory(config: LedgerConfig) -> Self {
        Self::new(MemoryStore::new(), config)
    }
}

impl<S: LedgerStore> LedgerService<S> {
    pub fn new(store: S, config: LedgerConfig) -> Self {
        let throttle = EditThrottle::new(config.edit_rate_limit);
        Self {
            store,
            config,
            throttle,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// add a staff member who can act on the ledger
    pub fn register_employee(&self, employee: Employee) -> Result<EmployeeId> {
        self.store.transaction(|tx| {
            let id = employee.id;
            tx.employees.insert(id, employee);
            Ok(id)
        })
    }

    pub fn contract(&self, id: ContractId) -> Result<Contract> {
        self.store.read(|t| t.contract(id).cloned())
    }

    pub fn payment(&self, id: PaymentId) -> Result<Payment> {
        self.store.read(|t| t.payment(id).cloned())
    }

    /// entries of a contract, oldest first
    pub fn contract_payments(&self, id: ContractId) -> Vec<Payment> {
        self.store
            .read(|t| t.contract_payments(id).into_iter().cloned().collect())
    }

    pub fn balance(&self, manager_id: EmployeeId) -> Option<Balance> {
        self.store.read(|t| t.balances.get(&manager_id).cloned())
    }

    /// manager's whole cash in base currency at the configured rate
    pub fn cash_on_hand(&self, manager_id: EmployeeId) -> Option<Money> {
        self.balance(manager_id).map(|b| b.total(self.config.exchange_rate))
    }

    pub fn debtors(&self) -> Vec<Debtor> {
        self.store.read(|t| {
            let mut debtors: Vec<Debtor> = t.debtors.values().cloned().collect();
            debtors.sort_by_key(|d| d.due_date);
            debtors
        })
    }

    pub fn notes_for(&self, contract_id: ContractId) -> Vec<Note> {
        self.store.read(|t| {
            let mut notes: Vec<Note> = t
                .notes
                .values()
                .filter(|n| n.contract_id == Some(contract_id))
                .cloned()
                .collect();
            notes.sort_by_key(|n| n.created_at);
            notes
        })
    }

    /// drain events committed so far
    pub fn take_events(&self) -> Vec<Event> {
        self.store
            .transaction(|tx| Ok(tx.events.take_events()))
            .unwrap_or_default()
    }
}
