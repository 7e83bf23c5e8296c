use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::balance::Balance;
use crate::contract::Contract;
use crate::debtor::Debtor;
use crate::decimal::{CashSplit, Money};
use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::notes::Note;
use crate::payments::Payment;
use crate::types::{
    ContractId, ContractStatus, DebtorId, Employee, EmployeeId, NoteId, PaymentId, PaymentKind,
};

/// every record the ledger owns
#[derive(Debug, Clone, Default)]
pub struct LedgerTables {
    pub contracts: HashMap<ContractId, Contract>,
    pub payments: HashMap<PaymentId, Payment>,
    pub balances: HashMap<EmployeeId, Balance>,
    pub debtors: HashMap<DebtorId, Debtor>,
    pub notes: HashMap<NoteId, Note>,
    pub employees: HashMap<EmployeeId, Employee>,
    pub events: EventStore,
}

impl LedgerTables {
    /// live contract, soft-deleted ones are not found
    pub fn contract(&self, id: ContractId) -> Result<&Contract> {
        self.contracts
            .get(&id)
            .filter(|c| !c.is_deleted)
            .ok_or(LedgerError::ContractNotFound { id })
    }

    pub fn contract_mut(&mut self, id: ContractId) -> Result<&mut Contract> {
        self.contracts
            .get_mut(&id)
            .filter(|c| !c.is_deleted)
            .ok_or(LedgerError::ContractNotFound { id })
    }

    pub fn payment(&self, id: PaymentId) -> Result<&Payment> {
        self.payments.get(&id).ok_or(LedgerError::PaymentNotFound { id })
    }

    pub fn payment_mut(&mut self, id: PaymentId) -> Result<&mut Payment> {
        self.payments.get_mut(&id).ok_or(LedgerError::PaymentNotFound { id })
    }

    pub fn employee(&self, id: EmployeeId) -> Result<&Employee> {
        self.employees.get(&id).ok_or(LedgerError::EmployeeNotFound { id })
    }

    /// store an entry and append it to its contract
    pub fn attach_payment(&mut self, payment: Payment) -> Result<PaymentId> {
        payment.check_invariants()?;
        let id = payment.id;
        let contract = self.contract_mut(payment.contract_id)?;
        if !contract.payments.contains(&id) {
            contract.payments.push(id);
        }
        self.payments.insert(id, payment);
        Ok(id)
    }

    /// entries of a contract in chronological order
    pub fn contract_payments(&self, contract_id: ContractId) -> Vec<&Payment> {
        let mut entries: Vec<&Payment> = self
            .contracts
            .get(&contract_id)
            .map(|c| c.payments.iter().filter_map(|id| self.payments.get(id)).collect())
            .unwrap_or_default();
        entries.sort_by_key(|p| p.date);
        entries
    }

    /// confirmed money counted toward the contract total
    pub fn total_paid(&self, contract_id: ContractId) -> Money {
        self.contract_payments(contract_id)
            .into_iter()
            .filter(|p| p.counts_toward_total())
            .map(|p| p.received())
            .sum()
    }

    /// confirmed monthly installments
    pub fn paid_months(&self, contract_id: ContractId) -> u32 {
        self.contract_payments(contract_id)
            .into_iter()
            .filter(|p| p.kind == PaymentKind::Monthly && p.is_confirmed())
            .count() as u32
    }

    /// pending corrective entries pointing at `payment_id`
    pub fn open_corrections(&self, payment_id: PaymentId) -> Vec<PaymentId> {
        self.payments
            .values()
            .filter(|p| p.kind == PaymentKind::Extra && p.is_pending())
            .filter(|p| p.linked_payment_id == Some(payment_id))
            .map(|p| p.id)
            .collect()
    }

    /// atomic read-modify-write of a manager's cash
    pub fn credit_balance(&mut self, manager_id: EmployeeId, cash: CashSplit, now: DateTime<Utc>) -> Money {
        let balance = self
            .balances
            .entry(manager_id)
            .or_insert_with(|| Balance::new(manager_id, now));
        balance.credit(cash, now);
        let new_total = balance.dollar;
        self.events.emit(Event::BalanceCredited {
            manager_id,
            amount: cash.dollar,
            new_total,
            timestamp: now,
        });
        new_total
    }

    /// remove every debtor of a contract, returns how many went away
    pub fn clear_debtors(&mut self, contract_id: ContractId, now: DateTime<Utc>) -> usize {
        let before = self.debtors.len();
        self.debtors.retain(|_, d| d.contract_id != contract_id);
        let removed = before - self.debtors.len();
        if removed > 0 {
            self.events.emit(Event::DebtorCleared {
                contract_id,
                removed,
                timestamp: now,
            });
        }
        removed
    }

    /// write a new note or extend the existing one
    pub fn record_note(
        &mut self,
        existing: Option<NoteId>,
        contract_id: ContractId,
        author: EmployeeId,
        text: &str,
        now: DateTime<Utc>,
    ) -> Result<NoteId> {
        if let Some(id) = existing {
            if let Some(note) = self.notes.get_mut(&id) {
                note.append(text);
                return Ok(id);
            }
        }
        let customer_id = self.contract(contract_id)?.customer_id;
        let note = Note::new(customer_id, Some(contract_id), author, text, now);
        let id = note.id;
        self.notes.insert(id, note);
        Ok(id)
    }

    /// re-run the completion invariant for one contract
    pub fn check_completion(
        &mut self,
        contract_id: ContractId,
        now: DateTime<Utc>,
    ) -> Result<Option<(ContractStatus, ContractStatus)>> {
        let total_paid = self.total_paid(contract_id);
        let contract = self.contract_mut(contract_id)?;
        let flipped = contract.apply_completion(total_paid, now);

        if let Some((old_status, new_status)) = flipped {
            let total_price = contract.total_price;
            let prepaid = contract.prepaid_balance;
            info!(
                contract_id = %contract_id,
                total_paid = %total_paid,
                prepaid_balance = %prepaid,
                total_price = %total_price,
                status = ?new_status,
                "contract status changed"
            );
            self.events.emit(Event::ContractStatusChanged {
                contract_id,
                old_status,
                new_status,
                total_paid,
                total_price,
                timestamp: now,
            });
        }
        Ok(flipped)
    }

    /// change the prepaid balance, emitting an event when it moved
    pub fn set_prepaid(&mut self, contract_id: ContractId, new_balance: Money, now: DateTime<Utc>) -> Result<()> {
        let contract = self.contract_mut(contract_id)?;
        let old_balance = contract.prepaid_balance;
        let new_balance = new_balance.non_negative();
        if old_balance == new_balance {
            return Ok(());
        }
        contract.prepaid_balance = new_balance;
        self.events.emit(Event::PrepaidBalanceChanged {
            contract_id,
            old_balance,
            new_balance,
            timestamp: now,
        });
        Ok(())
    }
}

/// best-effort record of an attempted change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub at: DateTime<Utc>,
    pub actor: EmployeeId,
    pub contract_id: ContractId,
    pub action: String,
    pub success: bool,
    pub detail: String,
}

/// storage seam for the ledger
pub trait LedgerStore {
    /// run `f` with exclusive access, all writes land or none do
    fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut LedgerTables) -> Result<T>;

    /// read-only access
    fn read<T, F>(&self, f: F) -> T
    where
        F: FnOnce(&LedgerTables) -> T;

    /// append to the audit log outside any transaction
    fn append_audit(&self, record: AuditRecord) -> Result<()>;

    fn audit_log(&self) -> Vec<AuditRecord>;
}

/// in-process store guarded by a single lock
#[derive(Debug)]
pub struct MemoryStore {
    tables: Mutex<LedgerTables>,
    audit: Mutex<Vec<AuditRecord>>,
    audit_available: bool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(LedgerTables::default()),
            audit: Mutex::new(Vec::new()),
            audit_available: true,
        }
    }

    /// store whose audit log refuses writes
    pub fn without_audit() -> Self {
        Self {
            audit_available: false,
            ..Self::new()
        }
    }

    /// drain events committed so far
    pub fn take_events(&self) -> Vec<Event> {
        self.tables.lock().events.take_events()
    }
}

impl LedgerStore for MemoryStore {
    fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut LedgerTables) -> Result<T>,
    {
        let mut tables = self.tables.lock();
        let mut working = tables.clone();
        let value = f(&mut working)?;
        *tables = working;
        Ok(value)
    }

    fn read<T, F>(&self, f: F) -> T
    where
        F: FnOnce(&LedgerTables) -> T,
    {
        f(&self.tables.lock())
    }

    fn append_audit(&self, record: AuditRecord) -> Result<()> {
        if !self.audit_available {
            return Err(LedgerError::Storage {
                message: "audit log unavailable".to_string(),
            });
        }
        self.audit.lock().push(record);
        Ok(())
    }

    fn audit_log(&self) -> Vec<AuditRecord> {
        self.audit.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_failed_transaction_rolls_back() {
        let store = MemoryStore::new();
        let manager = Uuid::new_v4();

        let result: Result<()> = store.transaction(|tx| {
            tx.credit_balance(manager, CashSplit::dollars(Money::from_major(100)), now());
            Err(LedgerError::Storage {
                message: "disk full".to_string(),
            })
        });
        assert!(result.is_err());
        assert!(store.read(|t| t.balances.is_empty()));
        assert!(store.take_events().is_empty());

        store
            .transaction(|tx| {
                tx.credit_balance(manager, CashSplit::dollars(Money::from_major(100)), now());
                Ok(())
            })
            .unwrap();
        assert_eq!(store.read(|t| t.balances[&manager].dollar), Money::from_major(100));
        assert_eq!(store.take_events().len(), 1);
    }

    #[test]
    fn test_missing_records() {
        let tables = LedgerTables::default();
        let id = Uuid::new_v4();
        assert_eq!(tables.contract(id).unwrap_err(), LedgerError::ContractNotFound { id });
        assert_eq!(tables.payment(id).unwrap_err(), LedgerError::PaymentNotFound { id });
        assert_eq!(tables.employee(id).unwrap_err(), LedgerError::EmployeeNotFound { id });
    }

    #[test]
    fn test_unlinked_correction_is_refused() {
        let mut tables = LedgerTables::default();
        let extra = Payment::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            PaymentKind::Extra,
            crate::types::PaymentSource::Dashboard,
            Money::from_major(30),
            now(),
        );
        let err = tables.attach_payment(extra).unwrap_err();
        assert!(matches!(err, LedgerError::Validation { ref field, .. } if field == "linked_payment_id"));
        assert!(tables.payments.is_empty());
    }

    #[test]
    fn test_audit_is_separate_from_transactions() {
        let store = MemoryStore::new();
        let record = AuditRecord {
            at: now(),
            actor: Uuid::new_v4(),
            contract_id: Uuid::new_v4(),
            action: "update_contract".to_string(),
            success: false,
            detail: "rate limited".to_string(),
        };
        store.append_audit(record.clone()).unwrap();
        assert_eq!(store.audit_log(), vec![record.clone()]);

        let closed = MemoryStore::without_audit();
        assert!(closed.append_audit(record).is_err());
        assert!(closed.audit_log().is_empty());
    }
}
