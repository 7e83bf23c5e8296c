use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::editing::ImpactSummary;
use crate::types::{ContractId, ContractStatus, DebtorId, EmployeeId, PaymentId, PaymentKind, PaymentSource, PaymentStatus};

/// all events that can be emitted by the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // contract lifecycle events
    ContractCreated {
        contract_id: ContractId,
        total_price: Money,
        monthly_payment: Money,
        period: u32,
        approved: bool,
        timestamp: DateTime<Utc>,
    },
    ContractApproved {
        contract_id: ContractId,
        approved_by: EmployeeId,
        timestamp: DateTime<Utc>,
    },
    ContractStatusChanged {
        contract_id: ContractId,
        old_status: ContractStatus,
        new_status: ContractStatus,
        total_paid: Money,
        total_price: Money,
        timestamp: DateTime<Utc>,
    },
    ContractEdited {
        contract_id: ContractId,
        edited_by: EmployeeId,
        impact: ImpactSummary,
        timestamp: DateTime<Utc>,
    },
    ContractDeleted {
        contract_id: ContractId,
        timestamp: DateTime<Utc>,
    },

    // payment events
    PaymentReceived {
        contract_id: ContractId,
        payment_id: PaymentId,
        kind: PaymentKind,
        source: PaymentSource,
        expected: Money,
        actual: Money,
        status: PaymentStatus,
        timestamp: DateTime<Utc>,
    },
    PaymentConfirmed {
        contract_id: ContractId,
        payment_id: PaymentId,
        status: PaymentStatus,
        confirmed_by: EmployeeId,
        timestamp: DateTime<Utc>,
    },
    PaymentRejected {
        contract_id: ContractId,
        payment_id: PaymentId,
        reason: String,
        rejected_by: EmployeeId,
        timestamp: DateTime<Utc>,
    },
    RemainingPaid {
        contract_id: ContractId,
        payment_id: PaymentId,
        amount: Money,
        still_remaining: Money,
        timestamp: DateTime<Utc>,
    },
    CorrectiveEntryCreated {
        contract_id: ContractId,
        payment_id: PaymentId,
        linked_payment_id: PaymentId,
        amount: Money,
        timestamp: DateTime<Utc>,
    },
    PrepaidBalanceChanged {
        contract_id: ContractId,
        old_balance: Money,
        new_balance: Money,
        timestamp: DateTime<Utc>,
    },

    // schedule events
    DueDateAdvanced {
        contract_id: ContractId,
        old_date: DateTime<Utc>,
        new_date: DateTime<Utc>,
    },
    DueDateRolledBack {
        contract_id: ContractId,
        old_date: DateTime<Utc>,
        new_date: DateTime<Utc>,
    },
    PaymentPostponed {
        contract_id: ContractId,
        previous_date: DateTime<Utc>,
        new_date: DateTime<Utc>,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    // cash events
    BalanceCredited {
        manager_id: EmployeeId,
        amount: Money,
        new_total: Money,
        timestamp: DateTime<Utc>,
    },

    // collection events
    DebtorCreated {
        debtor_id: DebtorId,
        contract_id: ContractId,
        debt_amount: Money,
        overdue_days: u32,
        timestamp: DateTime<Utc>,
    },
    DebtorCleared {
        contract_id: ContractId,
        removed: usize,
        timestamp: DateTime<Utc>,
    },
}

impl Event {
    /// contract the event belongs to, if any
    pub fn contract_id(&self) -> Option<ContractId> {
        match self {
            Event::ContractCreated { contract_id, .. }
            | Event::ContractApproved { contract_id, .. }
            | Event::ContractStatusChanged { contract_id, .. }
            | Event::ContractEdited { contract_id, .. }
            | Event::ContractDeleted { contract_id, .. }
            | Event::PaymentReceived { contract_id, .. }
            | Event::PaymentConfirmed { contract_id, .. }
            | Event::PaymentRejected { contract_id, .. }
            | Event::RemainingPaid { contract_id, .. }
            | Event::CorrectiveEntryCreated { contract_id, .. }
            | Event::PrepaidBalanceChanged { contract_id, .. }
            | Event::DueDateAdvanced { contract_id, .. }
            | Event::DueDateRolledBack { contract_id, .. }
            | Event::PaymentPostponed { contract_id, .. }
            | Event::DebtorCreated { contract_id, .. }
            | Event::DebtorCleared { contract_id, .. } => Some(*contract_id),
            Event::BalanceCredited { .. } => None,
        }
    }
}

/// event store for collecting events during operations
#[derive(Debug, Clone, Default)]
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

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
