use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::Period;
use crate::decimal::Money;
use crate::errors::Result;
use crate::payments::Payment;
use crate::store::LedgerTables;
use crate::types::{
    ContractId, ContractStatus, CustomerId, EmployeeId, PaymentId, PaymentKind, PaymentStatus,
};

/// contract terms with derived totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractView {
    pub id: ContractId,
    pub customer_id: CustomerId,
    pub product_name: String,
    pub status: ContractStatus,
    pub is_active: bool,
    pub total_price: Money,
    pub initial_payment: Money,
    pub monthly_payment: Money,
    pub period: u32,
    pub paid_months: u32,
    pub total_paid: Money,
    pub prepaid_balance: Money,
    /// what is still owed after payments and prepaid balance
    pub remaining_debt: Money,
    /// open shortfalls on underpaid entries
    pub outstanding_shortfall: Money,
    pub pending_payments: usize,
    pub next_payment_date: DateTime<Utc>,
    pub previous_payment_date: Option<DateTime<Utc>>,
    pub is_postponed_once: bool,
    pub edits: usize,
}

impl ContractView {
    pub fn build(tables: &LedgerTables, contract_id: ContractId) -> Result<Self> {
        let contract = tables.contract(contract_id)?;
        let entries = tables.contract_payments(contract_id);
        let total_paid = tables.total_paid(contract_id);

        let outstanding_shortfall: Money = entries
            .iter()
            .filter(|p| p.is_confirmed() && p.status == PaymentStatus::Underpaid)
            .map(|p| p.remaining_amount)
            .sum();
        let pending_payments = entries
            .iter()
            .filter(|p| p.is_pending() && p.kind != PaymentKind::Extra)
            .count();

        Ok(Self {
            id: contract.id,
            customer_id: contract.customer_id,
            product_name: contract.product_name.clone(),
            status: contract.status,
            is_active: contract.is_active,
            total_price: contract.total_price,
            initial_payment: contract.initial_payment,
            monthly_payment: contract.monthly_payment,
            period: contract.period,
            paid_months: tables.paid_months(contract_id),
            total_paid,
            prepaid_balance: contract.prepaid_balance,
            remaining_debt: (contract.total_price - total_paid - contract.prepaid_balance).non_negative(),
            outstanding_shortfall,
            pending_payments,
            next_payment_date: contract.next_payment_date,
            previous_payment_date: contract.previous_payment_date,
            is_postponed_once: contract.is_postponed_once,
            edits: contract.edit_history.len(),
        })
    }

    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// row in the cash desk's queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingPaymentView {
    pub payment_id: PaymentId,
    pub contract_id: ContractId,
    pub customer_id: CustomerId,
    pub product_name: String,
    pub manager_id: EmployeeId,
    pub manager_name: String,
    pub expected: Money,
    pub actual: Money,
    /// status the entry takes when confirmed
    pub classified_as: PaymentStatus,
    pub remaining: Money,
    pub excess: Money,
    pub target_period: Option<Period>,
    pub date: DateTime<Utc>,
    pub note: Option<String>,
}

impl PendingPaymentView {
    pub fn build(tables: &LedgerTables, payment: &Payment) -> Self {
        Self {
            payment_id: payment.id,
            contract_id: payment.contract_id,
            customer_id: payment.customer_id,
            product_name: tables
                .contracts
                .get(&payment.contract_id)
                .map(|c| c.product_name.clone())
                .unwrap_or_default(),
            manager_id: payment.manager_id,
            manager_name: tables
                .employees
                .get(&payment.manager_id)
                .map(|e| e.full_name())
                .unwrap_or_default(),
            expected: payment.expected_amount - payment.prepaid_applied,
            actual: payment.received(),
            classified_as: payment.classified_status(),
            remaining: payment.remaining_amount,
            excess: payment.excess_amount,
            target_period: payment.target_period,
            date: payment.date,
            note: note_text(tables, payment),
        }
    }
}

/// row in the confirmed payment history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentHistoryItem {
    pub payment_id: PaymentId,
    pub contract_id: ContractId,
    pub kind: PaymentKind,
    pub status: PaymentStatus,
    pub expected: Money,
    pub actual: Money,
    pub remaining: Money,
    pub excess: Money,
    pub date: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub confirmed_by: Option<EmployeeId>,
    pub note: Option<String>,
}

impl PaymentHistoryItem {
    pub fn build(tables: &LedgerTables, payment: &Payment) -> Self {
        Self {
            payment_id: payment.id,
            contract_id: payment.contract_id,
            kind: payment.kind,
            status: payment.status,
            expected: payment.expected_amount,
            actual: payment.received(),
            remaining: payment.remaining_amount,
            excess: payment.excess_amount,
            date: payment.date,
            confirmed_at: payment.confirmed_at,
            confirmed_by: payment.confirmed_by,
            note: note_text(tables, payment),
        }
    }
}

fn note_text(tables: &LedgerTables, payment: &Payment) -> Option<String> {
    payment
        .note_id
        .and_then(|id| tables.notes.get(&id))
        .map(|n| n.text.clone())
}
