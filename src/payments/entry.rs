use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calendar::Period;
use crate::decimal::{CashSplit, Money};
use crate::errors::{LedgerError, Result};
use crate::payments::classify::Classification;
use crate::types::{
    ContractId, CustomerId, EmployeeId, NoteId, PaymentId, PaymentKind, PaymentReason, PaymentSource,
    PaymentStatus,
};

/// one recorded money movement against a contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub contract_id: ContractId,
    pub customer_id: CustomerId,
    /// manager whose cash balance the money lands in
    pub manager_id: EmployeeId,
    pub kind: PaymentKind,
    pub source: PaymentSource,

    // amounts
    pub expected_amount: Money,
    pub actual_amount: Option<Money>,
    pub remaining_amount: Money,
    pub excess_amount: Money,
    /// excess moved into the contract's prepaid balance
    pub prepaid_amount: Money,
    /// prepaid balance consumed to cover this period
    pub prepaid_applied: Money,
    pub cash: Option<CashSplit>,

    // state
    pub status: PaymentStatus,
    pub target_period: Option<Period>,
    pub linked_payment_id: Option<PaymentId>,
    pub reason: Option<PaymentReason>,
    pub note_id: Option<NoteId>,
    /// this entry moved the contract's due date when it was recorded
    pub advanced_due_date: bool,

    // dates
    pub date: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub confirmed_by: Option<EmployeeId>,
    pub rejected_at: Option<DateTime<Utc>>,
}

impl Payment {
    /// create new pending entry
    pub fn new(
        contract_id: ContractId,
        customer_id: CustomerId,
        manager_id: EmployeeId,
        kind: PaymentKind,
        source: PaymentSource,
        expected_amount: Money,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            contract_id,
            customer_id,
            manager_id,
            kind,
            source,
            expected_amount,
            actual_amount: None,
            remaining_amount: Money::ZERO,
            excess_amount: Money::ZERO,
            prepaid_amount: Money::ZERO,
            prepaid_applied: Money::ZERO,
            cash: None,
            status: PaymentStatus::Pending,
            target_period: None,
            linked_payment_id: None,
            reason: None,
            note_id: None,
            advanced_due_date: false,
            date,
            confirmed_at: None,
            confirmed_by: None,
            rejected_at: None,
        }
    }

    /// corrective entry for the shortfall of `original`
    ///
    /// stays pending until the shortfall is paid through `pay_remaining`.
    pub fn corrective(original: &Payment, shortfall: Money, reason: PaymentReason, date: DateTime<Utc>) -> Self {
        let mut extra = Payment::new(
            original.contract_id,
            original.customer_id,
            original.manager_id,
            PaymentKind::Extra,
            original.source,
            shortfall,
            date,
        );
        extra.remaining_amount = shortfall;
        extra.target_period = original.target_period;
        extra.linked_payment_id = Some(original.id);
        extra.reason = Some(reason);
        extra
    }

    /// record what was received and how it compares to the expected amount
    pub fn apply_classification(&mut self, actual: Money, classification: &Classification) {
        self.actual_amount = Some(actual);
        self.remaining_amount = classification.remaining;
        self.excess_amount = classification.excess;
        self.prepaid_amount = classification.excess;
        // pending entries keep their status until the cash desk decides
        if self.status != PaymentStatus::Pending {
            self.status = classification.status;
        }
    }

    /// status the recorded amounts call for
    pub fn classified_status(&self) -> PaymentStatus {
        if self.remaining_amount.is_positive() {
            PaymentStatus::Underpaid
        } else if self.excess_amount.is_positive() {
            PaymentStatus::Overpaid
        } else {
            PaymentStatus::Paid
        }
    }

    /// fails unless the entry is still waiting for the cash desk
    pub fn ensure_pending(&self) -> Result<()> {
        if self.status != PaymentStatus::Pending {
            return Err(LedgerError::AlreadyProcessed {
                payment_id: self.id,
                status: self.status,
            });
        }
        Ok(())
    }

    /// move a pending entry to its settled status
    pub fn confirm(&mut self, status: PaymentStatus, actor: EmployeeId, now: DateTime<Utc>) -> Result<()> {
        self.ensure_pending()?;
        if !status.is_settled() {
            return Err(LedgerError::Validation {
                field: "status".to_string(),
                message: format!("{:?} is not a settled status", status),
            });
        }
        self.status = status;
        self.confirmed_at = Some(now);
        self.confirmed_by = Some(actor);
        Ok(())
    }

    /// refuse a pending entry, terminal
    pub fn reject(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.ensure_pending()?;
        self.status = PaymentStatus::Rejected;
        self.rejected_at = Some(now);
        Ok(())
    }

    /// book part of the shortfall, returns what is still owed
    pub fn pay_toward_remaining(&mut self, amount: Money, tolerance: Money) -> Money {
        let actual = self.actual_amount.unwrap_or(Money::ZERO) + amount;
        self.actual_amount = Some(actual);
        let remaining = (self.remaining_amount - amount).non_negative();
        if remaining < tolerance {
            self.remaining_amount = Money::ZERO;
            self.status = PaymentStatus::Paid;
        } else {
            self.remaining_amount = remaining;
        }
        self.remaining_amount
    }

    /// confirmed by the cash desk or entered at the dashboard
    pub fn is_confirmed(&self) -> bool {
        self.confirmed_at.is_some() && self.status != PaymentStatus::Rejected
    }

    /// settled without a shortfall or excess
    pub fn is_paid(&self) -> bool {
        self.status == PaymentStatus::Paid
    }

    pub fn is_pending(&self) -> bool {
        self.status == PaymentStatus::Pending
    }

    /// money that counts toward the contract total
    ///
    /// corrective entries mirror a shortfall that is booked on the
    /// linked entry, so they never count on their own.
    pub fn counts_toward_total(&self) -> bool {
        self.is_confirmed() && self.kind != PaymentKind::Extra
    }

    /// received amount, zero when nothing was recorded yet
    pub fn received(&self) -> Money {
        self.actual_amount.unwrap_or(Money::ZERO)
    }

    /// amount credited to the manager's cash balance
    pub fn cash_received(&self) -> CashSplit {
        self.cash.unwrap_or_else(|| CashSplit::dollars(self.received()))
    }

    /// structural invariants every entry must hold
    pub fn check_invariants(&self) -> Result<()> {
        if self.remaining_amount.is_positive() && self.excess_amount.is_positive() {
            return Err(LedgerError::Validation {
                field: "remaining_amount".to_string(),
                message: "an entry cannot be both short and over".to_string(),
            });
        }
        if self.kind == PaymentKind::Extra && self.linked_payment_id.is_none() {
            return Err(LedgerError::Validation {
                field: "linked_payment_id".to_string(),
                message: "corrective entry without a linked entry".to_string(),
            });
        }
        Ok(())
    }
}
