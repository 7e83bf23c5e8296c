pub mod cascade;
pub mod throttle;
pub mod validate;

pub use cascade::{reclassify, CascadeInput, CascadePlan, EntryOutcome};
pub use throttle::EditThrottle;
pub use validate::validate_update;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{ContractStatus, EmployeeId, PaymentId};

/// financial field of a contract that can be edited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContractField {
    MonthlyPayment,
    InitialPayment,
    TotalPrice,
}

/// before/after of one edited field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: ContractField,
    pub old_value: Money,
    pub new_value: Money,
    pub difference: Money,
}

impl FieldChange {
    pub fn new(field: ContractField, old_value: Money, new_value: Money) -> Self {
        Self {
            field,
            old_value,
            new_value,
            difference: new_value - old_value,
        }
    }
}

/// requested contract edit, absent fields stay unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractUpdate {
    pub monthly_payment: Option<Money>,
    pub initial_payment: Option<Money>,
    pub total_price: Option<Money>,
}

impl ContractUpdate {
    pub fn monthly_payment(mut self, amount: Money) -> Self {
        self.monthly_payment = Some(amount);
        self
    }

    pub fn initial_payment(mut self, amount: Money) -> Self {
        self.initial_payment = Some(amount);
        self
    }

    pub fn total_price(mut self, amount: Money) -> Self {
        self.total_price = Some(amount);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.monthly_payment.is_none() && self.initial_payment.is_none() && self.total_price.is_none()
    }
}

/// what a monthly payment change does to already confirmed entries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImpactSummary {
    pub underpaid_count: u32,
    pub overpaid_count: u32,
    pub total_shortage: Money,
    pub total_excess: Money,
    pub corrective_entries_created: u32,
    /// excess left after the last entry, folded into the prepaid balance
    pub leftover_carry: Money,
}

/// immutable audit record of one applied edit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditRecord {
    pub edited_at: DateTime<Utc>,
    pub edited_by: EmployeeId,
    pub changes: Vec<FieldChange>,
    pub affected_payments: Vec<PaymentId>,
    pub impact: ImpactSummary,
}

/// dry-run result of an edit, also returned after committing it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditImpact {
    pub changes: Vec<FieldChange>,
    pub outcomes: Vec<EntryOutcome>,
    pub impact: ImpactSummary,
    pub prepaid_balance: Money,
    pub status: ContractStatus,
}

impl EditImpact {
    pub fn affected_payments(&self) -> Vec<PaymentId> {
        self.outcomes
            .iter()
            .filter(|o| o.changed())
            .map(|o| o.payment_id)
            .collect()
    }
}
