use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// unique identifier for a contract
pub type ContractId = Uuid;

/// unique identifier for a ledger entry
pub type PaymentId = Uuid;

/// unique identifier for a staff member
pub type EmployeeId = Uuid;

/// unique identifier for a customer
pub type CustomerId = Uuid;

/// unique identifier for an overdue marker
pub type DebtorId = Uuid;

/// unique identifier for an audit note
pub type NoteId = Uuid;

/// contract status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContractStatus {
    /// payments still owed
    Active,
    /// confirmed payments plus prepaid balance cover the total price
    Completed,
}

/// ledger entry status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// waiting for the cash desk
    Pending,
    /// matched the expected amount
    Paid,
    /// short of the expected amount
    Underpaid,
    /// above the expected amount
    Overpaid,
    /// refused by the cash desk, terminal
    Rejected,
}

impl PaymentStatus {
    /// statuses a confirmed entry can carry
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Paid | PaymentStatus::Underpaid | PaymentStatus::Overpaid
        )
    }
}

/// what the entry pays for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentKind {
    /// down payment taken at signing
    Initial,
    /// regular installment
    Monthly,
    /// corrective entry covering a shortfall of a linked entry
    Extra,
}

/// why an entry was created or changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentReason {
    /// shortfall at the time of payment
    Underpayment,
    /// shortfall created by a monthly payment increase
    MonthlyPaymentIncrease,
    /// shortfall created by a monthly payment decrease re-cascade
    MonthlyPaymentDecrease,
    /// initial payment amount edited
    InitialPaymentChange,
}

/// where a payment intent came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentSource {
    /// self-reported by a manager in the bot, needs cash confirmation
    Bot,
    /// entered at the dashboard, self-confirming
    Dashboard,
}

/// staff role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Moderator,
    Manager,
    Seller,
    Kassa,
}

impl Role {
    /// roles allowed to activate contracts drafted by sellers
    pub fn can_approve_contracts(&self) -> bool {
        matches!(self, Role::Admin | Role::Moderator | Role::Manager)
    }
}

/// staff member acting on the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

impl Employee {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            role,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}
