use rust_decimal::Decimal;
use thiserror::Error;

use crate::decimal::Money;
use crate::types::{ContractId, ContractStatus, DebtorId, EmployeeId, PaymentId, PaymentStatus};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("invalid {field}: {message}")]
    Validation {
        field: String,
        message: String,
    },

    #[error("invalid payment amount: {amount}")]
    InvalidAmount {
        amount: Money,
    },

    #[error("date {date} is in the past")]
    PastDate {
        date: chrono::NaiveDate,
    },

    #[error("monthly payment cannot change by more than {limit}% (requested {percent}%: {old} -> {new})")]
    MonthlyChangeTooLarge {
        old: Money,
        new: Money,
        percent: Decimal,
        limit: Decimal,
    },

    #[error("total price {total_price} must be greater than initial payment {initial_payment}")]
    TotalPriceNotAboveInitial {
        total_price: Money,
        initial_payment: Money,
    },

    #[error("contract not found: {id}")]
    ContractNotFound {
        id: ContractId,
    },

    #[error("payment not found: {id}")]
    PaymentNotFound {
        id: PaymentId,
    },

    #[error("employee not found: {id}")]
    EmployeeNotFound {
        id: EmployeeId,
    },

    #[error("debtor not found: {id}")]
    DebtorNotFound {
        id: DebtorId,
    },

    #[error("forbidden: {reason}")]
    Forbidden {
        reason: String,
    },

    #[error("payment {payment_id} already processed: current status is {status:?}")]
    AlreadyProcessed {
        payment_id: PaymentId,
        status: PaymentStatus,
    },

    #[error("payment {payment_id} is {status:?}, only underpaid payments can be topped up")]
    NotUnderpaid {
        payment_id: PaymentId,
        status: PaymentStatus,
    },

    #[error("remaining debt is {remaining}, but {requested} was offered")]
    RemainingExceeded {
        remaining: Money,
        requested: Money,
    },

    #[error("nothing left to pay on {what}")]
    NothingRemaining {
        what: String,
    },

    #[error("contract not accepting payments: approved={approved}, status {status:?}")]
    ContractNotActive {
        approved: bool,
        status: ContractStatus,
    },

    #[error("too many requests, retry in {retry_after_secs}s")]
    RateLimited {
        retry_after_secs: u64,
    },

    #[error("storage failure: {message}")]
    Storage {
        message: String,
    },
}

impl LedgerError {
    /// http status the api layer answers with
    pub fn http_status(&self) -> u16 {
        match self {
            LedgerError::Validation { .. }
            | LedgerError::InvalidAmount { .. }
            | LedgerError::PastDate { .. }
            | LedgerError::MonthlyChangeTooLarge { .. }
            | LedgerError::TotalPriceNotAboveInitial { .. }
            | LedgerError::AlreadyProcessed { .. }
            | LedgerError::NotUnderpaid { .. }
            | LedgerError::RemainingExceeded { .. }
            | LedgerError::NothingRemaining { .. } => 400,
            LedgerError::Forbidden { .. } => 403,
            LedgerError::ContractNotFound { .. }
            | LedgerError::PaymentNotFound { .. }
            | LedgerError::EmployeeNotFound { .. }
            | LedgerError::DebtorNotFound { .. } => 404,
            LedgerError::ContractNotActive { .. } => 409,
            LedgerError::RateLimited { .. } => 429,
            LedgerError::Storage { .. } => 500,
        }
    }

    /// stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::Validation { .. } => "VALIDATION_ERROR",
            LedgerError::InvalidAmount { .. } => "INVALID_AMOUNT",
            LedgerError::PastDate { .. } => "DATE_IN_PAST",
            LedgerError::MonthlyChangeTooLarge { .. } => "MONTHLY_CHANGE_TOO_LARGE",
            LedgerError::TotalPriceNotAboveInitial { .. } => "TOTAL_PRICE_NOT_ABOVE_INITIAL",
            LedgerError::ContractNotFound { .. } => "CONTRACT_NOT_FOUND",
            LedgerError::PaymentNotFound { .. } => "PAYMENT_NOT_FOUND",
            LedgerError::EmployeeNotFound { .. } => "EMPLOYEE_NOT_FOUND",
            LedgerError::DebtorNotFound { .. } => "DEBTOR_NOT_FOUND",
            LedgerError::Forbidden { .. } => "FORBIDDEN",
            LedgerError::AlreadyProcessed { .. } => "ALREADY_PROCESSED",
            LedgerError::NotUnderpaid { .. } => "NOT_UNDERPAID",
            LedgerError::RemainingExceeded { .. } => "REMAINING_EXCEEDED",
            LedgerError::NothingRemaining { .. } => "NOTHING_REMAINING",
            LedgerError::ContractNotActive { .. } => "CONTRACT_NOT_ACTIVE",
            LedgerError::RateLimited { .. } => "RATE_LIMITED",
            LedgerError::Storage { .. } => "INTERNAL_ERROR",
        }
    }

    /// message safe to hand to a caller; storage details stay in the logs
    pub fn public_message(&self) -> String {
        match self {
            LedgerError::Storage { .. } => "internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_status_taxonomy() {
        let not_found = LedgerError::ContractNotFound { id: Uuid::new_v4() };
        assert_eq!(not_found.http_status(), 404);
        assert_eq!(not_found.code(), "CONTRACT_NOT_FOUND");

        let processed = LedgerError::AlreadyProcessed {
            payment_id: Uuid::new_v4(),
            status: PaymentStatus::Rejected,
        };
        assert_eq!(processed.http_status(), 400);

        assert_eq!(LedgerError::RateLimited { retry_after_secs: 5 }.http_status(), 429);
        assert_eq!(LedgerError::Forbidden { reason: "role".into() }.http_status(), 403);
    }

    #[test]
    fn test_storage_message_is_hidden() {
        let err = LedgerError::Storage {
            message: "lock poisoned at 0x1234".to_string(),
        };
        assert_eq!(err.http_status(), 500);
        assert_eq!(err.public_message(), "internal server error");
    }
}
