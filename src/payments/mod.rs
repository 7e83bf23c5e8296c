pub mod classify;
pub mod entry;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::calendar::Period;
use crate::decimal::{CashSplit, Money};
use crate::errors::{LedgerError, Result};
use crate::types::{ContractId, ContractStatus, CustomerId, EmployeeId, PaymentId, PaymentSource, PaymentStatus};

pub use classify::{classify, Classification};
pub use entry::Payment;

/// payment intent from the bot or the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub contract_id: ContractId,
    pub amount: Money,
    pub source: PaymentSource,
    pub notes: Option<String>,
    pub cash: Option<CashSplit>,
    pub target_period: Option<Period>,
}

impl PaymentRequest {
    /// manager-reported payment, waits for the cash desk
    pub fn bot(contract_id: ContractId, amount: Money) -> Self {
        Self::new(contract_id, amount, PaymentSource::Bot)
    }

    /// dashboard payment, confirmed on entry
    pub fn dashboard(contract_id: ContractId, amount: Money) -> Self {
        Self::new(contract_id, amount, PaymentSource::Dashboard)
    }

    fn new(contract_id: ContractId, amount: Money, source: PaymentSource) -> Self {
        Self {
            contract_id,
            amount,
            source,
            notes: None,
            cash: None,
            target_period: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// record how the cash was handed over
    pub fn with_cash(mut self, cash: CashSplit) -> Self {
        self.cash = Some(cash);
        self
    }

    pub fn for_period(mut self, period: Period) -> Self {
        self.target_period = Some(period);
        self
    }
}

/// amounts must be strictly positive
pub fn validate_amount(amount: Money) -> Result<()> {
    if !amount.is_positive() {
        return Err(LedgerError::InvalidAmount { amount });
    }
    Ok(())
}

/// what the caller learns about a recorded payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub payment_id: PaymentId,
    pub contract_id: ContractId,
    pub status: PaymentStatus,
    /// classification the cash desk will confirm
    pub classification: Classification,
    pub expected: Money,
    pub prepaid_applied: Money,
    pub actual: Money,
    pub prepaid_balance: Money,
    pub next_payment_date: DateTime<Utc>,
    pub corrective_payment_id: Option<PaymentId>,
    pub contract_status: ContractStatus,
    pub message: String,
}

impl PaymentReceipt {
    pub fn is_pending(&self) -> bool {
        self.status == PaymentStatus::Pending
    }
}

/// result of paying toward a shortfall
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemainingReceipt {
    /// entry the shortfall belongs to
    pub payment_id: PaymentId,
    pub paid: Money,
    pub still_remaining: Money,
    pub status: PaymentStatus,
    pub contract_status: ContractStatus,
}

/// result of paying every outstanding month at once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkPaymentReceipt {
    pub contract_id: ContractId,
    pub payment_ids: Vec<PaymentId>,
    pub months: u32,
    pub per_month: Money,
    pub contract_status: ContractStatus,
}

/// selection for the payment history listing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentHistoryFilter {
    pub contract_id: Option<ContractId>,
    pub customer_id: Option<CustomerId>,
    pub manager_id: Option<EmployeeId>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl PaymentHistoryFilter {
    pub fn for_contract(contract_id: ContractId) -> Self {
        Self {
            contract_id: Some(contract_id),
            ..Self::default()
        }
    }

    pub fn for_customer(customer_id: CustomerId) -> Self {
        Self {
            customer_id: Some(customer_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, payment: &Payment) -> bool {
        self.contract_id.map_or(true, |id| payment.contract_id == id)
            && self.customer_id.map_or(true, |id| payment.customer_id == id)
            && self.manager_id.map_or(true, |id| payment.manager_id == id)
            && self.from.map_or(true, |from| payment.date >= from)
            && self.to.map_or(true, |to| payment.date <= to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PaymentKind;
    use chrono::TimeZone;
    use uuid::Uuid;

    #[test]
    fn test_validate_amount() {
        assert!(validate_amount(Money::from_major(1)).is_ok());
        assert_eq!(
            validate_amount(Money::ZERO).unwrap_err(),
            LedgerError::InvalidAmount { amount: Money::ZERO }
        );
        assert!(validate_amount(Money::from_major(-5)).is_err());
    }

    #[test]
    fn test_request_builders() {
        let id = Uuid::new_v4();
        let req = PaymentRequest::bot(id, Money::from_major(100))
            .with_notes("cash at the shop")
            .for_period(Period::new(2024, 3));
        assert_eq!(req.source, PaymentSource::Bot);
        assert_eq!(req.notes.as_deref(), Some("cash at the shop"));
        assert_eq!(req.target_period, Some(Period::new(2024, 3)));
        assert_eq!(PaymentRequest::dashboard(id, Money::ONE).source, PaymentSource::Dashboard);
    }

    #[test]
    fn test_history_filter() {
        let contract_id = Uuid::new_v4();
        let payment = Payment::new(
            contract_id,
            Uuid::new_v4(),
            Uuid::new_v4(),
            PaymentKind::Monthly,
            PaymentSource::Dashboard,
            Money::from_major(100),
            Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
        );

        assert!(PaymentHistoryFilter::default().matches(&payment));
        assert!(PaymentHistoryFilter::for_contract(contract_id).matches(&payment));
        assert!(!PaymentHistoryFilter::for_contract(Uuid::new_v4()).matches(&payment));
        assert!(!PaymentHistoryFilter::for_customer(Uuid::new_v4()).matches(&payment));

        let window = PaymentHistoryFilter {
            from: Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()),
            ..PaymentHistoryFilter::default()
        };
        assert!(!window.matches(&payment));
    }
}
