use chrono::{DateTime, Datelike, Utc};
use hourglass_rs::SafeTimeProvider;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calendar::{add_months_anchored, start_of_day};
use crate::decimal::Money;
use crate::editing::EditRecord;
use crate::errors::{LedgerError, Result};
use crate::types::{ContractId, ContractStatus, CustomerId, EmployeeId, PaymentId};

/// financial terms agreed at signing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractTerms {
    pub customer_id: CustomerId,
    pub product_name: String,
    pub original_price: Money,
    pub price: Money,
    pub initial_payment: Money,
    /// markup over the original price
    pub percentage: Decimal,
    /// number of monthly installments
    pub period: u32,
    pub monthly_payment: Money,
    pub total_price: Money,
    pub start_date: DateTime<Utc>,
    pub notes: Option<String>,
}

/// installment agreement between a customer and the business
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    pub customer_id: CustomerId,
    /// employee who created the contract
    pub created_by: EmployeeId,
    pub product_name: String,
    pub notes: Option<String>,

    // terms
    pub original_price: Money,
    pub price: Money,
    pub initial_payment: Money,
    pub percentage: Decimal,
    pub period: u32,
    pub monthly_payment: Money,
    pub total_price: Money,

    // schedule
    pub start_date: DateTime<Utc>,
    pub next_payment_date: DateTime<Utc>,
    /// due date before the current postponement, cleared on the next advance
    pub previous_payment_date: Option<DateTime<Utc>>,
    pub postponed_at: Option<DateTime<Utc>>,
    pub is_postponed_once: bool,
    /// day of month the schedule returns to after a postponement
    pub original_payment_day: Option<u32>,

    // balances
    pub prepaid_balance: Money,

    // lifecycle
    pub status: ContractStatus,
    /// false while a seller draft waits for approval
    pub is_active: bool,
    pub is_deleted: bool,
    pub payments: Vec<PaymentId>,
    pub edit_history: Vec<EditRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contract {
    /// create new contract from agreed terms
    ///
    /// an approved contract is due one month after the start date, a
    /// draft keeps the start date until it is approved.
    pub fn new(terms: ContractTerms, created_by: EmployeeId, approved: bool, now: DateTime<Utc>) -> Self {
        let anchor = terms.start_date.day();
        let next_payment_date = if approved {
            add_months_anchored(terms.start_date, 1, anchor)
        } else {
            terms.start_date
        };

        Self {
            id: Uuid::new_v4(),
            customer_id: terms.customer_id,
            created_by,
            product_name: terms.product_name,
            notes: terms.notes,
            original_price: terms.original_price,
            price: terms.price,
            initial_payment: terms.initial_payment,
            percentage: terms.percentage,
            period: terms.period,
            monthly_payment: terms.monthly_payment,
            total_price: terms.total_price,
            start_date: terms.start_date,
            next_payment_date,
            previous_payment_date: None,
            postponed_at: None,
            is_postponed_once: false,
            original_payment_day: Some(anchor),
            prepaid_balance: Money::ZERO,
            status: ContractStatus::Active,
            is_active: approved,
            is_deleted: false,
            payments: Vec::new(),
            edit_history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// builder for contract terms
    pub fn builder() -> ContractBuilder {
        ContractBuilder::new()
    }

    /// activate a seller draft, schedule restarts from the start date
    pub fn approve(&mut self, now: DateTime<Utc>) {
        self.is_active = true;
        self.next_payment_date = add_months_anchored(self.start_date, 1, self.anchor_day());
        self.updated_at = now;
    }

    /// day of month the schedule is anchored to
    pub fn anchor_day(&self) -> u32 {
        self.original_payment_day.unwrap_or_else(|| self.next_payment_date.day())
    }

    /// fails unless payments can be booked against the contract
    pub fn ensure_accepts_payments(&self) -> Result<()> {
        if self.is_deleted {
            return Err(LedgerError::ContractNotFound { id: self.id });
        }
        if !self.is_active || self.status != ContractStatus::Active {
            return Err(LedgerError::ContractNotActive {
                approved: self.is_active,
                status: self.status,
            });
        }
        Ok(())
    }

    /// move the due date one month forward and clear postponement
    pub fn advance_due_date(&mut self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let anchor = self.anchor_day();
        if self.original_payment_day.is_none() {
            self.original_payment_day = Some(anchor);
        }
        let old = self.next_payment_date;
        self.next_payment_date = add_months_anchored(old, 1, anchor);
        self.previous_payment_date = None;
        self.postponed_at = None;
        self.updated_at = now;
        (old, self.next_payment_date)
    }

    /// undo one month of advancement
    pub fn roll_back_due_date(&mut self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let old = self.next_payment_date;
        self.next_payment_date = add_months_anchored(old, -1, self.anchor_day());
        self.updated_at = now;
        (old, self.next_payment_date)
    }

    /// push the due date to `new_date`
    ///
    /// a single slot: postponing again overwrites the saved previous date.
    pub fn postpone(&mut self, new_date: DateTime<Utc>, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        if new_date < start_of_day(now) {
            return Err(LedgerError::PastDate {
                date: new_date.date_naive(),
            });
        }

        let previous = self.next_payment_date;
        if self.original_payment_day.is_none() {
            self.original_payment_day = Some(previous.day());
        }
        self.previous_payment_date = Some(previous);
        self.next_payment_date = new_date;
        self.postponed_at = Some(now);
        self.is_postponed_once = true;
        self.updated_at = now;
        Ok(previous)
    }

    /// status the contract should have for the given confirmed total
    pub fn completion_status(&self, total_paid: Money) -> ContractStatus {
        if total_paid + self.prepaid_balance >= self.total_price {
            ContractStatus::Completed
        } else {
            ContractStatus::Active
        }
    }

    /// re-check completion, returns the transition if the status flipped
    pub fn apply_completion(
        &mut self,
        total_paid: Money,
        now: DateTime<Utc>,
    ) -> Option<(ContractStatus, ContractStatus)> {
        let target = self.completion_status(total_paid);
        if target == self.status {
            return None;
        }
        let old = self.status;
        self.status = target;
        self.updated_at = now;
        Some((old, target))
    }

    /// installments not yet covered
    pub fn remaining_months(&self, paid_months: u32) -> u32 {
        self.period.saturating_sub(paid_months)
    }
}

/// builder for contract terms
pub struct ContractBuilder {
    customer_id: Option<CustomerId>,
    product_name: Option<String>,
    original_price: Option<Money>,
    price: Option<Money>,
    initial_payment: Option<Money>,
    percentage: Option<Decimal>,
    period: Option<u32>,
    monthly_payment: Option<Money>,
    total_price: Option<Money>,
    start_date: Option<DateTime<Utc>>,
    notes: Option<String>,
}

impl Default for ContractBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ContractBuilder {
    pub fn new() -> Self {
        Self {
            customer_id: None,
            product_name: None,
            original_price: None,
            price: None,
            initial_payment: None,
            percentage: None,
            period: None,
            monthly_payment: None,
            total_price: None,
            start_date: None,
            notes: None,
        }
    }

    pub fn customer_id(mut self, customer: CustomerId) -> Self {
        self.customer_id = Some(customer);
        self
    }

    pub fn product_name(mut self, name: impl Into<String>) -> Self {
        self.product_name = Some(name.into());
        self
    }

    pub fn original_price(mut self, price: Money) -> Self {
        self.original_price = Some(price);
        self
    }

    pub fn price(mut self, price: Money) -> Self {
        self.price = Some(price);
        self
    }

    pub fn initial_payment(mut self, amount: Money) -> Self {
        self.initial_payment = Some(amount);
        self
    }

    pub fn percentage(mut self, percentage: Decimal) -> Self {
        self.percentage = Some(percentage);
        self
    }

    pub fn period(mut self, months: u32) -> Self {
        self.period = Some(months);
        self
    }

    pub fn monthly_payment(mut self, amount: Money) -> Self {
        self.monthly_payment = Some(amount);
        self
    }

    pub fn total_price(mut self, amount: Money) -> Self {
        self.total_price = Some(amount);
        self
    }

    pub fn start_date(mut self, date: DateTime<Utc>) -> Self {
        self.start_date = Some(date);
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// build terms, start date defaults to the provider's now
    pub fn build(self, time: &SafeTimeProvider) -> Result<ContractTerms> {
        let customer_id = self.customer_id.ok_or_else(|| required("customer_id"))?;
        let total_price = self.total_price.ok_or_else(|| required("total_price"))?;
        let period = self.period.ok_or_else(|| required("period"))?;
        let initial_payment = self.initial_payment.unwrap_or(Money::ZERO);

        if period == 0 {
            return Err(LedgerError::Validation {
                field: "period".to_string(),
                message: "must be at least one month".to_string(),
            });
        }
        if initial_payment.is_negative() {
            return Err(LedgerError::InvalidAmount { amount: initial_payment });
        }
        if total_price <= initial_payment {
            return Err(LedgerError::TotalPriceNotAboveInitial {
                total_price,
                initial_payment,
            });
        }

        // monthly installment defaults to an even split of the financed part
        let monthly_payment = match self.monthly_payment {
            Some(amount) => amount,
            None => ((total_price - initial_payment) / Decimal::from(period)).round_dp(2),
        };
        if !monthly_payment.is_positive() {
            return Err(LedgerError::InvalidAmount { amount: monthly_payment });
        }

        let price = self.price.unwrap_or(total_price);
        Ok(ContractTerms {
            customer_id,
            product_name: self.product_name.unwrap_or_default(),
            original_price: self.original_price.unwrap_or(price),
            price,
            initial_payment,
            percentage: self.percentage.unwrap_or(Decimal::ZERO),
            period,
            monthly_payment,
            total_price,
            start_date: self.start_date.unwrap_or_else(|| time.now()),
            notes: self.notes,
        })
    }
}

fn required(field: &str) -> LedgerError {
    LedgerError::Validation {
        field: field.to_string(),
        message: "required".to_string(),
    }
}
