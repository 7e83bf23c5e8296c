use rust_decimal::Decimal;

use crate::config::LedgerConfig;
use crate::contract::Contract;
use crate::decimal::Money;
use crate::editing::{ContractField, ContractUpdate, FieldChange};
use crate::errors::{LedgerError, Result};

/// check an edit against the contract and list the fields it changes
///
/// runs before anything is written. unchanged fields are left out.
pub fn validate_update(contract: &Contract, update: &ContractUpdate, config: &LedgerConfig) -> Result<Vec<FieldChange>> {
    for (field, value) in [
        ("monthly_payment", update.monthly_payment),
        ("initial_payment", update.initial_payment),
        ("total_price", update.total_price),
    ] {
        if let Some(amount) = value {
            if amount.is_negative() {
                return Err(LedgerError::Validation {
                    field: field.to_string(),
                    message: format!("must not be negative, got {}", amount),
                });
            }
        }
    }

    if let Some(new) = update.monthly_payment {
        if new.is_zero() {
            return Err(LedgerError::InvalidAmount { amount: new });
        }
        let old = contract.monthly_payment;
        if old.is_positive() {
            if let Some(percent) = change_percent(old, new) {
                if percent > config.max_monthly_change_percent {
                    return Err(LedgerError::MonthlyChangeTooLarge {
                        old,
                        new,
                        percent: percent.round_dp(2),
                        limit: config.max_monthly_change_percent,
                    });
                }
            }
        }
    }

    let total_price = update.total_price.unwrap_or(contract.total_price);
    let initial_payment = update.initial_payment.unwrap_or(contract.initial_payment);
    if total_price <= initial_payment {
        return Err(LedgerError::TotalPriceNotAboveInitial {
            total_price,
            initial_payment,
        });
    }

    let mut changes = Vec::new();
    push_change(&mut changes, ContractField::MonthlyPayment, contract.monthly_payment, update.monthly_payment);
    push_change(&mut changes, ContractField::InitialPayment, contract.initial_payment, update.initial_payment);
    push_change(&mut changes, ContractField::TotalPrice, contract.total_price, update.total_price);
    Ok(changes)
}

fn push_change(changes: &mut Vec<FieldChange>, field: ContractField, old: Money, new: Option<Money>) {
    if let Some(new) = new {
        if new != old {
            changes.push(FieldChange::new(field, old, new));
        }
    }
}

/// percentage change between two amounts, none when the base is zero
pub fn change_percent(old: Money, new: Money) -> Option<Decimal> {
    (new - old).abs().percent_of(old)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use hourglass_rs::{SafeTimeProvider, TimeSource};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn contract() -> Contract {
        let time = SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));
        let terms = Contract::builder()
            .customer_id(Uuid::new_v4())
            .total_price(Money::from_major(1400))
            .initial_payment(Money::from_major(200))
            .period(12)
            .build(&time)
            .unwrap();
        Contract::new(terms, Uuid::new_v4(), true, time.now())
    }

    #[test]
    fn test_monthly_change_within_limit() {
        let c = contract();
        let update = ContractUpdate::default().monthly_payment(Money::from_major(150));
        let changes = validate_update(&c, &update, &LedgerConfig::default()).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, ContractField::MonthlyPayment);
        assert_eq!(changes[0].difference, Money::from_major(50));
    }

    #[test]
    fn test_monthly_change_over_limit() {
        let c = contract();
        let update = ContractUpdate::default().monthly_payment(Money::from_major(151));
        let err = validate_update(&c, &update, &LedgerConfig::default()).unwrap_err();
        match err {
            LedgerError::MonthlyChangeTooLarge { percent, .. } => assert_eq!(percent, dec!(51)),
            other => panic!("unexpected error: {:?}", other),
        }

        let down = ContractUpdate::default().monthly_payment(Money::from_major(40));
        assert!(validate_update(&c, &down, &LedgerConfig::default()).is_err());
    }

    #[test]
    fn test_negative_values_rejected() {
        let c = contract();
        let update = ContractUpdate::default().initial_payment(Money::from_major(-1));
        let err = validate_update(&c, &update, &LedgerConfig::default()).unwrap_err();
        assert!(matches!(err, LedgerError::Validation { ref field, .. } if field == "initial_payment"));
    }

    #[test]
    fn test_total_must_stay_above_initial() {
        let c = contract();
        let update = ContractUpdate::default().total_price(Money::from_major(200));
        assert!(matches!(
            validate_update(&c, &update, &LedgerConfig::default()),
            Err(LedgerError::TotalPriceNotAboveInitial { .. })
        ));

        let update = ContractUpdate::default().initial_payment(Money::from_major(1400));
        assert!(validate_update(&c, &update, &LedgerConfig::default()).is_err());
    }

    #[test]
    fn test_unchanged_fields_are_skipped() {
        let c = contract();
        let update = ContractUpdate::default()
            .monthly_payment(c.monthly_payment)
            .total_price(Money::from_major(1500));
        let changes = validate_update(&c, &update, &LedgerConfig::default()).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field, ContractField::TotalPrice);
    }

    #[test]
    fn test_change_percent() {
        assert_eq!(change_percent(Money::from_major(100), Money::from_major(120)), Some(dec!(20)));
        assert_eq!(change_percent(Money::ZERO, Money::from_major(120)), None);
    }
}
