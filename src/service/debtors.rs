use hourglass_rs::SafeTimeProvider;
use tracing::info;

use super::payments::DebtorClearing;
use super::LedgerService;
use crate::debtor::{sweep_overdue, SweepReport, SweepSchedule};
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::payments::{validate_amount, PaymentReceipt, PaymentRequest};
use crate::store::LedgerStore;
use crate::types::{DebtorId, EmployeeId};

impl<S: LedgerStore> LedgerService<S> {
    /// mark overdue contracts, safe to run repeatedly
    pub fn run_debtor_sweep(&self, time: &SafeTimeProvider) -> Result<SweepReport> {
        let now = time.now();
        self.store.transaction(|tx| Ok(sweep_overdue(tx, now, None)))
    }

    /// run the sweep when the schedule says it is due
    pub fn run_scheduled_sweep(
        &self,
        schedule: &mut SweepSchedule,
        time: &SafeTimeProvider,
    ) -> Result<Option<SweepReport>> {
        if !schedule.tick(time.now()) {
            return Ok(None);
        }
        let report = self.run_debtor_sweep(time)?;
        info!(next_run = %schedule.next_run(), "scheduled sweep done");
        Ok(Some(report))
    }

    /// dashboard payment taken against an overdue marker
    ///
    /// the marker stays while the payment leaves a shortfall.
    pub fn pay_debtor(
        &self,
        debtor_id: DebtorId,
        amount: Money,
        notes: Option<String>,
        actor: EmployeeId,
        time: &SafeTimeProvider,
    ) -> Result<PaymentReceipt> {
        validate_amount(amount)?;
        let now = time.now();

        let receipt = self.store.transaction(|tx| {
            let contract_id = tx
                .debtors
                .get(&debtor_id)
                .map(|d| d.contract_id)
                .ok_or(LedgerError::DebtorNotFound { id: debtor_id })?;
            tx.contract(contract_id)?.ensure_accepts_payments()?;

            let mut request = PaymentRequest::dashboard(contract_id, amount);
            request.notes = notes;
            self.record_payment(tx, &request, actor, now, DebtorClearing::WhenCovered)
        })?;

        info!(
            debtor_id = %debtor_id,
            contract_id = %receipt.contract_id,
            amount = %amount,
            status = ?receipt.status,
            "debtor payment received"
        );
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::Fixture;
    use super::*;
    use crate::config::SweepConfig;
    use crate::types::PaymentStatus;
    use chrono::Duration;

    #[test]
    fn test_sweep_twice_creates_nothing_new() {
        let fx = Fixture::new();
        fx.contract(1200, 0, 100, 12);
        fx.contract(1200, 0, 100, 12);
        fx.time.test_control().unwrap().advance(Duration::days(40));

        let first = fx.service.run_debtor_sweep(&fx.time).unwrap();
        assert_eq!(first.created, 2);
        let second = fx.service.run_debtor_sweep(&fx.time).unwrap();
        assert_eq!(second.created, 0);
        assert_eq!(fx.service.debtors().len(), 2);
    }

    #[test]
    fn test_full_payment_clears_debtor() {
        let fx = Fixture::new();
        let id = fx.contract(1200, 0, 100, 12);
        fx.time.test_control().unwrap().advance(Duration::days(40));
        fx.service.run_debtor_sweep(&fx.time).unwrap();
        let debtor = fx.service.debtors()[0].clone();
        assert_eq!(debtor.contract_id, id);
        assert_eq!(debtor.overdue_days, 9);

        let receipt = fx
            .service
            .pay_debtor(debtor.id, Money::from_major(100), None, fx.manager, &fx.time)
            .unwrap();
        assert_eq!(receipt.status, PaymentStatus::Paid);
        assert!(fx.service.debtors().is_empty());
    }

    #[test]
    fn test_underpaid_debtor_payment_keeps_marker() {
        let fx = Fixture::new();
        fx.contract(1200, 0, 100, 12);
        fx.time.test_control().unwrap().advance(Duration::days(40));
        fx.service.run_debtor_sweep(&fx.time).unwrap();
        let debtor_id = fx.service.debtors()[0].id;

        let receipt = fx
            .service
            .pay_debtor(debtor_id, Money::from_major(60), Some("partial".to_string()), fx.manager, &fx.time)
            .unwrap();
        assert_eq!(receipt.status, PaymentStatus::Underpaid);
        assert!(receipt.corrective_payment_id.is_some());
        assert_eq!(fx.service.debtors().len(), 1);

        // the rest of the shortfall removes it
        fx.service
            .pay_remaining(receipt.payment_id, Money::from_major(40), fx.manager, &fx.time)
            .unwrap();
        assert!(fx.service.debtors().is_empty());
    }

    #[test]
    fn test_unknown_debtor() {
        let fx = Fixture::new();
        let missing = uuid::Uuid::new_v4();
        let err = fx
            .service
            .pay_debtor(missing, Money::from_major(100), None, fx.manager, &fx.time)
            .unwrap_err();
        assert_eq!(err, LedgerError::DebtorNotFound { id: missing });
    }

    #[test]
    fn test_scheduled_sweep() {
        let fx = Fixture::new();
        fx.contract(1200, 0, 100, 12);
        let mut schedule = SweepSchedule::new(SweepConfig::default(), fx.time.now()).unwrap();

        assert_eq!(fx.service.run_scheduled_sweep(&mut schedule, &fx.time).unwrap(), None);
        fx.time.test_control().unwrap().advance(Duration::days(40));
        let report = fx.service.run_scheduled_sweep(&mut schedule, &fx.time).unwrap().unwrap();
        assert_eq!(report.created, 1);
        assert_eq!(fx.service.run_scheduled_sweep(&mut schedule, &fx.time).unwrap(), None);
    }
}
