use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use super::LedgerService;
use crate::calendar::Period;
use crate::contract::Contract;
use crate::decimal::{CashSplit, Money};
use crate::errors::{LedgerError, Result};
use crate::events::Event;
use crate::payments::{
    classify, validate_amount, BulkPaymentReceipt, Payment, PaymentHistoryFilter, PaymentReceipt, PaymentRequest,
    RemainingReceipt,
};
use crate::store::{LedgerStore, LedgerTables};
use crate::types::{ContractId, EmployeeId, PaymentId, PaymentKind, PaymentReason, PaymentSource, PaymentStatus};
use crate::views::{PaymentHistoryItem, PendingPaymentView};

/// whether a settled payment removes the contract's debtor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum DebtorClearing {
    Always,
    /// keep the debtor while a shortfall is left
    WhenCovered,
}

impl<S: LedgerStore> LedgerService<S> {
    /// record a payment intent
    ///
    /// bot payments wait for the cash desk, dashboard payments are
    /// confirmed immediately.
    pub fn receive_payment(
        &self,
        request: PaymentRequest,
        actor: EmployeeId,
        time: &SafeTimeProvider,
    ) -> Result<PaymentReceipt> {
        validate_amount(request.amount)?;
        let now = time.now();

        let receipt = self.store.transaction(|tx| {
            tx.contract(request.contract_id)?.ensure_accepts_payments()?;
            self.record_payment(tx, &request, actor, now, DebtorClearing::Always)
        })?;

        info!(
            contract_id = %receipt.contract_id,
            payment_id = %receipt.payment_id,
            source = ?request.source,
            amount = %request.amount,
            status = ?receipt.status,
            "payment received"
        );
        Ok(receipt)
    }

    /// cash desk accepts a pending entry
    pub fn confirm_payment(
        &self,
        payment_id: PaymentId,
        actor: EmployeeId,
        time: &SafeTimeProvider,
    ) -> Result<PaymentReceipt> {
        let now = time.now();

        let receipt = self.store.transaction(|tx| {
            tx.employee(actor)?;
            let payment = tx.payment(payment_id)?;
            payment.ensure_pending()?;
            ensure_not_corrective(payment)?;
            let contract_id = payment.contract_id;
            let kind = payment.kind;
            let actual = payment.received();

            // other entries may have moved the prepaid balance since receipt
            let status = if kind == PaymentKind::Monthly {
                let contract = tx.contract(contract_id)?;
                let monthly = contract.monthly_payment;
                let applied = contract.prepaid_balance.min(monthly).non_negative();
                let classification = classify(monthly - applied, actual, self.config.tolerance);

                let entry = tx.payment_mut(payment_id)?;
                entry.expected_amount = monthly;
                entry.prepaid_applied = applied;
                entry.apply_classification(actual, &classification);
                debug!(
                    payment_id = %payment_id,
                    prepaid_applied = %applied,
                    status = ?classification.status,
                    "payment reclassified at confirmation"
                );
                classification.status
            } else {
                tx.contract(contract_id)?;
                tx.payment(payment_id)?.classified_status()
            };

            tx.payment_mut(payment_id)?.confirm(status, actor, now)?;
            tx.events.emit(Event::PaymentConfirmed {
                contract_id,
                payment_id,
                status,
                confirmed_by: actor,
                timestamp: now,
            });

            let corrective = self.settle(tx, payment_id, actor, now, DebtorClearing::Always)?;
            build_receipt(tx, payment_id, corrective)
        })?;

        info!(
            contract_id = %receipt.contract_id,
            payment_id = %payment_id,
            status = ?receipt.status,
            confirmed_by = %actor,
            "payment confirmed"
        );
        Ok(receipt)
    }

    /// cash desk refuses a pending entry
    pub fn reject_payment(
        &self,
        payment_id: PaymentId,
        reason: &str,
        actor: EmployeeId,
        time: &SafeTimeProvider,
    ) -> Result<Payment> {
        let now = time.now();

        let payment = self.store.transaction(|tx| {
            tx.employee(actor)?;
            let payment = tx.payment(payment_id)?.clone();
            payment.ensure_pending()?;
            ensure_not_corrective(&payment)?;
            let contract_id = payment.contract_id;
            tx.contract(contract_id)?;

            tx.payment_mut(payment_id)?.reject(now)?;
            let note_id = tx.record_note(
                payment.note_id,
                contract_id,
                actor,
                &format!("[REJECTED: {}]", reason),
                now,
            )?;
            tx.payment_mut(payment_id)?.note_id = Some(note_id);

            if payment.kind == PaymentKind::Monthly && payment.advanced_due_date {
                let (old_date, new_date) = tx.contract_mut(contract_id)?.roll_back_due_date(now);
                tx.events.emit(Event::DueDateRolledBack {
                    contract_id,
                    old_date,
                    new_date,
                });
            }

            tx.events.emit(Event::PaymentRejected {
                contract_id,
                payment_id,
                reason: reason.to_string(),
                rejected_by: actor,
                timestamp: now,
            });
            tx.check_completion(contract_id, now)?;
            Ok(tx.payment(payment_id)?.clone())
        })?;

        info!(
            contract_id = %payment.contract_id,
            payment_id = %payment_id,
            reason,
            rejected_by = %actor,
            "payment rejected"
        );
        Ok(payment)
    }

    /// pay toward the shortfall of an underpaid entry
    ///
    /// accepts either the underpaid entry or its corrective entry; the
    /// money is always booked on the underpaid one.
    pub fn pay_remaining(
        &self,
        payment_id: PaymentId,
        amount: Money,
        actor: EmployeeId,
        time: &SafeTimeProvider,
    ) -> Result<RemainingReceipt> {
        validate_amount(amount)?;
        let now = time.now();
        let tolerance = self.config.tolerance;

        let receipt = self.store.transaction(|tx| {
            tx.employee(actor)?;
            let target = tx.payment(payment_id)?;
            let original_id = match target.kind {
                PaymentKind::Extra => target
                    .linked_payment_id
                    .ok_or(LedgerError::PaymentNotFound { id: payment_id })?,
                _ => payment_id,
            };

            let original = tx.payment(original_id)?.clone();
            if original.status != PaymentStatus::Underpaid || !original.is_confirmed() {
                return Err(LedgerError::NotUnderpaid {
                    payment_id: original_id,
                    status: original.status,
                });
            }
            if original.remaining_amount < tolerance {
                return Err(LedgerError::NothingRemaining {
                    what: format!("payment {}", original_id),
                });
            }
            if amount > original.remaining_amount + tolerance {
                return Err(LedgerError::RemainingExceeded {
                    remaining: original.remaining_amount,
                    requested: amount,
                });
            }

            let contract_id = original.contract_id;
            tx.contract(contract_id)?;
            let still_remaining = tx.payment_mut(original_id)?.pay_toward_remaining(amount, tolerance);
            let note_id = tx.record_note(
                original.note_id,
                contract_id,
                actor,
                &format!("[paid remaining: {} $, still owed {} $]", amount.to_cents(), still_remaining.to_cents()),
                now,
            )?;
            tx.payment_mut(original_id)?.note_id = Some(note_id);
            tx.credit_balance(actor, CashSplit::dollars(amount), now);

            for extra_id in tx.open_corrections(original_id) {
                let extra = tx.payment_mut(extra_id)?;
                if still_remaining.is_zero() {
                    extra.confirm(PaymentStatus::Paid, actor, now)?;
                    extra.actual_amount = Some(extra.expected_amount);
                    extra.remaining_amount = Money::ZERO;
                } else {
                    extra.remaining_amount = still_remaining;
                }
            }

            if still_remaining.is_zero() {
                tx.clear_debtors(contract_id, now);
            }
            tx.events.emit(Event::RemainingPaid {
                contract_id,
                payment_id: original_id,
                amount,
                still_remaining,
                timestamp: now,
            });
            tx.check_completion(contract_id, now)?;

            Ok(RemainingReceipt {
                payment_id: original_id,
                paid: amount,
                still_remaining,
                status: tx.payment(original_id)?.status,
                contract_status: tx.contract(contract_id)?.status,
            })
        })?;

        info!(
            payment_id = %receipt.payment_id,
            amount = %amount,
            still_remaining = %receipt.still_remaining,
            "remaining amount paid"
        );
        Ok(receipt)
    }

    /// split one amount evenly over every month still owed
    pub fn pay_all_remaining_months(
        &self,
        contract_id: ContractId,
        amount: Money,
        actor: EmployeeId,
        time: &SafeTimeProvider,
    ) -> Result<BulkPaymentReceipt> {
        validate_amount(amount)?;
        let now = time.now();

        let receipt = self.store.transaction(|tx| {
            tx.employee(actor)?;
            let contract = tx.contract(contract_id)?;
            contract.ensure_accepts_payments()?;
            let months = contract.remaining_months(tx.paid_months(contract_id));
            if months == 0 {
                return Err(LedgerError::NothingRemaining {
                    what: "monthly installments".to_string(),
                });
            }

            let per_month = (amount / Decimal::from(months)).round_dp(2);
            // the last month absorbs the rounding
            let last = amount - per_month * Decimal::from(months - 1);
            if per_month < Money::CENT || last < Money::CENT {
                return Err(LedgerError::InvalidAmount { amount });
            }

            let mut payment_ids = Vec::with_capacity(months as usize);
            for month in 0..months {
                let share = if month + 1 == months { last } else { per_month };
                let request = PaymentRequest::dashboard(contract_id, share)
                    .with_notes(format!("bulk payment {}/{}", month + 1, months));
                let receipt = self.record_payment(tx, &request, actor, now, DebtorClearing::Always)?;
                payment_ids.push(receipt.payment_id);
            }

            Ok(BulkPaymentReceipt {
                contract_id,
                payment_ids,
                months,
                per_month,
                contract_status: tx.contract(contract_id)?.status,
            })
        })?;

        info!(
            contract_id = %contract_id,
            months = receipt.months,
            per_month = %receipt.per_month,
            status = ?receipt.contract_status,
            "remaining months paid"
        );
        Ok(receipt)
    }

    /// push the contract's next due date
    pub fn postpone_payment(
        &self,
        contract_id: ContractId,
        new_date: DateTime<Utc>,
        reason: &str,
        actor: EmployeeId,
        time: &SafeTimeProvider,
    ) -> Result<Contract> {
        let now = time.now();

        let contract = self.store.transaction(|tx| {
            tx.employee(actor)?;
            let contract = tx.contract_mut(contract_id)?;
            contract.ensure_accepts_payments()?;
            let previous_date = contract.postpone(new_date, now)?;

            let text = format!(
                "payment postponed: {} -> {}, reason: {}",
                previous_date.format("%Y-%m-%d"),
                new_date.format("%Y-%m-%d"),
                reason
            );
            tx.record_note(None, contract_id, actor, &text, now)?;
            tx.events.emit(Event::PaymentPostponed {
                contract_id,
                previous_date,
                new_date,
                reason: reason.to_string(),
                timestamp: now,
            });
            Ok(tx.contract(contract_id)?.clone())
        })?;

        info!(
            contract_id = %contract_id,
            new_date = %new_date,
            previous_date = ?contract.previous_payment_date,
            "payment postponed"
        );
        Ok(contract)
    }

    /// entries waiting for the cash desk, oldest first
    pub fn pending_payments(&self) -> Vec<PendingPaymentView> {
        self.store.read(|t| {
            let mut pending: Vec<&Payment> = t
                .payments
                .values()
                .filter(|p| p.is_pending() && p.kind != PaymentKind::Extra)
                .filter(|p| t.contract(p.contract_id).is_ok())
                .collect();
            pending.sort_by_key(|p| p.date);
            pending
                .into_iter()
                .map(|p| PendingPaymentView::build(t, p))
                .collect()
        })
    }

    /// confirmed entries matching the filter, newest first
    pub fn payment_history(&self, filter: &PaymentHistoryFilter) -> Vec<PaymentHistoryItem> {
        self.store.read(|t| {
            let mut history: Vec<&Payment> = t
                .payments
                .values()
                .filter(|p| p.is_confirmed() && p.kind != PaymentKind::Extra)
                .filter(|p| filter.matches(p))
                .collect();
            history.sort_by(|a, b| b.date.cmp(&a.date));
            history
                .into_iter()
                .map(|p| PaymentHistoryItem::build(t, p))
                .collect()
        })
    }

    /// book a monthly payment inside an open transaction
    pub(super) fn record_payment(
        &self,
        tx: &mut LedgerTables,
        request: &PaymentRequest,
        actor: EmployeeId,
        now: DateTime<Utc>,
        clearing: DebtorClearing,
    ) -> Result<PaymentReceipt> {
        tx.employee(actor)?;
        if let Some(cash) = request.cash {
            let value = cash.base_value(self.config.exchange_rate);
            if !value.approx_eq(request.amount, self.config.tolerance.max(Money::CENT)) {
                return Err(LedgerError::Validation {
                    field: "cash".to_string(),
                    message: format!(
                        "cash handed over is worth {} $, payment says {} $",
                        value.to_cents(),
                        request.amount.to_cents()
                    ),
                });
            }
        }
        let contract = tx.contract(request.contract_id)?;
        let contract_id = contract.id;
        let customer_id = contract.customer_id;
        let monthly = contract.monthly_payment;
        let prepaid = contract.prepaid_balance;
        let due_period = Period::of(contract.next_payment_date);

        // prepaid balance covers part of this month first, bot entries
        // are classified again when the cash desk confirms them
        let applied = prepaid.min(monthly).non_negative();
        let classification = classify(monthly - applied, request.amount, self.config.tolerance);

        let mut payment = Payment::new(
            contract_id,
            customer_id,
            actor,
            PaymentKind::Monthly,
            request.source,
            monthly,
            now,
        );
        payment.prepaid_applied = applied;
        payment.apply_classification(request.amount, &classification);
        payment.cash = request.cash;
        payment.target_period = Some(request.target_period.unwrap_or(due_period));

        let mut text = classification.describe(request.amount);
        if let Some(notes) = &request.notes {
            text.push('\n');
            text.push_str(notes);
        }
        payment.note_id = Some(tx.record_note(None, contract_id, actor, &text, now)?);

        let payment_id = tx.attach_payment(payment)?;
        tx.events.emit(Event::PaymentReceived {
            contract_id,
            payment_id,
            kind: PaymentKind::Monthly,
            source: request.source,
            expected: monthly - applied,
            actual: request.amount,
            status: match request.source {
                PaymentSource::Dashboard => classification.status,
                PaymentSource::Bot => PaymentStatus::Pending,
            },
            timestamp: now,
        });

        let corrective = match request.source {
            PaymentSource::Dashboard => {
                tx.payment_mut(payment_id)?.confirm(classification.status, actor, now)?;
                self.settle(tx, payment_id, actor, now, clearing)?
            }
            PaymentSource::Bot => {
                if self.config.optimistic_due_date {
                    let (old_date, new_date) = tx.contract_mut(contract_id)?.advance_due_date(now);
                    tx.payment_mut(payment_id)?.advanced_due_date = true;
                    tx.events.emit(Event::DueDateAdvanced {
                        contract_id,
                        old_date,
                        new_date,
                    });
                }
                None
            }
        };

        debug!(
            contract_id = %contract_id,
            payment_id = %payment_id,
            expected = %monthly,
            prepaid_applied = %applied,
            actual = %request.amount,
            status = ?classification.status,
            "payment classified"
        );
        build_receipt(tx, payment_id, corrective)
    }

    /// side effects of a confirmed entry
    ///
    /// the only place a monthly entry moves the prepaid balance.
    pub(super) fn settle(
        &self,
        tx: &mut LedgerTables,
        payment_id: PaymentId,
        actor: EmployeeId,
        now: DateTime<Utc>,
        clearing: DebtorClearing,
    ) -> Result<Option<PaymentId>> {
        let payment = tx.payment(payment_id)?.clone();
        let contract_id = payment.contract_id;

        if payment.kind == PaymentKind::Monthly && !payment.advanced_due_date {
            let (old_date, new_date) = tx.contract_mut(contract_id)?.advance_due_date(now);
            tx.payment_mut(payment_id)?.advanced_due_date = true;
            tx.events.emit(Event::DueDateAdvanced {
                contract_id,
                old_date,
                new_date,
            });
        }

        let underpaid = payment.status == PaymentStatus::Underpaid;
        if clearing == DebtorClearing::Always || !underpaid {
            tx.clear_debtors(contract_id, now);
        }

        tx.credit_balance(payment.manager_id, payment.cash_received(), now);

        if payment.kind == PaymentKind::Monthly {
            let prepaid = tx.contract(contract_id)?.prepaid_balance;
            tx.set_prepaid(contract_id, prepaid - payment.prepaid_applied + payment.prepaid_amount, now)?;
        }

        let corrective = if underpaid {
            Some(open_correction(
                tx,
                &payment,
                payment.remaining_amount,
                PaymentReason::Underpayment,
                actor,
                now,
            )?)
        } else {
            None
        };

        tx.check_completion(contract_id, now)?;
        Ok(corrective)
    }
}

/// create the pending corrective entry for a shortfall
pub(super) fn open_correction(
    tx: &mut LedgerTables,
    original: &Payment,
    shortfall: Money,
    reason: PaymentReason,
    actor: EmployeeId,
    now: DateTime<Utc>,
) -> Result<PaymentId> {
    let mut extra = Payment::corrective(original, shortfall, reason, now);
    let period = original
        .target_period
        .map(|p| p.to_string())
        .unwrap_or_else(|| "unscheduled".to_string());
    let text = match reason {
        PaymentReason::Underpayment => format!("{} $ still owed for {}", shortfall.to_cents(), period),
        _ => format!(
            "{} $ short for {} after monthly payment change",
            shortfall.to_cents(),
            period
        ),
    };
    extra.note_id = Some(tx.record_note(None, original.contract_id, actor, &text, now)?);

    let contract_id = original.contract_id;
    let extra_id = tx.attach_payment(extra)?;
    tx.events.emit(Event::CorrectiveEntryCreated {
        contract_id,
        payment_id: extra_id,
        linked_payment_id: original.id,
        amount: shortfall,
        timestamp: now,
    });
    Ok(extra_id)
}

fn ensure_not_corrective(payment: &Payment) -> Result<()> {
    if payment.kind == PaymentKind::Extra {
        warn!(payment_id = %payment.id, "corrective entries are settled through pay_remaining");
        return Err(LedgerError::Validation {
            field: "payment_id".to_string(),
            message: "corrective entries are settled by paying the remaining amount".to_string(),
        });
    }
    Ok(())
}

fn build_receipt(tx: &LedgerTables, payment_id: PaymentId, corrective: Option<PaymentId>) -> Result<PaymentReceipt> {
    let payment = tx.payment(payment_id)?;
    let contract = tx.contract(payment.contract_id)?;
    let actual = payment.received();
    let classification = crate::payments::Classification {
        status: payment.classified_status(),
        remaining: payment.remaining_amount,
        excess: payment.excess_amount,
    };

    Ok(PaymentReceipt {
        payment_id,
        contract_id: contract.id,
        status: payment.status,
        classification,
        expected: payment.expected_amount,
        prepaid_applied: payment.prepaid_applied,
        actual,
        prepaid_balance: contract.prepaid_balance,
        next_payment_date: contract.next_payment_date,
        corrective_payment_id: corrective,
        contract_status: contract.status,
        message: classification.describe(actual),
    })
}
