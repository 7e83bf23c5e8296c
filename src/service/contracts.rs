use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::payments::open_correction;
use super::LedgerService;
use crate::contract::{Contract, ContractTerms};
use crate::decimal::{CashSplit, Money};
use crate::editing::{
    reclassify, validate_update, CascadeInput, CascadePlan, ContractField, ContractUpdate, EditImpact, EditRecord,
    ImpactSummary,
};
use crate::errors::{LedgerError, Result};
use crate::events::Event;
use crate::payments::{Classification, Payment};
use crate::store::{AuditRecord, LedgerStore, LedgerTables};
use crate::types::{
    ContractId, ContractStatus, EmployeeId, PaymentKind, PaymentReason, PaymentSource, PaymentStatus,
};
use crate::views::ContractView;

/// outcome of re-checking completion on every contract
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSweepReport {
    pub total: usize,
    pub updated: usize,
    pub completed: usize,
    pub reactivated: usize,
}

/// everything an edit will do, computed before anything is written
struct EditPlan {
    impact: EditImpact,
    cascade: Option<CascadePlan>,
    old_monthly: Money,
    new_monthly: Option<Money>,
    initial_change: Option<Money>,
    new_total: Option<Money>,
}

impl<S: LedgerStore> LedgerService<S> {
    /// create an active contract, booking the initial payment
    pub fn create_contract(&self, terms: ContractTerms, actor: EmployeeId, time: &SafeTimeProvider) -> Result<Contract> {
        let now = time.now();
        let contract = self.store.transaction(|tx| {
            tx.employee(actor)?;
            let contract = Contract::new(terms, actor, true, now);
            let id = contract.id;
            emit_created(tx, &contract, now);
            tx.contracts.insert(id, contract);
            book_initial_payment(tx, id, actor, now)?;
            tx.check_completion(id, now)?;
            Ok(tx.contract(id)?.clone())
        })?;

        info!(
            contract_id = %contract.id,
            total_price = %contract.total_price,
            monthly_payment = %contract.monthly_payment,
            period = contract.period,
            "contract created"
        );
        Ok(contract)
    }

    /// seller draft, inactive until approved
    pub fn seller_create_contract(
        &self,
        terms: ContractTerms,
        actor: EmployeeId,
        time: &SafeTimeProvider,
    ) -> Result<Contract> {
        let now = time.now();
        let contract = self.store.transaction(|tx| {
            tx.employee(actor)?;
            let contract = Contract::new(terms, actor, false, now);
            emit_created(tx, &contract, now);
            tx.contracts.insert(contract.id, contract.clone());
            Ok(contract)
        })?;

        info!(contract_id = %contract.id, seller = %actor, "contract drafted");
        Ok(contract)
    }

    /// activate a seller draft
    pub fn approve_contract(
        &self,
        contract_id: ContractId,
        actor: EmployeeId,
        time: &SafeTimeProvider,
    ) -> Result<Contract> {
        let now = time.now();
        let contract = self.store.transaction(|tx| {
            let employee = tx.employee(actor)?;
            if !employee.role.can_approve_contracts() {
                return Err(LedgerError::Forbidden {
                    reason: format!("role {:?} cannot approve contracts", employee.role),
                });
            }

            let contract = tx.contract_mut(contract_id)?;
            if contract.is_active {
                return Err(LedgerError::Validation {
                    field: "contract".to_string(),
                    message: "already approved".to_string(),
                });
            }
            contract.approve(now);

            tx.events.emit(Event::ContractApproved {
                contract_id,
                approved_by: actor,
                timestamp: now,
            });
            book_initial_payment(tx, contract_id, actor, now)?;
            tx.check_completion(contract_id, now)?;
            Ok(tx.contract(contract_id)?.clone())
        })?;

        info!(contract_id = %contract_id, approved_by = %actor, "contract approved");
        Ok(contract)
    }

    /// soft delete, the record stays for the audit trail
    pub fn delete_contract(&self, contract_id: ContractId, actor: EmployeeId, time: &SafeTimeProvider) -> Result<()> {
        let now = time.now();
        self.store.transaction(|tx| {
            tx.employee(actor)?;
            let contract = tx.contract_mut(contract_id)?;
            contract.is_deleted = true;
            contract.updated_at = now;
            tx.clear_debtors(contract_id, now);
            tx.events.emit(Event::ContractDeleted {
                contract_id,
                timestamp: now,
            });
            Ok(())
        })?;

        info!(contract_id = %contract_id, deleted_by = %actor, "contract deleted");
        Ok(())
    }

    /// terms plus derived totals
    pub fn contract_view(&self, contract_id: ContractId) -> Result<ContractView> {
        self.store.read(|t| ContractView::build(t, contract_id))
    }

    /// dry run of an edit, nothing is written
    pub fn analyze_contract_edit_impact(&self, contract_id: ContractId, update: &ContractUpdate) -> Result<EditImpact> {
        self.store
            .read(|t| self.plan_edit(t, contract_id, update))
            .map(|plan| plan.impact)
    }

    /// apply a validated edit to a contract
    ///
    /// rate limited per actor. every attempt lands in the audit log,
    /// failures to write that log are only reported.
    pub fn update_contract(
        &self,
        contract_id: ContractId,
        update: ContractUpdate,
        actor: EmployeeId,
        time: &SafeTimeProvider,
    ) -> Result<EditImpact> {
        let now = time.now();

        let result = self
            .throttle
            .check(actor, now)
            .and_then(|_| self.store.transaction(|tx| self.apply_edit(tx, contract_id, &update, actor, now)));

        let detail = match &result {
            Ok(impact) => format!(
                "{} field(s) changed, {} corrective entries",
                impact.changes.len(),
                impact.impact.corrective_entries_created
            ),
            Err(e) => e.to_string(),
        };
        let record = AuditRecord {
            at: now,
            actor,
            contract_id,
            action: "update_contract".to_string(),
            success: result.is_ok(),
            detail,
        };
        if let Err(e) = self.store.append_audit(record) {
            warn!(contract_id = %contract_id, error = %e, "audit log write failed");
        }

        match &result {
            Ok(impact) => info!(
                contract_id = %contract_id,
                edited_by = %actor,
                changes = impact.changes.len(),
                underpaid = impact.impact.underpaid_count,
                overpaid = impact.impact.overpaid_count,
                corrective_entries = impact.impact.corrective_entries_created,
                "contract edited"
            ),
            Err(e) if e.http_status() >= 500 => error!(contract_id = %contract_id, error = %e, "contract edit failed"),
            Err(e) => warn!(contract_id = %contract_id, error = %e, "contract edit refused"),
        }
        result
    }

    /// re-run completion on every live contract
    pub fn check_all_contracts_status(&self, time: &SafeTimeProvider) -> Result<StatusSweepReport> {
        let now = time.now();
        let report = self.store.transaction(|tx| {
            let mut report = StatusSweepReport::default();
            let ids: Vec<ContractId> = tx
                .contracts
                .values()
                .filter(|c| !c.is_deleted && c.is_active)
                .map(|c| c.id)
                .collect();

            for id in ids {
                report.total += 1;
                if let Some((_, new_status)) = tx.check_completion(id, now)? {
                    report.updated += 1;
                    match new_status {
                        ContractStatus::Completed => report.completed += 1,
                        ContractStatus::Active => report.reactivated += 1,
                    }
                }
            }
            Ok(report)
        })?;

        info!(
            total = report.total,
            updated = report.updated,
            completed = report.completed,
            reactivated = report.reactivated,
            "contract status check finished"
        );
        Ok(report)
    }

    fn plan_edit(&self, tx: &LedgerTables, contract_id: ContractId, update: &ContractUpdate) -> Result<EditPlan> {
        let contract = tx.contract(contract_id)?;
        let changes = validate_update(contract, update, &self.config)?;
        if changes.is_empty() {
            return Err(LedgerError::Validation {
                field: "update".to_string(),
                message: "no field changes".to_string(),
            });
        }

        let find = |field: ContractField| changes.iter().find(|c| c.field == field);
        let new_monthly = find(ContractField::MonthlyPayment).map(|c| c.new_value);
        let initial_change = find(ContractField::InitialPayment).map(|c| c.difference);
        let new_total = find(ContractField::TotalPrice).map(|c| c.new_value);

        let mut projected = contract.clone();
        let mut total_paid = tx.total_paid(contract_id);
        let mut cascade = None;
        let mut outcomes = Vec::new();
        let mut summary = ImpactSummary::default();

        if let Some(new_monthly) = new_monthly {
            let entries: Vec<&Payment> = tx
                .contract_payments(contract_id)
                .into_iter()
                .filter(|p| p.kind == PaymentKind::Monthly && p.is_confirmed())
                .collect();
            let inputs: Vec<CascadeInput> = entries
                .iter()
                .map(|p| CascadeInput {
                    payment_id: p.id,
                    actual: p.received(),
                    status: p.status,
                })
                .collect();
            let plan = reclassify(&inputs, new_monthly, self.config.tolerance);

            // drop what the old classification put into the prepaid balance,
            // [100, 150, 100] moved to 120 ends at 10, not 50 + 10
            let old_contribution: Money = entries.iter().map(|p| p.prepaid_amount - p.prepaid_applied).sum();
            projected.prepaid_balance =
                (contract.prepaid_balance - old_contribution + plan.leftover_carry).non_negative();
            projected.monthly_payment = new_monthly;

            outcomes = plan.outcomes.clone();
            summary = plan.summary.clone();
            cascade = Some(plan);
        }

        if let Some(diff) = initial_change {
            let has_initial = tx
                .contract_payments(contract_id)
                .iter()
                .any(|p| p.kind == PaymentKind::Initial && p.is_confirmed());
            if has_initial {
                total_paid += diff;
            } else if contract.is_active {
                total_paid += contract.initial_payment + diff;
            }
            projected.initial_payment = contract.initial_payment + diff;
        }

        if let Some(total) = new_total {
            projected.total_price = total;
        }

        let status = projected.completion_status(total_paid);
        Ok(EditPlan {
            impact: EditImpact {
                changes,
                outcomes,
                impact: summary,
                prepaid_balance: projected.prepaid_balance,
                status,
            },
            cascade,
            old_monthly: contract.monthly_payment,
            new_monthly,
            initial_change,
            new_total,
        })
    }

    fn apply_edit(
        &self,
        tx: &mut LedgerTables,
        contract_id: ContractId,
        update: &ContractUpdate,
        actor: EmployeeId,
        now: DateTime<Utc>,
    ) -> Result<EditImpact> {
        tx.employee(actor)?;
        let plan = self.plan_edit(tx, contract_id, update)?;
        if tx.contract(contract_id)?.status == ContractStatus::Completed {
            warn!(contract_id = %contract_id, "editing a completed contract");
        }

        if let (Some(new_monthly), Some(cascade)) = (plan.new_monthly, &plan.cascade) {
            apply_monthly_change(tx, contract_id, plan.old_monthly, new_monthly, cascade, plan.impact.prepaid_balance, actor, now)?;
        }
        if let Some(diff) = plan.initial_change {
            apply_initial_change(tx, contract_id, diff, actor, now)?;
        }
        if let Some(total) = plan.new_total {
            tx.contract_mut(contract_id)?.total_price = total;
        }

        let record = EditRecord {
            edited_at: now,
            edited_by: actor,
            changes: plan.impact.changes.clone(),
            affected_payments: plan.impact.affected_payments(),
            impact: plan.impact.impact.clone(),
        };
        let contract = tx.contract_mut(contract_id)?;
        contract.edit_history.push(record);
        contract.updated_at = now;

        tx.events.emit(Event::ContractEdited {
            contract_id,
            edited_by: actor,
            impact: plan.impact.impact.clone(),
            timestamp: now,
        });
        tx.check_completion(contract_id, now)?;

        let mut impact = plan.impact;
        impact.status = tx.contract(contract_id)?.status;
        Ok(impact)
    }
}

fn emit_created(tx: &mut LedgerTables, contract: &Contract, now: DateTime<Utc>) {
    tx.events.emit(Event::ContractCreated {
        contract_id: contract.id,
        total_price: contract.total_price,
        monthly_payment: contract.monthly_payment,
        period: contract.period,
        approved: contract.is_active,
        timestamp: now,
    });
}

/// confirmed INITIAL entry for the down payment, credited to `manager_id`
fn book_initial_payment(
    tx: &mut LedgerTables,
    contract_id: ContractId,
    manager_id: EmployeeId,
    now: DateTime<Utc>,
) -> Result<()> {
    let contract = tx.contract(contract_id)?;
    let amount = contract.initial_payment;
    if !amount.is_positive() {
        return Ok(());
    }

    let mut payment = Payment::new(
        contract_id,
        contract.customer_id,
        manager_id,
        PaymentKind::Initial,
        PaymentSource::Dashboard,
        amount,
        now,
    );
    payment.apply_classification(amount, &Classification::exact());
    payment.confirm(PaymentStatus::Paid, manager_id, now)?;
    payment.note_id = Some(tx.record_note(
        None,
        contract_id,
        manager_id,
        &format!("initial payment: {} $", amount.to_cents()),
        now,
    )?);

    let payment_id = tx.attach_payment(payment)?;
    tx.events.emit(Event::PaymentReceived {
        contract_id,
        payment_id,
        kind: PaymentKind::Initial,
        source: PaymentSource::Dashboard,
        expected: amount,
        actual: amount,
        status: PaymentStatus::Paid,
        timestamp: now,
    });
    tx.credit_balance(manager_id, CashSplit::dollars(amount), now);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn apply_monthly_change(
    tx: &mut LedgerTables,
    contract_id: ContractId,
    old_monthly: Money,
    new_monthly: Money,
    cascade: &CascadePlan,
    prepaid_balance: Money,
    actor: EmployeeId,
    now: DateTime<Utc>,
) -> Result<()> {
    let reason = if new_monthly > old_monthly {
        PaymentReason::MonthlyPaymentIncrease
    } else {
        PaymentReason::MonthlyPaymentDecrease
    };

    for outcome in &cascade.outcomes {
        // earlier shortfalls are replaced by the new classification
        for extra_id in tx.open_corrections(outcome.payment_id) {
            let extra = tx.payment_mut(extra_id)?;
            extra.reject(now)?;
            let note_id = extra.note_id;
            let note_id = tx.record_note(note_id, contract_id, actor, "[superseded by contract edit]", now)?;
            tx.payment_mut(extra_id)?.note_id = Some(note_id);
        }

        let entry = tx.payment_mut(outcome.payment_id)?;
        entry.expected_amount = new_monthly;
        entry.prepaid_applied = outcome.carry_in;
        entry.apply_classification(outcome.actual, &outcome.classification());
        let entry = entry.clone();

        if outcome.new_status == PaymentStatus::Underpaid {
            open_correction(tx, &entry, outcome.remaining, reason, actor, now)?;
        }
    }

    tx.contract_mut(contract_id)?.monthly_payment = new_monthly;
    tx.set_prepaid(contract_id, prepaid_balance, now)?;
    for debtor in tx.debtors.values_mut().filter(|d| d.contract_id == contract_id) {
        debtor.debt_amount = new_monthly;
    }
    Ok(())
}

fn apply_initial_change(
    tx: &mut LedgerTables,
    contract_id: ContractId,
    diff: Money,
    actor: EmployeeId,
    now: DateTime<Utc>,
) -> Result<()> {
    let contract = tx.contract_mut(contract_id)?;
    contract.initial_payment += diff;
    let active = contract.is_active;

    let initial_id = tx
        .contract_payments(contract_id)
        .into_iter()
        .find(|p| p.kind == PaymentKind::Initial && p.is_confirmed())
        .map(|p| p.id);

    match initial_id {
        Some(id) => {
            let entry = tx.payment_mut(id)?;
            entry.expected_amount += diff;
            entry.actual_amount = Some(entry.received() + diff);
            let manager_id = entry.manager_id;
            let note_id = entry.note_id;
            let text = format!("[initial payment changed by {} $]", diff.to_cents());
            let note_id = tx.record_note(note_id, contract_id, actor, &text, now)?;
            tx.payment_mut(id)?.note_id = Some(note_id);
            tx.credit_balance(manager_id, CashSplit::dollars(diff), now);
        }
        // drafts book their down payment on approval
        None if active => book_initial_payment(tx, contract_id, actor, now)?,
        None => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::Fixture;
    use super::*;
    use crate::payments::PaymentRequest;
    use crate::store::MemoryStore;
    use crate::types::{Employee, Role};
    use chrono::{Duration, TimeZone};
    use hourglass_rs::TimeSource;

    fn pay(fx: &Fixture, contract_id: ContractId, amount: i64) {
        fx.service
            .receive_payment(
                PaymentRequest::dashboard(contract_id, Money::from_major(amount)),
                fx.manager,
                &fx.time,
            )
            .unwrap();
        fx.time.test_control().unwrap().advance(Duration::days(30));
    }

    #[test]
    fn test_create_books_initial_payment() {
        let fx = Fixture::new();
        let id = fx.contract(1400, 200, 100, 12);
        let contract = fx.service.contract(id).unwrap();
        assert!(contract.is_active);
        assert_eq!(contract.payments.len(), 1);

        let initial = fx.service.payment(contract.payments[0]).unwrap();
        assert_eq!(initial.kind, PaymentKind::Initial);
        assert!(initial.is_paid());
        assert!(initial.is_confirmed());
        assert_eq!(fx.service.balance(fx.manager).unwrap().dollar, Money::from_major(200));
        assert_eq!(fx.service.contract_view(id).unwrap().total_paid, Money::from_major(200));
    }

    #[test]
    fn test_seller_draft_needs_approval() {
        let fx = Fixture::new();
        let terms = fx.terms(1400, 200, 100, 12);
        let draft = fx.service.seller_create_contract(terms, fx.seller, &fx.time).unwrap();
        assert!(!draft.is_active);
        assert!(draft.payments.is_empty());
        assert_eq!(draft.next_payment_date, draft.start_date);

        let err = fx.service.approve_contract(draft.id, fx.seller, &fx.time).unwrap_err();
        assert!(matches!(err, LedgerError::Forbidden { .. }));
        let err = fx.service.approve_contract(draft.id, fx.kassa, &fx.time).unwrap_err();
        assert_eq!(err.http_status(), 403);

        let approved = fx.service.approve_contract(draft.id, fx.admin, &fx.time).unwrap();
        assert!(approved.is_active);
        assert_eq!(approved.payments.len(), 1);
        assert_eq!(fx.service.balance(fx.admin).unwrap().dollar, Money::from_major(200));

        assert!(fx.service.approve_contract(draft.id, fx.admin, &fx.time).is_err());
    }

    #[test]
    fn test_deleted_contract_is_hidden() {
        let fx = Fixture::new();
        let id = fx.contract(1200, 0, 100, 12);
        fx.service.delete_contract(id, fx.admin, &fx.time).unwrap();
        assert!(matches!(fx.service.contract(id), Err(LedgerError::ContractNotFound { .. })));
        let err = fx
            .service
            .receive_payment(PaymentRequest::dashboard(id, Money::from_major(100)), fx.manager, &fx.time)
            .unwrap_err();
        assert_eq!(err.http_status(), 404);
    }

    #[test]
    fn test_monthly_increase_cascades_over_history() {
        let fx = Fixture::new();
        let id = fx.contract(1200, 0, 100, 12);
        for amount in [100, 150, 100] {
            pay(&fx, id, amount);
        }

        let preview = fx
            .service
            .analyze_contract_edit_impact(id, &ContractUpdate::default().monthly_payment(Money::from_major(120)))
            .unwrap();
        assert_eq!(preview.impact.underpaid_count, 1);
        assert_eq!(preview.impact.corrective_entries_created, 1);
        // nothing written by the preview
        assert_eq!(fx.service.contract(id).unwrap().monthly_payment, Money::from_major(100));

        let impact = fx
            .service
            .update_contract(
                id,
                ContractUpdate::default().monthly_payment(Money::from_major(120)),
                fx.admin,
                &fx.time,
            )
            .unwrap();
        assert_eq!(impact, preview);

        let entries = fx.service.contract_payments(id);
        assert!(entries.iter().all(|p| p.check_invariants().is_ok()));
        let monthly: Vec<&Payment> = entries.iter().filter(|p| p.kind == PaymentKind::Monthly).collect();
        assert_eq!(monthly[0].status, PaymentStatus::Underpaid);
        assert_eq!(monthly[0].remaining_amount, Money::from_major(20));
        assert_eq!(monthly[1].status, PaymentStatus::Overpaid);
        assert_eq!(monthly[1].excess_amount, Money::from_major(30));
        assert_eq!(monthly[2].status, PaymentStatus::Overpaid);
        assert_eq!(monthly[2].excess_amount, Money::from_major(10));
        assert_eq!(monthly[2].prepaid_applied, Money::from_major(30));

        let extra: Vec<&Payment> = entries.iter().filter(|p| p.kind == PaymentKind::Extra).collect();
        assert_eq!(extra.len(), 1);
        assert_eq!(extra[0].expected_amount, Money::from_major(20));
        assert_eq!(extra[0].linked_payment_id, Some(monthly[0].id));
        assert_eq!(extra[0].reason, Some(PaymentReason::MonthlyPaymentIncrease));
        assert!(extra[0].is_pending());

        let contract = fx.service.contract(id).unwrap();
        assert_eq!(contract.prepaid_balance, Money::from_major(10));
        assert_eq!(contract.monthly_payment, Money::from_major(120));
        assert_eq!(contract.edit_history.len(), 1);
        assert_eq!(contract.edit_history[0].affected_payments.len(), 3);
        assert_eq!(contract.edit_history[0].changes[0].difference, Money::from_major(20));
    }

    #[test]
    fn test_second_edit_supersedes_corrections() {
        let fx = Fixture::new();
        let id = fx.contract(1200, 0, 100, 12);
        pay(&fx, id, 100);

        let up = ContractUpdate::default().monthly_payment(Money::from_major(120));
        fx.service.update_contract(id, up, fx.admin, &fx.time).unwrap();
        let back = ContractUpdate::default().monthly_payment(Money::from_major(100));
        let impact = fx.service.update_contract(id, back, fx.admin, &fx.time).unwrap();
        assert_eq!(impact.impact.corrective_entries_created, 0);

        let entries = fx.service.contract_payments(id);
        let extra = entries.iter().find(|p| p.kind == PaymentKind::Extra).unwrap();
        assert_eq!(extra.status, PaymentStatus::Rejected);
        let monthly = entries.iter().find(|p| p.kind == PaymentKind::Monthly).unwrap();
        assert!(monthly.is_paid());
    }

    #[test]
    fn test_edit_validation_aborts_before_mutation() {
        let fx = Fixture::new();
        let id = fx.contract(1200, 0, 100, 12);
        let err = fx
            .service
            .update_contract(
                id,
                ContractUpdate::default().monthly_payment(Money::from_major(200)),
                fx.admin,
                &fx.time,
            )
            .unwrap_err();
        assert!(matches!(err, LedgerError::MonthlyChangeTooLarge { .. }));
        let contract = fx.service.contract(id).unwrap();
        assert_eq!(contract.monthly_payment, Money::from_major(100));
        assert!(contract.edit_history.is_empty());

        let audit = fx.service.store().audit_log();
        assert_eq!(audit.len(), 1);
        assert!(!audit[0].success);
    }

    #[test]
    fn test_initial_payment_change_moves_cash() {
        let fx = Fixture::new();
        let id = fx.contract(1400, 200, 100, 12);
        fx.service
            .update_contract(
                id,
                ContractUpdate::default().initial_payment(Money::from_major(300)),
                fx.admin,
                &fx.time,
            )
            .unwrap();

        let contract = fx.service.contract(id).unwrap();
        assert_eq!(contract.initial_payment, Money::from_major(300));
        let initial = fx.service.payment(contract.payments[0]).unwrap();
        assert_eq!(initial.received(), Money::from_major(300));
        // the manager who took the down payment holds the difference
        assert_eq!(fx.service.balance(fx.manager).unwrap().dollar, Money::from_major(300));
    }

    #[test]
    fn test_total_price_change_reopens_contract() {
        let fx = Fixture::new();
        let id = fx.contract(300, 100, 100, 2);
        pay(&fx, id, 100);
        pay(&fx, id, 100);
        assert_eq!(fx.service.contract(id).unwrap().status, ContractStatus::Completed);

        let impact = fx
            .service
            .update_contract(
                id,
                ContractUpdate::default().total_price(Money::from_major(400)),
                fx.admin,
                &fx.time,
            )
            .unwrap();
        assert_eq!(impact.status, ContractStatus::Active);
        assert_eq!(fx.service.contract(id).unwrap().status, ContractStatus::Active);
    }

    #[test]
    fn test_edit_rate_limit() {
        let fx = Fixture::with_config(crate::config::LedgerConfig::default().with_edit_rate_limit(2, 60));
        let id = fx.contract(1200, 0, 100, 12);
        for total in [1300, 1400] {
            fx.service
                .update_contract(
                    id,
                    ContractUpdate::default().total_price(Money::from_major(total)),
                    fx.admin,
                    &fx.time,
                )
                .unwrap();
        }
        let err = fx
            .service
            .update_contract(
                id,
                ContractUpdate::default().total_price(Money::from_major(1500)),
                fx.admin,
                &fx.time,
            )
            .unwrap_err();
        assert_eq!(err.http_status(), 429);
        assert_eq!(fx.service.contract(id).unwrap().total_price, Money::from_major(1400));

        fx.time.test_control().unwrap().advance(Duration::seconds(61));
        assert!(fx
            .service
            .update_contract(
                id,
                ContractUpdate::default().total_price(Money::from_major(1500)),
                fx.admin,
                &fx.time,
            )
            .is_ok());
    }

    #[test]
    fn test_audit_failure_does_not_block_edit() {
        let service = LedgerService::new(MemoryStore::without_audit(), crate::config::LedgerConfig::default());
        let time = SafeTimeProvider::new(TimeSource::Test(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));
        let admin = service.register_employee(Employee::new("Aziz", "Karimov", Role::Admin)).unwrap();
        let terms = Contract::builder()
            .customer_id(uuid::Uuid::new_v4())
            .total_price(Money::from_major(1200))
            .period(12)
            .build(&time)
            .unwrap();
        let contract = service.create_contract(terms, admin, &time).unwrap();

        let impact = service
            .update_contract(
                contract.id,
                ContractUpdate::default().total_price(Money::from_major(1300)),
                admin,
                &time,
            )
            .unwrap();
        assert_eq!(impact.changes.len(), 1);
        assert!(service.store().audit_log().is_empty());
    }

    #[test]
    fn test_check_all_contracts_status_is_idempotent() {
        let fx = Fixture::new();
        let id = fx.contract(300, 100, 100, 2);
        pay(&fx, id, 100);
        pay(&fx, id, 100);

        let first = fx.service.check_all_contracts_status(&fx.time).unwrap();
        let second = fx.service.check_all_contracts_status(&fx.time).unwrap();
        assert_eq!(first.total, 1);
        assert_eq!(first.updated, 0);
        assert_eq!(first, second);
        assert_eq!(fx.service.contract(id).unwrap().status, ContractStatus::Completed);
    }
}
