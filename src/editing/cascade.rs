use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::editing::ImpactSummary;
use crate::payments::classify::{classify, Classification};
use crate::types::{PaymentId, PaymentStatus};

/// confirmed monthly entry as seen by the cascade
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CascadeInput {
    pub payment_id: PaymentId,
    pub actual: Money,
    pub status: PaymentStatus,
}

/// reclassification of one entry under the new monthly amount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryOutcome {
    pub payment_id: PaymentId,
    pub old_status: PaymentStatus,
    pub new_status: PaymentStatus,
    /// new monthly amount less the carry from earlier entries
    pub effective_expected: Money,
    pub carry_in: Money,
    pub actual: Money,
    pub remaining: Money,
    pub excess: Money,
}

impl EntryOutcome {
    pub fn changed(&self) -> bool {
        self.old_status != self.new_status || !self.remaining.is_zero() || !self.excess.is_zero()
    }

    pub fn classification(&self) -> Classification {
        Classification {
            status: self.new_status,
            remaining: self.remaining,
            excess: self.excess,
        }
    }
}

/// result of re-running classification over a contract's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadePlan {
    pub outcomes: Vec<EntryOutcome>,
    pub leftover_carry: Money,
    pub summary: ImpactSummary,
}

/// re-derive every confirmed monthly entry against `new_monthly`
///
/// entries must be in chronological order. an overpaid entry carries its
/// excess into the next entry, which then owes `new_monthly - carry`. an
/// underpaid or exact entry resets the carry. the excess already includes
/// the carry it received, so the carry is replaced rather than summed.
pub fn reclassify(entries: &[CascadeInput], new_monthly: Money, tolerance: Money) -> CascadePlan {
    let mut carry = Money::ZERO;
    let mut outcomes = Vec::with_capacity(entries.len());
    let mut summary = ImpactSummary::default();

    for entry in entries {
        let carry_in = carry;
        let effective_expected = new_monthly - carry_in;
        let c = classify(effective_expected, entry.actual, tolerance);

        match c.status {
            PaymentStatus::Underpaid => {
                summary.underpaid_count += 1;
                summary.total_shortage += c.remaining;
                summary.corrective_entries_created += 1;
                carry = Money::ZERO;
            }
            PaymentStatus::Overpaid => {
                summary.overpaid_count += 1;
                summary.total_excess += c.excess;
                carry = c.excess;
            }
            _ => carry = Money::ZERO,
        }

        outcomes.push(EntryOutcome {
            payment_id: entry.payment_id,
            old_status: entry.status,
            new_status: c.status,
            effective_expected,
            carry_in,
            actual: entry.actual,
            remaining: c.remaining,
            excess: c.excess,
        });
    }

    summary.leftover_carry = carry;
    CascadePlan {
        outcomes,
        leftover_carry: carry,
        summary,
    }
}
