use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::PaymentStatus;

/// outcome of comparing what was paid against what was due
///
/// exactly one of `remaining` / `excess` is non-zero, or neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub status: PaymentStatus,
    pub remaining: Money,
    pub excess: Money,
}

impl Classification {
    pub fn exact() -> Self {
        Self {
            status: PaymentStatus::Paid,
            remaining: Money::ZERO,
            excess: Money::ZERO,
        }
    }

    /// one-line summary for notes and receipts
    pub fn describe(&self, actual: Money) -> String {
        match self.status {
            PaymentStatus::Underpaid => format!(
                "payment: {} $, short by {} $",
                actual.to_cents(),
                self.remaining.to_cents()
            ),
            PaymentStatus::Overpaid => format!(
                "payment: {} $, {} $ over, carried to the next month",
                actual.to_cents(),
                self.excess.to_cents()
            ),
            _ => format!("payment: {} $", actual.to_cents()),
        }
    }
}

/// classify a payment against the amount expected for its period
pub fn classify(expected: Money, actual: Money, tolerance: Money) -> Classification {
    let diff = actual - expected;

    if diff.abs() <= tolerance {
        Classification::exact()
    } else if diff.is_negative() {
        Classification {
            status: PaymentStatus::Underpaid,
            remaining: diff.abs(),
            excess: Money::ZERO,
        }
    } else {
        Classification {
            status: PaymentStatus::Overpaid,
            remaining: Money::ZERO,
            excess: diff,
        }
    }
}
