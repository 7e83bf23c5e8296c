use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{ContractId, CustomerId, EmployeeId, NoteId};

/// free-text audit note attached to a customer action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub customer_id: CustomerId,
    pub contract_id: Option<ContractId>,
    pub created_by: EmployeeId,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Note {
    pub fn new(
        customer_id: CustomerId,
        contract_id: Option<ContractId>,
        created_by: EmployeeId,
        text: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer_id,
            contract_id,
            created_by,
            text: text.into(),
            created_at,
        }
    }

    /// notes only ever grow
    pub fn append(&mut self, line: &str) {
        if self.text.is_empty() {
            self.text = line.to_string();
        } else {
            self.text.push('\n');
            self.text.push_str(line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_append_keeps_history() {
        let mut note = Note::new(
            Uuid::new_v4(),
            None,
            Uuid::new_v4(),
            "payment: 100 $",
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        );
        note.append("[REJECTED: cash missing]");
        assert_eq!(note.text, "payment: 100 $\n[REJECTED: cash missing]");

        let mut empty = Note::new(Uuid::new_v4(), None, Uuid::new_v4(), "", note.created_at);
        empty.append("first");
        assert_eq!(empty.text, "first");
    }
}
