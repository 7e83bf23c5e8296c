pub mod api;
pub mod balance;
pub mod calendar;
pub mod config;
pub mod contract;
pub mod debtor;
pub mod decimal;
pub mod editing;
pub mod errors;
pub mod events;
pub mod notes;
pub mod payments;
pub mod service;
pub mod store;
pub mod telemetry;
pub mod types;
pub mod views;

// re-export key types
pub use api::{ApiError, ApiResponse};
pub use balance::Balance;
pub use calendar::Period;
pub use config::{LedgerConfig, RateLimitConfig, SweepConfig};
pub use contract::{Contract, ContractBuilder, ContractTerms};
pub use debtor::{Debtor, SweepReport, SweepSchedule};
pub use decimal::{CashSplit, ExchangeRate, Money};
pub use editing::{ContractField, ContractUpdate, EditImpact, EditRecord, FieldChange, ImpactSummary};
pub use errors::{LedgerError, Result};
pub use events::{Event, EventStore};
pub use notes::Note;
pub use payments::{
    classify, BulkPaymentReceipt, Classification, Payment, PaymentHistoryFilter, PaymentReceipt,
    PaymentRequest, RemainingReceipt,
};
pub use service::{LedgerService, StatusSweepReport};
pub use store::{AuditRecord, LedgerStore, LedgerTables, MemoryStore};
pub use telemetry::init_tracing;
pub use types::{
    ContractId, ContractStatus, CustomerId, DebtorId, Employee, EmployeeId, NoteId, PaymentId,
    PaymentKind, PaymentReason, PaymentSource, PaymentStatus, Role,
};
pub use views::{ContractView, PaymentHistoryItem, PendingPaymentView};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
