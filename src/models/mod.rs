mod bank;
mod extraction;
mod id;
mod snapshot;

pub use bank::{AdapterSpec, BankDefinition, ConfiguredAccount, FdAttribution};
pub use extraction::{AccountKind, FixedDeposit, RawAccount, RawExtraction};
pub use id::{Id, IdError};
pub use snapshot::{AccountEntry, DailySnapshot, SnapshotTotals, Upsert};
