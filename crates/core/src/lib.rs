pub mod money;
pub mod party;
pub mod period;
pub mod settings;
pub mod transaction;

pub use money::Money;
pub use party::{extract_counterparty, resolve_counterparty, PartyRole};
pub use period::DateRange;
pub use settings::{Settings, SettingsError};
pub use transaction::{ImportBatch, ImportBatchId, Transaction, NO_PURPOSE};
