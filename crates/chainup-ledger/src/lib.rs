mod guard;
mod ledger;
mod store;

pub use guard::{is_first_upgrade_of_this_version, is_first_upgrade_of_version};
pub use ledger::{CompletionLedger, CompletionRecord, LedgerError, MemoryLedger};
pub use store::LedgerStore;
