use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Read access to the heights at which upgrade plans completed.
pub trait CompletionLedger {
    /// Height the named plan completed at, or 0 if it never did.
    fn done_height(&self, name: &str) -> u64;
}

impl CompletionLedger for BTreeMap<String, u64> {
    fn done_height(&self, name: &str) -> u64 {
        self.get(name).copied().unwrap_or(0)
    }
}

impl<L: CompletionLedger + ?Sized> CompletionLedger for &L {
    fn done_height(&self, name: &str) -> u64 {
        (**self).done_height(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("completion height for '{name}' must be non-zero")]
    ZeroHeight { name: String },

    #[error("upgrade '{name}' already completed at height {height}")]
    AlreadyCompleted { name: String, height: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub name: String,
    pub height: u64,
}

/// Append-only completion ledger kept in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryLedger {
    done: BTreeMap<String, u64>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `name` completed at `height`. A completed name is never
    /// rewritten, not even with the same height.
    pub fn record_done(&mut self, name: &str, height: u64) -> Result<(), LedgerError> {
        if height == 0 {
            return Err(LedgerError::ZeroHeight {
                name: name.to_string(),
            });
        }
        if let Some(existing) = self.done.get(name) {
            return Err(LedgerError::AlreadyCompleted {
                name: name.to_string(),
                height: *existing,
            });
        }

        self.done.insert(name.to_string(), height);
        tracing::info!(upgrade = name, height, "recorded upgrade completion");
        Ok(())
    }

    pub fn records(&self) -> Vec<CompletionRecord> {
        self.done
            .iter()
            .map(|(name, height)| CompletionRecord {
                name: name.clone(),
                height: *height,
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.done.is_empty()
    }

    pub(crate) fn from_records(records: Vec<CompletionRecord>) -> Result<Self, LedgerError> {
        let mut ledger = Self::new();
        for record in records {
            ledger.record_done(&record.name, record.height)?;
        }
        Ok(ledger)
    }
}

impl CompletionLedger for MemoryLedger {
    fn done_height(&self, name: &str) -> u64 {
        self.done.done_height(name)
    }
}
