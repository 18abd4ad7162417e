use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::ledger::{CompletionRecord, MemoryLedger};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CompletionStateFile {
    #[serde(default)]
    completions: Vec<CompletionRecord>,
}

/// Completion ledger persisted as `completions.toml` under a state root.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    state_root: PathBuf,
}

impl LedgerStore {
    pub fn new(state_root: impl Into<PathBuf>) -> Self {
        Self {
            state_root: state_root.into(),
        }
    }

    pub fn state_root(&self) -> &Path {
        &self.state_root
    }

    pub fn ledger_file_path(&self) -> PathBuf {
        self.state_root.join("completions.toml")
    }

    pub fn load(&self) -> Result<MemoryLedger> {
        let path = self.ledger_file_path();
        if !path.exists() {
            return Ok(MemoryLedger::new());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed reading completion ledger: {}", path.display()))?;
        let state: CompletionStateFile = toml::from_str(&content)
            .with_context(|| format!("failed parsing completion ledger: {}", path.display()))?;
        MemoryLedger::from_records(state.completions)
            .with_context(|| format!("inconsistent completion ledger: {}", path.display()))
    }

    pub fn save(&self, ledger: &MemoryLedger) -> Result<()> {
        fs::create_dir_all(&self.state_root).with_context(|| {
            format!(
                "failed creating ledger state root: {}",
                self.state_root.display()
            )
        })?;

        let path = self.ledger_file_path();
        let state = CompletionStateFile {
            completions: ledger.records(),
        };
        let content = toml::to_string(&state)
            .with_context(|| format!("failed serializing completion ledger: {}", path.display()))?;
        fs::write(&path, content)
            .with_context(|| format!("failed writing completion ledger: {}", path.display()))
    }

    pub fn record_done(&self, name: &str, height: u64) -> Result<()> {
        let mut ledger = self.load()?;
        ledger.record_done(name, height)?;
        self.save(&ledger)
    }
}
