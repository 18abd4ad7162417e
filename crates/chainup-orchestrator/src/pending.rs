use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::handler::UpgradeDetails;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPlanRecord {
    /// SHA-256 of the emitted execution plan.
    pub fingerprint: String,
    pub details: UpgradeDetails,
}

pub fn pending_plan_path(state_root: &Path) -> PathBuf {
    state_root.join("pending-plan.json")
}

/// Writes the pending plan for the execution engine. Only one plan may be
/// pending at a time.
pub fn write_pending_plan(
    state_root: &Path,
    details: &UpgradeDetails,
) -> Result<PendingPlanRecord> {
    let fingerprint = details
        .core_proposals
        .fingerprint()
        .context("refusing to record an invalid execution plan")?;
    let record = PendingPlanRecord {
        fingerprint,
        details: details.clone(),
    };
    let payload =
        serde_json::to_vec_pretty(&record).context("failed to serialize pending plan")?;

    fs::create_dir_all(state_root)
        .with_context(|| format!("failed to create {}", state_root.display()))?;
    let path = pending_plan_path(state_root);
    let mut file = match fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
    {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            let existing = read_pending_plan(state_root).ok().flatten();
            let detail = existing
                .map(|existing| format!(" (upgrade={})", existing.details.plan.name))
                .unwrap_or_default();
            return Err(anyhow!("pending plan already recorded{detail}"));
        }
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to create pending plan: {}", path.display()));
        }
    };

    file.write_all(&payload)
        .with_context(|| format!("failed to write pending plan: {}", path.display()))?;
    file.flush()
        .with_context(|| format!("failed to flush pending plan: {}", path.display()))?;
    tracing::info!(
        upgrade = %record.details.plan.name,
        fingerprint = %record.fingerprint,
        path = %path.display(),
        "wrote pending plan"
    );
    Ok(record)
}

pub fn read_pending_plan(state_root: &Path) -> Result<Option<PendingPlanRecord>> {
    let path = pending_plan_path(state_root);
    let raw = match fs::read(&path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read pending plan: {}", path.display()));
        }
    };

    let record: PendingPlanRecord = serde_json::from_slice(&raw)
        .with_context(|| format!("failed parsing pending plan: {}", path.display()))?;
    let actual = record
        .details
        .core_proposals
        .fingerprint()
        .with_context(|| format!("invalid execution plan in {}", path.display()))?;
    if actual != record.fingerprint {
        return Err(anyhow!(
            "pending plan fingerprint mismatch in {}: recorded {}, computed {actual}",
            path.display(),
            record.fingerprint
        ));
    }
    Ok(Some(record))
}

pub fn clear_pending_plan(state_root: &Path) -> Result<bool> {
    let path = pending_plan_path(state_root);
    match fs::remove_file(&path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => {
            Err(err).with_context(|| format!("failed to clear pending plan: {}", path.display()))
        }
    }
}
