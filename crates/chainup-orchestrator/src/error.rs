use chainup_core::{PlanInfoError, StepError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("migration of module '{module}' failed: {reason}")]
pub struct MigrationError {
    pub module: String,
    pub reason: String,
}

impl MigrationError {
    pub fn new(module: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            reason: reason.into(),
        }
    }
}

/// Failures that abort the upgrade at its height. None of them are retried:
/// the same plan on the same binary fails the same way.
#[derive(Debug, thiserror::Error)]
pub enum UpgradeError {
    /// Store schemas are only initialized for primary names, so the first
    /// upgrade of a version must use one.
    #[error("cannot run {name} as first upgrade")]
    NonPrimaryFirstUpgrade { name: String },

    #[error(transparent)]
    Step(#[from] StepError),

    #[error(transparent)]
    PlanInfo(#[from] PlanInfoError),

    #[error(transparent)]
    Migration(#[from] MigrationError),
}
