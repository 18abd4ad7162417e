use std::collections::BTreeMap;
use std::fmt;

use chainup_core::{validate_upgrade_name, variant_for, ExecutionPlan, UpgradeName, UpgradePlan};
use chainup_ledger::{is_first_upgrade_of_this_version, CompletionLedger};
use serde::{Deserialize, Serialize};

use crate::error::UpgradeError;
use crate::migrations::ModuleMigrations;
use crate::steps::one_time_steps;

/// Consensus version of every module, keyed by module name.
pub type VersionMap = BTreeMap<String, u64>;

/// Module whose parameter schema is migrated on every upgrade.
pub const PARAMS_MIGRATION_MODULE: &str = "swingset";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradePhase {
    Idle,
    Validating,
    FirstTime,
    Repeat,
    Planning,
    Committing,
    Done,
}

impl UpgradePhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::FirstTime => "first-time",
            Self::Repeat => "repeat",
            Self::Planning => "planning",
            Self::Committing => "committing",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for UpgradePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The plan recorded for the execution engine to pick up when it boots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeDetails {
    pub plan: UpgradePlan,
    /// Built-in steps followed by the steps carried in the plan's info.
    pub core_proposals: ExecutionPlan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpgradeHandler {
    target: UpgradeName,
}

impl UpgradeHandler {
    pub fn new(target: UpgradeName) -> Self {
        Self { target }
    }

    pub fn target(self) -> UpgradeName {
        self.target
    }

    /// Runs the upgrade for `plan` and returns the migrated version map.
    ///
    /// # Panics
    ///
    /// Panics if the plan name is not an upgrade name of this version or if
    /// the execution controller was already initialized.
    pub fn handle<L, M>(
        self,
        app: &mut UpgradeApp<L, M>,
        plan: &UpgradePlan,
        from_vm: &VersionMap,
    ) -> Result<VersionMap, UpgradeError>
    where
        L: CompletionLedger,
        M: ModuleMigrations,
    {
        app.phase = UpgradePhase::Idle;
        app.check_controller_initialized(false);

        app.enter(UpgradePhase::Validating, plan);
        let plan_name = validate_upgrade_name(&plan.name);

        let built_in = if is_first_upgrade_of_this_version(&app.ledger) {
            app.enter(UpgradePhase::FirstTime, plan);
            if !plan_name.is_primary() {
                tracing::error!(
                    upgrade = %plan_name,
                    height = plan.height,
                    "first upgrade of this version must use a primary name"
                );
                return Err(UpgradeError::NonPrimaryFirstUpgrade {
                    name: plan.name.clone(),
                });
            }
            let steps = one_time_steps(self.target)?;
            tracing::info!(
                target_upgrade = %self.target,
                variant = variant_for(self.target).as_str(),
                steps = steps.len(),
                "scheduled one-time upgrade steps"
            );
            steps
        } else {
            app.enter(UpgradePhase::Repeat, plan);
            tracing::warn!(
                upgrade = %plan_name,
                "version already upgraded on this chain; skipping one-time steps"
            );
            Vec::new()
        };

        app.enter(UpgradePhase::Planning, plan);
        let mut core_proposals = ExecutionPlan::from_steps(built_in);
        let built_in_len = core_proposals.len();
        core_proposals.append(plan.info_steps()?);
        core_proposals.validate()?;
        tracing::info!(
            upgrade = %plan_name,
            built_in = built_in_len,
            from_info = core_proposals.len() - built_in_len,
            "recorded pending execution plan"
        );
        app.upgrade_details = Some(UpgradeDetails {
            plan: plan.clone(),
            core_proposals,
        });

        app.enter(UpgradePhase::Committing, plan);
        match app.commit(from_vm) {
            Ok(migrated) => {
                app.enter(UpgradePhase::Done, plan);
                Ok(migrated)
            }
            Err(err) => {
                app.upgrade_details = None;
                tracing::error!(upgrade = %plan_name, error = %err, "module migrations failed");
                Err(err)
            }
        }
    }
}

/// Registers one handler per upgrade name of this version.
pub fn upgrade_handlers() -> BTreeMap<UpgradeName, UpgradeHandler> {
    UpgradeName::ALL
        .into_iter()
        .map(|name| (name, UpgradeHandler::new(name)))
        .collect()
}

/// The slice of the node the upgrade handler works against: the completion
/// ledger, the module migrations and the pending-plan slot read by the
/// execution engine.
#[derive(Debug)]
pub struct UpgradeApp<L, M> {
    ledger: L,
    migrations: M,
    handlers: BTreeMap<UpgradeName, UpgradeHandler>,
    controller_initialized: bool,
    upgrade_details: Option<UpgradeDetails>,
    phase: UpgradePhase,
}

impl<L, M> UpgradeApp<L, M>
where
    L: CompletionLedger,
    M: ModuleMigrations,
{
    pub fn new(ledger: L, migrations: M) -> Self {
        Self {
            ledger,
            migrations,
            handlers: upgrade_handlers(),
            controller_initialized: false,
            upgrade_details: None,
            phase: UpgradePhase::Idle,
        }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    pub fn migrations(&self) -> &M {
        &self.migrations
    }

    pub fn handler(&self, name: UpgradeName) -> Option<UpgradeHandler> {
        self.handlers.get(&name).copied()
    }

    /// Last phase reached by the most recent upgrade invocation.
    pub fn phase(&self) -> UpgradePhase {
        self.phase
    }

    pub fn mark_controller_initialized(&mut self) {
        self.controller_initialized = true;
    }

    pub fn upgrade_details(&self) -> Option<&UpgradeDetails> {
        self.upgrade_details.as_ref()
    }

    /// Hands the pending plan to the execution engine and clears the slot.
    pub fn take_upgrade_details(&mut self) -> Option<UpgradeDetails> {
        self.upgrade_details.take()
    }

    /// Dispatches `plan` to the handler registered for its name.
    ///
    /// # Panics
    ///
    /// Panics if no handler is registered for the plan name.
    pub fn apply_upgrade(
        &mut self,
        plan: &UpgradePlan,
        from_vm: &VersionMap,
    ) -> Result<VersionMap, UpgradeError> {
        let name = validate_upgrade_name(&plan.name);
        let handler = self
            .handler(name)
            .unwrap_or_else(|| panic!("no upgrade handler registered for {name}"));
        handler.handle(self, plan, from_vm)
    }

    fn check_controller_initialized(&self, expected: bool) {
        if self.controller_initialized != expected {
            panic!(
                "execution controller initialized = {}, expected {expected}",
                self.controller_initialized
            );
        }
    }

    fn enter(&mut self, phase: UpgradePhase, plan: &UpgradePlan) {
        tracing::debug!(
            upgrade = %plan.name,
            height = plan.height,
            from = %self.phase,
            to = %phase,
            "upgrade phase"
        );
        self.phase = phase;
    }

    fn commit(&mut self, from_vm: &VersionMap) -> Result<VersionMap, UpgradeError> {
        let migrated = self.migrations.run_migrations(from_vm)?;
        self.migrations.migrate_params(PARAMS_MIGRATION_MODULE)?;
        Ok(migrated)
    }
}
