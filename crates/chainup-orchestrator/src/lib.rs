//! Upgrade handler for this software version.
//!
//! The handler runs inside the upgrade block, decides whether the one-time
//! actions of this version still have to run, records the resulting
//! execution plan for the execution engine and always runs the module
//! migrations.

mod error;
mod handler;
mod migrations;
mod pending;
mod steps;

pub use error::{MigrationError, UpgradeError};
pub use handler::{
    upgrade_handlers, UpgradeApp, UpgradeDetails, UpgradeHandler, UpgradePhase, VersionMap,
    PARAMS_MIGRATION_MODULE,
};
pub use migrations::{ModuleMigrations, PassThroughMigrations};
pub use pending::{
    clear_pending_plan, pending_plan_path, read_pending_plan, write_pending_plan,
    PendingPlanRecord,
};
pub use steps::{
    one_time_steps, replace_electorate_step, replace_price_feeds_step,
    DEFAULT_PROPOSAL_ENTRYPOINT, REPLACE_ELECTORATE_MODULE, UPDATE_PRICE_FEEDS_MODULE,
    VERSION_MODULE_STEPS,
};

#[cfg(test)]
mod tests;
