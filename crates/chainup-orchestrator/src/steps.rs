use chainup_core::{build_step_with_args, variant_for, Step, StepError, UpgradeName, Variant};
use serde::Serialize;

pub const REPLACE_ELECTORATE_MODULE: &str =
    "@agoric/builders/scripts/inter-protocol/replace-electorate-core.js";
pub const UPDATE_PRICE_FEEDS_MODULE: &str =
    "@agoric/builders/scripts/inter-protocol/updatePriceFeeds.js";
pub const DEFAULT_PROPOSAL_ENTRYPOINT: &str = "defaultProposalBuilder";

/// Module upgrades of this version, each its own step, in execution order.
pub const VERSION_MODULE_STEPS: [&str; 6] = [
    "@agoric/builders/scripts/vats/add-auction.js",
    "@agoric/builders/scripts/vats/upgradeVaults.js",
    // Zoe only; no new ZCF needed
    "@agoric/builders/scripts/vats/upgrade-zoe.js",
    // new liveslots for repaired vow usage
    "@agoric/builders/scripts/vats/upgrade-orch-core.js",
    // new liveslots and vow support
    "@agoric/builders/scripts/smart-wallet/build-wallet-factory2-upgrade.js",
    "@agoric/builders/scripts/vats/init-orchestration.js",
];

#[derive(Serialize)]
struct VariantArgs {
    variant: Variant,
}

pub fn replace_electorate_step(target: UpgradeName) -> Result<Step, StepError> {
    build_step_with_args(
        REPLACE_ELECTORATE_MODULE,
        DEFAULT_PROPOSAL_ENTRYPOINT,
        &VariantArgs {
            variant: variant_for(target),
        },
    )
}

pub fn replace_price_feeds_step(target: UpgradeName) -> Result<Step, StepError> {
    build_step_with_args(
        UPDATE_PRICE_FEEDS_MODULE,
        DEFAULT_PROPOSAL_ENTRYPOINT,
        &VariantArgs {
            variant: variant_for(target),
        },
    )
}

/// The non-idempotent steps run by the first upgrade of this version.
/// Later steps may rely on state created by earlier ones.
pub fn one_time_steps(target: UpgradeName) -> Result<Vec<Step>, StepError> {
    let mut steps = Vec::with_capacity(2 + VERSION_MODULE_STEPS.len());
    steps.push(replace_electorate_step(target)?);
    steps.push(replace_price_feeds_step(target)?);
    steps.extend(
        VERSION_MODULE_STEPS
            .iter()
            .map(|module| Step::for_modules([*module])),
    );
    Ok(steps)
}
