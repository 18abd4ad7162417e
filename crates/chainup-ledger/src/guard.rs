use chainup_core::UpgradeName;

use crate::ledger::CompletionLedger;

/// True when none of `names` has a completion height yet.
///
/// Every entry point of a version shares one-time actions, so the check spans
/// the whole name set rather than the plan currently executing.
pub fn is_first_upgrade_of_version<L>(ledger: &L, names: &[UpgradeName]) -> bool
where
    L: CompletionLedger + ?Sized,
{
    for name in names {
        let height = ledger.done_height(name.as_str());
        if height != 0 {
            tracing::debug!(upgrade = %name, height, "version already upgraded");
            return false;
        }
    }
    true
}

pub fn is_first_upgrade_of_this_version<L>(ledger: &L) -> bool
where
    L: CompletionLedger + ?Sized,
{
    is_first_upgrade_of_version(ledger, &UpgradeName::ALL)
}
