use std::fmt;

use serde::{Deserialize, Serialize};

/// Upgrade plan names this software version knows how to handle.
///
/// A version ships several alternate entry points (one per target network and
/// a reapply fallback) so that the same binary can be brought up on any chain.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UpgradeName {
    #[serde(rename = "UNRELEASED_BASIC")]
    Basic,
    #[serde(rename = "UNRELEASED_A3P_INTEGRATION")]
    A3pIntegration,
    #[serde(rename = "UNRELEASED_main")]
    Main,
    #[serde(rename = "UNRELEASED_devnet")]
    Devnet,
    #[serde(rename = "UNRELEASED_REAPPLY")]
    Reapply,
}

impl UpgradeName {
    /// Every recognized name, in the order the completion ledger is scanned.
    pub const ALL: [UpgradeName; 5] = [
        Self::Basic,
        Self::A3pIntegration,
        Self::Main,
        Self::Devnet,
        Self::Reapply,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "UNRELEASED_BASIC",
            Self::A3pIntegration => "UNRELEASED_A3P_INTEGRATION",
            Self::Main => "UNRELEASED_main",
            Self::Devnet => "UNRELEASED_devnet",
            Self::Reapply => "UNRELEASED_REAPPLY",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|name| name.as_str() == value)
    }

    /// Primary names are the ones under which store schema initialization
    /// runs, so only they may carry the first upgrade of this version.
    pub fn is_primary(self) -> bool {
        match self {
            Self::Basic | Self::A3pIntegration | Self::Main | Self::Devnet => true,
            Self::Reapply => false,
        }
    }
}

impl fmt::Display for UpgradeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn is_upgrade_name_of_this_version(name: &str) -> bool {
    UpgradeName::parse(name).is_some()
}

/// Converts a plan name that the ledger already accepted into a typed name.
///
/// # Panics
///
/// Panics if `name` is not one of [`UpgradeName::ALL`]. Reaching this with an
/// unknown name means the binary was wired with the wrong handler set.
pub fn validate_upgrade_name(name: &str) -> UpgradeName {
    match UpgradeName::parse(name) {
        Some(parsed) => parsed,
        None => panic!("invalid upgrade name: {name}"),
    }
}

/// Classifies a raw plan name. The empty name means no upgrade is in
/// progress and is never primary.
///
/// # Panics
///
/// Panics for any other name that is not an upgrade name of this version.
pub fn is_primary_upgrade_name(name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    validate_upgrade_name(name).is_primary()
}
