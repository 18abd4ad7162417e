use serde::{Deserialize, Serialize};

use crate::names::UpgradeName;

/// Network parameterization passed to the one-time upgrade actions.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub enum Variant {
    /// The actions still run, but are told to change nothing.
    #[default]
    #[serde(rename = "")]
    None,
    #[serde(rename = "A3P_INTEGRATION")]
    A3pIntegration,
    #[serde(rename = "MAINNET")]
    Mainnet,
    #[serde(rename = "DEVNET")]
    Devnet,
}

impl Variant {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "",
            Self::A3pIntegration => "A3P_INTEGRATION",
            Self::Mainnet => "MAINNET",
            Self::Devnet => "DEVNET",
        }
    }

    pub fn is_none(self) -> bool {
        self == Self::None
    }
}

pub fn variant_for(name: UpgradeName) -> Variant {
    match name {
        UpgradeName::A3pIntegration => Variant::A3pIntegration,
        UpgradeName::Main => Variant::Mainnet,
        UpgradeName::Devnet => Variant::Devnet,
        // no-frills upgrade for this version
        UpgradeName::Basic => Variant::None,
        UpgradeName::Reapply => Variant::None,
    }
}
