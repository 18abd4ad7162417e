mod address;
mod error;
mod names;
mod plan;
mod step;
mod variant;

pub use address::{
    extract_base_address, extract_base_address_from_urn, PARAMETERIZED_ADDRESS_SCHEME,
};
pub use error::{AddressError, PlanInfoError, StepError};
pub use names::{
    is_primary_upgrade_name, is_upgrade_name_of_this_version, validate_upgrade_name, UpgradeName,
};
pub use plan::{parse_info_steps, ExecutionPlan, UpgradePlan};
pub use step::{build_step_with_args, ActionDescriptor, ArbitraryPayload, Step, StepAction};
pub use variant::{variant_for, Variant};
