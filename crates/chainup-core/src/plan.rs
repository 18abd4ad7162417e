use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{PlanInfoError, StepError};
use crate::step::{ArbitraryPayload, Step, StepAction};

/// Ordered steps handed to the execution engine for one upgrade.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    steps: Vec<Step>,
}

impl ExecutionPlan {
    pub fn from_steps(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    /// Appends steps after every step already in the plan.
    pub fn append<I>(&mut self, steps: I)
    where
        I: IntoIterator<Item = Step>,
    {
        self.steps.extend(steps);
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn validate(&self) -> Result<(), StepError> {
        for (index, step) in self.steps.iter().enumerate() {
            step.validate().map_err(|err| match err {
                StepError::MalformedPayload { reason } => {
                    StepError::malformed(format!("step {index}: {reason}"))
                }
                other => other,
            })?;
        }
        Ok(())
    }

    /// Wire form `{"steps": [[action, ...], ...]}`.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, StepError> {
        self.validate()?;
        serde_json::to_vec(self).map_err(|source| StepError::Serialization {
            module: "execution plan".to_string(),
            source,
        })
    }

    /// Lowercase hex SHA-256 of the wire form.
    pub fn fingerprint(&self) -> Result<String, StepError> {
        let bytes = self.to_json_bytes()?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }
}

/// A named, height-scheduled upgrade as agreed by the ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradePlan {
    pub name: String,
    #[serde(default)]
    pub height: u64,
    #[serde(default)]
    pub info: String,
}

impl UpgradePlan {
    pub fn new(name: impl Into<String>, height: u64) -> Self {
        Self {
            name: name.into(),
            height,
            info: String::new(),
        }
    }

    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = info.into();
        self
    }

    pub fn info_steps(&self) -> Result<Vec<Step>, PlanInfoError> {
        parse_info_steps(&self.info)
    }
}

/// Reads the `coreProposals` carried in an upgrade plan's info field.
///
/// Accepts either a list of proposals (one step each) or
/// `{"steps": [[...], ...]}`. An empty info or a missing key yields no steps.
pub fn parse_info_steps(info: &str) -> Result<Vec<Step>, PlanInfoError> {
    if info.trim().is_empty() {
        return Ok(Vec::new());
    }

    let value: Value = serde_json::from_str(info).map_err(PlanInfoError::InvalidJson)?;
    let Value::Object(mut fields) = value else {
        return Err(PlanInfoError::NotAnObject);
    };

    match fields.remove("coreProposals") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(proposals)) => proposals
            .into_iter()
            .enumerate()
            .map(|(index, proposal)| {
                let action = action_from_value(proposal).map_err(|shape| {
                    PlanInfoError::UnsupportedShape(format!("[{index}]: {shape}"))
                })?;
                Ok(Step::from_actions(vec![action]))
            })
            .collect(),
        Some(Value::Object(mut grouped)) => {
            let Some(Value::Array(steps)) = grouped.remove("steps") else {
                return Err(PlanInfoError::UnsupportedShape(
                    "object form requires a 'steps' array".to_string(),
                ));
            };
            steps
                .into_iter()
                .enumerate()
                .map(|(index, step)| step_from_value(index, step))
                .collect()
        }
        Some(other) => Err(PlanInfoError::UnsupportedShape(format!(
            "expected array or object, got {other}"
        ))),
    }
}

fn step_from_value(index: usize, value: Value) -> Result<Step, PlanInfoError> {
    let Value::Array(actions) = value else {
        return Err(PlanInfoError::UnsupportedShape(format!(
            "steps[{index}] must be an array"
        )));
    };
    if actions.is_empty() {
        return Err(PlanInfoError::UnsupportedShape(format!(
            "steps[{index}] has no actions"
        )));
    }

    let actions = actions
        .into_iter()
        .map(|action| {
            action_from_value(action).map_err(|shape| {
                PlanInfoError::UnsupportedShape(format!("steps[{index}]: {shape}"))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Step::from_actions(actions))
}

fn action_from_value(value: Value) -> Result<StepAction, String> {
    match value {
        Value::String(specifier) => Ok(StepAction::Module(specifier)),
        Value::Object(_) => {
            let bytes = serde_json::to_vec(&value).map_err(|err| err.to_string())?;
            Ok(StepAction::Arbitrary(ArbitraryPayload::new(bytes)))
        }
        other => Err(format!("unsupported proposal {other}")),
    }
}
