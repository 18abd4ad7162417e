use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::value::RawValue;
use serde_json::{Map, Value};

use crate::error::StepError;

/// A scripted action addressed by builder module and entrypoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionDescriptor {
    pub module: String,
    pub entrypoint: String,
    pub args: Map<String, Value>,
}

// Field order here is the wire order.
#[derive(Serialize)]
struct ActionPayload<'a> {
    module: &'a str,
    entrypoint: &'a str,
    args: [&'a Map<String, Value>; 1],
}

impl ActionDescriptor {
    pub fn new<A>(module: &str, entrypoint: &str, args: &A) -> Result<Self, StepError>
    where
        A: Serialize + ?Sized,
    {
        let value = serde_json::to_value(args).map_err(|source| StepError::Serialization {
            module: module.to_string(),
            source,
        })?;
        let Value::Object(args) = value else {
            return Err(StepError::malformed(format!(
                "arguments for '{module}' must serialize to a JSON object"
            )));
        };

        Ok(Self {
            module: module.to_string(),
            entrypoint: entrypoint.to_string(),
            args,
        })
    }

    /// Renders `{"module": .., "entrypoint": .., "args": [..]}`.
    pub fn to_payload(&self) -> Result<ArbitraryPayload, StepError> {
        let bytes = serde_json::to_vec(&ActionPayload {
            module: &self.module,
            entrypoint: &self.entrypoint,
            args: [&self.args],
        })
        .map_err(|source| StepError::Serialization {
            module: self.module.clone(),
            source,
        })?;
        Ok(ArbitraryPayload(bytes))
    }
}

/// Pre-serialized JSON handed to the execution engine as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArbitraryPayload(Vec<u8>);

impl ArbitraryPayload {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn validate(&self) -> Result<(), StepError> {
        self.as_raw_json().map(|_| ())
    }

    pub fn to_value(&self) -> Result<Value, StepError> {
        serde_json::from_slice(&self.0).map_err(|err| self.malformed(&err))
    }

    fn as_raw_json(&self) -> Result<&RawValue, StepError> {
        serde_json::from_slice(&self.0).map_err(|err| self.malformed(&err))
    }

    fn malformed(&self, err: &serde_json::Error) -> StepError {
        StepError::malformed(format!(
            "invalid JSON ({err}): {}",
            String::from_utf8_lossy(&self.0)
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    /// Builder module run through its default entrypoint.
    Module(String),
    Arbitrary(ArbitraryPayload),
}

impl Serialize for StepAction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Module(specifier) => serializer.serialize_str(specifier),
            Self::Arbitrary(payload) => payload
                .as_raw_json()
                .map_err(S::Error::custom)?
                .serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for StepAction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Box::<RawValue>::deserialize(deserializer)?;
        if raw.get().starts_with('"') {
            let specifier: String = serde_json::from_str(raw.get()).map_err(D::Error::custom)?;
            return Ok(Self::Module(specifier));
        }
        Ok(Self::Arbitrary(ArbitraryPayload::new(raw.get())))
    }
}

/// One sequential unit of an execution plan. Actions inside a step carry no
/// ordering relative to each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Step {
    actions: Vec<StepAction>,
}

impl Step {
    pub fn from_actions(actions: Vec<StepAction>) -> Self {
        Self { actions }
    }

    pub fn for_modules<I, S>(modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            actions: modules
                .into_iter()
                .map(|module| StepAction::Module(module.into()))
                .collect(),
        }
    }

    /// Wraps an already serialized payload. Its validity is only checked when
    /// the plan is emitted.
    pub fn arbitrary(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            actions: vec![StepAction::Arbitrary(ArbitraryPayload::new(payload))],
        }
    }

    pub fn actions(&self) -> &[StepAction] {
        &self.actions
    }

    /// A step must carry at least one action, and every arbitrary payload
    /// must be valid JSON.
    pub fn validate(&self) -> Result<(), StepError> {
        if self.actions.is_empty() {
            return Err(StepError::malformed("step has no actions"));
        }
        for action in &self.actions {
            if let StepAction::Arbitrary(payload) = action {
                payload.validate()?;
            }
        }
        Ok(())
    }
}

pub fn build_step_with_args<A>(module: &str, entrypoint: &str, args: &A) -> Result<Step, StepError>
where
    A: Serialize + ?Sized,
{
    let descriptor = ActionDescriptor::new(module, entrypoint, args)?;
    let payload = descriptor.to_payload()?;
    payload.validate()?;
    Ok(Step::from_actions(vec![StepAction::Arbitrary(payload)]))
}
