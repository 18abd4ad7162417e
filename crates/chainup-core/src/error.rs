/// Failures while turning action arguments into a step payload.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("failed to serialize arguments for '{module}': {source}")]
    Serialization {
        module: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed action payload: {reason}")]
    MalformedPayload { reason: String },
}

impl StepError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedPayload {
            reason: reason.into(),
        }
    }
}

/// Failures while reading extra steps out of an upgrade plan's info field.
#[derive(Debug, thiserror::Error)]
pub enum PlanInfoError {
    #[error("upgrade info is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("upgrade info must be a JSON object")]
    NotAnObject,

    #[error("unsupported coreProposals shape: {0}")]
    UnsupportedShape(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("invalid address URL: {0}")]
    InvalidUrl(String),

    #[error("unsupported address scheme {0}")]
    UnsupportedScheme(String),

    #[error("base address path must have at least one leading slash, not {0}")]
    MissingLeadingSlash(String),

    #[error("base address cannot be empty")]
    EmptyBase,
}
