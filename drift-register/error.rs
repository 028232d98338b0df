use drift_brief::BriefError;
use drift_core::CoreError;
use drift_fast::FastError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// Nothing left to estimate from; the caller decides on a fallback
    #[error("insufficient data: no offset vectors left after {stage}")]
    InsufficientData { stage: &'static str },
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Fast(#[from] FastError),
    #[error(transparent)]
    Brief(#[from] BriefError),
}

impl RegistrationError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        RegistrationError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    /// Config validation failures surface as parameter errors
    pub(crate) fn from_config(err: CoreError) -> Self {
        match err {
            CoreError::InvalidConfig { field, reason } => RegistrationError::InvalidParameter {
                name: field,
                reason,
            },
            other => RegistrationError::Core(other),
        }
    }
}

pub type RegistrationResult<T> = Result<T, RegistrationError>;
