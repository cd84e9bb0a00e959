use shared::{
    domain::StepId,
    error::{ApiError, ErrorKind},
};
use thiserror::Error;

pub const GENERIC_TRANSPORT_MESSAGE: &str = "generation request failed; please try again";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    #[error("sign in to continue")]
    Unauthenticated,
    #[error("{step}: {reason}")]
    Validation { step: StepId, reason: String },
    #[error("{0}")]
    Transport(String),
    #[error("{0}")]
    Remote(String),
    #[error("unknown step {0}")]
    UnknownStep(StepId),
    #[error("invalid wizard definition: {0}")]
    InvalidDefinition(String),
    #[error("generation already succeeded; restart the wizard to generate again")]
    AlreadySucceeded,
}

impl WizardError {
    pub fn validation(step: &StepId, reason: impl Into<String>) -> Self {
        Self::Validation {
            step: step.clone(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthenticated => ErrorKind::Unauthenticated,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Remote(_) => ErrorKind::Remote,
            Self::Validation { .. }
            | Self::UnknownStep(_)
            | Self::InvalidDefinition(_)
            | Self::AlreadySucceeded => ErrorKind::Validation,
        }
    }

    pub fn to_api_error(&self) -> ApiError {
        ApiError::new(self.kind(), self.to_string())
    }
}

/// Failure of one request to a remote backend, already split into the two
/// kinds the wizard reports.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("transport failure: {detail}")]
    Transport { detail: String },
    #[error("backend rejected request: {message}")]
    Remote { message: String },
}

impl BackendError {
    pub fn transport(detail: impl Into<String>) -> Self {
        Self::Transport {
            detail: detail.into(),
        }
    }

    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
        }
    }

    /// Text shown to the user; transport details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport { .. } => GENERIC_TRANSPORT_MESSAGE.to_string(),
            Self::Remote { message } => message.clone(),
        }
    }
}

impl From<BackendError> for WizardError {
    fn from(value: BackendError) -> Self {
        match value {
            BackendError::Transport { .. } => Self::Transport(value.user_message()),
            BackendError::Remote { message } => Self::Remote(message),
        }
    }
}
