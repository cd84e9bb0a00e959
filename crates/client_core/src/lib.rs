//! Client core for the creator dashboard's generation wizards.
//!
//! A [`WizardController`] walks a fixed [`WizardDefinition`] step by step and
//! performs one guarded submission to a [`GenerationBackend`] on the last
//! step. Identity and ambient account state are injected collaborators.

pub mod account;
pub mod backend;
pub mod config;
pub mod definition;
pub mod error;
pub mod flows;
pub mod identity;
pub mod wizard;

pub use account::{
    AccountSnapshot, AccountStore, HttpUserRecordSource, RefreshPolicy, UserRecordSource,
};
pub use backend::{GenerationBackend, HttpGenerationBackend};
pub use definition::{
    ChoiceOption, EndpointSpec, InputKind, Requiredness, StepDefinition, TextRule,
    WizardDefinition,
};
pub use error::{BackendError, WizardError};
pub use identity::{
    DeferredIdentity, DeferredIdentityHandle, IdentityProvider, IdentityStatus, StaticIdentity,
};
pub use wizard::{SubmissionState, SubmitOutcome, WizardController, WizardEvent, WizardState};
