//! Wizard controller: linear step navigation over a fixed definition and a
//! single guarded asynchronous submission on the last step.

use std::{collections::BTreeMap, sync::Arc};

use shared::{
    domain::{AnswerValue, StepId, WizardId},
    error::ApiError,
    protocol::{GenerationRequest, GenerationResult},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::{
    backend::GenerationBackend,
    definition::{StepDefinition, WizardDefinition},
    error::WizardError,
    identity::IdentityProvider,
};

#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionState {
    Idle,
    InFlight,
    Succeeded(GenerationResult),
    Failed(String),
}

impl SubmissionState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::InFlight => "in_flight",
            Self::Succeeded(_) => "succeeded",
            Self::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WizardState {
    pub current_step_index: usize,
    pub answers: BTreeMap<StepId, AnswerValue>,
    pub submission: SubmissionState,
}

impl WizardState {
    fn fresh() -> Self {
        Self {
            current_step_index: 0,
            answers: BTreeMap::new(),
            submission: SubmissionState::Idle,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Completed(GenerationResult),
    /// Another submission from this wizard is still pending; nothing was sent.
    AlreadyInFlight,
}

#[derive(Debug, Clone)]
pub enum WizardEvent {
    StepChanged {
        wizard_id: WizardId,
        index: usize,
        step_id: StepId,
    },
    AnswerChanged {
        wizard_id: WizardId,
        step_id: StepId,
        value: Option<AnswerValue>,
    },
    SubmissionChanged {
        wizard_id: WizardId,
        submission: SubmissionState,
    },
    Rejected {
        wizard_id: WizardId,
        error: ApiError,
    },
}

pub struct WizardController {
    id: WizardId,
    definition: Arc<WizardDefinition>,
    identity: Arc<dyn IdentityProvider>,
    backend: Arc<dyn GenerationBackend>,
    state: Mutex<WizardState>,
    events: broadcast::Sender<WizardEvent>,
}

impl WizardController {
    pub fn new(
        definition: Arc<WizardDefinition>,
        identity: Arc<dyn IdentityProvider>,
        backend: Arc<dyn GenerationBackend>,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        let id = WizardId::random();
        debug!(
            "wizard: mounted id={} flow={} steps={}",
            id,
            definition.name(),
            definition.step_count()
        );
        Arc::new(Self {
            id,
            definition,
            identity,
            backend,
            state: Mutex::new(WizardState::fresh()),
            events,
        })
    }

    /// New instance over the same definition and collaborators with no state.
    pub fn restart(&self) -> Arc<Self> {
        Self::new(
            Arc::clone(&self.definition),
            Arc::clone(&self.identity),
            Arc::clone(&self.backend),
        )
    }

    pub fn id(&self) -> WizardId {
        self.id
    }

    pub fn definition(&self) -> &WizardDefinition {
        &self.definition
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<WizardEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> WizardState {
        self.state.lock().await.clone()
    }

    pub async fn current_step(&self) -> &StepDefinition {
        let index = self.state.lock().await.current_step_index;
        &self.definition.steps()[index]
    }

    pub async fn is_loading(&self) -> bool {
        matches!(
            self.state.lock().await.submission,
            SubmissionState::InFlight
        )
    }

    /// Advances one step once the current step's answer validates. Stays put
    /// on the last step.
    pub async fn go_next(&self) -> Result<usize, WizardError> {
        let mut guard = self.state.lock().await;
        let step = &self.definition.steps()[guard.current_step_index];
        let validated = step.validate(guard.answers.get(&step.id));
        if let Err(err) = validated {
            drop(guard);
            return Err(self.reject(err));
        }

        if guard.current_step_index < self.definition.last_index() {
            guard.current_step_index += 1;
            self.emit_step(guard.current_step_index);
        }
        Ok(guard.current_step_index)
    }

    /// Retreats one step, keeping every answer. Stays put on the first step.
    pub async fn go_back(&self) -> usize {
        let mut guard = self.state.lock().await;
        if guard.current_step_index > 0 {
            guard.current_step_index -= 1;
            self.emit_step(guard.current_step_index);
        }
        guard.current_step_index
    }

    pub async fn set_answer(
        &self,
        step_id: impl Into<StepId>,
        value: AnswerValue,
    ) -> Result<(), WizardError> {
        let step_id = step_id.into();
        if self.definition.step(&step_id).is_none() {
            return Err(self.reject(WizardError::UnknownStep(step_id)));
        }

        let mut guard = self.state.lock().await;
        guard.answers.insert(step_id.clone(), value.clone());
        let _ = self.events.send(WizardEvent::AnswerChanged {
            wizard_id: self.id,
            step_id,
            value: Some(value),
        });
        Ok(())
    }

    pub async fn clear_answer(&self, step_id: impl Into<StepId>) -> Result<(), WizardError> {
        let step_id = step_id.into();
        if self.definition.step(&step_id).is_none() {
            return Err(self.reject(WizardError::UnknownStep(step_id)));
        }

        let mut guard = self.state.lock().await;
        if guard.answers.remove(&step_id).is_some() {
            let _ = self.events.send(WizardEvent::AnswerChanged {
                wizard_id: self.id,
                step_id,
                value: None,
            });
        }
        Ok(())
    }

    /// Sends the accumulated answers to the generation backend.
    ///
    /// The in-flight check and the transition into `InFlight` happen under one
    /// lock, so repeated calls while a request is pending send nothing. The
    /// lock is released while the request is outstanding.
    pub async fn submit(&self) -> Result<SubmitOutcome, WizardError> {
        let identity = self.identity.current_identity().await;

        let request = {
            let mut guard = self.state.lock().await;
            if matches!(guard.submission, SubmissionState::InFlight) {
                debug!("wizard: submit ignored while in flight id={}", self.id);
                return Ok(SubmitOutcome::AlreadyInFlight);
            }
            if matches!(guard.submission, SubmissionState::Succeeded(_)) {
                drop(guard);
                return Err(self.reject(WizardError::AlreadySucceeded));
            }

            let last_index = self.definition.last_index();
            if guard.current_step_index != last_index {
                let step_id = self.definition.steps()[guard.current_step_index].id.clone();
                drop(guard);
                return Err(self.reject(WizardError::validation(
                    &step_id,
                    "finish the remaining steps before submitting",
                )));
            }

            let validated = self.definition.validate_answers(&guard.answers);
            if let Err(err) = validated {
                drop(guard);
                return Err(self.reject(err));
            }

            let Some(signed_in) = identity.signed_in() else {
                drop(guard);
                info!(
                    "wizard: submit blocked identity={} id={}",
                    identity.label(),
                    self.id
                );
                return Err(self.reject(WizardError::Unauthenticated));
            };

            guard.submission = SubmissionState::InFlight;
            self.emit_submission(&guard.submission);
            GenerationRequest::from_answers(&guard.answers, &signed_in.email)
        };

        info!(
            "wizard: submit dispatched id={} flow={} endpoint={}",
            self.id,
            self.definition.name(),
            self.definition.endpoint().path
        );
        let response = self
            .backend
            .generate(self.definition.endpoint(), request)
            .await;

        let mut guard = self.state.lock().await;
        match response {
            Ok(result) => {
                info!(
                    "wizard: submit succeeded id={} flow={} url={}",
                    self.id,
                    self.definition.name(),
                    result.url
                );
                guard.submission = SubmissionState::Succeeded(result.clone());
                self.emit_submission(&guard.submission);
                Ok(SubmitOutcome::Completed(result))
            }
            Err(err) => {
                warn!(
                    "wizard: submit failed id={} flow={} error={err}",
                    self.id,
                    self.definition.name()
                );
                guard.submission = SubmissionState::Failed(err.user_message());
                self.emit_submission(&guard.submission);
                Err(err.into())
            }
        }
    }

    fn reject(&self, err: WizardError) -> WizardError {
        debug!("wizard: rejected id={} error={err}", self.id);
        let _ = self.events.send(WizardEvent::Rejected {
            wizard_id: self.id,
            error: err.to_api_error(),
        });
        err
    }

    fn emit_step(&self, index: usize) {
        let _ = self.events.send(WizardEvent::StepChanged {
            wizard_id: self.id,
            index,
            step_id: self.definition.steps()[index].id.clone(),
        });
    }

    fn emit_submission(&self, submission: &SubmissionState) {
        let _ = self.events.send(WizardEvent::SubmissionChanged {
            wizard_id: self.id,
            submission: submission.clone(),
        });
    }
}

#[cfg(test)]
#[path = "tests/wizard_tests.rs"]
mod tests;
