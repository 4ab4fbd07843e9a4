//! Submission lifecycle for one training request, raced against a deadline.

use std::time::{Duration, Instant};

use thiserror::Error;

use crate::api::{self, ApiFailure, FailureContext, Model, TrainingRequest};
use crate::config::MAX_TRAINING_TIMEOUT_SECS;

use super::RequestIds;
use super::configuration::ConfigurationBuilder;
use super::validation::ValidationError;

#[derive(Clone, Debug, PartialEq)]
pub enum TrainingState {
    Idle,
    Submitting { request_id: u64, deadline: Instant },
    Succeeded(Model),
    Failed(String),
    TimedOut,
}

#[derive(Debug, Error, PartialEq)]
pub enum TrainingError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("A training request is already in progress")]
    AlreadySubmitting,
    #[error("Training deadline is out of range")]
    DeadlineOutOfRange,
}

/// A submission accepted by the orchestrator; the caller performs the remote call.
#[derive(Debug)]
pub(crate) struct TrainingTicket {
    pub(crate) request_id: u64,
    pub(crate) request: TrainingRequest,
}

#[derive(Debug)]
pub struct TrainingOrchestrator {
    state: TrainingState,
    timeout: Duration,
    ids: RequestIds,
}

impl TrainingOrchestrator {
    /// Timeouts above [`MAX_TRAINING_TIMEOUT_SECS`] are capped.
    pub fn new(timeout: Duration) -> Self {
        Self {
            state: TrainingState::Idle,
            timeout: timeout.min(Duration::from_secs(MAX_TRAINING_TIMEOUT_SECS)),
            ids: RequestIds::default(),
        }
    }

    pub fn state(&self) -> &TrainingState {
        &self.state
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self.state, TrainingState::Submitting { .. })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Validate the builder and move to `Submitting` with a deadline of `now + timeout`.
    ///
    /// No ticket is issued on validation failure, so no remote call may be made.
    pub(crate) fn submit(
        &mut self,
        builder: &ConfigurationBuilder,
        now: Instant,
    ) -> Result<TrainingTicket, TrainingError> {
        if self.is_submitting() {
            return Err(TrainingError::AlreadySubmitting);
        }
        let request = builder.build_request()?;
        let deadline = now
            .checked_add(self.timeout)
            .ok_or(TrainingError::DeadlineOutOfRange)?;
        let request_id = self.ids.next();
        self.state = TrainingState::Submitting {
            request_id,
            deadline,
        };
        tracing::info!(
            request_id,
            model = request.model_name(),
            dataset = request.dataset_id(),
            "Training submitted"
        );
        Ok(TrainingTicket {
            request_id,
            request,
        })
    }

    /// Apply the remote outcome, which settled at `finished_at`.
    ///
    /// Returns `true` when the outcome replaced the `Submitting` state. A result for an
    /// unknown request, or one settling at or after the deadline, is discarded.
    pub(crate) fn apply_result(
        &mut self,
        request_id: u64,
        finished_at: Instant,
        result: Result<Model, ApiFailure>,
    ) -> bool {
        let deadline = match self.state {
            TrainingState::Submitting {
                request_id: current,
                deadline,
            } if current == request_id => deadline,
            _ => {
                tracing::debug!(request_id, "Discarding late training result");
                return false;
            }
        };
        if finished_at >= deadline {
            tracing::warn!(request_id, "Training result arrived after the deadline");
            self.state = TrainingState::TimedOut;
            return true;
        }
        self.state = match result {
            Ok(model) => {
                tracing::info!(request_id, model_id = model.id, "Training succeeded");
                TrainingState::Succeeded(model)
            }
            Err(failure) if failure.is_session() => TrainingState::Idle,
            Err(failure) => {
                tracing::warn!(request_id, "Training failed: {failure}");
                TrainingState::Failed(api::resolve(&failure, FailureContext::Training))
            }
        };
        true
    }

    /// Flip to `TimedOut` once `now` reaches the deadline. Returns `true` on the transition.
    pub(crate) fn check_deadline(&mut self, now: Instant) -> bool {
        match self.state {
            TrainingState::Submitting {
                request_id,
                deadline,
            } if now >= deadline => {
                tracing::warn!(request_id, "Training timed out");
                self.state = TrainingState::TimedOut;
                true
            }
            _ => false,
        }
    }

    pub fn timeout_message(&self) -> String {
        format!(
            "Training request timed out after {}. Please try again.",
            describe_duration(self.timeout)
        )
    }

    /// Return to `Idle`; an in-flight result becomes stale.
    pub fn reset(&mut self) {
        self.state = TrainingState::Idle;
    }
}

fn describe_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    match secs {
        60 => "1 minute".to_string(),
        s if s > 0 && s % 60 == 0 => format!("{} minutes", s / 60),
        1 => "1 second".to_string(),
        s if s > 0 => format!("{s} seconds"),
        _ => format!("{} ms", duration.as_millis()),
    }
}
