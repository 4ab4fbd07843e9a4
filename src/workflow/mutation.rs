//! Two-step confirm gate in front of destructive operations.

use crate::api::{DatasetId, FailureContext, ModelId};

use super::RequestIds;

/// Something the user asked to delete.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeleteTarget {
    Dataset { id: DatasetId, name: String },
    Model { id: ModelId, name: String },
}

impl DeleteTarget {
    pub fn name(&self) -> &str {
        match self {
            Self::Dataset { name, .. } | Self::Model { name, .. } => name,
        }
    }

    pub fn prompt(&self) -> String {
        format!(
            "Are you sure you want to delete \"{}\"? This action cannot be undone.",
            self.name()
        )
    }

    pub(crate) fn failure_context(&self) -> FailureContext {
        match self {
            Self::Dataset { .. } => FailureContext::DeleteDataset,
            Self::Model { .. } => FailureContext::DeleteModel,
        }
    }

    pub(crate) fn success_message(&self) -> &'static str {
        match self {
            Self::Dataset { .. } => "Dataset deleted successfully!",
            Self::Model { .. } => "Model deleted successfully!",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationState<T> {
    Idle,
    ConfirmPending(T),
    Executing { request_id: u64, target: T },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MutationOutcome<T> {
    Completed(T),
    Failed { target: T, message: String },
}

#[derive(Debug)]
pub(crate) struct MutationTicket<T> {
    pub(crate) request_id: u64,
    pub(crate) target: T,
}

/// Nothing runs until [`MutationConfirmer::confirm`] is called on a pending target.
#[derive(Debug)]
pub struct MutationConfirmer<T> {
    state: MutationState<T>,
    last_error: Option<String>,
    ids: RequestIds,
}

impl<T> Default for MutationConfirmer<T> {
    fn default() -> Self {
        Self {
            state: MutationState::Idle,
            last_error: None,
            ids: RequestIds::default(),
        }
    }
}

impl<T: Clone> MutationConfirmer<T> {
    pub fn state(&self) -> &MutationState<T> {
        &self.state
    }

    pub fn pending(&self) -> Option<&T> {
        match &self.state {
            MutationState::ConfirmPending(target) => Some(target),
            _ => None,
        }
    }

    pub fn executing(&self) -> Option<&T> {
        match &self.state {
            MutationState::Executing { target, .. } => Some(target),
            _ => None,
        }
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Ask for confirmation. Replaces an earlier unconfirmed target; ignored while executing.
    pub fn request(&mut self, target: T) -> bool {
        if matches!(self.state, MutationState::Executing { .. }) {
            return false;
        }
        self.state = MutationState::ConfirmPending(target);
        self.last_error = None;
        true
    }

    pub fn cancel(&mut self) -> bool {
        if matches!(self.state, MutationState::ConfirmPending(_)) {
            self.state = MutationState::Idle;
            return true;
        }
        false
    }

    pub(crate) fn confirm(&mut self) -> Option<MutationTicket<T>> {
        let MutationState::ConfirmPending(target) = &self.state else {
            return None;
        };
        let target = target.clone();
        let request_id = self.ids.next();
        self.state = MutationState::Executing {
            request_id,
            target: target.clone(),
        };
        Some(MutationTicket { request_id, target })
    }

    /// Settle an execution; the gate returns to `Idle` whatever the outcome.
    pub(crate) fn apply_result(
        &mut self,
        request_id: u64,
        result: Result<(), String>,
    ) -> Option<MutationOutcome<T>> {
        let target = match &self.state {
            MutationState::Executing {
                request_id: current,
                target,
            } if *current == request_id => target.clone(),
            _ => return None,
        };
        self.state = MutationState::Idle;
        Some(match result {
            Ok(()) => MutationOutcome::Completed(target),
            Err(message) => {
                self.last_error = Some(message.clone());
                MutationOutcome::Failed { target, message }
            }
        })
    }

    pub fn reset(&mut self) {
        self.state = MutationState::Idle;
        self.last_error = None;
    }
}
