//! Model selection, per-feature input and the joined predict + explain run.

use crate::api::{
    self, ApiFailure, Explanation, FailureContext, InputData, Model, ModelId, PredictionResult,
};

use super::RequestIds;
use super::validation::{LookupError, ValidationError};

#[derive(Clone, Debug, PartialEq)]
pub struct InferenceResult {
    pub prediction: PredictionResult,
    pub explanation: Explanation,
}

#[derive(Clone, Debug, PartialEq)]
pub enum InferenceState {
    Idle,
    Running { run_id: u64 },
    Succeeded(InferenceResult),
    Failed(String),
}

#[derive(Debug)]
pub(crate) struct InferenceTicket {
    pub(crate) run_id: u64,
    pub(crate) model_id: ModelId,
    pub(crate) input: InputData,
}

#[derive(Debug)]
pub struct InferenceOrchestrator {
    selected_model: Option<ModelId>,
    model: Option<Model>,
    input: InputData,
    state: InferenceState,
    pending_detail: Option<u64>,
    detail_error: Option<LookupError>,
    ids: RequestIds,
}

impl Default for InferenceOrchestrator {
    fn default() -> Self {
        Self {
            selected_model: None,
            model: None,
            input: InputData::new(),
            state: InferenceState::Idle,
            pending_detail: None,
            detail_error: None,
            ids: RequestIds::default(),
        }
    }
}

impl InferenceOrchestrator {
    pub fn selected_model(&self) -> Option<ModelId> {
        self.selected_model
    }

    /// Detail of the selected model, once loaded.
    pub fn model(&self) -> Option<&Model> {
        self.model.as_ref()
    }

    pub fn input(&self) -> &InputData {
        &self.input
    }

    pub fn state(&self) -> &InferenceState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, InferenceState::Running { .. })
    }

    pub fn is_loading_detail(&self) -> bool {
        self.pending_detail.is_some()
    }

    pub fn detail_error(&self) -> Option<&LookupError> {
        self.detail_error.as_ref()
    }

    /// Switch models; clears inputs and any previous outcome.
    pub(crate) fn select_model(&mut self, id: ModelId) -> u64 {
        let request_id = self.ids.next();
        self.selected_model = Some(id);
        self.model = None;
        self.input.clear();
        self.state = InferenceState::Idle;
        self.pending_detail = Some(request_id);
        self.detail_error = None;
        request_id
    }

    pub(crate) fn apply_model_detail(
        &mut self,
        request_id: u64,
        result: Result<Model, ApiFailure>,
    ) -> Result<bool, LookupError> {
        if self.pending_detail != Some(request_id) {
            tracing::debug!(request_id, "Discarding stale model detail");
            return Ok(false);
        }
        self.pending_detail = None;
        match result {
            Ok(model) => {
                self.input = model
                    .feature_names
                    .iter()
                    .map(|feature| (feature.clone(), String::new()))
                    .collect();
                self.model = Some(model);
                Ok(true)
            }
            Err(failure) => {
                tracing::warn!(request_id, "Model detail failed: {failure}");
                let err = LookupError {
                    message: api::resolve(&failure, FailureContext::ModelDetails),
                };
                self.detail_error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Record a value for one of the model's features. Unknown features are ignored.
    pub fn set_input(&mut self, feature: &str, value: impl Into<String>) -> bool {
        match self.input.get_mut(feature) {
            Some(slot) => {
                *slot = value.into();
                true
            }
            None => false,
        }
    }

    /// Validate inputs and start a run. A newer run supersedes any in flight.
    pub(crate) fn run(&mut self) -> Result<InferenceTicket, ValidationError> {
        let Some(model) = &self.model else {
            return Err(ValidationError::MissingFields(vec!["model".to_string()]));
        };
        let missing: Vec<String> = model
            .feature_names
            .iter()
            .filter(|feature| {
                self.input
                    .get(feature.as_str())
                    .is_none_or(|value| value.trim().is_empty())
            })
            .cloned()
            .collect();
        if let Some(err) = ValidationError::from_missing(missing) {
            return Err(err);
        }

        let input: InputData = model
            .feature_names
            .iter()
            .filter_map(|feature| {
                self.input
                    .get(feature)
                    .map(|value| (feature.clone(), value.trim().to_string()))
            })
            .collect();
        let run_id = self.ids.next();
        self.state = InferenceState::Running { run_id };
        Ok(InferenceTicket {
            run_id,
            model_id: model.id,
            input,
        })
    }

    /// Apply both halves of a run. Either failure fails the whole run.
    pub(crate) fn apply_run(
        &mut self,
        run_id: u64,
        prediction: Result<PredictionResult, ApiFailure>,
        explanation: Result<Explanation, ApiFailure>,
    ) -> bool {
        if self.state != (InferenceState::Running { run_id }) {
            tracing::debug!(run_id, "Discarding superseded inference run");
            return false;
        }
        self.state = match (prediction, explanation) {
            (Ok(prediction), Ok(explanation)) => InferenceState::Succeeded(InferenceResult {
                prediction,
                explanation,
            }),
            (Err(failure), _) | (_, Err(failure)) => {
                tracing::warn!(run_id, "Inference failed: {failure}");
                InferenceState::Failed(api::resolve(&failure, FailureContext::Prediction))
            }
        };
        true
    }

    pub fn reset(&mut self) {
        let ids = std::mem::take(&mut self.ids);
        *self = Self {
            ids,
            ..Self::default()
        };
    }
}
