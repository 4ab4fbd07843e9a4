//! Target/feature selection for a pending training request.
//!
//! Every mutation is a single `&mut self` transition, so `target ∉ features` holds
//! after each call returns; there is no observable state where it does not.

use crate::api::{self, ApiFailure, Dataset, DatasetId, FailureContext, ModelType, TrainingRequest};

use super::RequestIds;
use super::validation::{LookupError, ValidationError};

#[derive(Debug, Default)]
pub struct ConfigurationBuilder {
    selected_dataset: Option<DatasetId>,
    universe: Vec<String>,
    model_name: String,
    model_type: ModelType,
    target: Option<String>,
    features: Vec<String>,
    ids: RequestIds,
    pending_detail: Option<u64>,
    last_error: Option<LookupError>,
}

impl ConfigurationBuilder {
    pub fn selected_dataset(&self) -> Option<DatasetId> {
        self.selected_dataset
    }

    /// Headers of the selected dataset; empty until its detail has loaded.
    pub fn universe(&self) -> &[String] {
        &self.universe
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn model_type(&self) -> ModelType {
        self.model_type
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Selected features in selection order.
    pub fn features(&self) -> &[String] {
        &self.features
    }

    /// Headers that may be toggled as features: everything except the target.
    pub fn available_features(&self) -> Vec<&str> {
        self.universe
            .iter()
            .map(String::as_str)
            .filter(|header| Some(*header) != self.target.as_deref())
            .collect()
    }

    pub fn is_loading_detail(&self) -> bool {
        self.pending_detail.is_some()
    }

    pub fn last_error(&self) -> Option<&LookupError> {
        self.last_error.as_ref()
    }

    /// Select a dataset and reset target/features; returns the detail request id.
    pub(crate) fn select_dataset(&mut self, id: DatasetId) -> u64 {
        let request_id = self.ids.next();
        self.selected_dataset = Some(id);
        self.universe.clear();
        self.target = None;
        self.features.clear();
        self.pending_detail = Some(request_id);
        self.last_error = None;
        request_id
    }

    /// Apply a dataset detail response.
    ///
    /// Returns `Ok(false)` for a response that no longer matches the selection.
    pub(crate) fn apply_dataset_detail(
        &mut self,
        request_id: u64,
        result: Result<Dataset, ApiFailure>,
    ) -> Result<bool, LookupError> {
        if self.pending_detail != Some(request_id) {
            tracing::debug!(request_id, "Discarding stale dataset detail");
            return Ok(false);
        }
        self.pending_detail = None;
        match result {
            Ok(dataset) => {
                if Some(dataset.id) != self.selected_dataset {
                    tracing::warn!(
                        expected = ?self.selected_dataset,
                        received = dataset.id,
                        "Dataset detail id mismatch"
                    );
                }
                self.universe = dedup_preserving_order(dataset.headers);
                Ok(true)
            }
            Err(failure) => {
                let err = LookupError {
                    message: api::resolve(&failure, FailureContext::DatasetDetails),
                };
                tracing::warn!(request_id, "Dataset detail failed: {failure}");
                self.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    pub fn set_model_name(&mut self, name: impl Into<String>) {
        self.model_name = name.into();
    }

    pub fn set_model_type(&mut self, model_type: ModelType) {
        self.model_type = model_type;
    }

    /// Set the target variable, dropping it from the feature selection in the same step.
    ///
    /// Names outside the dataset headers are ignored and `false` is returned.
    pub fn set_target(&mut self, name: &str) -> bool {
        if !self.universe.iter().any(|header| header == name) {
            return false;
        }
        self.features.retain(|feature| feature != name);
        self.target = Some(name.to_string());
        true
    }

    /// Add or remove a feature. The target and unknown names are rejected.
    pub fn toggle_feature(&mut self, name: &str) -> bool {
        if self.target.as_deref() == Some(name) || !self.universe.iter().any(|h| h == name) {
            return false;
        }
        if let Some(index) = self.features.iter().position(|feature| feature == name) {
            self.features.remove(index);
        } else {
            self.features.push(name.to_string());
        }
        true
    }

    /// Validate the configuration into a submittable request.
    pub fn build_request(&self) -> Result<TrainingRequest, ValidationError> {
        let target = self.target.as_deref().filter(|target| !target.is_empty());
        let features: Vec<String> = self
            .features
            .iter()
            .filter(|feature| Some(feature.as_str()) != target)
            .cloned()
            .collect();
        let model_name = self.model_name.trim();

        let mut missing = Vec::new();
        if self.selected_dataset.is_none() {
            missing.push("dataset".to_string());
        }
        if model_name.is_empty() {
            missing.push("model name".to_string());
        }
        if target.is_none() {
            missing.push("target variable".to_string());
        }
        if features.is_empty() {
            missing.push("features".to_string());
        }
        if let Some(err) = ValidationError::from_missing(missing) {
            return Err(err);
        }

        match (self.selected_dataset, target) {
            (Some(dataset_id), Some(target)) => Ok(TrainingRequest::new(
                dataset_id,
                model_name.to_string(),
                self.model_type,
                target.to_string(),
                features,
            )),
            _ => Err(ValidationError::MissingFields(vec!["dataset".to_string()])),
        }
    }

    /// Discard the per-model inputs after a successful training run; keeps the dataset.
    pub(crate) fn clear_after_training(&mut self) {
        self.model_name.clear();
        self.target = None;
        self.features.clear();
    }

    /// Drop the whole in-progress configuration, e.g. when leaving the training flow.
    pub fn reset(&mut self) {
        let ids = std::mem::take(&mut self.ids);
        *self = Self {
            ids,
            ..Self::default()
        };
    }
}

fn dedup_preserving_order(headers: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    headers
        .into_iter()
        .filter(|header| seen.insert(header.clone()))
        .collect()
}
