//! Dataset and model listings, refreshed together.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::api::{self, ApiFailure, Dataset, DatasetId, FailureContext, Model, ModelId};

use super::RequestIds;

#[derive(Debug, Default)]
pub struct ResourceDirectory {
    datasets: Vec<Dataset>,
    models: Vec<Model>,
    last_error: Option<String>,
    pending: Option<u64>,
    ids: RequestIds,
}

impl ResourceDirectory {
    pub fn datasets(&self) -> &[Dataset] {
        &self.datasets
    }

    pub fn models(&self) -> &[Model] {
        &self.models
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn dataset(&self, id: DatasetId) -> Option<&Dataset> {
        self.datasets.iter().find(|dataset| dataset.id == id)
    }

    pub fn model(&self, id: ModelId) -> Option<&Model> {
        self.models.iter().find(|model| model.id == id)
    }

    /// Start a refresh; any earlier refresh still in flight becomes stale.
    pub(crate) fn begin_refresh(&mut self) -> u64 {
        let request_id = self.ids.next();
        self.pending = Some(request_id);
        request_id
    }

    /// Apply both settled listings at once.
    ///
    /// Either failure empties both lists and records one aggregated message.
    pub(crate) fn apply_refresh(
        &mut self,
        request_id: u64,
        datasets: Result<Value, ApiFailure>,
        models: Result<Value, ApiFailure>,
    ) -> bool {
        if self.pending != Some(request_id) {
            tracing::debug!(request_id, "Discarding stale directory refresh");
            return false;
        }
        self.pending = None;
        match (datasets, models) {
            (Ok(datasets), Ok(models)) => {
                self.datasets = coerce_list(datasets, "datasets");
                self.models = coerce_list(models, "models");
                self.last_error = None;
                tracing::info!(
                    datasets = self.datasets.len(),
                    models = self.models.len(),
                    "Directory refreshed"
                );
            }
            (datasets, models) => {
                let fallback = FailureContext::Refresh.fallback();
                let mut messages: Vec<String> = Vec::new();
                for failure in [datasets.err(), models.err()].into_iter().flatten() {
                    // Without a message in the body, keep the status text of the failure.
                    let message = match api::resolve(&failure, FailureContext::Refresh) {
                        resolved if resolved == fallback => failure.to_string(),
                        resolved => resolved,
                    };
                    if !messages.contains(&message) {
                        messages.push(message);
                    }
                }
                let message = format!("{fallback}: {}", messages.join("; "));
                tracing::warn!(request_id, "{message}");
                self.datasets.clear();
                self.models.clear();
                self.last_error = Some(message);
            }
        }
        true
    }

    /// Forget everything, e.g. after the session ended.
    pub(crate) fn clear(&mut self) {
        self.datasets.clear();
        self.models.clear();
        self.last_error = None;
        self.pending = None;
    }
}

/// Treat the payload as a list of `T`, skipping entries that do not decode.
///
/// Anything other than a JSON array yields an empty list.
fn coerce_list<T: DeserializeOwned>(payload: Value, what: &str) -> Vec<T> {
    let Value::Array(items) = payload else {
        if !payload.is_null() {
            tracing::warn!(what, "Listing payload is not an array");
        }
        return Vec::new();
    };
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(what, "Skipping malformed listing entry: {err}");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn datasets_payload() -> Value {
        json!([
            { "id": 1, "fileName": "loans.csv", "headers": ["age", "approved"], "rowCount": 10 },
            { "id": 2, "fileName": "houses.csv", "headers": null }
        ])
    }

    fn models_payload() -> Value {
        json!([{
            "id": 7,
            "modelName": "loan model",
            "modelType": "CLASSIFICATION",
            "targetVariable": "approved",
            "featureNames": ["age"],
            "accuracy": 0.9
        }])
    }

    #[test]
    fn successful_refresh_replaces_both_lists() {
        let mut directory = ResourceDirectory::default();
        let request_id = directory.begin_refresh();
        assert!(directory.is_loading());

        assert!(directory.apply_refresh(request_id, Ok(datasets_payload()), Ok(models_payload())));

        assert_eq!(directory.datasets().len(), 2);
        assert!(directory.dataset(2).unwrap().headers.is_empty());
        assert_eq!(directory.model(7).unwrap().model_name, "loan model");
        assert_eq!(directory.last_error(), None);
        assert!(!directory.is_loading());
    }

    #[test]
    fn one_failure_empties_both_lists() {
        let mut directory = ResourceDirectory::default();
        let first = directory.begin_refresh();
        directory.apply_refresh(first, Ok(datasets_payload()), Ok(models_payload()));

        let second = directory.begin_refresh();
        directory.apply_refresh(
            second,
            Ok(datasets_payload()),
            Err(ApiFailure::server(500, Some(json!({ "message": "db down" })))),
        );

        assert!(directory.datasets().is_empty());
        assert!(directory.models().is_empty());
        assert_eq!(directory.last_error(), Some("Failed to load data: db down"));
    }

    #[test]
    fn both_failures_aggregate_distinct_messages() {
        let mut directory = ResourceDirectory::default();
        let request_id = directory.begin_refresh();
        directory.apply_refresh(
            request_id,
            Err(ApiFailure::transport("Network Error: connection refused")),
            Err(ApiFailure::transport("Network Error: connection refused")),
        );
        assert_eq!(
            directory.last_error(),
            Some("Failed to load data: Network Error: connection refused")
        );
    }

    #[test]
    fn unreadable_failure_keeps_status_text() {
        let mut directory = ResourceDirectory::default();
        let request_id = directory.begin_refresh();
        directory.apply_refresh(
            request_id,
            Err(ApiFailure::server(502, Some(json!("<html>bad gateway</html>")))),
            Ok(json!([])),
        );
        assert_eq!(
            directory.last_error(),
            Some("Failed to load data: Request failed with status code 502")
        );
    }

    #[test]
    fn non_array_payloads_become_empty_lists() {
        let mut directory = ResourceDirectory::default();
        let request_id = directory.begin_refresh();
        directory.apply_refresh(request_id, Ok(json!({ "oops": true })), Ok(Value::Null));
        assert!(directory.datasets().is_empty());
        assert!(directory.models().is_empty());
        assert_eq!(directory.last_error(), None);
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let mut directory = ResourceDirectory::default();
        let request_id = directory.begin_refresh();
        directory.apply_refresh(
            request_id,
            Ok(json!([{ "fileName": "no-id.csv" }, { "id": 4, "fileName": "ok.csv" }])),
            Ok(json!([])),
        );
        assert_eq!(directory.datasets().len(), 1);
        assert_eq!(directory.datasets()[0].id, 4);
    }

    #[test]
    fn stale_refresh_is_ignored() {
        let mut directory = ResourceDirectory::default();
        let old = directory.begin_refresh();
        let current = directory.begin_refresh();
        assert!(!directory.apply_refresh(old, Ok(datasets_payload()), Ok(models_payload())));
        assert!(directory.datasets().is_empty());
        assert!(directory.is_loading());
        assert!(directory.apply_refresh(current, Ok(json!([])), Ok(json!([]))));
    }
}
