//! Reduce a heterogeneous failure payload to one user-facing message.

use serde_json::Value;

use super::ApiFailure;

/// Candidate locations, highest priority first.
const MESSAGE_POINTERS: [&str; 5] = [
    "/response/data/message",
    "/response/data/data/userMessage",
    "/response/data/data/message",
    "/response/data/error",
    "/message",
];

/// Which operation failed; selects the fallback message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureContext {
    Training,
    Prediction,
    DatasetDetails,
    ModelDetails,
    DeleteDataset,
    DeleteModel,
    Upload,
    Refresh,
    Login,
    Register,
}

impl FailureContext {
    pub fn fallback(self) -> &'static str {
        match self {
            Self::Training => "Training failed",
            Self::Prediction => "Prediction failed",
            Self::DatasetDetails => "Failed to load dataset details",
            Self::ModelDetails => "Failed to load model details",
            Self::DeleteDataset => "Delete failed",
            Self::DeleteModel => "Failed to delete model",
            Self::Upload => "Upload failed",
            Self::Refresh => "Failed to load data",
            Self::Login => "Login failed",
            Self::Register => "Registration failed",
        }
    }
}

/// Resolve an [`ApiFailure`] to the message shown for `context`.
pub fn resolve(failure: &ApiFailure, context: FailureContext) -> String {
    resolve_payload(&failure.to_payload(), context.fallback())
}

/// Walk the priority chain over an arbitrary payload, falling back to `fallback`.
pub fn resolve_payload(payload: &Value, fallback: &str) -> String {
    MESSAGE_POINTERS
        .iter()
        .filter_map(|pointer| payload.pointer(pointer))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|candidate| !candidate.is_empty())
        .unwrap_or(fallback)
        .to_string()
}
