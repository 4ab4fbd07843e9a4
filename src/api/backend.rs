use serde_json::Value;

use super::types::{
    AuthResponse, Dataset, DatasetId, Explanation, InputData, LoginRequest, Model, ModelId,
    PredictionResult, RegisterRequest, TrainingRequest,
};
use super::ApiFailure;

/// Remote operations the workflow controller depends on.
///
/// Calls block; the controller runs them on worker threads. List calls return the raw
/// payload so the resource directory can decide how to coerce it.
pub trait MlBackend: Send + Sync {
    fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiFailure>;
    fn register(&self, request: &RegisterRequest) -> Result<(), ApiFailure>;

    fn list_datasets(&self) -> Result<Value, ApiFailure>;
    fn get_dataset(&self, id: DatasetId) -> Result<Dataset, ApiFailure>;
    fn upload_dataset(&self, file_name: &str, contents: &[u8]) -> Result<(), ApiFailure>;
    fn delete_dataset(&self, id: DatasetId) -> Result<(), ApiFailure>;

    fn list_models(&self) -> Result<Value, ApiFailure>;
    fn get_model(&self, id: ModelId) -> Result<Model, ApiFailure>;
    fn train_model(&self, request: &TrainingRequest) -> Result<Model, ApiFailure>;
    fn predict(&self, id: ModelId, input: &InputData) -> Result<PredictionResult, ApiFailure>;
    fn explain(&self, id: ModelId, input: &InputData) -> Result<Explanation, ApiFailure>;
    fn delete_model(&self, id: ModelId) -> Result<(), ApiFailure>;
}
