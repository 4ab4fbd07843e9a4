//! Client for the ML/auth backend: wire types, failures, message resolution and the
//! HTTP transport.

mod backend;
mod failure;
mod http;
mod resolve;
mod session;
mod types;

pub use backend::MlBackend;
pub use failure::ApiFailure;
pub use http::HttpBackend;
pub use resolve::{FailureContext, resolve, resolve_payload};
pub use session::{LogNavigator, MemorySession, Navigator, Session};
pub use types::{
    AuthResponse, Dataset, DatasetId, Direction, Explanation, FeatureContribution, InputData,
    LoginRequest, Model, ModelId, ModelType, PredictionResult, RegisterRequest, TrainingRequest,
};
