//! ureq-backed implementation of [`MlBackend`].
//!
//! The session policy lives here and nowhere else: a 401/403 from any endpoint other
//! than login/register clears the session, asks the navigator to re-authenticate, and
//! surfaces as [`ApiFailure::Session`].

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use super::backend::MlBackend;
use super::session::{Navigator, Session};
use super::types::{
    AuthResponse, Dataset, DatasetId, Explanation, InputData, LoginRequest, Model, ModelId,
    PredictionResult, RegisterRequest, TrainingRequest, unwrap_envelope,
};
use super::ApiFailure;
use crate::config::ClientConfig;
use crate::http_client::{self, MultipartFile};

const AUTH_ENDPOINTS: [&str; 2] = ["auth/login", "auth/register"];

enum Body {
    Empty,
    Json(Value),
    Multipart(MultipartFile),
}

pub struct HttpBackend {
    agent: ureq::Agent,
    base: Url,
    max_response_bytes: usize,
    session: Arc<dyn Session>,
    navigator: Arc<dyn Navigator>,
}

impl HttpBackend {
    pub fn new(
        config: &ClientConfig,
        session: Arc<dyn Session>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, url::ParseError> {
        let base = Url::parse(&format!("{}/", config.api_base_url.trim_end_matches('/')))?;
        Ok(Self {
            agent: http_client::agent(config),
            base,
            max_response_bytes: config.max_response_bytes,
            session,
            navigator,
        })
    }

    fn get(&self, path: &str) -> Result<Value, ApiFailure> {
        self.execute("GET", path, Body::Empty)
    }

    fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<Value, ApiFailure> {
        let body = serde_json::to_value(body)
            .map_err(|err| ApiFailure::decode(format!("Invalid request body: {err}")))?;
        self.execute("POST", path, Body::Json(body))
    }

    fn delete(&self, path: &str) -> Result<Value, ApiFailure> {
        self.execute("DELETE", path, Body::Empty)
    }

    fn execute(&self, method: &str, path: &str, body: Body) -> Result<Value, ApiFailure> {
        let url = self
            .base
            .join(path)
            .map_err(|err| ApiFailure::transport(format!("Invalid URL for {path}: {err}")))?;
        let mut request = self
            .agent
            .request(method, url.as_str())
            .set("Accept", "application/json");
        if !is_auth_endpoint(path) {
            if let Some(token) = self.session.token() {
                request = request.set("Authorization", &format!("Bearer {}", token.trim()));
            }
        }
        tracing::debug!(method, %url, "Sending request");

        let result = match body {
            Body::Empty => request.call(),
            Body::Json(value) => request.send_json(value),
            Body::Multipart(part) => request
                .set("Content-Type", &part.content_type)
                .send_bytes(&part.body),
        };

        match result {
            Ok(response) => {
                let text = http_client::read_response_text(response, self.max_response_bytes)
                    .map_err(|err| ApiFailure::transport(err.to_string()))?;
                parse_success_body(&text)
            }
            Err(ureq::Error::Status(status, response)) => {
                let text =
                    http_client::read_response_text(response, self.max_response_bytes).ok();
                Err(self.status_failure(path, status, text))
            }
            Err(ureq::Error::Transport(err)) => {
                tracing::warn!(method, path, "Transport failure: {err}");
                Err(ApiFailure::transport(transport_message(&err)))
            }
        }
    }

    fn status_failure(&self, path: &str, status: u16, text: Option<String>) -> ApiFailure {
        if matches!(status, 401 | 403) && !is_auth_endpoint(path) {
            tracing::warn!(path, status, "Authentication rejected; ending session");
            self.session.clear();
            self.navigator.redirect_to_login();
            return ApiFailure::Session { status };
        }
        let body = text
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .map(|text| serde_json::from_str(&text).unwrap_or(Value::String(text)));
        tracing::debug!(path, status, "Request rejected");
        ApiFailure::server(status, body)
    }
}

impl MlBackend for HttpBackend {
    fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiFailure> {
        decode(self.post("auth/login", request)?)
    }

    fn register(&self, request: &RegisterRequest) -> Result<(), ApiFailure> {
        discard_body(self.post("auth/register", request))
    }

    fn list_datasets(&self) -> Result<Value, ApiFailure> {
        self.get("datasets")
    }

    fn get_dataset(&self, id: DatasetId) -> Result<Dataset, ApiFailure> {
        decode(unwrap_envelope(self.get(&format!("datasets/{id}"))?))
    }

    fn upload_dataset(&self, file_name: &str, contents: &[u8]) -> Result<(), ApiFailure> {
        let part = MultipartFile::new("file", file_name, "text/csv", contents);
        discard_body(self.execute("POST", "datasets/upload", Body::Multipart(part)))
    }

    fn delete_dataset(&self, id: DatasetId) -> Result<(), ApiFailure> {
        discard_body(self.delete(&format!("datasets/{id}")))
    }

    fn list_models(&self) -> Result<Value, ApiFailure> {
        self.get("models")
    }

    fn get_model(&self, id: ModelId) -> Result<Model, ApiFailure> {
        decode(unwrap_envelope(self.get(&format!("models/{id}"))?))
    }

    fn train_model(&self, request: &TrainingRequest) -> Result<Model, ApiFailure> {
        decode(unwrap_envelope(self.post("models/train", request)?))
    }

    fn predict(&self, id: ModelId, input: &InputData) -> Result<PredictionResult, ApiFailure> {
        decode(self.post(&format!("models/{id}/predict"), input)?)
    }

    fn explain(&self, id: ModelId, input: &InputData) -> Result<Explanation, ApiFailure> {
        decode(self.post(&format!("models/{id}/explain"), input)?)
    }

    fn delete_model(&self, id: ModelId) -> Result<(), ApiFailure> {
        discard_body(self.delete(&format!("models/{id}")))
    }
}

fn is_auth_endpoint(path: &str) -> bool {
    AUTH_ENDPOINTS
        .iter()
        .any(|endpoint| path.trim_start_matches('/').starts_with(endpoint))
}

fn parse_success_body(text: &str) -> Result<Value, ApiFailure> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(trimmed).map_err(|err| ApiFailure::decode(err.to_string()))
}

/// Status-only calls: a 2xx with an unparseable body still succeeded.
fn discard_body(result: Result<Value, ApiFailure>) -> Result<(), ApiFailure> {
    match result {
        Ok(_) | Err(ApiFailure::Decode { .. }) => Ok(()),
        Err(failure) => Err(failure),
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiFailure> {
    serde_json::from_value(value).map_err(|err| ApiFailure::decode(err.to_string()))
}

fn transport_message(err: &ureq::Transport) -> String {
    let text = err.to_string();
    if text.to_ascii_lowercase().contains("timed out") {
        "Request timed out".to_string()
    } else {
        format!("Network Error: {text}")
    }
}
