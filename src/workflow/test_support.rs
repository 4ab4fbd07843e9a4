use std::collections::{HashMap, HashSet};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};

use crate::api::{
    ApiFailure, AuthResponse, Dataset, DatasetId, Explanation, InputData, LoginRequest,
    MemorySession, MlBackend, Model, ModelId, ModelType, PredictionResult, RegisterRequest,
    Session, TrainingRequest,
};
use crate::config::ClientConfig;

use super::WorkbenchController;

pub(super) const WAIT: Duration = Duration::from_secs(5);

/// Scripted backend. Unscripted calls succeed with small canned payloads.
#[derive(Default)]
pub(super) struct FakeBackend {
    failures: Mutex<HashMap<&'static str, ApiFailure>>,
    gates: Mutex<HashMap<&'static str, Receiver<()>>>,
    panics: Mutex<HashSet<&'static str>>,
    calls: Mutex<Vec<String>>,
    trained: Mutex<Vec<TrainingRequest>>,
    predicted_inputs: Mutex<Vec<InputData>>,
}

impl FakeBackend {
    pub(super) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every later call to `call` fail with `failure`.
    pub(super) fn fail(&self, call: &'static str, failure: ApiFailure) {
        self.failures.lock().unwrap().insert(call, failure);
    }

    pub(super) fn succeed(&self, call: &'static str) {
        self.failures.lock().unwrap().remove(call);
    }

    /// Make every later call to `call` panic on the worker thread.
    pub(super) fn panic_on(&self, call: &'static str) {
        self.panics.lock().unwrap().insert(call);
    }

    /// Block the next `call` until the returned sender fires (or is dropped).
    pub(super) fn gate(&self, call: &'static str) -> Sender<()> {
        let (tx, rx) = mpsc::channel();
        self.gates.lock().unwrap().insert(call, rx);
        tx
    }

    pub(super) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(super) fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == call).count()
    }

    pub(super) fn trained(&self) -> Vec<TrainingRequest> {
        self.trained.lock().unwrap().clone()
    }

    pub(super) fn predicted_inputs(&self) -> Vec<InputData> {
        self.predicted_inputs.lock().unwrap().clone()
    }

    fn enter(&self, call: &'static str) -> Result<(), ApiFailure> {
        self.calls.lock().unwrap().push(call.to_string());
        let gate = self.gates.lock().unwrap().remove(call);
        if let Some(gate) = gate {
            let _ = gate.recv();
        }
        let panics = self.panics.lock().unwrap().contains(call);
        if panics {
            panic!("backend exploded during {call}");
        }
        match self.failures.lock().unwrap().get(call) {
            Some(failure) => Err(failure.clone()),
            None => Ok(()),
        }
    }
}

pub(super) fn dataset(id: DatasetId) -> Dataset {
    Dataset {
        id,
        file_name: format!("dataset-{id}.csv"),
        upload_date: Some("2024-05-01T10:00:00".to_string()),
        row_count: Some(100),
        headers: vec!["age".into(), "income".into(), "approved".into()],
    }
}

pub(super) fn model(id: ModelId) -> Model {
    Model {
        id,
        model_name: format!("model-{id}"),
        model_type: ModelType::Classification,
        target_variable: "approved".into(),
        feature_names: vec!["age".into(), "income".into()],
        accuracy: Some(0.9),
        training_date: None,
    }
}

impl MlBackend for FakeBackend {
    fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiFailure> {
        self.enter("login")?;
        Ok(AuthResponse {
            access_token: format!("token-for-{}", request.username),
            user_id: Some(1),
            username: Some(request.username.clone()),
        })
    }

    fn register(&self, _request: &RegisterRequest) -> Result<(), ApiFailure> {
        self.enter("register")
    }

    fn list_datasets(&self) -> Result<Value, ApiFailure> {
        self.enter("list_datasets")?;
        Ok(json!([
            { "id": 1, "fileName": "dataset-1.csv", "headers": ["age", "income", "approved"] }
        ]))
    }

    fn get_dataset(&self, id: DatasetId) -> Result<Dataset, ApiFailure> {
        self.enter("get_dataset")?;
        Ok(dataset(id))
    }

    fn upload_dataset(&self, _file_name: &str, _contents: &[u8]) -> Result<(), ApiFailure> {
        self.enter("upload_dataset")
    }

    fn delete_dataset(&self, _id: DatasetId) -> Result<(), ApiFailure> {
        self.enter("delete_dataset")
    }

    fn list_models(&self) -> Result<Value, ApiFailure> {
        self.enter("list_models")?;
        Ok(json!([{
            "id": 7,
            "modelName": "model-7",
            "modelType": "REGRESSION",
            "targetVariable": "income",
            "featureNames": ["age"]
        }]))
    }

    fn get_model(&self, id: ModelId) -> Result<Model, ApiFailure> {
        self.enter("get_model")?;
        Ok(model(id))
    }

    fn train_model(&self, request: &TrainingRequest) -> Result<Model, ApiFailure> {
        self.trained.lock().unwrap().push(request.clone());
        self.enter("train_model")?;
        Ok(model(42))
    }

    fn predict(&self, _id: ModelId, input: &InputData) -> Result<PredictionResult, ApiFailure> {
        self.predicted_inputs.lock().unwrap().push(input.clone());
        self.enter("predict")?;
        Ok(PredictionResult {
            prediction: "1".into(),
            confidence: Some(0.75),
            probabilities: None,
        })
    }

    fn explain(&self, _id: ModelId, input: &InputData) -> Result<Explanation, ApiFailure> {
        self.enter("explain")?;
        Ok(Explanation {
            explanation_text: "Age mattered most".into(),
            feature_contributions: Vec::new(),
            input_data: input.clone(),
        })
    }

    fn delete_model(&self, _id: ModelId) -> Result<(), ApiFailure> {
        self.enter("delete_model")
    }
}

pub(super) fn controller_with(
    backend: &Arc<FakeBackend>,
    config: ClientConfig,
) -> (WorkbenchController, Arc<MemorySession>) {
    let session = Arc::new(MemorySession::new(Some("seed-token".to_string())));
    let controller = WorkbenchController::new(
        Arc::clone(backend) as Arc<dyn MlBackend>,
        Arc::clone(&session) as Arc<dyn Session>,
        &config,
    );
    (controller, session)
}

pub(super) fn controller(backend: &Arc<FakeBackend>) -> (WorkbenchController, Arc<MemorySession>) {
    controller_with(backend, ClientConfig::default())
}

/// Select dataset 1 and fill in a valid configuration.
pub(super) fn configure(controller: &mut WorkbenchController) {
    controller.select_dataset(1);
    assert!(controller.wait_until_idle(WAIT));
    let builder = controller.configuration_mut();
    builder.set_model_name("loan model");
    builder.set_target("approved");
    builder.toggle_feature("age");
}
