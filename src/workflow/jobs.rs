use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::thread;
use std::time::Instant;

use serde_json::Value;

use crate::api::{
    ApiFailure, AuthResponse, Dataset, DatasetId, Explanation, InputData, LoginRequest, MlBackend,
    Model, ModelId, PredictionResult, RegisterRequest, TrainingRequest,
};

use super::mutation::DeleteTarget;

pub(crate) enum JobMessage {
    DirectoryRefreshed(DirectoryRefreshResult),
    DatasetDetailLoaded(DetailResult<Dataset>),
    ModelDetailLoaded(DetailResult<Model>),
    TrainingFinished(TrainingResult),
    InferenceFinished(InferenceRunResult),
    DeleteFinished(DeleteResult),
    UploadFinished(UploadResult),
    LoginFinished(LoginResult),
    RegisterFinished(RegisterResult),
}

impl JobMessage {
    /// Whether any remote call behind this message was rejected with a session failure.
    pub(crate) fn session_failed(&self) -> bool {
        fn ended<T>(result: &Result<T, ApiFailure>) -> bool {
            matches!(result, Err(failure) if failure.is_session())
        }
        match self {
            Self::DirectoryRefreshed(message) => {
                ended(&message.datasets) || ended(&message.models)
            }
            Self::DatasetDetailLoaded(message) => ended(&message.result),
            Self::ModelDetailLoaded(message) => ended(&message.result),
            Self::TrainingFinished(message) => ended(&message.result),
            Self::InferenceFinished(message) => {
                ended(&message.prediction) || ended(&message.explanation)
            }
            Self::DeleteFinished(message) => ended(&message.result),
            Self::UploadFinished(message) => ended(&message.result),
            Self::LoginFinished(message) => ended(&message.result),
            Self::RegisterFinished(message) => ended(&message.result),
        }
    }
}

#[derive(Debug)]
pub(crate) struct DirectoryRefreshResult {
    pub(crate) request_id: u64,
    pub(crate) datasets: Result<Value, ApiFailure>,
    pub(crate) models: Result<Value, ApiFailure>,
}

#[derive(Debug)]
pub(crate) struct DetailResult<T> {
    pub(crate) request_id: u64,
    pub(crate) result: Result<T, ApiFailure>,
}

#[derive(Debug)]
pub(crate) struct TrainingResult {
    pub(crate) request_id: u64,
    pub(crate) finished_at: Instant,
    pub(crate) result: Result<Model, ApiFailure>,
}

#[derive(Debug)]
pub(crate) struct InferenceRunResult {
    pub(crate) run_id: u64,
    pub(crate) prediction: Result<PredictionResult, ApiFailure>,
    pub(crate) explanation: Result<Explanation, ApiFailure>,
}

#[derive(Debug)]
pub(crate) struct DeleteResult {
    pub(crate) request_id: u64,
    pub(crate) result: Result<(), ApiFailure>,
}

#[derive(Debug)]
pub(crate) struct UploadResult {
    pub(crate) request_id: u64,
    pub(crate) result: Result<(), ApiFailure>,
}

#[derive(Debug)]
pub(crate) struct LoginResult {
    pub(crate) request_id: u64,
    pub(crate) result: Result<AuthResponse, ApiFailure>,
}

#[derive(Debug)]
pub(crate) struct RegisterResult {
    pub(crate) request_id: u64,
    pub(crate) result: Result<(), ApiFailure>,
}

/// Worker threads for remote calls, reporting back over one channel.
pub(crate) struct ControllerJobs {
    backend: Arc<dyn MlBackend>,
    message_tx: Sender<JobMessage>,
    message_rx: Receiver<JobMessage>,
    in_flight: usize,
}

impl ControllerJobs {
    pub(crate) fn new(backend: Arc<dyn MlBackend>) -> Self {
        let (message_tx, message_rx) = std::sync::mpsc::channel::<JobMessage>();
        Self {
            backend,
            message_tx,
            message_rx,
            in_flight: 0,
        }
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub(crate) fn try_recv_message(&mut self) -> Result<JobMessage, TryRecvError> {
        let message = self.message_rx.try_recv()?;
        self.in_flight = self.in_flight.saturating_sub(1);
        Ok(message)
    }

    pub(crate) fn begin_refresh(&mut self, request_id: u64) {
        self.spawn(
            "directory-refresh",
            move |backend| {
                let (datasets, models) = thread::scope(|scope| {
                    let datasets = scope.spawn(|| backend.list_datasets());
                    let models = scope.spawn(|| backend.list_models());
                    (settle(datasets.join()), settle(models.join()))
                });
                JobMessage::DirectoryRefreshed(DirectoryRefreshResult {
                    request_id,
                    datasets,
                    models,
                })
            },
            move |failure| {
                JobMessage::DirectoryRefreshed(DirectoryRefreshResult {
                    request_id,
                    datasets: Err(failure.clone()),
                    models: Err(failure),
                })
            },
        );
    }

    pub(crate) fn begin_dataset_detail(&mut self, request_id: u64, id: DatasetId) {
        self.spawn(
            "dataset-detail",
            move |backend| {
                JobMessage::DatasetDetailLoaded(DetailResult {
                    request_id,
                    result: backend.get_dataset(id),
                })
            },
            move |failure| {
                JobMessage::DatasetDetailLoaded(DetailResult {
                    request_id,
                    result: Err(failure),
                })
            },
        );
    }

    pub(crate) fn begin_model_detail(&mut self, request_id: u64, id: ModelId) {
        self.spawn(
            "model-detail",
            move |backend| {
                JobMessage::ModelDetailLoaded(DetailResult {
                    request_id,
                    result: backend.get_model(id),
                })
            },
            move |failure| {
                JobMessage::ModelDetailLoaded(DetailResult {
                    request_id,
                    result: Err(failure),
                })
            },
        );
    }

    pub(crate) fn begin_training(&mut self, request_id: u64, request: TrainingRequest) {
        self.spawn(
            "training",
            move |backend| {
                let result = backend.train_model(&request);
                JobMessage::TrainingFinished(TrainingResult {
                    request_id,
                    finished_at: Instant::now(),
                    result,
                })
            },
            move |failure| {
                JobMessage::TrainingFinished(TrainingResult {
                    request_id,
                    finished_at: Instant::now(),
                    result: Err(failure),
                })
            },
        );
    }

    /// Predict and explain concurrently; one message once both have settled.
    pub(crate) fn begin_inference(&mut self, run_id: u64, model_id: ModelId, input: InputData) {
        self.spawn(
            "inference",
            move |backend| {
                let (prediction, explanation) = thread::scope(|scope| {
                    let prediction = scope.spawn(|| backend.predict(model_id, &input));
                    let explanation = scope.spawn(|| backend.explain(model_id, &input));
                    (settle(prediction.join()), settle(explanation.join()))
                });
                JobMessage::InferenceFinished(InferenceRunResult {
                    run_id,
                    prediction,
                    explanation,
                })
            },
            move |failure| {
                JobMessage::InferenceFinished(InferenceRunResult {
                    run_id,
                    prediction: Err(failure.clone()),
                    explanation: Err(failure),
                })
            },
        );
    }

    pub(crate) fn begin_delete(&mut self, request_id: u64, target: DeleteTarget) {
        self.spawn(
            "delete",
            move |backend| {
                let result = match target {
                    DeleteTarget::Dataset { id, .. } => backend.delete_dataset(id),
                    DeleteTarget::Model { id, .. } => backend.delete_model(id),
                };
                JobMessage::DeleteFinished(DeleteResult { request_id, result })
            },
            move |failure| {
                JobMessage::DeleteFinished(DeleteResult {
                    request_id,
                    result: Err(failure),
                })
            },
        );
    }

    pub(crate) fn begin_upload(&mut self, request_id: u64, file_name: String, contents: Vec<u8>) {
        self.spawn(
            "upload",
            move |backend| {
                JobMessage::UploadFinished(UploadResult {
                    request_id,
                    result: backend.upload_dataset(&file_name, &contents),
                })
            },
            move |failure| {
                JobMessage::UploadFinished(UploadResult {
                    request_id,
                    result: Err(failure),
                })
            },
        );
    }

    pub(crate) fn begin_login(&mut self, request_id: u64, request: LoginRequest) {
        self.spawn(
            "login",
            move |backend| {
                JobMessage::LoginFinished(LoginResult {
                    request_id,
                    result: backend.login(&request),
                })
            },
            move |failure| {
                JobMessage::LoginFinished(LoginResult {
                    request_id,
                    result: Err(failure),
                })
            },
        );
    }

    pub(crate) fn begin_register(&mut self, request_id: u64, request: RegisterRequest) {
        self.spawn(
            "register",
            move |backend| {
                JobMessage::RegisterFinished(RegisterResult {
                    request_id,
                    result: backend.register(&request),
                })
            },
            move |failure| {
                JobMessage::RegisterFinished(RegisterResult {
                    request_id,
                    result: Err(failure),
                })
            },
        );
    }

    /// Run `task` on a named worker thread and forward its message.
    ///
    /// Every accepted job reports exactly once: a panicking task reports `failed` with a
    /// transport failure, and so does a job whose thread could not be spawned.
    fn spawn<F, G>(&mut self, name: &str, task: F, failed: G)
    where
        F: FnOnce(&dyn MlBackend) -> JobMessage + Send + 'static,
        G: FnOnce(ApiFailure) -> JobMessage + Clone + Send + 'static,
    {
        let backend = Arc::clone(&self.backend);
        let tx = self.message_tx.clone();
        let on_spawn_error = failed.clone();
        let spawned = thread::Builder::new()
            .name(format!("xaiflow-{name}"))
            .spawn(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| task(backend.as_ref())));
                let message = outcome.unwrap_or_else(|payload| failed(panicked(payload)));
                let _ = tx.send(message);
            });
        self.in_flight += 1;
        if let Err(err) = spawned {
            tracing::error!(job = name, "Failed to spawn worker thread: {err}");
            let failure = ApiFailure::transport(format!("Failed to start request: {err}"));
            let _ = self.message_tx.send(on_spawn_error(failure));
        }
    }
}

/// Turn a panicked worker into a transport failure so both halves always settle.
fn settle<T>(joined: Result<Result<T, ApiFailure>, Box<dyn Any + Send>>) -> Result<T, ApiFailure> {
    joined.unwrap_or_else(|payload| Err(panicked(payload)))
}

fn panicked(payload: Box<dyn Any + Send>) -> ApiFailure {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    tracing::error!("Worker panicked: {detail}");
    ApiFailure::transport(format!("Request worker failed: {detail}"))
}
