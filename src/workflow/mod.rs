//! Workflow controller: owns every component's state and applies background results.
//!
//! All mutation happens on the thread that drives the controller. Remote calls run on
//! worker threads and come back as tagged [`jobs::JobMessage`]s, drained by
//! [`WorkbenchController::poll_background_jobs`].

mod auth;
mod configuration;
mod directory;
mod inference;
mod jobs;
mod mutation;
mod training;
mod upload;
mod validation;

#[cfg(test)]
mod test_support;

use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::api::{self, DatasetId, MlBackend, ModelId, Session};
use crate::config::ClientConfig;

pub use auth::AuthFlow;
pub use configuration::ConfigurationBuilder;
pub use directory::ResourceDirectory;
pub use inference::{InferenceOrchestrator, InferenceResult, InferenceState};
pub use mutation::{DeleteTarget, MutationConfirmer, MutationOutcome, MutationState};
pub use training::{TrainingError, TrainingOrchestrator, TrainingState};
pub use upload::{UploadError, UploadTracker};
pub use validation::{LookupError, ValidationError};

use jobs::{ControllerJobs, JobMessage};

const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Monotonic request ids; zero is never issued.
#[derive(Debug, Default)]
pub(crate) struct RequestIds {
    last: u64,
}

impl RequestIds {
    pub(crate) fn next(&mut self) -> u64 {
        self.last = self.last.wrapping_add(1).max(1);
        self.last
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusTone {
    Idle,
    Busy,
    Success,
    Error,
}

/// Latest user-facing status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusLine {
    pub text: String,
    pub tone: StatusTone,
}

impl Default for StatusLine {
    fn default() -> Self {
        Self {
            text: "Ready".to_string(),
            tone: StatusTone::Idle,
        }
    }
}

pub struct WorkbenchController {
    directory: ResourceDirectory,
    configuration: ConfigurationBuilder,
    training: TrainingOrchestrator,
    inference: InferenceOrchestrator,
    deletes: MutationConfirmer<DeleteTarget>,
    uploads: UploadTracker,
    auth: AuthFlow,
    jobs: ControllerJobs,
    session: Arc<dyn Session>,
    status: StatusLine,
    session_ended: bool,
}

impl WorkbenchController {
    pub fn new(
        backend: Arc<dyn MlBackend>,
        session: Arc<dyn Session>,
        config: &ClientConfig,
    ) -> Self {
        Self {
            directory: ResourceDirectory::default(),
            configuration: ConfigurationBuilder::default(),
            training: TrainingOrchestrator::new(config.training_timeout()),
            inference: InferenceOrchestrator::default(),
            deletes: MutationConfirmer::default(),
            uploads: UploadTracker::default(),
            auth: AuthFlow::default(),
            jobs: ControllerJobs::new(backend),
            session,
            status: StatusLine::default(),
            session_ended: false,
        }
    }

    pub fn directory(&self) -> &ResourceDirectory {
        &self.directory
    }

    pub fn configuration(&self) -> &ConfigurationBuilder {
        &self.configuration
    }

    /// Synchronous edits: model name/type, target and feature toggles.
    pub fn configuration_mut(&mut self) -> &mut ConfigurationBuilder {
        &mut self.configuration
    }

    pub fn training(&self) -> &TrainingOrchestrator {
        &self.training
    }

    pub fn inference(&self) -> &InferenceOrchestrator {
        &self.inference
    }

    pub fn deletes(&self) -> &MutationConfirmer<DeleteTarget> {
        &self.deletes
    }

    pub fn uploads(&self) -> &UploadTracker {
        &self.uploads
    }

    pub fn auth(&self) -> &AuthFlow {
        &self.auth
    }

    pub fn status(&self) -> &StatusLine {
        &self.status
    }

    /// True once a session failure tore everything down, until the next successful login.
    pub fn session_ended(&self) -> bool {
        self.session_ended
    }

    pub fn is_busy(&self) -> bool {
        self.jobs.in_flight() > 0
    }

    /// Reload both listings. An older refresh still in flight is superseded.
    pub fn refresh(&mut self) {
        let request_id = self.directory.begin_refresh();
        self.jobs.begin_refresh(request_id);
    }

    pub fn select_dataset(&mut self, id: DatasetId) {
        let request_id = self.configuration.select_dataset(id);
        self.jobs.begin_dataset_detail(request_id, id);
    }

    /// Leaving the training flow discards the in-progress configuration.
    pub fn leave_training(&mut self) {
        self.configuration.reset();
    }

    pub fn submit_training(&mut self) -> Result<(), TrainingError> {
        let ticket = self.training.submit(&self.configuration, Instant::now())?;
        self.jobs.begin_training(ticket.request_id, ticket.request);
        self.set_status("Training model...", StatusTone::Busy);
        Ok(())
    }

    pub fn select_model(&mut self, id: ModelId) {
        let request_id = self.inference.select_model(id);
        self.jobs.begin_model_detail(request_id, id);
    }

    pub fn set_input(&mut self, feature: &str, value: impl Into<String>) -> bool {
        self.inference.set_input(feature, value)
    }

    pub fn run_inference(&mut self) -> Result<(), ValidationError> {
        let ticket = self.inference.run()?;
        self.jobs
            .begin_inference(ticket.run_id, ticket.model_id, ticket.input);
        self.set_status("Running prediction...", StatusTone::Busy);
        Ok(())
    }

    pub fn request_delete(&mut self, target: DeleteTarget) -> bool {
        self.deletes.request(target)
    }

    pub fn cancel_delete(&mut self) -> bool {
        self.deletes.cancel()
    }

    /// Execute the pending delete. Returns `false` when nothing awaited confirmation.
    pub fn confirm_delete(&mut self) -> bool {
        let Some(ticket) = self.deletes.confirm() else {
            return false;
        };
        self.jobs.begin_delete(ticket.request_id, ticket.target);
        true
    }

    pub fn upload_dataset(&mut self, path: &Path) -> Result<(), UploadError> {
        let ticket = self.uploads.begin(path)?;
        self.jobs
            .begin_upload(ticket.request_id, ticket.file_name, ticket.contents);
        self.set_status("Uploading dataset...", StatusTone::Busy);
        Ok(())
    }

    pub fn login(&mut self, username: &str, password: &str) -> Result<(), ValidationError> {
        let (request_id, request) = self.auth.begin_login(username, password)?;
        self.jobs.begin_login(request_id, request);
        Ok(())
    }

    pub fn register(
        &mut self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<(), ValidationError> {
        let (request_id, request) = self.auth.begin_register(username, email, password)?;
        self.jobs.begin_register(request_id, request);
        Ok(())
    }

    pub fn poll_background_jobs(&mut self) {
        self.poll_at(Instant::now());
    }

    /// Poll until no job is in flight. Returns `false` if `timeout` elapsed first.
    pub fn wait_until_idle(&mut self, timeout: Duration) -> bool {
        let started = Instant::now();
        loop {
            self.poll_background_jobs();
            if !self.is_busy() {
                return true;
            }
            if started.elapsed() >= timeout {
                return false;
            }
            thread::sleep(IDLE_POLL_INTERVAL);
        }
    }

    pub(crate) fn poll_at(&mut self, now: Instant) {
        while let Ok(message) = self.jobs.try_recv_message() {
            if message.session_failed() {
                self.end_session();
                continue;
            }
            self.handle_job_message(message);
        }
        if self.training.check_deadline(now) {
            let message = self.training.timeout_message();
            self.set_status(message, StatusTone::Error);
        }
    }

    fn handle_job_message(&mut self, message: JobMessage) {
        match message {
            JobMessage::DirectoryRefreshed(message) => {
                self.directory
                    .apply_refresh(message.request_id, message.datasets, message.models);
            }
            JobMessage::DatasetDetailLoaded(message) => {
                if let Err(err) = self
                    .configuration
                    .apply_dataset_detail(message.request_id, message.result)
                {
                    self.set_status(err.message, StatusTone::Error);
                }
            }
            JobMessage::ModelDetailLoaded(message) => {
                if let Err(err) = self
                    .inference
                    .apply_model_detail(message.request_id, message.result)
                {
                    self.set_status(err.message, StatusTone::Error);
                }
            }
            JobMessage::TrainingFinished(message) => {
                if self.training.apply_result(
                    message.request_id,
                    message.finished_at,
                    message.result,
                ) {
                    self.handle_training_settled();
                }
            }
            JobMessage::InferenceFinished(message) => {
                if self.inference.apply_run(
                    message.run_id,
                    message.prediction,
                    message.explanation,
                ) {
                    match self.inference.state() {
                        InferenceState::Failed(text) => {
                            let text = text.clone();
                            self.set_status(text, StatusTone::Error);
                        }
                        _ => self.set_status(
                            "Prediction completed successfully!",
                            StatusTone::Success,
                        ),
                    }
                }
            }
            JobMessage::DeleteFinished(message) => {
                let context = self
                    .deletes
                    .executing()
                    .map(DeleteTarget::failure_context);
                let result = message.result.map_err(|failure| match context {
                    Some(context) => api::resolve(&failure, context),
                    None => failure.to_string(),
                });
                match self.deletes.apply_result(message.request_id, result) {
                    Some(MutationOutcome::Completed(target)) => self.handle_deleted(target),
                    Some(MutationOutcome::Failed { message, .. }) => {
                        self.set_status(message, StatusTone::Error)
                    }
                    None => {}
                }
            }
            JobMessage::UploadFinished(message) => {
                match self.uploads.apply_result(message.request_id, message.result) {
                    Some(Ok(())) => {
                        self.set_status("Dataset uploaded successfully!", StatusTone::Success);
                        self.refresh();
                    }
                    Some(Err(text)) => self.set_status(text, StatusTone::Error),
                    None => {}
                }
            }
            JobMessage::LoginFinished(message) => {
                match self.auth.apply_login(message.request_id, message.result) {
                    Some(Ok(auth)) => {
                        self.session.set_token(auth.access_token);
                        self.session_ended = false;
                        let text = match auth.username {
                            Some(username) => format!("Logged in as {username}"),
                            None => "Logged in".to_string(),
                        };
                        self.set_status(text, StatusTone::Success);
                        self.refresh();
                    }
                    Some(Err(text)) => self.set_status(text, StatusTone::Error),
                    None => {}
                }
            }
            JobMessage::RegisterFinished(message) => {
                match self.auth.apply_register(message.request_id, message.result) {
                    Some(Ok(())) => self.set_status(
                        "Registration successful! Please log in.",
                        StatusTone::Success,
                    ),
                    Some(Err(text)) => self.set_status(text, StatusTone::Error),
                    None => {}
                }
            }
        }
    }

    fn handle_training_settled(&mut self) {
        match self.training.state() {
            TrainingState::Succeeded(_) => {
                self.configuration.clear_after_training();
                self.set_status("Model trained successfully!", StatusTone::Success);
                self.refresh();
            }
            TrainingState::Failed(text) => {
                let text = text.clone();
                self.set_status(text, StatusTone::Error);
            }
            TrainingState::TimedOut => {
                let text = self.training.timeout_message();
                self.set_status(text, StatusTone::Error);
            }
            TrainingState::Idle | TrainingState::Submitting { .. } => {}
        }
    }

    fn handle_deleted(&mut self, target: DeleteTarget) {
        match &target {
            DeleteTarget::Dataset { id, .. } => {
                if self.configuration.selected_dataset() == Some(*id) {
                    self.configuration.reset();
                }
            }
            DeleteTarget::Model { id, .. } => {
                if self.inference.selected_model() == Some(*id) {
                    self.inference.reset();
                }
            }
        }
        self.set_status(target.success_message(), StatusTone::Success);
        self.refresh();
    }

    /// Tear down after the backend rejected the session; in-flight results become stale.
    fn end_session(&mut self) {
        if !self.session_ended {
            tracing::warn!("Session ended; clearing workflow state");
        }
        self.session_ended = true;
        self.directory.clear();
        self.configuration.reset();
        self.training.reset();
        self.inference.reset();
        self.deletes.reset();
        self.uploads.reset();
        self.status = StatusLine::default();
    }

    fn set_status(&mut self, text: impl Into<String>, tone: StatusTone) {
        self.status = StatusLine {
            text: text.into(),
            tone,
        };
    }
}
