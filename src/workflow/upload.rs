use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::api::{self, ApiFailure, FailureContext};

use super::RequestIds;
use super::validation::ValidationError;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("An upload is already in progress")]
    Busy,
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug)]
pub(crate) struct UploadTicket {
    pub(crate) request_id: u64,
    pub(crate) file_name: String,
    pub(crate) contents: Vec<u8>,
}

/// At most one dataset upload in flight.
#[derive(Debug, Default)]
pub struct UploadTracker {
    pending: Option<u64>,
    last_error: Option<String>,
    ids: RequestIds,
}

impl UploadTracker {
    pub fn is_uploading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub(crate) fn begin(&mut self, path: &Path) -> Result<UploadTicket, UploadError> {
        if self.pending.is_some() {
            return Err(UploadError::Busy);
        }
        let file_name = csv_file_name(path).ok_or(ValidationError::NotCsv)?;
        let contents = fs::read(path).map_err(|source| UploadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let request_id = self.ids.next();
        self.pending = Some(request_id);
        self.last_error = None;
        tracing::info!(request_id, file_name = %file_name, bytes = contents.len(), "Uploading dataset");
        Ok(UploadTicket {
            request_id,
            file_name,
            contents,
        })
    }

    /// `None` for a stale id; otherwise the resolved outcome.
    pub(crate) fn apply_result(
        &mut self,
        request_id: u64,
        result: Result<(), ApiFailure>,
    ) -> Option<Result<(), String>> {
        if self.pending != Some(request_id) {
            return None;
        }
        self.pending = None;
        Some(result.map_err(|failure| {
            let message = api::resolve(&failure, FailureContext::Upload);
            tracing::warn!(request_id, "Upload failed: {failure}");
            self.last_error = Some(message.clone());
            message
        }))
    }

    pub fn reset(&mut self) {
        self.pending = None;
        self.last_error = None;
    }
}

fn csv_file_name(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    is_csv.then(|| name.to_string())
}
