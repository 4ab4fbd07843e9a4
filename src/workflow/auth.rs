use crate::api::{self, ApiFailure, AuthResponse, FailureContext, LoginRequest, RegisterRequest};

use super::RequestIds;
use super::validation::ValidationError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum AuthKind {
    Login,
    Register,
}

impl AuthKind {
    fn context(self) -> FailureContext {
        match self {
            Self::Login => FailureContext::Login,
            Self::Register => FailureContext::Register,
        }
    }
}

/// Login and registration calls; one at a time.
#[derive(Debug, Default)]
pub struct AuthFlow {
    pending: Option<(u64, AuthKind)>,
    last_error: Option<String>,
    ids: RequestIds,
}

impl AuthFlow {
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub(crate) fn begin_login(
        &mut self,
        username: &str,
        password: &str,
    ) -> Result<(u64, LoginRequest), ValidationError> {
        require(&[("username", username), ("password", password)])?;
        let request_id = self.start(AuthKind::Login);
        Ok((
            request_id,
            LoginRequest {
                username: username.trim().to_string(),
                password: password.to_string(),
            },
        ))
    }

    pub(crate) fn begin_register(
        &mut self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<(u64, RegisterRequest), ValidationError> {
        require(&[
            ("username", username),
            ("email", email),
            ("password", password),
        ])?;
        let request_id = self.start(AuthKind::Register);
        Ok((
            request_id,
            RegisterRequest {
                username: username.trim().to_string(),
                email: email.trim().to_string(),
                password: password.to_string(),
            },
        ))
    }

    pub(crate) fn apply_login(
        &mut self,
        request_id: u64,
        result: Result<AuthResponse, ApiFailure>,
    ) -> Option<Result<AuthResponse, String>> {
        self.settle(request_id, AuthKind::Login, result)
    }

    pub(crate) fn apply_register(
        &mut self,
        request_id: u64,
        result: Result<(), ApiFailure>,
    ) -> Option<Result<(), String>> {
        self.settle(request_id, AuthKind::Register, result)
    }

    fn start(&mut self, kind: AuthKind) -> u64 {
        let request_id = self.ids.next();
        self.pending = Some((request_id, kind));
        self.last_error = None;
        request_id
    }

    fn settle<T>(
        &mut self,
        request_id: u64,
        kind: AuthKind,
        result: Result<T, ApiFailure>,
    ) -> Option<Result<T, String>> {
        if self.pending != Some((request_id, kind)) {
            return None;
        }
        self.pending = None;
        Some(result.map_err(|failure| {
            tracing::warn!(request_id, ?kind, "Authentication call failed: {failure}");
            let message = api::resolve(&failure, kind.context());
            self.last_error = Some(message.clone());
            message
        }))
    }
}

fn require(fields: &[(&str, &str)]) -> Result<(), ValidationError> {
    let missing = fields
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name.to_string())
        .collect();
    match ValidationError::from_missing(missing) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
