use serde_json::{Value, json};

/// Failure of one remote call.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ApiFailure {
    /// The request never produced a response: connect error, socket timeout, bad body read.
    #[error("{message}")]
    Transport { message: String },
    /// Non-2xx response. `body` holds the parsed JSON body, or the raw text as a string.
    #[error("Request failed with status code {status}")]
    Server { status: u16, body: Option<Value> },
    /// 401/403 on an authenticated endpoint; the session has already been torn down.
    #[error("Session ended (HTTP {status})")]
    Session { status: u16 },
    /// 2xx response whose body did not match the expected shape.
    #[error("Unexpected response: {message}")]
    Decode { message: String },
}

impl ApiFailure {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn server(status: u16, body: Option<Value>) -> Self {
        Self::Server { status, body }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    pub fn is_session(&self) -> bool {
        matches!(self, Self::Session { .. })
    }

    /// Render the failure as a loosely structured payload for message resolution.
    ///
    /// Server failures expose their body under `response.data`; a top-level `message`
    /// is only present when there is no body to inspect.
    pub fn to_payload(&self) -> Value {
        match self {
            Self::Transport { message } | Self::Decode { message } => json!({ "message": message }),
            Self::Server {
                status,
                body: Some(body),
            } => json!({ "response": { "status": status, "data": body } }),
            Self::Server { status, body: None } | Self::Session { status } => json!({
                "message": self.to_string(),
                "response": { "status": status },
            }),
        }
    }
}
