//! Session and navigation capabilities injected into the transport.
//!
//! Token persistence lives outside this crate; [`MemorySession`] only holds the
//! bearer token for the lifetime of the process.

use std::sync::Mutex;

/// Supplies and clears the bearer credential.
pub trait Session: Send + Sync {
    fn token(&self) -> Option<String>;
    fn set_token(&self, token: String);
    fn clear(&self);
}

/// Sends the user back to authentication after the session ended.
pub trait Navigator: Send + Sync {
    fn redirect_to_login(&self);
}

#[derive(Debug, Default)]
pub struct MemorySession {
    token: Mutex<Option<String>>,
}

impl MemorySession {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: Mutex::new(token.filter(|token| !token.trim().is_empty())),
        }
    }
}

impl Session for MemorySession {
    fn token(&self) -> Option<String> {
        self.token
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .clone()
    }

    fn set_token(&self, token: String) {
        *self.token.lock().unwrap_or_else(|err| err.into_inner()) = Some(token);
    }

    fn clear(&self) {
        *self.token.lock().unwrap_or_else(|err| err.into_inner()) = None;
    }
}

/// Navigator for headless use: records the redirect in the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn redirect_to_login(&self) {
        tracing::warn!("Session ended; re-authentication required");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_initial_token_is_ignored() {
        assert_eq!(MemorySession::new(Some("  ".to_string())).token(), None);
    }

    #[test]
    fn clear_drops_token() {
        let session = MemorySession::new(Some("abc".to_string()));
        session.set_token("def".to_string());
        assert_eq!(session.token().as_deref(), Some("def"));
        session.clear();
        assert_eq!(session.token(), None);
    }
}
