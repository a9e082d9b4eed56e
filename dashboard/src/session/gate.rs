use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use std::io;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tracing::{info, warn};

use super::TokenStore;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Token is empty or contains characters that cannot be sent in a header")]
    InvalidToken,

    #[error("Failed to access the stored session token: {0}")]
    Storage(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
}

/// Current credentials
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub token: Option<String>,
    pub is_authenticated: bool,
}

impl Session {
    fn authenticated(token: String) -> Self {
        Self {
            token: Some(token),
            is_authenticated: true,
        }
    }
}

/// Sole owner of the session token and its persisted copy
pub struct SessionGate {
    storage: Arc<dyn TokenStore>,
    session: RwLock<Session>,
}

impl SessionGate {
    /// Create an unauthenticated gate backed by `storage`
    pub fn new(storage: Arc<dyn TokenStore>) -> Self {
        Self {
            storage,
            session: RwLock::new(Session::default()),
        }
    }

    /// Adopt a persisted token if one is present and looks usable.
    ///
    /// No network call is made; an unreadable store leaves the gate
    /// unauthenticated.
    pub fn restore_session(&self) -> SessionState {
        match self.storage.load() {
            Ok(Some(token)) if bearer_value(&token).is_some() => {
                *self.write() = Session::authenticated(token);
                info!("Restored persisted session");
            }
            Ok(Some(_)) => warn!("Ignoring persisted token that is not usable as a bearer credential"),
            Ok(None) => info!("No persisted session found"),
            Err(e) => warn!("Failed to read persisted session token: {}", e),
        }
        self.state()
    }

    /// Persist `token` and become authenticated
    pub fn login(&self, token: &str) -> Result<(), SessionError> {
        let token = token.trim();
        if bearer_value(token).is_none() {
            return Err(SessionError::InvalidToken);
        }

        self.storage.save(token)?;
        *self.write() = Session::authenticated(token.to_string());
        info!("Logged in");
        Ok(())
    }

    /// Forget the token in memory and on disk.
    ///
    /// The in-memory session is always dropped, even if erasing the persisted
    /// copy fails.
    pub fn logout(&self) -> Result<(), SessionError> {
        *self.write() = Session::default();
        info!("Logged out");
        self.storage.clear()?;
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        if self.read().is_authenticated {
            SessionState::Authenticated
        } else {
            SessionState::Unauthenticated
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.state() == SessionState::Authenticated
    }

    pub fn session(&self) -> Session {
        self.read().clone()
    }

    /// Headers to attach to outbound requests
    pub fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let session = self.read();
        if let (true, Some(token)) = (session.is_authenticated, session.token.as_deref()) {
            if let Some(value) = bearer_value(token) {
                headers.insert(AUTHORIZATION, value);
            }
        }
        headers
    }

    fn read(&self) -> RwLockReadGuard<'_, Session> {
        self.session.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Session> {
        self.session.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn bearer_value(token: &str) -> Option<HeaderValue> {
    if token.trim().is_empty() {
        return None;
    }
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token)).ok()?;
    value.set_sensitive(true);
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemoryTokenStore;

    fn gate_with(storage: MemoryTokenStore) -> (SessionGate, Arc<MemoryTokenStore>) {
        let storage = Arc::new(storage);
        (SessionGate::new(storage.clone()), storage)
    }

    #[test]
    fn test_starts_unauthenticated_without_headers() {
        let (gate, _) = gate_with(MemoryTokenStore::new());
        assert_eq!(gate.state(), SessionState::Unauthenticated);
        assert!(gate.auth_headers().is_empty());
    }

    #[test]
    fn test_restore_adopts_persisted_token() {
        let (gate, _) = gate_with(MemoryTokenStore::with_token("persisted-token"));

        assert_eq!(gate.restore_session(), SessionState::Authenticated);
        assert_eq!(gate.session().token.as_deref(), Some("persisted-token"));
        assert_eq!(
            gate.auth_headers().get(AUTHORIZATION).unwrap(),
            "Bearer persisted-token"
        );
    }

    #[test]
    fn test_restore_without_token_stays_unauthenticated() {
        let (gate, _) = gate_with(MemoryTokenStore::new());
        assert_eq!(gate.restore_session(), SessionState::Unauthenticated);
    }

    #[test]
    fn test_restore_ignores_unusable_token() {
        let (gate, _) = gate_with(MemoryTokenStore::with_token("bad\ntoken"));
        assert_eq!(gate.restore_session(), SessionState::Unauthenticated);
    }

    #[test]
    fn test_login_persists_and_authenticates() {
        let (gate, storage) = gate_with(MemoryTokenStore::new());

        gate.login("  fresh-token ").unwrap();

        assert!(gate.is_authenticated());
        assert_eq!(storage.load().unwrap(), Some("fresh-token".to_string()));
        assert_eq!(gate.auth_headers().get(AUTHORIZATION).unwrap(), "Bearer fresh-token");
    }

    #[test]
    fn test_login_rejects_empty_token() {
        let (gate, storage) = gate_with(MemoryTokenStore::new());

        assert!(matches!(gate.login("   "), Err(SessionError::InvalidToken)));
        assert!(!gate.is_authenticated());
        assert_eq!(storage.load().unwrap(), None);
    }

    #[test]
    fn test_logout_clears_memory_and_storage() {
        let (gate, storage) = gate_with(MemoryTokenStore::new());
        gate.login("token").unwrap();

        gate.logout().unwrap();

        assert_eq!(gate.state(), SessionState::Unauthenticated);
        assert_eq!(gate.session(), Session::default());
        assert!(gate.auth_headers().is_empty());
        assert_eq!(storage.load().unwrap(), None);
    }
}
