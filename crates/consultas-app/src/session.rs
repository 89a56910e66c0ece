// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    LoggedOut,
    Active,
    Exited,
}

#[derive(Clone, PartialEq, Eq, Default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("login rejected: {0}")]
    Rejected(String),
    #[error("not logged in -- log in before using the console")]
    NotLoggedIn,
    #[error("already logged in")]
    AlreadyLoggedIn,
}

/// Decides whether a set of credentials may enter the console.
pub trait AuthenticationPort: fmt::Debug + Send {
    fn authenticate(&self, credentials: &Credentials) -> Result<(), SessionError>;
}

/// Lets every credential pair through. Not a security boundary.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAnyCredentials;

impl AuthenticationPort for AcceptAnyCredentials {
    fn authenticate(&self, _credentials: &Credentials) -> Result<(), SessionError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionController {
    state: SessionState,
}

impl Default for SessionController {
    fn default() -> Self {
        Self {
            state: SessionState::LoggedOut,
        }
    }
}

impl SessionController {
    pub const fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    pub fn login(
        &mut self,
        port: &dyn AuthenticationPort,
        credentials: &Credentials,
    ) -> Result<(), SessionError> {
        if self.state != SessionState::LoggedOut {
            return Err(SessionError::AlreadyLoggedIn);
        }
        port.authenticate(credentials)?;
        self.state = SessionState::Active;
        Ok(())
    }

    /// Returns `true` when this call moved the session to `Exited`.
    pub fn exit(&mut self) -> Result<bool, SessionError> {
        match self.state {
            SessionState::LoggedOut => Err(SessionError::NotLoggedIn),
            SessionState::Active => {
                self.state = SessionState::Exited;
                Ok(true)
            }
            SessionState::Exited => Ok(false),
        }
    }

    /// Gate for selecting a query. Re-enters an exited session and returns
    /// `true` when it did so.
    pub fn enter_for_selection(&mut self) -> Result<bool, SessionError> {
        match self.state {
            SessionState::LoggedOut => Err(SessionError::NotLoggedIn),
            SessionState::Active => Ok(false),
            SessionState::Exited => {
                self.state = SessionState::Active;
                Ok(true)
            }
        }
    }
}
