// src/auth.rs
// Credential acquisition for the record store.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::consts::TOKEN_ENV;
use crate::error::SyncError;

/// Opaque bearer credential. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    pub fn new(secret: impl Into<String>) -> Result<Self, SyncError> {
        let secret = secret.into();
        if secret.trim().is_empty() {
            return Err(SyncError::NotAuthorized(s!("empty credential")));
        }
        Ok(Self(secret))
    }

    pub fn secret(&self) -> &str { &self.0 }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token(****)")
    }
}

/// `acquire(interactive)`: with `interactive = false` a provider must not
/// prompt and fails with `NotAuthorized` if it has nothing cached.
#[allow(async_fn_in_trait)]
pub trait CredentialProvider {
    async fn acquire(&mut self, interactive: bool) -> Result<Token, SyncError>;
}

/// Fixed token, e.g. from the command line.
pub struct StaticCredential {
    token: Option<Token>,
}

impl StaticCredential {
    pub fn new(token: Option<Token>) -> Self { Self { token } }
}

impl CredentialProvider for StaticCredential {
    async fn acquire(&mut self, _interactive: bool) -> Result<Token, SyncError> {
        self.token
            .clone()
            .ok_or_else(|| SyncError::NotAuthorized(s!("Failed to get auth token")))
    }
}

/// Token read from an environment variable on each acquire.
pub struct EnvCredential {
    var: String,
}

impl Default for EnvCredential {
    fn default() -> Self { Self { var: s!(TOKEN_ENV) } }
}

impl EnvCredential {
    pub fn new(var: impl Into<String>) -> Self { Self { var: var.into() } }
}

impl CredentialProvider for EnvCredential {
    async fn acquire(&mut self, interactive: bool) -> Result<Token, SyncError> {
        match std::env::var(&self.var) {
            Ok(v) => Token::new(v),
            Err(_) => {
                if interactive {
                    logw!("{} is not set; nothing to prompt with", self.var);
                }
                Err(SyncError::NotAuthorized(format!("{} is not set", self.var)))
            }
        }
    }
}
