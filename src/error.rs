// src/error.rs
use serde::Serialize;

/// Failure taxonomy shared by every operation.
///
/// `NotAuthorized` and `Transport` abort the current operation. `EmptySource`
/// is absorbed by callers into a zero-count success. Unmatched names never
/// become errors; they only show up in aggregate counts.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Nothing to read: {0}")]
    EmptySource(String),

    #[error("Transport error: {message}")]
    Transport {
        message: String,
        status: Option<String>,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("State file error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SyncError {
    pub fn transport_with_status(message: impl Into<String>, status: impl Into<String>) -> Self {
        SyncError::Transport { message: message.into(), status: Some(status.into()) }
    }

    /// Errors that callers fold into an empty, successful result.
    pub fn is_absorbed(&self) -> bool {
        matches!(self, SyncError::EmptySource(_))
    }

    /// Upstream status text, when the failing collaborator supplied one.
    pub fn status(&self) -> Option<&str> {
        match self {
            SyncError::Transport { status, .. } => status.as_deref(),
            SyncError::Io(e) => Some(io_kind(e)),
            _ => None,
        }
    }
}

fn io_kind(e: &std::io::Error) -> &'static str {
    match e.kind() {
        std::io::ErrorKind::NotFound => "not found",
        std::io::ErrorKind::PermissionDenied => "permission denied",
        _ => "io failure",
    }
}

/// Uniform `{success, data?, error?}` shape every public operation resolves to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl<T> Outcome<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None, status: None }
    }

    pub fn fail(err: &SyncError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(err.to_string()),
            status: err.status().map(str::to_string),
        }
    }

    pub fn into_result(self) -> Result<T, String> {
        match (self.success, self.data) {
            (true, Some(d)) => Ok(d),
            _ => Err(self.error.unwrap_or_else(|| s!("unknown error"))),
        }
    }
}

impl<T> From<Result<T, SyncError>> for Outcome<T> {
    fn from(r: Result<T, SyncError>) -> Self {
        match r {
            Ok(d) => Outcome::ok(d),
            Err(e) => {
                loge!("{e}");
                Outcome::fail(&e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_status_flows_into_outcome() {
        let err = SyncError::transport_with_status("append failed", "HTTP 503");
        let out: Outcome<()> = Err(err).into();
        assert!(!out.success);
        assert_eq!(out.status.as_deref(), Some("HTTP 503"));
        assert!(out.error.unwrap().contains("append failed"));
    }

    #[test]
    fn success_serializes_without_error_fields() {
        let out = Outcome::ok(3usize);
        let json = serde_json::to_string(&out).unwrap();
        assert_eq!(json, r#"{"success":true,"data":3}"#);
    }

    #[test]
    fn only_empty_source_is_absorbed() {
        assert!(SyncError::EmptySource(s!("no rows")).is_absorbed());
        assert!(!SyncError::NotAuthorized(s!("no token")).is_absorbed());
        assert!(!SyncError::transport_with_status("boom", "HTTP 500").is_absorbed());
    }
}
