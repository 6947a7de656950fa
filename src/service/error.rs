//! Failures reported by the external collaborators.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Which collaborator failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    Generator,
    Backend,
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceKind::Generator => write!(f, "SQL generator"),
            ServiceKind::Backend => write!(f, "query backend"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExternalErrorKind {
    Unreachable,
    Timeout,
    Status(u16),
    /// The response arrived but could not be decoded.
    Malformed,
    /// The response decoded but carried nothing usable.
    Empty,
}

impl fmt::Display for ExternalErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExternalErrorKind::Unreachable => write!(f, "unreachable"),
            ExternalErrorKind::Timeout => write!(f, "timed out"),
            ExternalErrorKind::Status(code) => write!(f, "status {}", code),
            ExternalErrorKind::Malformed => write!(f, "malformed response"),
            ExternalErrorKind::Empty => write!(f, "empty response"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{service} {kind}: {message}")]
pub struct ExternalServiceError {
    pub service: ServiceKind,
    pub kind: ExternalErrorKind,
    pub message: String,
}

impl ExternalServiceError {
    pub fn new(service: ServiceKind, kind: ExternalErrorKind, message: impl Into<String>) -> Self {
        Self {
            service,
            kind,
            message: message.into(),
        }
    }

    pub fn generator(kind: ExternalErrorKind, message: impl Into<String>) -> Self {
        Self::new(ServiceKind::Generator, kind, message)
    }

    pub fn backend(kind: ExternalErrorKind, message: impl Into<String>) -> Self {
        Self::new(ServiceKind::Backend, kind, message)
    }

    /// Transport failures and server-side statuses may succeed on retry;
    /// client errors and bad payloads will not.
    pub fn is_retryable(&self) -> bool {
        match self.kind {
            ExternalErrorKind::Unreachable | ExternalErrorKind::Timeout => true,
            ExternalErrorKind::Status(code) => code == 429 || code >= 500,
            ExternalErrorKind::Malformed | ExternalErrorKind::Empty => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_kinds() {
        let err = |kind| ExternalServiceError::backend(kind, "x");
        assert!(err(ExternalErrorKind::Timeout).is_retryable());
        assert!(err(ExternalErrorKind::Unreachable).is_retryable());
        assert!(err(ExternalErrorKind::Status(503)).is_retryable());
        assert!(err(ExternalErrorKind::Status(429)).is_retryable());
        assert!(!err(ExternalErrorKind::Status(400)).is_retryable());
        assert!(!err(ExternalErrorKind::Malformed).is_retryable());
        assert!(!err(ExternalErrorKind::Empty).is_retryable());
    }

    #[test]
    fn display_names_service_and_kind() {
        let err = ExternalServiceError::generator(ExternalErrorKind::Status(401), "bad key");
        assert_eq!(err.to_string(), "SQL generator status 401: bad key");
    }
}
