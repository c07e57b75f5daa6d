//! Unified failure taxonomy for remote calls
//!
//! Every failure that crosses the boundary between application code and a
//! remote backend is converted exactly once into an [`AppError`]: a typed
//! value carrying the taxonomy kind, a severity level, both a technical and
//! a user-facing message, and a retryability verdict that is derived from
//! the kind/code at classification time and never mutated afterward.
//!
//! The classification rules themselves live in [`classify`], which accepts
//! the [`RawFailure`] sum type rather than sniffing loosely-typed fields:
//! callers describe the failure shape they observed (transport error, HTTP
//! status, backend payload, deadline expiry, free text) and the rules are
//! exhaustive matches over those shapes.
//!
//! # Propagation policy
//!
//! Classified errors flow one of three ways:
//! - back to the caller as an `Err(AppError)`,
//! - into the error reporter when [`should_report`] says so (severity High
//!   or Critical, or an Api error with a 5xx code),
//! - absorbed into a fallback value by the graceful-degradation helpers,
//!   with reporting still happening unless explicitly silenced.

mod classify;

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use classify::{classify, user_message_for, RawFailure};

/// Standard result type using [`AppError`]
pub type AppResult<T> = Result<T, AppError>;

/// Failure taxonomy kinds
///
/// The kind is fixed at classification time and drives retryability,
/// reporting, and the user-facing presentation tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Transport-level failure before any response was produced
    Network,
    /// The backend answered with an error
    Api,
    /// The request payload was rejected as invalid
    Validation,
    /// Authentication is missing, expired, or rejected
    Auth,
    /// The addressed resource does not exist
    NotFound,
    /// The caller is authenticated but not allowed
    Permission,
    /// A deadline expired while waiting for the operation
    Timeout,
    /// Nothing recognizable was observed
    Unknown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => write!(f, "NETWORK"),
            Self::Api => write!(f, "API"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::Auth => write!(f, "AUTH"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Permission => write!(f, "PERMISSION"),
            Self::Timeout => write!(f, "TIMEOUT"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Error severity levels for reporting and presentation decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorSeverity {
    /// Expected conditions, informational presentation
    Low,
    /// Degraded but recoverable
    Medium,
    /// Failure requiring attention
    High,
    /// Requires immediate attention, never auto-dismissed
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// The classified representation of any failure
///
/// Invariant: `retryable` is derived solely from `kind`/`code` by the
/// classification rules and is never mutated after construction.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("[{kind}] {message}")]
pub struct AppError {
    pub kind: ErrorKind,
    pub severity: ErrorSeverity,
    /// Technical message, suitable for logs
    pub message: String,
    /// Non-technical message, suitable for direct user presentation
    pub user_message: String,
    /// Backend or HTTP code that produced this classification, if any
    pub code: Option<String>,
    pub retryable: bool,
    pub timestamp: DateTime<Utc>,
    /// Opaque payload carried along for diagnostics
    pub details: Option<serde_json::Value>,
}

impl AppError {
    fn new(
        kind: ErrorKind,
        severity: ErrorSeverity,
        message: impl Into<String>,
        user_message: impl Into<String>,
        retryable: bool,
    ) -> Self {
        Self {
            kind,
            severity,
            message: message.into(),
            user_message: user_message.into(),
            code: None,
            retryable,
            timestamp: Utc::now(),
            details: None,
        }
    }

    /// Create a transport-level network error (retryable)
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::Network,
            ErrorSeverity::Medium,
            message,
            "Connection problem. Check your internet connection.",
            true,
        )
    }

    /// Create a backend error with explicit severity and retryability
    pub fn api(
        message: impl Into<String>,
        severity: ErrorSeverity,
        retryable: bool,
    ) -> Self {
        Self::new(
            ErrorKind::Api,
            severity,
            message,
            "Something went wrong. Please try again.",
            retryable,
        )
    }

    /// Create a validation error (never retryable)
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::Validation,
            ErrorSeverity::Medium,
            message,
            "The provided data is invalid.",
            false,
        )
    }

    /// Create an authentication error (never retryable)
    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::Auth,
            ErrorSeverity::High,
            message,
            "Your session has expired. Please sign in again.",
            false,
        )
    }

    /// Create a not-found error (never retryable)
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::NotFound,
            ErrorSeverity::Low,
            message,
            "The requested resource was not found.",
            false,
        )
    }

    /// Create a permission error (never retryable)
    pub fn permission(message: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::Permission,
            ErrorSeverity::High,
            message,
            "You do not have permission to perform this action.",
            false,
        )
    }

    /// Create a timeout error for an operation that exceeded its deadline
    /// (retryable)
    pub fn timeout(waited: Duration) -> Self {
        Self::new(
            ErrorKind::Timeout,
            ErrorSeverity::Medium,
            format!("operation timed out after {waited:?}"),
            "The request took too long. Please try again.",
            true,
        )
    }

    /// Create an unknown error (never retryable)
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::Unknown,
            ErrorSeverity::Low,
            message,
            "An unexpected error occurred.",
            false,
        )
    }

    /// Attach the backend or HTTP code that produced this classification
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Replace the user-facing message
    pub fn with_user_message(mut self, user_message: impl Into<String>) -> Self {
        self.user_message = user_message.into();
        self
    }

    /// Attach an opaque diagnostics payload
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Convert the error to structured tracing fields
    pub fn as_tracing_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("kind", self.kind.to_string()),
            ("severity", self.severity.to_string()),
            ("message", self.message.clone()),
            ("retryable", self.retryable.to_string()),
        ];
        if let Some(code) = &self.code {
            fields.push(("code", code.clone()));
        }
        fields
    }
}

impl ErrorClassification for AppError {
    fn is_retryable(&self) -> bool {
        self.retryable
    }

    fn severity(&self) -> ErrorSeverity {
        self.severity
    }

    fn is_critical(&self) -> bool {
        self.severity == ErrorSeverity::Critical
    }
}

/// Error classification trait for consistent handling across modules
///
/// Implemented by [`AppError`] and by any module-specific error that wants
/// to participate in the shared retry/reporting machinery.
pub trait ErrorClassification {
    /// Whether the failed operation can safely be attempted again
    fn is_retryable(&self) -> bool;

    /// Severity level used for reporting and presentation decisions
    fn severity(&self) -> ErrorSeverity;

    /// Whether this error requires immediate attention
    fn is_critical(&self) -> bool {
        self.severity() == ErrorSeverity::Critical
    }
}

/// Reporting policy: which classified errors are worth persisting
///
/// High and Critical severities always report; Api errors report when they
/// carry a 5xx code even at lower severity.
pub fn should_report(error: &AppError) -> bool {
    if error.severity >= ErrorSeverity::High {
        return true;
    }
    error.kind == ErrorKind::Api
        && error.code.as_deref().is_some_and(|code| code.starts_with('5'))
}
