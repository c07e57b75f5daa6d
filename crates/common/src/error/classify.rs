//! Classification rules: [`RawFailure`] → [`AppError`]
//!
//! Classification happens exactly once, at the boundary where the raw
//! failure is caught. The rules are ordered by priority:
//!
//! 1. transport-failure markers in the message → Network, retryable
//! 2. status 401, JWT-related text, or auth error codes → Auth
//! 3. status 404 or row-not-found codes → NotFound
//! 4. status 400 or integrity/constraint code prefixes → Validation
//! 5. status 403 or row-level-security codes → Permission
//! 6. status 5xx → Api, retryable
//! 7. anything else → Api (Unknown when there is nothing to go on)

use std::time::Duration;

use super::{AppError, ErrorSeverity};

/// Backend error code for a rejected or expired JWT
const CODE_JWT_REJECTED: &str = "PGRST301";
/// Backend error code for a query that matched no rows
const CODE_ROW_NOT_FOUND: &str = "PGRST116";
/// Backend error code for a row-level-security denial
const CODE_RLS_DENIED: &str = "PGRST201";

/// The observed shape of a failure, before classification
///
/// Callers describe what they actually saw instead of handing over a
/// loosely-typed blob; the classification rules match exhaustively over
/// these shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum RawFailure {
    /// Transport-level failure: the request never produced a response
    Transport { message: String },
    /// An HTTP response with a non-success status
    Status { status: u16, message: String },
    /// A structured backend error payload
    Backend { code: String, message: String, details: Option<serde_json::Value> },
    /// A deadline expired while waiting for the operation
    Timeout { waited: Duration },
    /// Free-form failure text from an unknown source
    Other { message: String },
}

impl RawFailure {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport { message: message.into() }
    }

    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status { status, message: message.into() }
    }

    pub fn backend(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend { code: code.into(), message: message.into(), details: None }
    }

    pub fn backend_with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self::Backend { code: code.into(), message: message.into(), details: Some(details) }
    }

    pub fn timeout(waited: Duration) -> Self {
        Self::Timeout { waited }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other { message: message.into() }
    }

    /// Quick transient check, usable before (or without) full classification
    ///
    /// Mirrors the classification verdict for the common cases: transport
    /// and timeout failures, 5xx statuses, and rate limiting (429).
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } | Self::Timeout { .. } => true,
            Self::Status { status, .. } => (500..=599).contains(status) || *status == 429,
            Self::Backend { code, .. } => {
                code.parse::<u16>().is_ok_and(|c| (500..=599).contains(&c) || c == 429)
            }
            Self::Other { message } => {
                let lower = message.to_lowercase();
                lower.contains("network") || lower.contains("timeout")
            }
        }
    }
}

impl From<std::io::Error> for RawFailure {
    fn from(err: std::io::Error) -> Self {
        Self::Transport { message: err.to_string() }
    }
}

impl From<String> for RawFailure {
    fn from(message: String) -> Self {
        Self::Other { message }
    }
}

impl From<&str> for RawFailure {
    fn from(message: &str) -> Self {
        Self::Other { message: message.to_string() }
    }
}

/// Classify a raw failure into a typed [`AppError`]
///
/// Pure mapping: no side effects, and the resulting `retryable` flag is
/// final. `user_message` is always populated from the matched rule, with a
/// generic fallback for unmatched failures.
pub fn classify(raw: RawFailure) -> AppError {
    match raw {
        RawFailure::Transport { message } => AppError::network(message),
        RawFailure::Timeout { waited } => AppError::timeout(waited),
        RawFailure::Status { status, message } => classify_status(status, message),
        RawFailure::Backend { code, message, details } => {
            let err = classify_coded(&code, message).with_code(code);
            match details {
                Some(details) => err.with_details(details),
                None => err,
            }
        }
        RawFailure::Other { message } => classify_text(message),
    }
}

fn classify_status(status: u16, message: String) -> AppError {
    let err = match status {
        401 => AppError::auth(message),
        404 => AppError::not_found(message),
        400 => AppError::validation(message),
        403 => AppError::permission(message),
        500..=599 => AppError::api(message, ErrorSeverity::High, true)
            .with_user_message("Server error. Please try again later."),
        _ => AppError::api(message, ErrorSeverity::Medium, false),
    };
    err.with_code(status.to_string())
}

/// Rules for string-coded backend payloads, in priority order
///
/// Transport markers and JWT text outrank the code so that a wrapped
/// network failure or expired token is never misfiled under a generic code.
fn classify_coded(code: &str, message: String) -> AppError {
    if has_transport_marker(&message) {
        return AppError::network(message);
    }
    if code == "401" || code == CODE_JWT_REJECTED || message.contains("JWT") {
        return AppError::auth(message);
    }
    if code == "404" || code == CODE_ROW_NOT_FOUND {
        return AppError::not_found(message);
    }
    if code == "400" || code.starts_with("22") || code.starts_with("23") {
        return AppError::validation(message);
    }
    if code == "403" || code == CODE_RLS_DENIED {
        return AppError::permission(message);
    }
    if code.parse::<u16>().is_ok_and(|c| (500..=599).contains(&c)) {
        return AppError::api(message, ErrorSeverity::High, true)
            .with_user_message("Server error. Please try again later.");
    }
    AppError::api(message, ErrorSeverity::Medium, false)
}

fn classify_text(message: String) -> AppError {
    if message.is_empty() {
        return AppError::unknown("unknown error");
    }
    if has_transport_marker(&message) {
        return AppError::network(message);
    }
    if message.contains("JWT") {
        return AppError::auth(message);
    }
    AppError::api(message, ErrorSeverity::Medium, false)
}

fn has_transport_marker(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("failed to fetch") || lower.contains("networkerror")
}

/// Derive a friendly message from arbitrary failure text
///
/// Used when a failure reaches presentation without having been classified,
/// for example text bubbled out of a third-party layer.
pub fn user_message_for(message: &str) -> String {
    let lower = message.to_lowercase();

    if lower.contains("network") || lower.contains("fetch") {
        return "Connection problem. Check your internet connection.".to_string();
    }
    if lower.contains("timeout") {
        return "The request took too long. Please try again.".to_string();
    }
    if lower.contains("unauthorized") || lower.contains("401") {
        return "Your session has expired. Please sign in again.".to_string();
    }
    if lower.contains("forbidden") || lower.contains("403") {
        return "You do not have permission to perform this action.".to_string();
    }
    if lower.contains("not found") || lower.contains("404") {
        return "The requested resource was not found.".to_string();
    }
    if lower.contains("already exists") || lower.contains("duplicate") {
        return "This resource already exists.".to_string();
    }

    message.to_string()
}
